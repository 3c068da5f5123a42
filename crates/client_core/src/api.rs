use async_trait::async_trait;
use reqwest::{
    header,
    multipart::{Form, Part},
    Client, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{User, UserId, UserPayload},
    error::detail_from_body,
    protocol::{
        export_csv_route, import_csv_route, user_route, users_route, ImportReport,
        IMPORT_FILE_FIELD,
    },
};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Paging parameters passed through to the backend list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Raw export as received: the bytes and the disposition header, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

/// A CSV file chosen for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn list_users(&self, query: &ListQuery) -> Result<Vec<User>, ClientError>;
    async fn get_user(&self, user_id: UserId) -> Result<User, ClientError>;
    async fn create_user(&self, payload: &UserPayload) -> Result<User, ClientError>;
    async fn update_user(
        &self,
        user_id: UserId,
        payload: &UserPayload,
    ) -> Result<User, ClientError>;
    async fn delete_user(&self, user_id: UserId) -> Result<(), ClientError>;
    async fn export_csv(&self) -> Result<CsvExport, ClientError>;
    async fn import_csv(&self, file: ImportFile) -> Result<ImportReport, ClientError>;
}

/// [`DirectoryApi`] over HTTP against the same-origin proxy.
#[derive(Clone)]
pub struct ProxyClient {
    http: Client,
    proxy_url: String,
}

impl ProxyClient {
    pub fn new(proxy_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), proxy_url)
    }

    pub fn with_client(http: Client, proxy_url: impl Into<String>) -> Self {
        let proxy_url = proxy_url.into().trim_end_matches('/').to_string();
        Self { http, proxy_url }
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.proxy_url)
    }
}

#[async_trait]
impl DirectoryApi for ProxyClient {
    async fn list_users(&self, query: &ListQuery) -> Result<Vec<User>, ClientError> {
        let response = self
            .http
            .get(self.url(users_route()))
            .query(query)
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, ClientError> {
        let response = self.http.get(self.url(&user_route(user_id))).send().await?;
        decode(ensure_success(response).await?).await
    }

    async fn create_user(&self, payload: &UserPayload) -> Result<User, ClientError> {
        let response = self
            .http
            .post(self.url(users_route()))
            .json(payload)
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }

    async fn update_user(
        &self,
        user_id: UserId,
        payload: &UserPayload,
    ) -> Result<User, ClientError> {
        let response = self
            .http
            .put(self.url(&user_route(user_id)))
            .json(payload)
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&user_route(user_id)))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn export_csv(&self) -> Result<CsvExport, ClientError> {
        let response = self.http.get(self.url(export_csv_route())).send().await?;
        let response = ensure_success(response).await?;
        let content_disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        debug!(size_bytes = bytes.len(), "csv export received");
        Ok(CsvExport {
            content_disposition,
            bytes,
        })
    }

    async fn import_csv(&self, file: ImportFile) -> Result<ImportReport, ClientError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str("text/csv")?;
        let form = Form::new().part(IMPORT_FILE_FIELD, part);
        let response = self
            .http
            .post(self.url(import_csv_route()))
            .multipart(form)
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }
}

/// Passes successful responses through and turns any other status into
/// [`ClientError::Status`] with the best detail the body offers.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => {
            warn!(status = status.as_u16(), %err, "failed to read proxy error body");
            Default::default()
        }
    };
    let detail = detail_from_body(&body);
    warn!(
        status = status.as_u16(),
        detail = detail.as_deref().unwrap_or_default(),
        "proxy returned an error status"
    );
    Err(ClientError::Status { status, detail })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
