//! Same-origin proxy onto the backend user service.
//!
//! Every handler follows the same order: configuration check, request body
//! check, one outbound call, response translation. Nothing is retried and no
//! state survives between calls.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use shared::error::ErrorEnvelope;
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::config::BackendOrigin;

pub mod routes;

const MISSING_BACKEND_MESSAGE: &str = "Backend API URL not configured";
const INVALID_REQUEST_MESSAGE: &str = "Invalid request body";

/// Proxy configuration, built once at startup and shared by all handlers.
#[derive(Clone)]
pub struct ProxyContext {
    http: Client,
    backend: Option<BackendOrigin>,
}

impl ProxyContext {
    pub fn new(backend: Option<BackendOrigin>) -> Self {
        Self::with_client(Client::new(), backend)
    }

    pub fn with_client(http: Client, backend: Option<BackendOrigin>) -> Self {
        Self { http, backend }
    }

    pub fn backend(&self) -> Result<&BackendOrigin, ProxyError> {
        self.backend.as_ref().ok_or(ProxyError::MissingBackend)
    }

    /// Outbound request that must reach the live backend, never a cache.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(header::CACHE_CONTROL, "no-store")
            .header(header::PRAGMA, "no-cache")
    }

    async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, ProxyError> {
        request.send().await.map_err(|err| {
            error!(operation = operation.label(), %err, "backend request failed");
            ProxyError::transport(operation, err)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
    Export,
    Import,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::List => "list_users",
            Operation::Create => "create_user",
            Operation::Read => "get_user",
            Operation::Update => "update_user",
            Operation::Delete => "delete_user",
            Operation::Export => "export_csv",
            Operation::Import => "import_csv",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Operation::List | Operation::Read => "Failed to fetch data from backend",
            Operation::Create => "Failed to post data to backend",
            Operation::Update => "Failed to update data via backend",
            Operation::Delete => "Failed to delete data via backend",
            Operation::Export => "Failed to fetch export data from backend",
            Operation::Import => "Failed to forward import request to backend",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Backend API URL not configured")]
    MissingBackend,
    #[error("Backend error: {reason}")]
    Upstream {
        status: StatusCode,
        reason: String,
        body: String,
    },
    #[error("{}: {details}", .operation.failure_message())]
    Transport {
        operation: Operation,
        details: String,
    },
    #[error("Invalid request body: {details}")]
    InvalidRequest { details: String },
}

impl ProxyError {
    pub fn transport(operation: Operation, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation,
            details: err.to_string(),
        }
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::InvalidRequest {
            details: details.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingBackend | ProxyError::Transport { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ProxyError::MissingBackend => ErrorEnvelope::new(MISSING_BACKEND_MESSAGE),
            ProxyError::Upstream { reason, body, .. } => {
                ErrorEnvelope::with_details(format!("Backend error: {reason}"), body.clone())
            }
            ProxyError::Transport { operation, details } => {
                ErrorEnvelope::with_details(operation.failure_message(), details.clone())
            }
            ProxyError::InvalidRequest { details } => {
                ErrorEnvelope::with_details(INVALID_REQUEST_MESSAGE, details.clone())
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

/// Passes successful responses through and turns any other status into an
/// upstream error carrying the backend's raw text body.
async fn ensure_success(
    operation: Operation,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProxyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(operation = operation.label(), %err, "failed to read backend error body");
            String::new()
        }
    };
    error!(
        operation = operation.label(),
        status = status.as_u16(),
        %body,
        "backend returned an error status"
    );
    Err(ProxyError::Upstream {
        status,
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        body,
    })
}

/// JSON body and status code of a successful backend response, unchanged.
async fn forward_json(
    operation: Operation,
    response: reqwest::Response,
) -> Result<Response, ProxyError> {
    let response = ensure_success(operation, response).await?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| ProxyError::transport(operation, err))?;
    Ok((status, Json(body)).into_response())
}

fn parse_json_body(body: &[u8]) -> Result<Value, ProxyError> {
    serde_json::from_slice(body).map_err(|err| ProxyError::invalid_request(err.to_string()))
}

fn is_empty_body(response: &reqwest::Response) -> bool {
    response.status() == StatusCode::NO_CONTENT
        || response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            == Some("0")
}

fn multipart_content_type(value: Option<&HeaderValue>) -> Result<HeaderValue, ProxyError> {
    let value =
        value.ok_or_else(|| ProxyError::invalid_request("missing multipart content type"))?;
    let text = value
        .to_str()
        .map_err(|_| ProxyError::invalid_request("content type is not valid text"))?;
    let lower = text.to_ascii_lowercase();
    if !lower.starts_with("multipart/form-data") || !lower.contains("boundary=") {
        return Err(ProxyError::invalid_request(format!(
            "expected multipart/form-data with a boundary, got '{text}'"
        )));
    }
    Ok(value.clone())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
