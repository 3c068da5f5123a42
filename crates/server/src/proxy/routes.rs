use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    ensure_success, forward_json, is_empty_body, multipart_content_type, parse_json_body,
    Operation, ProxyError,
};
use crate::app_state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv";

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let mut url = ctx.backend()?.endpoint(&["api", "users"]);
    url.set_query(query.as_deref());
    debug!(%url, "forwarding user list request");

    let response = ctx
        .send(Operation::List, ctx.request(Method::GET, url))
        .await?;
    forward_json(Operation::List, response).await
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx.backend()?.endpoint(&["api", "users", ""]);
    let payload = parse_json_body(&body)?;

    let response = ctx
        .send(
            Operation::Create,
            ctx.request(Method::POST, url).json(&payload),
        )
        .await?;
    forward_json(Operation::Create, response).await
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx.backend()?.endpoint(&["api", "users", &user_id]);

    let response = ctx
        .send(Operation::Read, ctx.request(Method::GET, url))
        .await?;
    forward_json(Operation::Read, response).await
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx.backend()?.endpoint(&["api", "users", &user_id]);
    let payload = parse_json_body(&body)?;

    let response = ctx
        .send(
            Operation::Update,
            ctx.request(Method::PUT, url).json(&payload),
        )
        .await?;
    forward_json(Operation::Update, response).await
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx.backend()?.endpoint(&["api", "users", &user_id]);

    let response = ctx
        .send(Operation::Delete, ctx.request(Method::DELETE, url))
        .await?;
    let response = ensure_success(Operation::Delete, response).await?;
    if is_empty_body(&response) {
        info!(%user_id, "user deleted");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| ProxyError::transport(Operation::Delete, err))?;
    info!(%user_id, "user deleted");
    Ok((status, Json(body)).into_response())
}

/// Raw CSV bytes; only the content type and disposition are carried over.
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx
        .backend()?
        .endpoint(&["api", "users", "export", "csv"]);

    let response = ctx
        .send(
            Operation::Export,
            ctx.request(Method::GET, url)
                .header(header::ACCEPT, CSV_CONTENT_TYPE),
        )
        .await?;
    let response = ensure_success(Operation::Export, response).await?;

    let disposition = response.headers().get(header::CONTENT_DISPOSITION).cloned();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ProxyError::transport(Operation::Export, err))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CSV_CONTENT_TYPE),
    );
    if let Some(disposition) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    debug!(size_bytes = bytes.len(), "forwarding csv export");

    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// Forwards the browser's multipart body byte for byte. The backend answers
/// with JSON on success and failure alike, and both are passed back with the
/// backend's status.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let ctx = &state.proxy;
    let url = ctx
        .backend()?
        .endpoint(&["api", "users", "import", "csv"]);
    let content_type = multipart_content_type(headers.get(header::CONTENT_TYPE))?;
    debug!(size_bytes = body.len(), "forwarding csv import");

    let response = ctx
        .send(
            Operation::Import,
            ctx.request(Method::POST, url)
                .header(header::CONTENT_TYPE, content_type)
                .body(body),
        )
        .await?;

    let status = response.status();
    let report: Value = response
        .json()
        .await
        .map_err(|err| ProxyError::transport(Operation::Import, err))?;
    info!(status = status.as_u16(), "csv import forwarded");
    Ok((status, Json(report)).into_response())
}
