use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod proxy;

use app_state::AppState;
use crate::config::load_settings;
use proxy::{routes, ProxyContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let backend = settings.backend_origin()?;
    match &backend {
        Some(origin) => info!(backend = origin.as_str(), "proxying to backend"),
        None => warn!("backend url not configured; every proxy route will answer 500"),
    }

    let state = AppState {
        proxy: ProxyContext::new(backend),
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/users",
            get(routes::list_users).post(routes::create_user),
        )
        .route(
            "/api/users/",
            get(routes::list_users).post(routes::create_user),
        )
        .route("/api/users/export/csv", get(routes::export_csv))
        .route("/api/users/import/csv", post(routes::import_csv))
        .route(
            "/api/users/:user_id",
            get(routes::get_user)
                .put(routes::update_user)
                .delete(routes::delete_user),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
