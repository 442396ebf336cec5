//! 健康检查与指标

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tracing::warn;

use crate::api::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: bool,
    pub cache: bool,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// 数据库与缓存均可用时返回 200，否则 503
async fn ready(State(state): State<AppState>) -> Response {
    let database = match state.uow_factory.begin_readonly().await {
        Ok(uow) => uow.commit().await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Database not ready");
            false
        }
    };
    let cache = match state.cache.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Cache not ready");
            false
        }
    };

    let ready = database && cache;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadinessResponse {
        status: if ready { "ready" } else { "unavailable" },
        database,
        cache,
    };
    (status, Json(body)).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
