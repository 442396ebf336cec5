//! 超产看板与处理

use axum::extract::{Json, Path, State};
use axum::routing::{get, post};
use axum::Router;
use oleema_errors::AppResult;
use serde::Deserialize;

use crate::api::middleware::CurrentSession;
use crate::api::state::AppState;
use crate::application::overage::{OverageDashboard, OverageDetail};
use crate::domain::overage::{Overage, OverageId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/overages", get(dashboard))
        .route("/api/overages/{id}", get(detail))
        .route("/api/overages/{id}/resolve", post(resolve))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub resolution_notes: String,
}

async fn dashboard(State(state): State<AppState>) -> AppResult<Json<OverageDashboard>> {
    Ok(Json(state.overages.dashboard().await?))
}

async fn detail(
    State(state): State<AppState>,
    Path(id): Path<OverageId>,
) -> AppResult<Json<OverageDetail>> {
    Ok(Json(state.overages.detail(&id).await?))
}

/// 处理人取当前会话的用户名
async fn resolve(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<OverageId>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Json<Overage>> {
    let overage = state
        .overages
        .resolve(&id, &session.username, &req.resolution_notes)
        .await?;
    Ok(Json(overage))
}
