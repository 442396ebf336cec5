//! 数据完整性检查与修复

use axum::extract::{Json, State};
use axum::routing::{get, post};
use axum::Router;
use oleema_errors::AppResult;
use tracing::info;

use crate::api::middleware::CurrentSession;
use crate::api::state::AppState;
use crate::application::integrity::{IntegrityReport, RepairReport};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/integrity", get(scan))
        .route("/api/admin/integrity/repair", post(repair))
}

async fn scan(State(state): State<AppState>) -> AppResult<Json<IntegrityReport>> {
    Ok(Json(state.integrity.scan().await?))
}

async fn repair(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<RepairReport>> {
    let report = state.integrity.repair().await?;
    info!(username = %session.username, removed = report.removed, "Integrity repair requested");
    Ok(Json(report))
}
