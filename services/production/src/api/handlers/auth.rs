//! 登录与注销

use axum::extract::{Json, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use oleema_errors::AppResult;
use serde::{Deserialize, Serialize};

use crate::api::middleware::{CurrentSession, expired_cookie, session_cookie};
use crate::api::state::AppState;

/// 公开路由
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

/// 需要会话的路由
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_in: u64,
    pub token_type: String,
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> AppResult<Response> {
    let session = state.sessions.login(&req.username, &req.password).await?;
    let cookie = session_cookie(&state, &session.id);

    let body = LoginResponse {
        session_id: session.id.to_string(),
        username: session.username,
        created_at: session.created_at,
        expires_in: state.sessions.idle_timeout().as_secs(),
        token_type: "Bearer".to_string(),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Response> {
    state.sessions.logout(&session.id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_cookie(&state))],
    )
        .into_response())
}
