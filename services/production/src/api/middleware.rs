//! 会话认证中间件

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use oleema_errors::AppError;
use tracing::debug;

use super::state::AppState;
use crate::application::session::{Session, SessionId};

/// 当前会话提取器
///
/// 应在 `require_session` 之后使用
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AppError::unauthenticated("Authentication required"))
    }
}

/// 校验会话（Bearer 或 Cookie），成功后续期并注入请求扩展
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = session_id_from_headers(request.headers(), &state.cookie.name)
        .ok_or_else(|| AppError::unauthenticated("Authentication required"))?;

    let session = state.sessions.authenticate(&id).await?;
    debug!(username = %session.username, "Session authenticated");

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// 读取会话 ID：优先 `Authorization: Bearer`，其次 Cookie
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return SessionId::parse(token);
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// 生成会话 Cookie
pub fn session_cookie(state: &AppState, id: &SessionId) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.cookie.name,
        id,
        state.cookie.max_age.as_secs()
    );
    if state.cookie.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// 清除会话 Cookie
pub fn expired_cookie(state: &AppState) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.cookie.name
    )
}
