//! 路由组装

use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{admin, auth, catalog, health, overages, reports, work_logs};
use super::middleware::require_session;
use super::state::AppState;

/// 请求体上限
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 构建完整路由
///
/// 健康检查、指标与登录公开，其余接口需要会话。
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(work_logs::routes())
        .merge(overages::routes())
        .merge(reports::routes())
        .merge(admin::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::public_routes())
        .merge(protected)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
