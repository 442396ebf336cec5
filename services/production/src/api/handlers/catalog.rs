//! 订单、工序、员工

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use oleema_common::{PagedResult, Pagination};
use oleema_errors::AppResult;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::application::catalog::{
    CreateEmployeeCommand, CreateOrderCommand, ProcessCommand, UpdateEmployeeCommand,
    UpdateOrderCommand,
};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::order::{Order, OrderId};
use crate::domain::process::{Process, ProcessId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route(
            "/api/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/api/processes", get(list_processes).post(create_process))
        .route(
            "/api/processes/{id}",
            get(get_process).put(update_process).delete(delete_process),
        )
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
}

/// 列表过滤：仅启用
#[derive(Debug, Default, Deserialize)]
pub struct ActiveFilter {
    #[serde(default)]
    pub active_only: bool,
}

// ---------------------------------------------------------------------------
// 订单
// ---------------------------------------------------------------------------

async fn list_orders(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PagedResult<Order>>> {
    Ok(Json(state.catalog.list_orders(&pagination).await?))
}

async fn create_order(
    State(state): State<AppState>,
    Json(cmd): Json<CreateOrderCommand>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.catalog.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.catalog.get_order(&id).await?))
}

async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(cmd): Json<UpdateOrderCommand>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.catalog.update_order(&id, cmd).await?))
}

async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> AppResult<StatusCode> {
    state.catalog.delete_order(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// 工序
// ---------------------------------------------------------------------------

async fn list_processes(
    State(state): State<AppState>,
    Query(filter): Query<ActiveFilter>,
) -> AppResult<Json<Vec<Process>>> {
    Ok(Json(state.catalog.list_processes(filter.active_only).await?))
}

async fn create_process(
    State(state): State<AppState>,
    Json(cmd): Json<ProcessCommand>,
) -> AppResult<(StatusCode, Json<Process>)> {
    let process = state.catalog.create_process(cmd).await?;
    Ok((StatusCode::CREATED, Json(process)))
}

async fn get_process(
    State(state): State<AppState>,
    Path(id): Path<ProcessId>,
) -> AppResult<Json<Process>> {
    Ok(Json(state.catalog.get_process(&id).await?))
}

async fn update_process(
    State(state): State<AppState>,
    Path(id): Path<ProcessId>,
    Json(cmd): Json<ProcessCommand>,
) -> AppResult<Json<Process>> {
    Ok(Json(state.catalog.update_process(&id, cmd).await?))
}

async fn delete_process(
    State(state): State<AppState>,
    Path(id): Path<ProcessId>,
) -> AppResult<StatusCode> {
    state.catalog.delete_process(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// 员工
// ---------------------------------------------------------------------------

async fn list_employees(
    State(state): State<AppState>,
    Query(filter): Query<ActiveFilter>,
) -> AppResult<Json<Vec<Employee>>> {
    Ok(Json(state.catalog.list_employees(filter.active_only).await?))
}

async fn create_employee(
    State(state): State<AppState>,
    Json(cmd): Json<CreateEmployeeCommand>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    let employee = state.catalog.create_employee(cmd).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
) -> AppResult<Json<Employee>> {
    Ok(Json(state.catalog.get_employee(&id).await?))
}

async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
    Json(cmd): Json<UpdateEmployeeCommand>,
) -> AppResult<Json<Employee>> {
    Ok(Json(state.catalog.update_employee(&id, cmd).await?))
}

async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
) -> AppResult<StatusCode> {
    state.catalog.delete_employee(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
