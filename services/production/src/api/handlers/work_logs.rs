//! 工作记录录入、待审确认、编辑与删除

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use oleema_common::{PagedResult, Pagination};
use oleema_errors::AppResult;
use serde::{Deserialize, Serialize};

use crate::api::middleware::CurrentSession;
use crate::api::state::AppState;
use crate::application::overage::OverageRecord;
use crate::application::staging::StagedWorkLog;
use crate::application::work_log::{
    DecisionOutcome, EditOutcome, FieldErrors, StagedAction, SubmitOutcome, WorkLogForm,
};
use crate::domain::employee::EmployeeId;
use crate::domain::order::OrderId;
use crate::domain::overage::Overage;
use crate::domain::process::ProcessId;
use crate::domain::work_log::{WorkLog, WorkLogFilter, WorkLogId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/work-logs", get(list_work_logs).post(submit_work_log))
        .route(
            "/api/work-logs/pending",
            get(peek_pending).post(decide_pending),
        )
        .route(
            "/api/work-logs/{id}",
            get(get_work_log).put(edit_work_log).delete(delete_work_log),
        )
}

/// 列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct WorkLogListQuery {
    pub employee_id: Option<EmployeeId>,
    pub order_id: Option<OrderId>,
    pub process_id: Option<ProcessId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl WorkLogListQuery {
    fn into_parts(self) -> (WorkLogFilter, Pagination) {
        let defaults = Pagination::default();
        let pagination = Pagination::new(
            self.page.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.page_size),
        );
        let filter = WorkLogFilter {
            employee_id: self.employee_id,
            order_id: self.order_id,
            process_id: self.process_id,
            from: self.from,
            to: self.to,
        };
        (filter, pagination)
    }
}

/// 字段校验失败
#[derive(Debug, Serialize)]
pub struct RejectedResponse {
    pub errors: FieldErrors,
}

/// 确认后写入的结果
#[derive(Debug, Serialize)]
pub struct ApprovedResponse {
    pub work_log: WorkLog,
    pub overage: Option<Overage>,
    /// created / updated
    pub overage_kind: Option<&'static str>,
}

impl ApprovedResponse {
    fn new(work_log: WorkLog, record: Option<OverageRecord>) -> Self {
        Self {
            work_log,
            overage_kind: record.as_ref().map(OverageRecord::kind),
            overage: record.map(|r| r.overage().clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionResponse {
    Persisted(ApprovedResponse),
    ReturnedToEntry { form: WorkLogForm },
    Discarded,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub action: StagedAction,
}

fn rejected(errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(RejectedResponse { errors }),
    )
        .into_response()
}

async fn list_work_logs(
    State(state): State<AppState>,
    Query(query): Query<WorkLogListQuery>,
) -> AppResult<Json<PagedResult<WorkLog>>> {
    let (filter, pagination) = query.into_parts();
    Ok(Json(state.work_logs.list(&filter, &pagination).await?))
}

/// 201 已写入 / 202 超产待确认 / 422 字段错误
async fn submit_work_log(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(form): Json<WorkLogForm>,
) -> AppResult<Response> {
    let response = match state.work_logs.submit(&session.id, form).await? {
        SubmitOutcome::Persisted(work_log) => {
            (StatusCode::CREATED, Json(work_log)).into_response()
        }
        SubmitOutcome::Staged(staged) => (StatusCode::ACCEPTED, Json(staged)).into_response(),
        SubmitOutcome::Rejected(errors) => rejected(errors),
    };
    Ok(response)
}

async fn peek_pending(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Option<StagedWorkLog>>> {
    Ok(Json(state.work_logs.pending(&session.id).await?))
}

async fn decide_pending(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Response> {
    let response = match state.work_logs.decide(&session.id, req.action).await? {
        DecisionOutcome::Persisted { work_log, overage } => (
            StatusCode::CREATED,
            Json(DecisionResponse::Persisted(ApprovedResponse::new(
                work_log, overage,
            ))),
        )
            .into_response(),
        DecisionOutcome::ReturnedToEntry(form) => {
            Json(DecisionResponse::ReturnedToEntry { form }).into_response()
        }
        DecisionOutcome::Discarded => Json(DecisionResponse::Discarded).into_response(),
    };
    Ok(response)
}

async fn get_work_log(
    State(state): State<AppState>,
    Path(id): Path<WorkLogId>,
) -> AppResult<Json<WorkLog>> {
    Ok(Json(state.work_logs.get(&id).await?))
}

async fn edit_work_log(
    State(state): State<AppState>,
    Path(id): Path<WorkLogId>,
    Json(form): Json<WorkLogForm>,
) -> AppResult<Response> {
    let outcome = state.work_logs.edit(&id, form).await?;
    let status = match outcome {
        EditOutcome::Updated { .. } => StatusCode::OK,
        EditOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(outcome)).into_response())
}

async fn delete_work_log(
    State(state): State<AppState>,
    Path(id): Path<WorkLogId>,
) -> AppResult<StatusCode> {
    state.work_logs.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
