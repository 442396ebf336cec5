//! 计件工资报表

use axum::extract::{Json, State};
use axum::routing::post;
use axum::Router;
use oleema_errors::AppResult;

use crate::api::state::AppState;
use crate::application::payment::{PaymentReport, PaymentReportQuery};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/reports/payments", post(payment_report))
}

async fn payment_report(
    State(state): State<AppState>,
    Json(query): Json<PaymentReportQuery>,
) -> AppResult<Json<PaymentReport>> {
    Ok(Json(state.payments.generate(query).await?))
}
