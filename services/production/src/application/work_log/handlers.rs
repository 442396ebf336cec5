//! 工作记录命令处理器
//!
//! 提交 → 校验 → 在订单行锁下判定超产：
//! - 未超产：直接写入，订单 pending → in_progress
//! - 超产：暂存到会话，等待 approve / edit / cancel
//!
//! 超产记录只在 approve 时与工作记录一起写入。编辑已有记录时超产只作提示。

use std::sync::Arc;

use oleema_common::{PagedResult, Pagination};
use oleema_errors::{AppError, AppResult};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::commands::{FieldErrors, StagedAction, WorkLogForm, WorkLogSubmission};
use crate::application::overage::{OverageRecord, record_or_update};
use crate::application::session::SessionId;
use crate::application::staging::{PendingWorkLogStore, StagedWorkLog};
use crate::domain::order::Order;
use crate::domain::overage::{OverageContribution, OverageEvaluation, evaluate};
use crate::domain::process::Process;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::work_log::{WorkLog, WorkLogFilter, WorkLogId};
use crate::infrastructure::observability::metrics;

/// 新建提交的结果
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Persisted(WorkLog),
    Staged(StagedWorkLog),
    Rejected(FieldErrors),
}

/// 待审提交的处理结果
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Persisted {
        work_log: WorkLog,
        overage: Option<OverageRecord>,
    },
    /// 回到录入表单（暂存已清空）
    ReturnedToEntry(WorkLogForm),
    Discarded,
}

/// 编辑结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditOutcome {
    Updated {
        work_log: WorkLog,
        /// 超产提示（不阻止保存）
        warning: Option<String>,
    },
    Rejected {
        errors: FieldErrors,
    },
}

/// 工作记录命令处理器
pub struct WorkLogCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    staging: Arc<dyn PendingWorkLogStore>,
}

impl WorkLogCommandHandler {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        staging: Arc<dyn PendingWorkLogStore>,
    ) -> Self {
        Self {
            uow_factory,
            staging,
        }
    }

    /// 新建提交
    #[instrument(skip(self, form), fields(session = %session))]
    pub async fn submit(&self, session: &SessionId, form: WorkLogForm) -> AppResult<SubmitOutcome> {
        let submission = match form.parse() {
            Ok(submission) => submission,
            Err(errors) => {
                metrics::record_work_log_submission("rejected");
                return Ok(SubmitOutcome::Rejected(errors));
            }
        };

        let uow = self.uow_factory.begin().await?;
        let (order, process) = load_references(uow.as_ref(), &submission).await?;
        let existing = uow
            .work_logs()
            .sum_quantity(&order.id, &process.id, None)
            .await?;
        let evaluation = evaluate(&order, &process, existing, submission.quantity);

        if evaluation.exceeds {
            // 释放订单锁，不写入任何内容
            uow.rollback().await?;
            let staged = StagedWorkLog::new(submission, evaluation);
            self.staging.stage(session, &staged).await?;
            info!(
                order_id = %staged.evaluation.order_id,
                process_id = %staged.evaluation.process_id,
                overage_units = staged.evaluation.overage_units,
                "Work log staged for overage approval"
            );
            metrics::record_work_log_submission("staged");
            return Ok(SubmitOutcome::Staged(staged));
        }

        let (work_log, _) = persist_new(uow.as_ref(), order, &submission, &evaluation).await?;
        uow.commit().await?;

        info!(work_log_id = %work_log.id, "Work log persisted");
        metrics::record_work_log_submission("persisted");
        Ok(SubmitOutcome::Persisted(work_log))
    }

    /// 当前会话的待审提交
    pub async fn pending(&self, session: &SessionId) -> AppResult<Option<StagedWorkLog>> {
        self.staging.peek(session).await
    }

    /// 处理待审提交
    #[instrument(skip(self), fields(session = %session))]
    pub async fn decide(
        &self,
        session: &SessionId,
        action: StagedAction,
    ) -> AppResult<DecisionOutcome> {
        match action {
            StagedAction::Approve => self.approve(session).await,
            StagedAction::Edit => {
                let staged = self
                    .staging
                    .consume(session)
                    .await?
                    .ok_or_else(no_pending_submission)?;
                Ok(DecisionOutcome::ReturnedToEntry(WorkLogForm::from(
                    &staged.submission,
                )))
            }
            StagedAction::Cancel => {
                if self.staging.consume(session).await?.is_some() {
                    info!("Staged work log discarded");
                    metrics::record_work_log_submission("cancelled");
                }
                Ok(DecisionOutcome::Discarded)
            }
        }
    }

    async fn approve(&self, session: &SessionId) -> AppResult<DecisionOutcome> {
        // 原子取出，防止重复确认
        let staged = self
            .staging
            .consume(session)
            .await?
            .ok_or_else(no_pending_submission)?;

        match self.persist_approved(&staged.submission).await {
            Ok(outcome) => {
                metrics::record_work_log_submission("approved");
                Ok(outcome)
            }
            Err(e) => {
                // 失败时放回，用户可修改后重试
                if let Err(restore_err) = self.staging.stage(session, &staged).await {
                    warn!(error = %restore_err, "Failed to restore staged work log");
                }
                Err(e)
            }
        }
    }

    async fn persist_approved(&self, submission: &WorkLogSubmission) -> AppResult<DecisionOutcome> {
        let uow = self.uow_factory.begin().await?;
        let (order, process) = load_references(uow.as_ref(), submission).await?;
        // 以加锁后的最新总量重新判定
        let existing = uow
            .work_logs()
            .sum_quantity(&order.id, &process.id, None)
            .await?;
        let evaluation = evaluate(&order, &process, existing, submission.quantity);

        let (work_log, overage) = persist_new(uow.as_ref(), order, submission, &evaluation).await?;
        uow.commit().await?;

        info!(
            work_log_id = %work_log.id,
            overage_id = ?overage.as_ref().map(|r| r.overage().id),
            "Staged work log approved"
        );
        Ok(DecisionOutcome::Persisted { work_log, overage })
    }

    /// 编辑已有记录（超产只提示）
    #[instrument(skip(self, form), fields(work_log_id = %id))]
    pub async fn edit(&self, id: &WorkLogId, form: WorkLogForm) -> AppResult<EditOutcome> {
        let submission = match form.parse() {
            Ok(submission) => submission,
            Err(errors) => return Ok(EditOutcome::Rejected { errors }),
        };

        let uow = self.uow_factory.begin().await?;
        let mut work_log = uow
            .work_logs()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Work log {} not found", id)))?;

        let (order, process) = load_references(uow.as_ref(), &submission).await?;
        let existing = uow
            .work_logs()
            .sum_quantity(&order.id, &process.id, Some(id))
            .await?;
        let evaluation = evaluate(&order, &process, existing, submission.quantity);

        work_log.amend(
            submission.employee_id,
            submission.order_id,
            submission.process_id,
            submission.quantity,
            submission.work_date,
            submission.notes,
        )?;
        uow.work_logs().update(&work_log).await?;
        uow.commit().await?;

        let warning = evaluation.exceeds.then(|| evaluation.message());
        if warning.is_some() {
            warn!(overage_units = evaluation.overage_units, "Edited work log exceeds target");
        }
        Ok(EditOutcome::Updated { work_log, warning })
    }

    /// 删除记录（连同其超产溯源）
    #[instrument(skip(self), fields(work_log_id = %id))]
    pub async fn delete(&self, id: &WorkLogId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        if uow.work_logs().find_by_id(id).await?.is_none() {
            return Err(AppError::not_found(format!("Work log {} not found", id)));
        }
        uow.overages().delete_contributions_for_work_log(id).await?;
        uow.work_logs().delete(id).await?;
        uow.commit().await?;
        info!("Work log deleted");
        Ok(())
    }

    pub async fn get(&self, id: &WorkLogId) -> AppResult<WorkLog> {
        let uow = self.uow_factory.begin_readonly().await?;
        let work_log = uow
            .work_logs()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Work log {} not found", id)))?;
        uow.commit().await?;
        Ok(work_log)
    }

    pub async fn list(
        &self,
        filter: &WorkLogFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<WorkLog>> {
        let pagination = pagination.clone().normalized();
        let uow = self.uow_factory.begin_readonly().await?;
        let (items, total) = uow.work_logs().list(filter, &pagination).await?;
        uow.commit().await?;
        Ok(PagedResult::new(items, total, &pagination))
    }
}

fn no_pending_submission() -> AppError {
    AppError::not_found("No work log is awaiting approval")
}

/// 锁定订单并加载工序、员工
async fn load_references(
    uow: &dyn UnitOfWork,
    submission: &WorkLogSubmission,
) -> AppResult<(Order, Process)> {
    let order = uow
        .orders()
        .lock_by_id(&submission.order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", submission.order_id)))?;
    let process = uow
        .processes()
        .find_by_id(&submission.process_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Process {} not found", submission.process_id))
        })?;
    if uow
        .employees()
        .find_by_id(&submission.employee_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found(format!(
            "Employee {} not found",
            submission.employee_id
        )));
    }
    Ok((order, process))
}

/// 写入新工作记录；超产时一并记录超产及溯源，首条记录推进订单状态
async fn persist_new(
    uow: &dyn UnitOfWork,
    mut order: Order,
    submission: &WorkLogSubmission,
    evaluation: &OverageEvaluation,
) -> AppResult<(WorkLog, Option<OverageRecord>)> {
    let work_log = WorkLog::new(
        submission.employee_id,
        submission.order_id,
        submission.process_id,
        submission.quantity,
        submission.work_date,
        submission.notes.clone(),
    )?;
    uow.work_logs().create(&work_log).await?;

    let overage = if evaluation.exceeds {
        let record = record_or_update(uow, evaluation).await?;
        let units = record
            .added_units()
            .clamp(0, i64::from(work_log.quantity));
        uow.overages()
            .add_contribution(&OverageContribution::new(
                record.overage().id,
                work_log.id,
                units,
            ))
            .await?;
        Some(record)
    } else {
        None
    };

    if order.mark_started() {
        uow.orders().update(&order).await?;
        info!(order_id = %order.id, "Order started");
    }

    Ok((work_log, overage))
}
