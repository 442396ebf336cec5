//! 超产台账写操作

use std::sync::Arc;

use chrono::Utc;
use oleema_common::TrailingWindow;
use oleema_errors::{AppError, AppResult};
use tracing::{info, instrument};

use crate::domain::order::OrderId;
use crate::domain::overage::{Overage, OverageEvaluation, OverageId};
use crate::domain::process::ProcessId;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::infrastructure::observability::metrics;

/// `record_or_update` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum OverageRecord {
    /// 新建 pending 记录
    Created(Overage),
    /// 在已有 pending 记录上更新
    Updated { overage: Overage, previous_units: i64 },
}

impl OverageRecord {
    pub fn overage(&self) -> &Overage {
        match self {
            Self::Created(overage) => overage,
            Self::Updated { overage, .. } => overage,
        }
    }

    /// 本次新增的超产数量
    pub fn added_units(&self) -> i64 {
        match self {
            Self::Created(overage) => overage.overage_units,
            Self::Updated {
                overage,
                previous_units,
            } => overage.overage_units - previous_units,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated { .. } => "updated",
        }
    }
}

/// 在调用方的工作单元内记录超产
///
/// 已有 pending 记录时原地更新（期望数量重新取订单当前目标），否则新建。
/// 必须与对应工作记录的写入在同一单元内提交。
pub async fn record_or_update(
    uow: &dyn UnitOfWork,
    evaluation: &OverageEvaluation,
) -> AppResult<OverageRecord> {
    if !evaluation.exceeds {
        return Err(AppError::internal("Cannot record an overage that does not exceed target"));
    }

    let existing = uow
        .overages()
        .find_pending(&evaluation.order_id, &evaluation.process_id)
        .await?;

    let record = match existing {
        Some(mut overage) => {
            let previous_units =
                overage.refresh(evaluation.target_quantity, evaluation.new_total)?;
            uow.overages().update(&overage).await?;
            OverageRecord::Updated {
                overage,
                previous_units,
            }
        }
        None => {
            let overage = Overage::detect(
                evaluation.order_id,
                evaluation.process_id,
                evaluation.target_quantity,
                evaluation.new_total,
            )?;
            uow.overages().create(&overage).await?;
            OverageRecord::Created(overage)
        }
    };

    info!(
        overage_id = %record.overage().id,
        order_id = %evaluation.order_id,
        process_id = %evaluation.process_id,
        overage_units = record.overage().overage_units,
        kind = record.kind(),
        "Overage recorded"
    );
    metrics::record_overage(record.kind());
    Ok(record)
}

/// 删除订单前清理其超产记录（同一工作单元）
pub async fn cascade_delete_for_order(uow: &dyn UnitOfWork, order_id: &OrderId) -> AppResult<u64> {
    let removed = uow.overages().delete_by_order(order_id).await?;
    if removed > 0 {
        info!(order_id = %order_id, removed, "Overages removed with order");
    }
    Ok(removed)
}

/// 删除工序前清理其超产记录（同一工作单元）
pub async fn cascade_delete_for_process(
    uow: &dyn UnitOfWork,
    process_id: &ProcessId,
) -> AppResult<u64> {
    let removed = uow.overages().delete_by_process(process_id).await?;
    if removed > 0 {
        info!(process_id = %process_id, removed, "Overages removed with process");
    }
    Ok(removed)
}

/// 超产台账服务
pub struct OverageLedger {
    pub(super) uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub(super) resolved_window: TrailingWindow,
}

impl OverageLedger {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, resolved_window: TrailingWindow) -> Self {
        Self {
            uow_factory,
            resolved_window,
        }
    }

    /// 人工处理超产
    #[instrument(skip(self, notes), fields(overage_id = %id))]
    pub async fn resolve(&self, id: &OverageId, resolver: &str, notes: &str) -> AppResult<Overage> {
        let uow = self.uow_factory.begin().await?;

        let (order_id, process_id) = uow
            .overages()
            .find_by_id(id)
            .await?
            .map(|o| (o.order_id, o.process_id))
            .ok_or_else(|| overage_not_found(id))?;

        // 与审批写入串行
        if uow.orders().lock_by_id(&order_id).await?.is_none() {
            return Err(AppError::invalid_state(format!(
                "Overage {} references missing order {}",
                id, order_id
            )));
        }
        if uow.processes().find_by_id(&process_id).await?.is_none() {
            return Err(AppError::invalid_state(format!(
                "Overage {} references missing process {}",
                id, process_id
            )));
        }

        // 加锁前读到的数量可能已被审批更新，锁内重读
        let mut overage = uow
            .overages()
            .find_by_id(id)
            .await?
            .ok_or_else(|| overage_not_found(id))?;
        overage.resolve(resolver, notes, Utc::now())?;
        uow.overages().update(&overage).await?;
        uow.commit().await?;

        info!(resolved_by = %resolver, "Overage resolved");
        metrics::record_overage_resolved();
        Ok(overage)
    }
}

fn overage_not_found(id: &OverageId) -> AppError {
    AppError::not_found(format!("Overage {} not found", id))
}
