//! 孤儿超产记录的扫描与清理
//!
//! 订单或工序已被删除但超产记录仍然存在时视为孤儿。正常删除流程会级联清理，
//! 这里用于修复历史数据。

use std::sync::Arc;

use oleema_errors::AppResult;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::overage::{Overage, OverageId};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::infrastructure::observability::metrics;

/// 孤儿记录
#[derive(Debug, Clone, Serialize)]
pub struct OrphanedOverage {
    #[serde(flatten)]
    pub overage: Overage,
    pub missing_order: bool,
    pub missing_process: bool,
}

/// 扫描结果
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub orphans: Vec<OrphanedOverage>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty()
    }
}

/// 清理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub removed: u64,
}

/// 完整性服务
pub struct IntegrityService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl IntegrityService {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// 扫描孤儿记录
    pub async fn scan(&self) -> AppResult<IntegrityReport> {
        let uow = self.uow_factory.begin_readonly().await?;
        let orphans = find_orphans(uow.as_ref()).await?;
        uow.commit().await?;
        Ok(IntegrityReport { orphans })
    }

    /// 删除孤儿记录（含溯源记录）
    #[instrument(skip(self))]
    pub async fn repair(&self) -> AppResult<RepairReport> {
        let uow = self.uow_factory.begin().await?;
        let ids: Vec<OverageId> = uow
            .overages()
            .find_orphans()
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();
        if ids.is_empty() {
            uow.rollback().await?;
            return Ok(RepairReport { removed: 0 });
        }

        let removed = uow.overages().delete_by_ids(&ids).await?;
        uow.commit().await?;

        info!(removed, "Orphaned overages removed");
        metrics::record_orphans_removed(removed);
        Ok(RepairReport { removed })
    }

    /// 启动时扫描，发现孤儿记录只记录警告
    pub async fn warn_on_startup(&self) {
        match self.scan().await {
            Ok(report) if !report.is_clean() => warn!(
                orphans = report.orphans.len(),
                "Orphaned overage records found; run the integrity repair"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Integrity scan failed"),
        }
    }
}

async fn find_orphans(uow: &dyn UnitOfWork) -> AppResult<Vec<OrphanedOverage>> {
    let mut orphans = Vec::new();
    for overage in uow.overages().find_orphans().await? {
        let missing_order = uow.orders().find_by_id(&overage.order_id).await?.is_none();
        let missing_process = uow
            .processes()
            .find_by_id(&overage.process_id)
            .await?
            .is_none();
        orphans.push(OrphanedOverage {
            overage,
            missing_order,
            missing_process,
        });
    }
    Ok(orphans)
}
