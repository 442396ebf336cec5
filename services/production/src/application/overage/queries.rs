//! 超产看板查询

use chrono::Utc;
use oleema_errors::{AppError, AppResult};
use serde::Serialize;

use super::ledger::OverageLedger;
use crate::domain::overage::{Overage, OverageContribution, OverageId};
use crate::domain::unit_of_work::UnitOfWork;
use crate::domain::work_log::WorkLog;

/// 带订单号与工序名称的超产记录
#[derive(Debug, Clone, Serialize)]
pub struct OverageView {
    #[serde(flatten)]
    pub overage: Overage,
    pub order_no: Option<String>,
    pub process_name: Option<String>,
}

/// 看板：pending 与窗口期内已处理
#[derive(Debug, Clone, Serialize)]
pub struct OverageDashboard {
    pub pending: Vec<OverageView>,
    pub recently_resolved: Vec<OverageView>,
    pub resolved_window_days: u32,
}

/// 超产详情及其订单工序的全部工作记录（最新在前）
#[derive(Debug, Clone, Serialize)]
pub struct OverageDetail {
    #[serde(flatten)]
    pub view: OverageView,
    pub contributions: Vec<OverageContribution>,
    pub history: Vec<WorkLog>,
}

impl OverageLedger {
    /// pending 列表
    pub async fn list_pending(&self) -> AppResult<Vec<OverageView>> {
        let uow = self.uow_factory.begin_readonly().await?;
        let overages = uow.overages().list_pending().await?;
        let views = with_names(uow.as_ref(), overages).await?;
        uow.commit().await?;
        Ok(views)
    }

    /// 窗口期内已处理的记录（处理时间倒序）
    pub async fn list_recently_resolved(&self) -> AppResult<Vec<OverageView>> {
        let since = self.resolved_window.since(Utc::now());
        let uow = self.uow_factory.begin_readonly().await?;
        let overages = uow.overages().list_resolved_since(since).await?;
        let views = with_names(uow.as_ref(), overages).await?;
        uow.commit().await?;
        Ok(views)
    }

    pub async fn dashboard(&self) -> AppResult<OverageDashboard> {
        Ok(OverageDashboard {
            pending: self.list_pending().await?,
            recently_resolved: self.list_recently_resolved().await?,
            resolved_window_days: self.resolved_window.days,
        })
    }

    pub async fn detail(&self, id: &OverageId) -> AppResult<OverageDetail> {
        let uow = self.uow_factory.begin_readonly().await?;
        let overage = uow
            .overages()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Overage {} not found", id)))?;

        let history = uow
            .work_logs()
            .list_for_pair(&overage.order_id, &overage.process_id)
            .await?;
        let contributions = uow.overages().list_contributions(id).await?;
        let view = with_names(uow.as_ref(), vec![overage])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Overage view lost"))?;
        uow.commit().await?;

        Ok(OverageDetail {
            view,
            contributions,
            history,
        })
    }
}

async fn with_names(uow: &dyn UnitOfWork, overages: Vec<Overage>) -> AppResult<Vec<OverageView>> {
    let mut views = Vec::with_capacity(overages.len());
    for overage in overages {
        let order_no = uow
            .orders()
            .find_by_id(&overage.order_id)
            .await?
            .map(|o| o.order_no);
        let process_name = uow
            .processes()
            .find_by_id(&overage.process_id)
            .await?
            .map(|p| p.name);
        views.push(OverageView {
            overage,
            order_no,
            process_name,
        });
    }
    Ok(views)
}
