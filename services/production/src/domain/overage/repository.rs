//! 超产仓储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oleema_errors::AppResult;

use super::overage::{Overage, OverageContribution, OverageId};
use crate::domain::order::OrderId;
use crate::domain::process::ProcessId;
use crate::domain::work_log::WorkLogId;

/// 超产仓储接口
#[async_trait]
pub trait OverageRepository: Send + Sync {
    /// 查找某订单工序的 pending 记录
    async fn find_pending(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Option<Overage>>;

    async fn create(&self, overage: &Overage) -> AppResult<()>;

    async fn update(&self, overage: &Overage) -> AppResult<()>;

    async fn find_by_id(&self, id: &OverageId) -> AppResult<Option<Overage>>;

    /// 全部 pending 记录（最新在前）
    async fn list_pending(&self) -> AppResult<Vec<Overage>>;

    /// 指定时间之后处理的记录（按处理时间倒序）
    async fn list_resolved_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Overage>>;

    /// 删除订单的全部超产记录（先删除溯源记录），返回删除条数
    async fn delete_by_order(&self, order_id: &OrderId) -> AppResult<u64>;

    /// 删除工序的全部超产记录（先删除溯源记录），返回删除条数
    async fn delete_by_process(&self, process_id: &ProcessId) -> AppResult<u64>;

    async fn add_contribution(&self, contribution: &OverageContribution) -> AppResult<()>;

    async fn list_contributions(&self, overage_id: &OverageId)
    -> AppResult<Vec<OverageContribution>>;

    async fn delete_contributions_for_work_log(&self, work_log_id: &WorkLogId) -> AppResult<u64>;

    /// 订单或工序已不存在的超产记录
    async fn find_orphans(&self) -> AppResult<Vec<Overage>>;

    /// 批量删除（含溯源记录）
    async fn delete_by_ids(&self, ids: &[OverageId]) -> AppResult<u64>;
}
