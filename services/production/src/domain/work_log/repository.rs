//! 工作记录仓储接口

use async_trait::async_trait;
use chrono::NaiveDate;
use oleema_common::Pagination;
use oleema_errors::AppResult;
use serde::Deserialize;

use super::work_log::{WorkLog, WorkLogId};
use crate::domain::employee::EmployeeId;
use crate::domain::order::OrderId;
use crate::domain::process::ProcessId;

/// 工作记录列表过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkLogFilter {
    pub employee_id: Option<EmployeeId>,
    pub order_id: Option<OrderId>,
    pub process_id: Option<ProcessId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl WorkLogFilter {
    pub fn matches(&self, log: &WorkLog) -> bool {
        self.employee_id.is_none_or(|id| id == log.employee_id)
            && self.order_id.is_none_or(|id| id == log.order_id)
            && self.process_id.is_none_or(|id| id == log.process_id)
            && self.from.is_none_or(|d| log.work_date >= d)
            && self.to.is_none_or(|d| log.work_date <= d)
    }
}

/// 工作记录仓储接口
#[async_trait]
pub trait WorkLogRepository: Send + Sync {
    async fn create(&self, log: &WorkLog) -> AppResult<()>;

    async fn update(&self, log: &WorkLog) -> AppResult<()>;

    async fn delete(&self, id: &WorkLogId) -> AppResult<()>;

    async fn find_by_id(&self, id: &WorkLogId) -> AppResult<Option<WorkLog>>;

    /// 某订单某工序已登记的总数量，可排除正在编辑的记录
    async fn sum_quantity(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
        excluding: Option<&WorkLogId>,
    ) -> AppResult<i64>;

    async fn count_by_order(&self, order_id: &OrderId) -> AppResult<i64>;

    async fn count_by_process(&self, process_id: &ProcessId) -> AppResult<i64>;

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64>;

    /// 某订单某工序的全部记录（最新在前）
    async fn list_for_pair(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Vec<WorkLog>>;

    /// 员工在日期区间内的记录（按日期升序）
    async fn list_for_employee_between(
        &self,
        employee_id: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<WorkLog>>;

    /// 分页列出（最新在前）
    async fn list(
        &self,
        filter: &WorkLogFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<WorkLog>, u64)>;
}
