//! 工资记录仓储接口

use async_trait::async_trait;
use oleema_errors::AppResult;

use super::payment::{Payment, PaymentPeriod};
use crate::domain::employee::EmployeeId;

/// 工资记录仓储接口
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// 按 (员工, 年, 月) 插入或覆盖，返回存储后的记录
    async fn upsert(&self, payment: &Payment) -> AppResult<Payment>;

    async fn find(
        &self,
        employee_id: &EmployeeId,
        period: &PaymentPeriod,
    ) -> AppResult<Option<Payment>>;

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64>;
}
