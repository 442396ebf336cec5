//! 员工仓储接口

use async_trait::async_trait;
use oleema_errors::AppResult;

use super::employee::{Employee, EmployeeId};

/// 员工仓储接口
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn create(&self, employee: &Employee) -> AppResult<()>;

    async fn update(&self, employee: &Employee) -> AppResult<()>;

    async fn delete(&self, id: &EmployeeId) -> AppResult<()>;

    async fn find_by_id(&self, id: &EmployeeId) -> AppResult<Option<Employee>>;

    /// 根据员工编号查找
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Employee>>;

    async fn list(&self, active_only: bool) -> AppResult<Vec<Employee>>;
}
