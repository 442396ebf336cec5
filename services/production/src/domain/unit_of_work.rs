//! Unit of Work 模式
//!
//! 一个工作单元对应一个数据库事务，所有写操作在同一单元内提交或回滚。
//! 未提交即丢弃的单元自动回滚。

use async_trait::async_trait;
use oleema_errors::AppResult;

use crate::domain::employee::EmployeeRepository;
use crate::domain::order::OrderRepository;
use crate::domain::overage::OverageRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::process::ProcessRepository;
use crate::domain::work_log::WorkLogRepository;

/// Unit of Work trait
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn orders(&self) -> &dyn OrderRepository;

    fn processes(&self) -> &dyn ProcessRepository;

    fn employees(&self) -> &dyn EmployeeRepository;

    fn work_logs(&self) -> &dyn WorkLogRepository;

    fn overages(&self) -> &dyn OverageRepository;

    fn payments(&self) -> &dyn PaymentRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始读写事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// 开始只读事务
    async fn begin_readonly(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
