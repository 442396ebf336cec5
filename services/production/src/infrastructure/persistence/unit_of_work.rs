//! PostgreSQL Unit of Work 实现

use std::sync::Arc;

use async_trait::async_trait;
use oleema_adapter_postgres::TransactionManager;
use oleema_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use super::tx_repositories::{
    SharedTx, TxEmployeeRepository, TxOrderRepository, TxOverageRepository, TxPaymentRepository,
    TxProcessRepository, TxWorkLogRepository,
};
use crate::domain::employee::EmployeeRepository;
use crate::domain::order::OrderRepository;
use crate::domain::overage::OverageRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::process::ProcessRepository;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::work_log::WorkLogRepository;

/// Postgres Unit of Work 工厂
pub struct PostgresUnitOfWorkFactory {
    tx_manager: TransactionManager,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool),
        }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.tx_manager.begin().await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }

    async fn begin_readonly(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.tx_manager.begin_readonly().await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}

/// Postgres Unit of Work 实现
///
/// 未提交即丢弃时，sqlx 事务在 Drop 中回滚。
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    order_repo: TxOrderRepository,
    process_repo: TxProcessRepository,
    employee_repo: TxEmployeeRepository,
    work_log_repo: TxWorkLogRepository,
    overage_repo: TxOverageRepository,
    payment_repo: TxPaymentRepository,
}

impl PostgresUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            tx: tx.clone(),
            order_repo: TxOrderRepository::new(tx.clone()),
            process_repo: TxProcessRepository::new(tx.clone()),
            employee_repo: TxEmployeeRepository::new(tx.clone()),
            work_log_repo: TxWorkLogRepository::new(tx.clone()),
            overage_repo: TxOverageRepository::new(tx.clone()),
            payment_repo: TxPaymentRepository::new(tx),
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn orders(&self) -> &dyn OrderRepository {
        &self.order_repo
    }

    fn processes(&self) -> &dyn ProcessRepository {
        &self.process_repo
    }

    fn employees(&self) -> &dyn EmployeeRepository {
        &self.employee_repo
    }

    fn work_logs(&self) -> &dyn WorkLogRepository {
        &self.work_log_repo
    }

    fn overages(&self) -> &dyn OverageRepository {
        &self.overage_repo
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payment_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))?;

        Ok(())
    }
}
