//! PostgreSQL 事务管理
//!
//! 隔离级别保持默认（READ COMMITTED）；需要串行化的写路径由行锁负责。

use oleema_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};

/// 事务访问模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    /// 需要追加的 SET TRANSACTION 语句（默认模式无需）
    pub fn set_statement(&self) -> Option<&'static str> {
        match self {
            AccessMode::ReadWrite => None,
            AccessMode::ReadOnly => Some("SET TRANSACTION READ ONLY"),
        }
    }
}

/// 事务管理器
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 读写事务
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.begin_with(AccessMode::ReadWrite).await
    }

    /// 只读事务（查询与就绪检查）
    pub async fn begin_readonly(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.begin_with(AccessMode::ReadOnly).await
    }

    async fn begin_with(&self, mode: AccessMode) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        if let Some(statement) = mode.set_statement() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to set access mode: {}", e)))?;
        }
        Ok(tx)
    }
}
