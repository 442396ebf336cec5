//! PostgreSQL 连接池

use std::time::Duration;

use oleema_errors::{AppError, AppResult};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// 连接池参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl PostgresConfig {
    /// 检查连接数范围
    pub fn validate(&self) -> AppResult<()> {
        if self.max_connections == 0 {
            return Err(AppError::validation("database.max_connections must be at least 1"));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::validation(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

/// 创建连接池
pub async fn create_pool(config: &PostgresConfig) -> AppResult<PgPool> {
    config.validate()?;
    config
        .pool_options()
        .connect(&config.url)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))
}
