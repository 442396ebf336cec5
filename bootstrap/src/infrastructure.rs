//! 基础设施资源管理
//!
//! PostgreSQL 必需，Redis 可选（未配置时服务使用进程内缓存）

use std::time::Duration;

use oleema_adapter_postgres::{PostgresConfig, create_pool};
use oleema_adapter_redis::{RedisCache, create_connection_manager};
use oleema_config::{AppConfig, DatabaseConfig};
use oleema_errors::AppResult;
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::retry::{RetryConfig, with_retry, with_retry_optional};

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Redis 连接管理器（可选）
    redis_conn: Option<ConnectionManager>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        let pg_config = postgres_config(&config.database);
        pg_config.validate()?;
        let postgres_pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;
        info!(
            max_connections = pg_config.max_connections,
            min_connections = pg_config.min_connections,
            "PostgreSQL connection pool created"
        );

        let redis_conn = match &config.redis {
            Some(redis_config) => {
                let url = redis_config.url.expose_secret().clone();
                let conn = with_retry_optional(&retry_config, "Redis connection", || {
                    let url = url.clone();
                    async move { create_connection_manager(&url).await }
                })
                .await;
                if conn.is_some() {
                    info!("Redis connection created");
                }
                conn
            }
            None => {
                info!("Redis not configured, using in-process cache");
                None
            }
        };

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
        })
    }

    /// 获取应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取 PostgreSQL 连接池
    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// 获取 Redis 缓存（实现 CachePort trait）
    pub fn redis_cache(&self) -> Option<RedisCache> {
        self.redis_conn.clone().map(RedisCache::new)
    }
}

fn postgres_config(db: &DatabaseConfig) -> PostgresConfig {
    PostgresConfig {
        url: db.url.expose_secret().clone(),
        max_connections: db.max_connections,
        min_connections: db.min_connections,
        acquire_timeout: Duration::from_secs(db.acquire_timeout_secs),
        idle_timeout: Duration::from_secs(db.idle_timeout_secs),
    }
}
