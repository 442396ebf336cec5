//! 生产服务入口

use std::sync::Arc;

use oleema_ports::CachePort;
use production::api::{AppState, build_router};
use production::application::integrity::IntegrityService;
use production::infrastructure::cache::MemoryCache;
use production::infrastructure::persistence::{PostgresUnitOfWorkFactory, run_migrations};
use tracing::info;

/// 进程内缓存容量
const MEMORY_CACHE_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    oleema_bootstrap::run("config", |infra, metrics| async move {
        let pool = infra.postgres_pool();
        run_migrations(&pool).await?;

        let cache: Arc<dyn CachePort> = match infra.redis_cache() {
            Some(redis) => Arc::new(redis),
            None => {
                info!(capacity = MEMORY_CACHE_CAPACITY, "Using in-process session cache");
                Arc::new(MemoryCache::new(MEMORY_CACHE_CAPACITY))
            }
        };

        let uow_factory = Arc::new(PostgresUnitOfWorkFactory::new(pool));
        IntegrityService::new(uow_factory.clone()).warn_on_startup().await;

        let state = AppState::new(uow_factory, cache, infra.config()).with_metrics(metrics);
        Ok(build_router(state))
    })
    .await
}
