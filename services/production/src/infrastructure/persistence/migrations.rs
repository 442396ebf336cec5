//! 内嵌数据库迁移

use oleema_adapter_postgres::{Migration, MigrationManager};
use oleema_errors::AppResult;
use sqlx::PgPool;
use tracing::info;

/// 全部迁移（按版本号递增）
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "init",
        include_str!("../../../migrations/0001_init.sql"),
    )]
}

/// 启动时执行迁移；已应用迁移的校验和不一致时终止启动
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let report = MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await?;

    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "Database migrations complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_increasing() {
        let migrations = migrations();
        assert!(!migrations.is_empty());
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn test_initial_schema_has_pending_uniqueness() {
        let init = &migrations()[0];
        assert!(init.up_sql.contains("WHERE status = 'pending'"));
        assert!(init.up_sql.contains("work_log_overages"));
        assert_eq!(init.checksum.len(), 64);
    }
}
