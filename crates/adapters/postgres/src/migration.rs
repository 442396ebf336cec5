//! 嵌入式迁移
//!
//! 迁移脚本编译进二进制，启动时在 advisory lock 下按版本顺序应用。
//! 已应用迁移的校验和不一致时拒绝继续。

use oleema_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info};

/// 迁移表
const MIGRATIONS_TABLE: &str = "_migrations";

/// 多实例同时启动时串行化迁移
const MIGRATION_LOCK_KEY: i64 = 0x6f6c_6565_6d61;

/// 单个迁移脚本
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    /// SHA-256（十六进制）
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = hex::encode(Sha256::digest(up_sql.as_bytes()));
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }
}

/// 迁移执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 应用全部未执行的迁移
    ///
    /// 每个迁移与其记录在同一事务中提交；任一失败立即返回，之后的迁移不再执行。
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationReport> {
        check_versions(migrations)?;

        let mut tx = self.pool.begin().await.map_err(db_error("begin migration"))?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(db_error("acquire migration lock"))?;
        sqlx::raw_sql(&format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                checksum VARCHAR(64) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ))
        .execute(&mut *tx)
        .await
        .map_err(db_error("create migration table"))?;

        let applied: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT version, checksum FROM {MIGRATIONS_TABLE} ORDER BY version"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("read applied migrations"))?;

        let mut report = MigrationReport::default();
        for migration in migrations {
            match applied.iter().find(|(version, _)| *version == migration.version) {
                Some((_, checksum)) if *checksum != migration.checksum => {
                    error!(
                        version = migration.version,
                        name = %migration.name,
                        "Applied migration has been modified"
                    );
                    return Err(AppError::internal(format!(
                        "Migration {} ({}) checksum mismatch",
                        migration.version, migration.name
                    )));
                }
                Some(_) => report.skipped.push(migration.version),
                None => {
                    apply(&mut tx, migration).await?;
                    report.applied.push(migration.version);
                }
            }
        }

        tx.commit().await.map_err(db_error("commit migrations"))?;
        Ok(report)
    }
}

async fn apply(tx: &mut Transaction<'static, Postgres>, migration: &Migration) -> AppResult<()> {
    sqlx::raw_sql(&migration.up_sql)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::database(format!(
                "Failed to apply migration {} ({}): {}",
                migration.version, migration.name, e
            ))
        })?;

    sqlx::query(&format!(
        "INSERT INTO {MIGRATIONS_TABLE} (version, name, checksum) VALUES ($1, $2, $3)"
    ))
    .bind(migration.version)
    .bind(&migration.name)
    .bind(&migration.checksum)
    .execute(&mut **tx)
    .await
    .map_err(db_error("record migration"))?;

    info!(version = migration.version, name = %migration.name, "Migration applied");
    Ok(())
}

/// 版本号必须严格递增
fn check_versions(migrations: &[Migration]) -> AppResult<()> {
    match migrations.windows(2).find(|w| w[0].version >= w[1].version) {
        Some(w) => Err(AppError::internal(format!(
            "Migration versions out of order: {} before {}",
            w[0].version, w[1].version
        ))),
        None => Ok(()),
    }
}

fn db_error(step: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::database(format!("Failed to {}: {}", step, e))
}
