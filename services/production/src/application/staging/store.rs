//! 暂存存储

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oleema_errors::{AppError, AppResult};
use oleema_ports::CachePort;
use serde::{Deserialize, Serialize};

use crate::application::session::SessionId;
use crate::application::work_log::WorkLogSubmission;
use crate::domain::overage::OverageEvaluation;

/// 因超产而等待人工确认的提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedWorkLog {
    pub submission: WorkLogSubmission,
    pub evaluation: OverageEvaluation,
    /// 面向用户的超产说明
    pub message: String,
    pub staged_at: DateTime<Utc>,
}

impl StagedWorkLog {
    pub fn new(submission: WorkLogSubmission, evaluation: OverageEvaluation) -> Self {
        let message = evaluation.message();
        Self {
            submission,
            evaluation,
            message,
            staged_at: Utc::now(),
        }
    }
}

/// 按会话隔离的单槽暂存
#[async_trait]
pub trait PendingWorkLogStore: Send + Sync {
    /// 暂存（覆盖该会话已有的内容）
    async fn stage(&self, session: &SessionId, staged: &StagedWorkLog) -> AppResult<()>;

    /// 非破坏性读取
    async fn peek(&self, session: &SessionId) -> AppResult<Option<StagedWorkLog>>;

    /// 读取并清空
    async fn consume(&self, session: &SessionId) -> AppResult<Option<StagedWorkLog>>;

    /// 清空
    async fn discard(&self, session: &SessionId) -> AppResult<()>;

    /// 随会话续期
    async fn touch(&self, session: &SessionId) -> AppResult<()>;
}

/// 基于 CachePort 的实现（Redis 或进程内缓存）
pub struct CachePendingWorkLogStore {
    cache: Arc<dyn CachePort>,
    ttl: Duration,
}

impl CachePendingWorkLogStore {
    pub fn new(cache: Arc<dyn CachePort>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    fn key(session: &SessionId) -> String {
        format!("staging:{}", session)
    }

    fn decode(payload: Option<String>) -> AppResult<Option<StagedWorkLog>> {
        payload
            .map(|p| {
                serde_json::from_str(&p)
                    .map_err(|e| AppError::internal(format!("Corrupt staged work log: {}", e)))
            })
            .transpose()
    }
}

#[async_trait]
impl PendingWorkLogStore for CachePendingWorkLogStore {
    async fn stage(&self, session: &SessionId, staged: &StagedWorkLog) -> AppResult<()> {
        let payload = serde_json::to_string(staged)
            .map_err(|e| AppError::internal(format!("Failed to encode staged work log: {}", e)))?;
        self.cache
            .set(&Self::key(session), &payload, Some(self.ttl))
            .await
    }

    async fn peek(&self, session: &SessionId) -> AppResult<Option<StagedWorkLog>> {
        Self::decode(self.cache.get(&Self::key(session)).await?)
    }

    async fn consume(&self, session: &SessionId) -> AppResult<Option<StagedWorkLog>> {
        Self::decode(self.cache.take(&Self::key(session)).await?)
    }

    async fn discard(&self, session: &SessionId) -> AppResult<()> {
        self.cache.delete(&Self::key(session)).await
    }

    async fn touch(&self, session: &SessionId) -> AppResult<()> {
        let key = Self::key(session);
        if self.cache.exists(&key).await? {
            self.cache.expire(&key, self.ttl).await?;
        }
        Ok(())
    }
}
