//! 工序仓储接口

use async_trait::async_trait;
use oleema_errors::AppResult;

use super::process::{Process, ProcessId};

/// 工序仓储接口
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    async fn create(&self, process: &Process) -> AppResult<()>;

    async fn update(&self, process: &Process) -> AppResult<()>;

    async fn delete(&self, id: &ProcessId) -> AppResult<()>;

    async fn find_by_id(&self, id: &ProcessId) -> AppResult<Option<Process>>;

    /// 按名称排序列出工序
    async fn list(&self, active_only: bool) -> AppResult<Vec<Process>>;
}
