//! 待审工作记录暂存
//!
//! 每个会话一个槽位。会话过期或进程重启时暂存内容随之丢失，这不视为错误。

mod store;

pub use store::{CachePendingWorkLogStore, PendingWorkLogStore, StagedWorkLog};
