//! 工作记录领域模块

#![allow(clippy::module_inception)]

pub mod repository;
pub mod work_log;

pub use repository::{WorkLogFilter, WorkLogRepository};
pub use work_log::{WorkLog, WorkLogId};
