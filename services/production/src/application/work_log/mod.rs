//! 工作记录提交流程
//!
//! 新建时超产需人工确认；编辑时超产仅提示。

mod commands;
mod handlers;

pub use commands::{FieldErrors, StagedAction, WorkLogForm, WorkLogSubmission};
pub use handlers::{DecisionOutcome, EditOutcome, SubmitOutcome, WorkLogCommandHandler};

#[cfg(test)]
mod tests;
