//! 业务指标记录

use metrics::counter;

/// 工作记录提交结果（persisted / staged / rejected / approved / cancelled）
pub fn record_work_log_submission(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("work_log_submissions_total", &labels).increment(1);
}

/// 超产记录写入（created / updated）
pub fn record_overage(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!("overages_recorded_total", &labels).increment(1);
}

/// 超产处理
pub fn record_overage_resolved() {
    counter!("overages_resolved_total").increment(1);
}

/// 清理的孤儿超产记录数
pub fn record_orphans_removed(count: u64) {
    counter!("integrity_orphans_removed_total").increment(count);
}
