//! 数据完整性维护

mod service;

pub use service::{IntegrityReport, IntegrityService, OrphanedOverage, RepairReport};
