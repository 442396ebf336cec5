//! 应用层

pub mod catalog;
pub mod integrity;
pub mod overage;
pub mod payment;
pub mod session;
pub mod staging;
pub mod work_log;
