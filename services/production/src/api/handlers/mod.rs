//! HTTP 处理器

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod overages;
pub mod reports;
pub mod work_logs;
