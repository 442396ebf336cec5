//! 计件工资领域模块

#![allow(clippy::module_inception)]

pub mod payment;
pub mod repository;

pub use payment::{Payment, PaymentId, PaymentPeriod};
pub use repository::PaymentRepository;
