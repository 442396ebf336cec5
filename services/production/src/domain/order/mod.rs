//! 订单领域模块

#![allow(clippy::module_inception)]

pub mod order;
pub mod repository;

pub use order::{Order, OrderId, OrderStatus};
pub use repository::OrderRepository;
