//! oleema-adapter-redis - Redis 适配器
//!
//! 会话与待审工作记录的共享存储

mod cache;
mod connection;

pub use cache::*;
pub use connection::*;
