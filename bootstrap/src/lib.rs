//! oleema-bootstrap - 统一服务启动骨架
//!
//! 配置加载、日志、基础设施连接与 HTTP 服务启动

mod infrastructure;
mod retry;
mod runtime;
mod starter;

pub use infrastructure::*;
pub use retry::*;
pub use runtime::*;
pub use starter::*;
