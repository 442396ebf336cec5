//! 会话与登录（单管理员账号）

mod service;

pub use service::{Session, SessionId, SessionService};
