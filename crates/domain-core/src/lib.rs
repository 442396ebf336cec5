//! domain-core - 跨模块共享的领域核心类型

mod entity;
mod money;

pub use entity::*;
pub use money::*;
