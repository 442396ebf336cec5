//! 基础资料：订单、工序、员工

mod commands;
mod handlers;

pub use commands::*;
pub use handlers::CatalogCommandHandler;
