//! 持久化（PostgreSQL）

mod migrations;
mod rows;
mod tx_repositories;
mod unit_of_work;

pub use migrations::{migrations, run_migrations};
pub use unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
