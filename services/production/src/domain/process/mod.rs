//! 工序领域模块

#![allow(clippy::module_inception)]

pub mod process;
pub mod repository;

pub use process::{Process, ProcessId};
pub use repository::ProcessRepository;
