//! 员工领域模块

#![allow(clippy::module_inception)]

pub mod employee;
pub mod repository;

pub use employee::{Employee, EmployeeId};
pub use repository::EmployeeRepository;
