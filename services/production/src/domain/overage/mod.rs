//! 超产领域模块

#![allow(clippy::module_inception)]

pub mod evaluator;
pub mod overage;
pub mod repository;

pub use evaluator::{OverageEvaluation, evaluate};
pub use overage::{Overage, OverageContribution, OverageId, OverageStatus};
pub use repository::OverageRepository;
