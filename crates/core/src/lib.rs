//! Core library for gitbench
//!
//! This crate contains the benchmark's data model:
//! - Task records and their typed scenarios
//! - Dataset loading and selection
//! - Per-task results and the aggregate report

pub mod error;
pub mod report;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
