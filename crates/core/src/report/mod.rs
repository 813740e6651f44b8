//! Report module
//!
//! Task results, their aggregate, and where the aggregate is written.

mod model;
mod sink;

pub use model::{Report, TaskResult};
pub use sink::{JsonFileSink, ReportSink};
