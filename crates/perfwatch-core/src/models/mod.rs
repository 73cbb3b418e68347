//! Data models for perfwatch

mod alert;
mod lenient;
mod metrics;
mod query;
mod report;

pub use alert::*;
pub use metrics::*;
pub use query::*;
pub use report::*;
