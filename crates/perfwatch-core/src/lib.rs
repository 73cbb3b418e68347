//! # perfwatch
//!
//! In-memory Web Vitals aggregation and alerting engine.
//!
//! perfwatch accepts browser performance reports and client-side threshold
//! alerts over HTTP, keeps them in bounded in-memory logs, and answers
//! queries with aggregated statistics.
//!
//! ## Architecture
//!
//! - **Registry**: counters, gauges and histograms with percentile snapshots
//! - **Collector**: report ingestion and online aggregation
//! - **Alerting**: severity classification, frequency checks, notifications
//! - **Store**: fixed-capacity report and alert logs
//! - **API**: REST endpoints on axum
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the server
//! perfwatch serve --port 8080
//!
//! # Show the effective configuration
//! perfwatch config
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod alerting;
pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertEvaluator, AlertNotifier, AlertRepository};
    pub use crate::collector::{Collector, ReportIngestor};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::registry::MetricsRegistry;
    pub use crate::store::Store;
}
