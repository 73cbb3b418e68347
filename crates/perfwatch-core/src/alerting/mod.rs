//! Alerting system for perfwatch
//!
//! Classifies client-reported threshold breaches, stores them, and delivers
//! notifications for critical ones.

mod evaluator;
pub mod notifier;
mod repository;

pub use evaluator::{AlertEvaluator, AlertOutcome};
pub use notifier::{AlertNotifier, LogNotifier, WebhookNotifier};
pub use repository::{AlertRepository, InsertOutcome};
