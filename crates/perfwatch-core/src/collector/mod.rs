//! Collector module - performance report ingestion and service wiring
//!
//! The collector owns the shared registry and stores, builds the ingestor and
//! alert evaluator on top of them, and serves the HTTP API until shutdown.

mod aggregate;
mod ingestor;

pub use aggregate::aggregate_metrics;
pub use ingestor::{IngestOutcome, ReportIngestor};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::alerting::{notifier, AlertEvaluator, AlertNotifier};
use crate::api::{AppState, HttpServer};
use crate::config::Config;
use crate::error::Result;
use crate::registry::MetricsRegistry;
use crate::store::Store;

/// The main collector service
pub struct Collector {
    config: Config,
    state: AppState,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl Collector {
    /// Create a new collector instance
    pub fn new(config: Config) -> Result<Self> {
        let registry = MetricsRegistry::new();
        let store = Store::new(&config.retention);

        let ingestor = ReportIngestor::new(store.reports.clone(), registry.clone(), &config.ingest);
        let notifier: Arc<dyn AlertNotifier> =
            Arc::from(notifier::from_config(&config.alerting.notifications)?);
        let evaluator = AlertEvaluator::new(
            store.alerts.clone(),
            registry.clone(),
            notifier,
            &config.alerting,
        )?;

        let state = AppState {
            ingestor,
            evaluator: Arc::new(evaluator),
            store,
            registry,
            config: Arc::new(config.clone()),
        };

        Ok(Self {
            config,
            state,
            shutdown_tx: None,
        })
    }

    /// Serve the HTTP API until Ctrl+C or [`Collector::stop`]
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting perfwatch collector...");

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let addr = self.config.bind_addr();
        let server = HttpServer::new(self.state.clone());

        let shutdown = async move {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                }
            }
        };

        server.serve(&addr, shutdown).await?;

        info!("Collector stopped");
        Ok(())
    }

    /// Stop the collector
    pub async fn stop(&self) -> Result<()> {
        if let Some(tx) = &self.shutdown_tx {
            let _ = tx.send(()).await;
        }
        Ok(())
    }

    /// Shared handler state, for driving the router without a socket
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}
