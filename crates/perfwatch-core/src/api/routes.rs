//! API routes

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Performance reports
        .route(
            "/performance",
            post(handlers::ingest_report).get(handlers::list_reports),
        )

        // Alerts
        .route(
            "/performance/alerts",
            post(handlers::create_alert)
                .get(handlers::list_alerts)
                .patch(handlers::acknowledge_alert),
        )

        // Registry
        .route(
            "/metrics",
            get(handlers::get_metrics).delete(handlers::reset_metrics),
        )

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
