//! HTTP API for tabular prediction
//!
//! ## Endpoints
//!
//! - `POST /v1/:vertical/predict` - Predict one record (form, JSON) or a CSV batch (multipart)
//! - `GET /v1/:vertical/categories` - Output categories of a vertical
//! - `GET /v1/verticals` - Configured verticals, their fields and load state
//! - `GET /health` - Health check (always 200)
//! - `GET /ready` - Readiness (503 until every vertical is loaded)
//! - `GET /metrics` - Prometheus-formatted metrics
//!
//! ## Example
//!
//! ```rust,ignore
//! use prever::api::{create_router, AppState};
//!
//! let state = AppState::demo();
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

mod handlers;
pub mod types;

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::{config::ServeConfig, metrics::MetricsCollector, registry::PipelineRegistry, schema::Vertical};

use self::handlers::{
    categories_handler, health_handler, metrics_handler, not_found_handler, predict_handler,
    ready_handler, verticals_handler,
};
pub use self::types::ErrorResponse;

/// Error half of handler results
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded pipelines, one per configured vertical
    registry: Arc<PipelineRegistry>,
    /// Request counters
    metrics: Arc<MetricsCollector>,
    /// Server configuration
    config: Arc<ServeConfig>,
}

impl AppState {
    /// Create application state
    #[must_use]
    pub fn new(registry: PipelineRegistry, config: ServeConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(MetricsCollector::new()),
            config: Arc::new(config),
        }
    }

    /// State serving the reference bundles for every vertical
    #[must_use]
    pub fn demo() -> Self {
        Self::new(PipelineRegistry::demo(&Vertical::ALL), ServeConfig::default())
    }

    /// Loaded pipelines
    #[must_use]
    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Request counters
    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Server configuration
    #[must_use]
    pub fn config(&self) -> &ServeConfig {
        &self.config
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/verticals", get(verticals_handler))
        .route("/v1/:vertical/predict", post(predict_handler))
        .route("/v1/:vertical/categories", get(categories_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
