//! Request-independent response types
//!
//! Prediction bodies are serialized straight from
//! [`PredictionResult`](crate::decode::PredictionResult) and
//! [`BatchReport`](crate::batch::BatchReport); the types here cover the
//! auxiliary endpoints and error bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    registry::{Health, VerticalStatus},
    schema::{DerivedFeatureSpec, FieldSpec, Vertical},
};

/// Error body: `{success: false, errors: {general: message}}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Field (or `general`) to message
    pub errors: BTreeMap<String, String>,
}

impl ErrorResponse {
    /// Error not tied to any field
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: BTreeMap::from([("general".to_string(), message.into())]),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy`, `degraded` or `models_not_loaded`
    pub status: Health,
    /// Crate version
    pub version: String,
    /// Number of verticals serving predictions
    pub models_loaded: usize,
    /// Per-vertical load state
    pub verticals: Vec<VerticalStatus>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadyResponse {
    /// Whether every configured vertical loaded
    pub ready: bool,
    /// Loaded verticals
    pub loaded: usize,
    /// Configured verticals
    pub configured: usize,
}

/// Output categories of one vertical
#[derive(Debug, Clone, Serialize)]
pub struct CategoriesResponse {
    /// Vertical identifier
    pub vertical: Vertical,
    /// Label code to category
    pub categories: BTreeMap<i64, &'static str>,
    /// Number of categories
    pub total: usize,
}

/// Description of one configured vertical
#[derive(Debug, Clone, Serialize)]
pub struct VerticalDescription {
    /// Vertical identifier
    pub vertical: Vertical,
    /// Whether predictions are served
    pub loaded: bool,
    /// Why the vertical is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Accepted input fields
    pub fields: &'static [FieldSpec],
    /// Derived features computed from the inputs
    pub derived_features: &'static [DerivedFeatureSpec],
    /// Feature column order of the fitted artifacts
    pub feature_columns: &'static [&'static str],
    /// JSON key of the decoded category
    pub response_key: &'static str,
}

/// Response of `GET /v1/verticals`
#[derive(Debug, Clone, Serialize)]
pub struct VerticalsResponse {
    /// Configured verticals
    pub verticals: Vec<VerticalDescription>,
}
