//! Pipeline registry for multi-vertical serving
//!
//! Built once at startup and never mutated afterwards, so request handlers
//! share it through an `Arc` without any locking. Each configured vertical is
//! either loaded (a checked [`Pipeline`]) or unavailable with the reason its
//! artifacts were rejected; a failing vertical never takes down the others.
//!
//! ## Example
//!
//! ```rust
//! use prever::{registry::PipelineRegistry, schema::Vertical};
//!
//! let registry = PipelineRegistry::demo(&Vertical::ALL);
//! assert!(registry.all_loaded());
//! let pipeline = registry.get(Vertical::Crop).expect("loaded");
//! assert_eq!(pipeline.vertical(), Vertical::Crop);
//! ```

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::Serialize;
use tracing::{error, info};

use crate::{
    artifact::{bundle_path, ArtifactBundle},
    demo,
    error::{PreverError, Result},
    pipeline::Pipeline,
    schema::Vertical,
};

/// Load state of one vertical
#[derive(Debug, Clone)]
pub enum VerticalState {
    /// Artifacts loaded and checked
    Loaded(Arc<Pipeline>),
    /// Artifacts missing or rejected
    Unavailable {
        /// Why loading failed
        reason: String,
    },
}

/// Serializable status of one vertical
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerticalStatus {
    /// Vertical identifier
    pub vertical: Vertical,
    /// Whether predictions are served
    pub loaded: bool,
    /// Why the vertical is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Overall service health derived from vertical states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Every configured vertical loaded
    Healthy,
    /// Some verticals loaded
    Degraded,
    /// Nothing loaded
    ModelsNotLoaded,
}

/// Immutable map from vertical to its load state
#[derive(Debug, Clone, Default)]
pub struct PipelineRegistry {
    entries: BTreeMap<Vertical, VerticalState>,
}

impl PipelineRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of building `vertical`'s pipeline
    pub fn insert(&mut self, vertical: Vertical, pipeline: Result<Pipeline>) {
        let state = match pipeline {
            Ok(pipeline) => {
                info!(
                    vertical = %vertical,
                    model = pipeline.predictor().kind(),
                    transforms = pipeline.chain().len(),
                    "Vertical loaded"
                );
                VerticalState::Loaded(Arc::new(pipeline))
            }
            Err(err) => {
                error!(vertical = %vertical, error = %err, "Vertical unavailable");
                VerticalState::Unavailable {
                    reason: err.to_string(),
                }
            }
        };
        self.entries.insert(vertical, state);
    }

    /// Load `<dir>/<vertical>.json` for every vertical in `verticals`
    ///
    /// Never fails: a vertical whose bundle is missing or inconsistent is
    /// registered as unavailable.
    #[must_use]
    pub fn load(dir: &Path, verticals: &[Vertical]) -> Self {
        let mut registry = Self::new();
        for &vertical in verticals {
            let path = bundle_path(dir, vertical);
            let pipeline = ArtifactBundle::load(&path).and_then(|b| b.into_pipeline(vertical));
            registry.insert(vertical, pipeline);
        }
        registry
    }

    /// Registry built from the reference bundles
    #[must_use]
    pub fn demo(verticals: &[Vertical]) -> Self {
        let mut registry = Self::new();
        for &vertical in verticals {
            registry.insert(
                vertical,
                demo::bundle(vertical).and_then(|b| b.into_pipeline(vertical)),
            );
        }
        registry
    }

    /// Pipeline for `vertical`
    ///
    /// # Errors
    ///
    /// Returns `UnknownVertical` if the vertical is not configured and
    /// `VerticalUnavailable` if its artifacts failed to load.
    pub fn get(&self, vertical: Vertical) -> Result<Arc<Pipeline>> {
        match self.entries.get(&vertical) {
            Some(VerticalState::Loaded(pipeline)) => Ok(Arc::clone(pipeline)),
            Some(VerticalState::Unavailable { reason }) => Err(PreverError::VerticalUnavailable {
                vertical: vertical.to_string(),
                reason: reason.clone(),
            }),
            None => Err(PreverError::UnknownVertical(vertical.to_string())),
        }
    }

    /// Configured verticals, in registry order
    pub fn verticals(&self) -> impl Iterator<Item = Vertical> + '_ {
        self.entries.keys().copied()
    }

    /// Status of every configured vertical
    #[must_use]
    pub fn status(&self) -> Vec<VerticalStatus> {
        self.entries
            .iter()
            .map(|(vertical, state)| match state {
                VerticalState::Loaded(_) => VerticalStatus {
                    vertical: *vertical,
                    loaded: true,
                    reason: None,
                },
                VerticalState::Unavailable { reason } => VerticalStatus {
                    vertical: *vertical,
                    loaded: false,
                    reason: Some(reason.clone()),
                },
            })
            .collect()
    }

    /// Number of loaded verticals
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, VerticalState::Loaded(_)))
            .count()
    }

    /// Number of configured verticals
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no vertical is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every configured vertical loaded
    #[must_use]
    pub fn all_loaded(&self) -> bool {
        !self.is_empty() && self.loaded_count() == self.len()
    }

    /// Overall health
    #[must_use]
    pub fn health(&self) -> Health {
        match self.loaded_count() {
            0 => Health::ModelsNotLoaded,
            n if n == self.len() => Health::Healthy,
            _ => Health::Degraded,
        }
    }
}
