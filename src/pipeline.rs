//! Per-record inference pipeline
//!
//! ```text
//! raw record -> validate -> derive -> project -> transform -> predict -> decode
//! ```
//!
//! Each stage runs only if the previous one succeeded, and every record ends
//! in exactly one [`Outcome`]. A [`Pipeline`] holds only immutable fitted
//! state, so one instance serves any number of concurrent requests.

use std::fmt;

use serde::{ser::SerializeMap, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    decode::{self, Prediction, PredictionResult},
    error::{PreverError, Result},
    features::{self, FeatureVector},
    model::{self, Predictor},
    schema::{Vertical, VerticalSchema},
    transform::TransformChain,
    validate::{validate_against, ErrorMap, FieldErrorKind, RawRecord},
};

/// Message shown for model and configuration faults
pub const PREDICTION_FAILED: &str = "Prediction failed";

/// Message shown for unmapped model output
pub const UNKNOWN_RESULT: &str = "Could not determine result";

// ============================================================================
// Outcomes and errors
// ============================================================================

/// Terminal state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    /// Missing, unparseable or out-of-range input
    ValidationFailed,
    /// A derived feature was undefined
    DerivationFailed,
    /// Transform or model fault
    PredictFailed,
    /// Model output had no label
    DecodeFailed,
    /// Prediction decoded
    Completed,
}

impl Outcome {
    /// Every outcome, in pipeline order
    pub const ALL: [Outcome; 5] = [
        Outcome::ValidationFailed,
        Outcome::DerivationFailed,
        Outcome::PredictFailed,
        Outcome::DecodeFailed,
        Outcome::Completed,
    ];

    /// Stable snake_case identifier (metrics label)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::ValidationFailed => "validation_failed",
            Outcome::DerivationFailed => "derivation_failed",
            Outcome::PredictFailed => "predict_failed",
            Outcome::DecodeFailed => "decode_failed",
            Outcome::Completed => "completed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one record did not complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    /// One or more raw fields failed validation
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(ErrorMap),

    /// One or more derived features were undefined
    #[error("{} derived feature(s) undefined", .0.len())]
    UndefinedDerivation(ErrorMap),

    /// Feature vector did not fit the fitted artifacts
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Internal description, logged only
        reason: String,
    },

    /// The model call failed
    #[error("model inference fault: {reason}")]
    ModelInferenceFault {
        /// Internal description, logged only
        reason: String,
    },

    /// Model output is not a mapped label
    #[error("unknown label {label}")]
    UnknownLabel {
        /// Raw model output
        label: f64,
    },
}

impl PredictionError {
    /// Terminal outcome this error ends in
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            PredictionError::Validation(_) => Outcome::ValidationFailed,
            PredictionError::UndefinedDerivation(_) => Outcome::DerivationFailed,
            PredictionError::SchemaMismatch { .. } | PredictionError::ModelInferenceFault { .. } => {
                Outcome::PredictFailed
            }
            PredictionError::UnknownLabel { .. } => Outcome::DecodeFailed,
        }
    }

    /// HTTP status: 400 for faults caused by the input, 500 otherwise
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PredictionError::Validation(_)
            | PredictionError::UndefinedDerivation(_)
            | PredictionError::UnknownLabel { .. } => 400,
            PredictionError::SchemaMismatch { .. } | PredictionError::ModelInferenceFault { .. } => {
                500
            }
        }
    }

    /// Taxonomy name reported as `error_kind`
    ///
    /// Validation reports the single kind its entries share, or
    /// `InvalidInput` when missing and malformed fields are mixed.
    #[must_use]
    pub fn error_kind(&self) -> &'static str {
        match self {
            PredictionError::Validation(errors) => {
                if errors.all_of_kind(FieldErrorKind::MissingField) {
                    "MissingField"
                } else if errors.all_of_kind(FieldErrorKind::InvalidFormat) {
                    "InvalidFormat"
                } else if errors.all_of_kind(FieldErrorKind::OutOfRange) {
                    "OutOfRange"
                } else {
                    "InvalidInput"
                }
            }
            PredictionError::UndefinedDerivation(_) => "UndefinedDerivation",
            PredictionError::SchemaMismatch { .. } => "SchemaMismatch",
            PredictionError::ModelInferenceFault { .. } => "ModelInferenceFault",
            PredictionError::UnknownLabel { .. } => "UnknownLabel",
        }
    }

    /// Field-to-message map shown to the caller
    #[must_use]
    pub fn errors(&self) -> ErrorMap {
        match self {
            PredictionError::Validation(errors) | PredictionError::UndefinedDerivation(errors) => {
                errors.clone()
            }
            PredictionError::SchemaMismatch { .. } | PredictionError::ModelInferenceFault { .. } => {
                general(PREDICTION_FAILED)
            }
            PredictionError::UnknownLabel { .. } => {
                general(UNKNOWN_RESULT)
            }
        }
    }

    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> std::result::Result<(), M::Error> {
        map.serialize_entry("success", &false)?;
        map.serialize_entry("error_kind", self.error_kind())?;
        map.serialize_entry("errors", &self.errors())
    }
}

fn general(message: &str) -> ErrorMap {
    let mut errors = ErrorMap::new();
    errors.insert("general", FieldErrorKind::General, message);
    errors
}

impl Serialize for PredictionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Fitted pipeline for one vertical
#[derive(Debug)]
pub struct Pipeline {
    schema: &'static VerticalSchema,
    chain: TransformChain,
    predictor: Box<dyn Predictor>,
}

impl Pipeline {
    /// Assemble a pipeline, checking it against the vertical's schema
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an inconsistent schema,
    /// `SchemaMismatch` when the transform order or any artifact's column
    /// order differs from the schema, and `InvalidArtifact` when the model
    /// can emit a class the label map does not cover.
    pub fn new(
        schema: &'static VerticalSchema,
        chain: TransformChain,
        predictor: Box<dyn Predictor>,
    ) -> Result<Self> {
        schema.check()?;
        let columns = schema.feature_column_names();
        chain.check(schema.transform_order, &columns)?;

        if predictor.feature_names() != columns.as_slice() {
            return Err(PreverError::SchemaMismatch {
                artifact: format!("model ({})", predictor.kind()),
                expected: columns,
                actual: predictor.feature_names().to_vec(),
            });
        }
        if let Some(class) = predictor
            .classes()
            .iter()
            .find(|c| !schema.labels.contains(**c))
        {
            return Err(PreverError::InvalidArtifact {
                artifact: format!("model ({})", predictor.kind()),
                reason: format!(
                    "class {class} has no entry in the {} label map",
                    schema.vertical
                ),
            });
        }

        Ok(Self {
            schema,
            chain,
            predictor,
        })
    }

    /// Vertical served by this pipeline
    #[must_use]
    pub fn vertical(&self) -> Vertical {
        self.schema.vertical
    }

    /// Static schema of the vertical
    #[must_use]
    pub fn schema(&self) -> &'static VerticalSchema {
        self.schema
    }

    /// Fitted transforms
    #[must_use]
    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Fitted model
    #[must_use]
    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Run one record through every stage
    ///
    /// # Errors
    ///
    /// Returns the [`PredictionError`] of the first stage that failed.
    pub fn predict(&self, raw: &RawRecord) -> std::result::Result<Prediction, PredictionError> {
        let record = validate_against(self.schema, raw).map_err(PredictionError::Validation)?;
        let record = features::derive(record, self.schema.derived)
            .map_err(PredictionError::UndefinedDerivation)?;

        let vector = FeatureVector::project(&record, self.schema.feature_columns)
            .map_err(|e| PredictionError::SchemaMismatch {
                reason: e.to_string(),
            })?;
        let transformed = self
            .chain
            .apply(vector.as_slice())
            .map_err(|e| PredictionError::SchemaMismatch {
                reason: e.to_string(),
            })?;

        let label = model::invoke(self.predictor.as_ref(), &FeatureVector::from(transformed))
            .map_err(|reason| {
                warn!(vertical = %self.schema.vertical, %reason, "Model inference fault");
                PredictionError::ModelInferenceFault { reason }
            })?;

        decode::decode(self.schema, label, &record)
    }

    /// Run one record and wrap the outcome
    #[must_use]
    pub fn run(&self, raw: &RawRecord) -> PredictionResult {
        let result = PredictionResult::from(self.predict(raw));
        debug!(
            vertical = %self.schema.vertical,
            outcome = %result.outcome(),
            "Record processed"
        );
        result
    }

    /// Run every row independently; one row's failure never affects another
    #[must_use]
    pub fn run_batch(&self, rows: &[RawRecord]) -> Vec<PredictionResult> {
        rows.iter().map(|row| self.run(row)).collect()
    }
}
