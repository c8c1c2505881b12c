//! Error types for Prever
//!
//! `PreverError` covers everything outside a single prediction: configuration,
//! artifact loading, startup consistency checks and the server itself. Failures
//! that belong to one request live in [`crate::pipeline::PredictionError`].

use thiserror::Error;

/// Result type alias for Prever operations
pub type Result<T> = std::result::Result<T, PreverError>;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum PreverError {
    /// Vertical name is not one of the supported verticals
    #[error("Unknown vertical: {0}")]
    UnknownVertical(String),

    /// Vertical is configured but its artifacts failed to load
    #[error("Vertical '{vertical}' is unavailable: {reason}")]
    VerticalUnavailable {
        /// Vertical that was requested
        vertical: String,
        /// Why loading failed
        reason: String,
    },

    /// Column names or order differ between the schema and a fitted artifact
    #[error("Schema mismatch in {artifact}: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        /// Artifact that declared the columns (e.g. `transform[0] (min_max)`)
        artifact: String,
        /// Columns the vertical schema expects, in order
        expected: Vec<String>,
        /// Columns the artifact was fitted on
        actual: Vec<String>,
    },

    /// Artifact parameters are internally inconsistent
    #[error("Invalid artifact {artifact}: {reason}")]
    InvalidArtifact {
        /// Artifact being checked
        artifact: String,
        /// Description of the defect
        reason: String,
    },

    /// Input vector length does not match what an artifact was fitted on
    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch {
        /// Expected number of features
        expected: usize,
        /// Provided number of features
        actual: usize,
    },

    /// Artifact or config file could not be parsed
    #[error("Format error: {reason}")]
    FormatError {
        /// Parser message
        reason: String,
    },

    /// Configuration values are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Filesystem error with the path that caused it
    #[error("I/O error on {path}: {message}")]
    IoError {
        /// Path being read or written
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Server could not bind or stopped unexpectedly
    #[error("Server error during {operation}: {reason}")]
    ServerError {
        /// `bind` or `serve`
        operation: String,
        /// Underlying error message
        reason: String,
    },
}

impl PreverError {
    /// Build an `IoError` from a path and `std::io::Error`
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::IoError {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PreverError {
    fn from(err: serde_json::Error) -> Self {
        Self::FormatError {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PreverError {
    fn from(err: toml::de::Error) -> Self {
        Self::FormatError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_display() {
        let err = PreverError::SchemaMismatch {
            artifact: "model".to_string(),
            expected: vec!["N".to_string(), "P".to_string()],
            actual: vec!["P".to_string(), "N".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("model"));
        assert!(msg.contains("[\"N\", \"P\"]"));
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PreverError::io("/tmp/crop.json", &io);
        assert!(err.to_string().contains("/tmp/crop.json"));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: PreverError = parse.expect_err("test").into();
        assert!(matches!(err, PreverError::FormatError { .. }));
    }
}
