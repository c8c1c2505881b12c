//! On-disk artifact bundles
//!
//! Each vertical ships one JSON bundle, `<dir>/<vertical>.json`, holding the
//! fitted transforms (in fitting order) and the fitted model:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "vertical": "crop",
//!   "feature_names": ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"],
//!   "transforms": [{"kind": "min_max", "feature_names": [...], "data_min": [...], "data_max": [...]}],
//!   "model": {"kind": "linear", "feature_names": [...], "classes": [...], "coef": [[...]], "intercept": [...]}
//! }
//! ```
//!
//! Loading parses the bundle and hands the built objects to
//! [`Pipeline::new`], which performs the column-order and label checks.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{PreverError, Result},
    model::{LinearClassifier, Predictor, TreeEnsemble, TreeNode},
    pipeline::Pipeline,
    schema::{schema_for, Vertical},
    transform::{MinMaxScaler, StandardScaler, Transform, TransformChain},
};

/// Bundle format version understood by this build
pub const FORMAT_VERSION: u32 = 1;

fn unit_range() -> [f64; 2] {
    [0.0, 1.0]
}

fn enabled() -> bool {
    true
}

/// Serialized fitted transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformArtifact {
    /// Fitted min-max scaler
    MinMax {
        /// Columns the scaler was fitted on
        feature_names: Vec<String>,
        /// Per-column minimum seen during fitting
        data_min: Vec<f64>,
        /// Per-column maximum seen during fitting
        data_max: Vec<f64>,
        /// Output interval
        #[serde(default = "unit_range")]
        feature_range: [f64; 2],
    },
    /// Fitted standard scaler
    Standard {
        /// Columns the scaler was fitted on
        feature_names: Vec<String>,
        /// Per-column mean
        mean: Vec<f64>,
        /// Per-column standard deviation
        scale: Vec<f64>,
        /// Whether centering is applied
        #[serde(default = "enabled")]
        with_mean: bool,
        /// Whether scaling is applied
        #[serde(default = "enabled")]
        with_std: bool,
    },
}

impl TransformArtifact {
    /// Build the runtime transform
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if the parameters are inconsistent.
    pub fn build(self) -> Result<Box<dyn Transform>> {
        Ok(match self {
            TransformArtifact::MinMax {
                feature_names,
                data_min,
                data_max,
                feature_range,
            } => Box::new(MinMaxScaler::new(
                feature_names,
                &data_min,
                &data_max,
                (feature_range[0], feature_range[1]),
            )?),
            TransformArtifact::Standard {
                feature_names,
                mean,
                scale,
                with_mean,
                with_std,
            } => Box::new(StandardScaler::new(
                feature_names,
                &mean,
                &scale,
                with_mean,
                with_std,
            )?),
        })
    }
}

/// One serialized decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeArtifact {
    /// Flat node array, root first
    pub nodes: Vec<TreeNode>,
}

/// Serialized fitted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Linear multi-class model
    Linear {
        /// Columns the model was fitted on
        feature_names: Vec<String>,
        /// Numeric class labels
        classes: Vec<i64>,
        /// One coefficient row per class
        coef: Vec<Vec<f64>>,
        /// One intercept per class
        intercept: Vec<f64>,
    },
    /// Averaging tree ensemble
    TreeEnsemble {
        /// Columns the model was fitted on
        feature_names: Vec<String>,
        /// Numeric class labels
        classes: Vec<i64>,
        /// Member trees
        trees: Vec<TreeArtifact>,
    },
}

impl ModelArtifact {
    /// Build the runtime predictor
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if the parameters are inconsistent.
    pub fn build(self) -> Result<Box<dyn Predictor>> {
        Ok(match self {
            ModelArtifact::Linear {
                feature_names,
                classes,
                coef,
                intercept,
            } => Box::new(LinearClassifier::new(feature_names, classes, coef, intercept)?),
            ModelArtifact::TreeEnsemble {
                feature_names,
                classes,
                trees,
            } => Box::new(TreeEnsemble::new(
                feature_names,
                classes,
                trees.into_iter().map(|t| t.nodes).collect(),
            )?),
        })
    }
}

/// Everything needed to run one vertical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    /// Bundle format version
    pub format_version: u32,
    /// Vertical the artifacts were fitted for
    pub vertical: Vertical,
    /// Column order of the feature vector
    pub feature_names: Vec<String>,
    /// Transforms in fitting order
    #[serde(default)]
    pub transforms: Vec<TransformArtifact>,
    /// Fitted model
    pub model: ModelArtifact,
}

/// Conventional location of `vertical`'s bundle inside `dir`
#[must_use]
pub fn bundle_path(dir: &Path, vertical: Vertical) -> PathBuf {
    dir.join(format!("{vertical}.json"))
}

impl ArtifactBundle {
    /// Read and parse a bundle file
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, `FormatError` if it is not
    /// a valid bundle.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PreverError::io(path, &e))?;
        let bundle: Self = serde_json::from_str(&text)?;
        debug!(
            path = %path.display(),
            vertical = %bundle.vertical,
            transforms = bundle.transforms.len(),
            "Parsed artifact bundle"
        );
        Ok(bundle)
    }

    /// Write the bundle as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| PreverError::io(path, &e))
    }

    /// Build the pipeline for `expected`, checking the bundle against its schema
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` for an unsupported version, wrong vertical, or
    /// malformed parameters, and `SchemaMismatch` when any declared column
    /// order differs from the schema's.
    pub fn into_pipeline(self, expected: Vertical) -> Result<Pipeline> {
        if self.format_version != FORMAT_VERSION {
            return Err(PreverError::InvalidArtifact {
                artifact: "bundle".to_string(),
                reason: format!(
                    "format_version {} is not supported (expected {FORMAT_VERSION})",
                    self.format_version
                ),
            });
        }
        if self.vertical != expected {
            return Err(PreverError::InvalidArtifact {
                artifact: "bundle".to_string(),
                reason: format!("bundle is for '{}', not '{expected}'", self.vertical),
            });
        }

        let schema = schema_for(expected);
        let columns = schema.feature_column_names();
        if self.feature_names != columns {
            return Err(PreverError::SchemaMismatch {
                artifact: "bundle".to_string(),
                expected: columns,
                actual: self.feature_names,
            });
        }

        let steps = self
            .transforms
            .into_iter()
            .map(TransformArtifact::build)
            .collect::<Result<Vec<_>>>()?;
        let predictor = self.model.build()?;
        Pipeline::new(schema, TransformChain::new(steps), predictor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    #[test]
    fn test_transform_defaults() {
        let json = r#"{"kind": "standard", "feature_names": ["a"], "mean": [1.0], "scale": [2.0]}"#;
        let artifact: TransformArtifact = serde_json::from_str(json).expect("test");
        assert!(matches!(
            artifact,
            TransformArtifact::Standard {
                with_mean: true,
                with_std: true,
                ..
            }
        ));
        let json = r#"{"kind": "min_max", "feature_names": ["a"], "data_min": [0], "data_max": [4]}"#;
        let artifact: TransformArtifact = serde_json::from_str(json).expect("test");
        let transform = artifact.build().expect("test");
        assert_eq!(transform.transform(&[2.0]).expect("test"), vec![0.5]);
    }

    #[test]
    fn test_tree_model_parses() {
        let json = r#"{
            "kind": "tree_ensemble",
            "feature_names": ["x"],
            "classes": [0, 1],
            "trees": [{"nodes": [
                {"type": "split", "feature": 0, "threshold": 1.0, "left": 1, "right": 2},
                {"type": "leaf", "value": [1.0, 0.0]},
                {"type": "leaf", "value": [0.0, 1.0]}
            ]}]
        }"#;
        let model = serde_json::from_str::<ModelArtifact>(json)
            .expect("test")
            .build()
            .expect("test");
        assert_eq!(model.predict(&[3.0]).expect("test"), 1.0);
    }

    #[test]
    fn test_unknown_kind_is_format_error() {
        let err: PreverError = serde_json::from_str::<TransformArtifact>(r#"{"kind": "pca"}"#)
            .expect_err("test")
            .into();
        assert!(matches!(err, PreverError::FormatError { .. }));
    }

    #[test]
    fn test_wrong_vertical_rejected() {
        let bundle = demo::bundle(Vertical::Liver).expect("test");
        let err = bundle.into_pipeline(Vertical::Crop).expect_err("test");
        assert!(err.to_string().contains("bundle is for 'liver'"));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bundle = demo::bundle(Vertical::Liver).expect("test");
        bundle.format_version = 2;
        assert!(bundle.into_pipeline(Vertical::Liver).is_err());
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let mut bundle = demo::bundle(Vertical::Crop).expect("test");
        bundle.feature_names.swap(0, 1);
        let err = bundle.into_pipeline(Vertical::Crop).expect_err("test");
        assert!(matches!(err, PreverError::SchemaMismatch { ref artifact, .. } if artifact == "bundle"));
    }

    #[test]
    fn test_bundle_path() {
        let path = bundle_path(Path::new("/srv/artifacts"), Vertical::Diabetes);
        assert_eq!(path, PathBuf::from("/srv/artifacts/diabetes.json"));
    }
}
