//! Fitted numeric transforms and the ordered chain that applies them
//!
//! Parameters follow the scikit-learn fitted attributes so exported scalers
//! translate one-to-one:
//!
//! - [`MinMaxScaler`]: `x * scale + min`, with `scale = (hi - lo) / (data_max - data_min)`
//! - [`StandardScaler`]: `(x - mean) / scale`
//!
//! Constant columns (zero range or zero scale) are treated as having scale 1 so
//! a transform never divides by zero.
//!
//! The chain applies transforms strictly in the order they were fitted. Column
//! order is checked once, when artifacts are loaded; a per-request call only
//! verifies vector length.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PreverError, Result};

/// Kind of fitted transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Min-max scaling into a feature range
    MinMax,
    /// Standardization to zero mean, unit variance
    Standard,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformKind::MinMax => "min_max",
            TransformKind::Standard => "standard",
        })
    }
}

/// A fitted, deterministic vector transform
///
/// Implementations hold only read-only fitted state and are shared across
/// concurrent requests.
pub trait Transform: fmt::Debug + Send + Sync {
    /// Which kind of transform this is
    fn kind(&self) -> TransformKind;

    /// Column names, in the order the transform was fitted on
    fn feature_names(&self) -> &[String];

    /// Transform one row
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `input` has the wrong length.
    fn transform(&self, input: &[f64]) -> Result<Vec<f64>>;
}

fn check_len(expected: usize, input: &[f64]) -> Result<()> {
    if input.len() == expected {
        Ok(())
    } else {
        Err(PreverError::ShapeMismatch {
            expected,
            actual: input.len(),
        })
    }
}

fn check_params(artifact: &str, names: &[String], params: &[(&str, &[f64])]) -> Result<()> {
    if names.is_empty() {
        return Err(PreverError::InvalidArtifact {
            artifact: artifact.to_string(),
            reason: "no feature names".to_string(),
        });
    }
    for (param, values) in params {
        if values.len() != names.len() {
            return Err(PreverError::InvalidArtifact {
                artifact: artifact.to_string(),
                reason: format!(
                    "{param} has {} entries for {} features",
                    values.len(),
                    names.len()
                ),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PreverError::InvalidArtifact {
                artifact: artifact.to_string(),
                reason: format!("{param}[{i}] is not finite"),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Min-max scaling
// ============================================================================

/// Fitted min-max scaler
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    feature_names: Vec<String>,
    scale: Vec<f64>,
    min: Vec<f64>,
}

impl MinMaxScaler {
    /// Build from the fitted per-column minimum and maximum
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if lengths disagree, a value is not finite,
    /// or `feature_range` is not increasing.
    pub fn new(
        feature_names: Vec<String>,
        data_min: &[f64],
        data_max: &[f64],
        feature_range: (f64, f64),
    ) -> Result<Self> {
        check_params(
            "min_max",
            &feature_names,
            &[("data_min", data_min), ("data_max", data_max)],
        )?;
        let (lo, hi) = feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(PreverError::InvalidArtifact {
                artifact: "min_max".to_string(),
                reason: format!("feature_range ({lo}, {hi}) must be increasing"),
            });
        }

        let scale: Vec<f64> = data_min
            .iter()
            .zip(data_max)
            .map(|(min, max)| {
                let range = max - min;
                (hi - lo) / if range == 0.0 { 1.0 } else { range }
            })
            .collect();
        let min = data_min
            .iter()
            .zip(&scale)
            .map(|(data_min, scale)| lo - data_min * scale)
            .collect();

        Ok(Self {
            feature_names,
            scale,
            min,
        })
    }
}

impl Transform for MinMaxScaler {
    fn kind(&self) -> TransformKind {
        TransformKind::MinMax
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, input: &[f64]) -> Result<Vec<f64>> {
        check_len(self.scale.len(), input)?;
        Ok(input
            .iter()
            .zip(self.scale.iter().zip(&self.min))
            .map(|(x, (scale, min))| x * scale + min)
            .collect())
    }
}

// ============================================================================
// Standardization
// ============================================================================

/// Fitted standard scaler
#[derive(Debug, Clone)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
}

impl StandardScaler {
    /// Build from fitted means and standard deviations
    ///
    /// `with_mean` / `with_std` mirror the options the scaler was fitted with;
    /// a disabled step is skipped entirely.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if lengths disagree or a value is not finite.
    pub fn new(
        feature_names: Vec<String>,
        mean: &[f64],
        scale: &[f64],
        with_mean: bool,
        with_std: bool,
    ) -> Result<Self> {
        check_params("standard", &feature_names, &[("mean", mean), ("scale", scale)])?;
        Ok(Self {
            feature_names,
            mean: with_mean.then(|| mean.to_vec()),
            scale: with_std.then(|| {
                scale
                    .iter()
                    .map(|&s| if s == 0.0 { 1.0 } else { s })
                    .collect()
            }),
        })
    }
}

impl Transform for StandardScaler {
    fn kind(&self) -> TransformKind {
        TransformKind::Standard
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, input: &[f64]) -> Result<Vec<f64>> {
        check_len(self.feature_names.len(), input)?;
        let mut out = input.to_vec();
        if let Some(mean) = &self.mean {
            out.iter_mut().zip(mean).for_each(|(x, m)| *x -= m);
        }
        if let Some(scale) = &self.scale {
            out.iter_mut().zip(scale).for_each(|(x, s)| *x /= s);
        }
        Ok(out)
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered sequence of fitted transforms
#[derive(Debug, Default)]
pub struct TransformChain {
    steps: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    /// Chain applying `steps` in the given (fitted) order
    #[must_use]
    pub fn new(steps: Vec<Box<dyn Transform>>) -> Self {
        Self { steps }
    }

    /// Number of transforms
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain is the identity
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Transform kinds in application order
    #[must_use]
    pub fn kinds(&self) -> Vec<TransformKind> {
        self.steps.iter().map(|t| t.kind()).collect()
    }

    /// Verify the chain was fitted in `expected` order on `columns`
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the kinds are out of order or any step was
    /// fitted on different columns.
    pub fn check(&self, expected: &[TransformKind], columns: &[String]) -> Result<()> {
        let kinds = self.kinds();
        if kinds != expected {
            return Err(PreverError::SchemaMismatch {
                artifact: "transform order".to_string(),
                expected: expected.iter().map(ToString::to_string).collect(),
                actual: kinds.iter().map(ToString::to_string).collect(),
            });
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.feature_names() != columns {
                return Err(PreverError::SchemaMismatch {
                    artifact: format!("transform[{i}] ({})", step.kind()),
                    expected: columns.to_vec(),
                    actual: step.feature_names().to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Apply every transform in order
    ///
    /// # Errors
    ///
    /// Propagates the first failing step's error.
    pub fn apply(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut current = input.to_vec();
        for step in &self.steps {
            current = step.transform(&current)?;
        }
        Ok(current)
    }
}
