//! Feature engineering over validated records
//!
//! Derived columns are evaluated in declaration order against the record
//! accumulated so far, so a formula may read raw columns and any derived
//! column declared before it. Ratios with a zero divisor are reported as
//! `UndefinedDerivation`; NaN or infinity never reaches the model.

use crate::{
    error::{PreverError, Result},
    schema::{Comparison, DerivedFeatureSpec, Formula},
    validate::{ErrorMap, FieldErrorKind, ValidatedRecord},
};

/// Extend `record` with every derived feature in `specs`
///
/// Evaluation continues after a failure so the caller learns about every
/// undefined feature, including ones that depend on an undefined feature.
///
/// # Errors
///
/// Returns an [`ErrorMap`] keyed by derived feature name, every entry of kind
/// [`FieldErrorKind::UndefinedDerivation`].
pub fn derive(
    mut record: ValidatedRecord,
    specs: &[DerivedFeatureSpec],
) -> std::result::Result<ValidatedRecord, ErrorMap> {
    let mut errors = ErrorMap::new();

    for spec in specs {
        match evaluate(&record, &spec.formula) {
            Ok(value) => record.push(spec.name, value),
            Err(message) => {
                errors.insert(spec.name, FieldErrorKind::UndefinedDerivation, message);
            }
        }
    }

    if errors.is_empty() {
        Ok(record)
    } else {
        Err(errors)
    }
}

fn input(record: &ValidatedRecord, column: &str) -> std::result::Result<f64, String> {
    record
        .get(column)
        .ok_or_else(|| format!("Undefined: depends on undefined feature {column}"))
}

fn evaluate(record: &ValidatedRecord, formula: &Formula) -> std::result::Result<f64, String> {
    let value = match *formula {
        Formula::Ratio {
            numerator,
            denominator,
            offset,
        } => {
            let n = input(record, numerator)?;
            let divisor = input(record, denominator)? + offset;
            if divisor == 0.0 {
                return Err(if offset == 0.0 {
                    format!("Undefined: division by zero ({denominator} is 0)")
                } else {
                    format!("Undefined: division by zero ({denominator} + {offset} is 0)")
                });
            }
            n / divisor
        }
        Formula::Threshold {
            field,
            comparison,
            constant,
        } => {
            let v = input(record, field)?;
            let hit = match comparison {
                Comparison::AtLeast => v >= constant,
                Comparison::Above => v > constant,
            };
            if hit {
                1.0
            } else {
                0.0
            }
        }
        Formula::Product { left, right } => input(record, left)? * input(record, right)?,
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err("Undefined: result is not a finite number".to_string())
    }
}

/// Fixed-order numeric row fed to the transform chain and model
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Project `record` onto `columns`, in that order
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if a column is absent from the record;
    /// registry checks make this unreachable for declared schemas.
    pub fn project(record: &ValidatedRecord, columns: &[&str]) -> Result<Self> {
        columns
            .iter()
            .map(|c| {
                record.get(c).ok_or_else(|| {
                    PreverError::InvalidConfiguration(format!("column '{c}' missing from record"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Values in column order
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}
