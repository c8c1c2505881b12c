//! Schema registry: per-vertical field declarations
//!
//! Each vertical declares, at compile time, the raw fields it accepts, the
//! derived features it computes, the exact column order its fitted artifacts
//! expect, and the label map used to decode model output. Everything here is
//! immutable; a malformed declaration is caught by [`VerticalSchema::check`]
//! when the registry is built, never per request.
//!
//! ## Example
//!
//! ```rust
//! use prever::schema::{fields_for, Vertical};
//!
//! let fields = fields_for(Vertical::Crop);
//! assert_eq!(fields[0].name, "Nitrogen");
//! assert_eq!(fields[0].column, "N");
//! ```

mod crop;
mod diabetes;
mod liver;

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{
    error::{PreverError, Result},
    transform::TransformKind,
};

// ============================================================================
// Vertical
// ============================================================================

/// One independently configured prediction domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    /// Crop recommendation from soil chemistry and weather
    Crop,
    /// Diabetes classification from a blood panel
    Diabetes,
    /// Liver disease risk from lifestyle and clinical factors
    Liver,
}

impl Vertical {
    /// Every supported vertical, in registry order
    pub const ALL: [Vertical; 3] = [Vertical::Crop, Vertical::Diabetes, Vertical::Liver];

    /// Stable lowercase identifier used in URLs and artifact file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Vertical::Crop => "crop",
            Vertical::Diabetes => "diabetes",
            Vertical::Liver => "liver",
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vertical {
    type Err = PreverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(Vertical::Crop),
            "diabetes" => Ok(Vertical::Diabetes),
            "liver" => Ok(Vertical::Liver),
            other => Err(PreverError::UnknownVertical(other.to_string())),
        }
    }
}

// ============================================================================
// Field and derived-feature declarations
// ============================================================================

/// Valid numeric domain of a raw field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// Inclusive bounds `[min, max]`
    Range {
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },
    /// Any value `>= 0`
    NonNegative,
}

impl Domain {
    /// Whether `value` lies inside the domain (bounds are inclusive)
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Domain::Range { min, max } => (min..=max).contains(&value),
            Domain::NonNegative => value >= 0.0,
        }
    }
}

/// Declaration of one raw input column
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    /// Key the caller submits (form field name or CSV header)
    pub name: &'static str,
    /// Column name the fitted artifacts were trained with
    pub column: &'static str,
    /// Human-readable name used in "is required" messages
    pub label: &'static str,
    /// Alternative submission keys accepted for this field
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub aliases: &'static [&'static str],
    /// Valid numeric domain
    pub domain: Domain,
    /// Unit suffix appended to range messages (e.g. `" ppm"`, `"%"`)
    #[serde(skip)]
    pub unit: &'static str,
    /// Whether the field must be present
    pub required: bool,
}

impl FieldSpec {
    /// Required field whose key, column and label are all `name`
    pub(crate) const fn ranged(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            column: name,
            label: name,
            aliases: &[],
            domain: Domain::Range { min, max },
            unit: "",
            required: true,
        }
    }

    /// Every key this field may be submitted under, primary name first
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// Message reported when the field is absent
    #[must_use]
    pub fn missing_message(&self) -> String {
        format!("{} is required.", self.label)
    }

    /// Message reported when the value falls outside the domain
    #[must_use]
    pub fn range_message(&self) -> String {
        match self.domain {
            Domain::Range { min, max } => {
                format!("Value must be between {min} and {max}{}.", self.unit)
            }
            Domain::NonNegative => "Value cannot be negative.".to_string(),
        }
    }
}

/// How a threshold indicator compares its input to the constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value >= constant`
    AtLeast,
    /// `value > constant`
    Above,
}

/// Formula computing a derived column from already-available columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum Formula {
    /// `numerator / (denominator + offset)`; undefined when the divisor is zero
    Ratio {
        /// Dividend column
        numerator: &'static str,
        /// Divisor column
        denominator: &'static str,
        /// Constant added to the divisor before dividing
        offset: f64,
    },
    /// 0/1 indicator comparing a column to a fixed constant
    Threshold {
        /// Compared column
        field: &'static str,
        /// Comparison operator
        comparison: Comparison,
        /// Domain constant
        constant: f64,
    },
    /// Product of two columns
    Product {
        /// First factor
        left: &'static str,
        /// Second factor
        right: &'static str,
    },
}

impl Formula {
    /// Columns this formula reads
    #[must_use]
    pub fn inputs(&self) -> Vec<&'static str> {
        match *self {
            Formula::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator, denominator],
            Formula::Threshold { field, .. } => vec![field],
            Formula::Product { left, right } => vec![left, right],
        }
    }
}

/// Declaration of one derived column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedFeatureSpec {
    /// Column name of the derived feature
    pub name: &'static str,
    /// Formula over raw/derived columns
    pub formula: Formula,
}

impl DerivedFeatureSpec {
    pub(crate) const fn ratio(
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
    ) -> Self {
        Self::ratio_with_offset(name, numerator, denominator, 0.0)
    }

    pub(crate) const fn ratio_with_offset(
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
        offset: f64,
    ) -> Self {
        Self {
            name,
            formula: Formula::Ratio {
                numerator,
                denominator,
                offset,
            },
        }
    }

    pub(crate) const fn threshold(
        name: &'static str,
        field: &'static str,
        comparison: Comparison,
        constant: f64,
    ) -> Self {
        Self {
            name,
            formula: Formula::Threshold {
                field,
                comparison,
                constant,
            },
        }
    }

    pub(crate) const fn product(name: &'static str, left: &'static str, right: &'static str) -> Self {
        Self {
            name,
            formula: Formula::Product { left, right },
        }
    }
}

// ============================================================================
// Label map
// ============================================================================

/// Static numeric-label to category lookup
#[derive(Debug, Clone, Copy)]
pub struct LabelMap(&'static [(i64, &'static str)]);

impl LabelMap {
    /// Wrap a static table
    #[must_use]
    pub const fn new(entries: &'static [(i64, &'static str)]) -> Self {
        Self(entries)
    }

    /// Category for `code`, if mapped
    #[must_use]
    pub fn get(&self, code: i64) -> Option<&'static str> {
        self.0.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
    }

    /// Whether `code` is mapped
    #[must_use]
    pub fn contains(&self, code: i64) -> bool {
        self.get(code).is_some()
    }

    /// All `(code, category)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &'static str)> + '_ {
        self.0.iter().copied()
    }

    /// Number of categories
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no categories
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Vertical schema
// ============================================================================

/// Complete static configuration of one vertical's pipeline
#[derive(Debug)]
pub struct VerticalSchema {
    /// Which vertical this describes
    pub vertical: Vertical,
    /// Raw input fields, in submission order
    pub fields: &'static [FieldSpec],
    /// Derived features, ordered so dependencies come first
    pub derived: &'static [DerivedFeatureSpec],
    /// Column order the fitted artifacts expect
    pub feature_columns: &'static [&'static str],
    /// Transform kinds in the order they were fitted
    pub transform_order: &'static [TransformKind],
    /// Field names echoed back (rounded) on success
    pub echo_fields: &'static [&'static str],
    /// Numeric label to category
    pub labels: LabelMap,
    /// JSON key carrying the decoded category
    pub response_key: &'static str,
    /// Optional sentence template; `{}` is replaced by the category
    pub result_template: Option<&'static str>,
}

impl VerticalSchema {
    /// Field declaration by submission key or alias
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.keys().any(|k| k == key))
    }

    /// Feature column names as owned strings (for artifact comparison)
    #[must_use]
    pub fn feature_column_names(&self) -> Vec<String> {
        self.feature_columns.iter().map(ToString::to_string).collect()
    }

    /// Verify the declaration is self-consistent
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a derived feature reads a column that
    /// is not yet available, a feature column cannot be resolved, an echo field
    /// is undeclared, or the label map has duplicate codes.
    pub fn check(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(PreverError::InvalidConfiguration(format!(
                "{} schema: {reason}",
                self.vertical
            )))
        };

        let mut available: Vec<&str> = self.fields.iter().map(|f| f.column).collect();
        for spec in self.derived {
            for input in spec.formula.inputs() {
                if !available.contains(&input) {
                    return fail(format!(
                        "derived feature '{}' reads '{input}' before it is available",
                        spec.name
                    ));
                }
            }
            if available.contains(&spec.name) {
                return fail(format!("column '{}' declared twice", spec.name));
            }
            available.push(spec.name);
        }

        for column in self.feature_columns {
            if !available.contains(column) {
                return fail(format!("feature column '{column}' is never produced"));
            }
        }

        for name in self.echo_fields {
            if self.field(name).is_none() {
                return fail(format!("echo field '{name}' is not a declared field"));
            }
        }

        let codes: Vec<i64> = self.labels.iter().map(|(c, _)| c).collect();
        for (i, code) in codes.iter().enumerate() {
            if codes[..i].contains(code) {
                return fail(format!("label code {code} mapped twice"));
            }
        }

        Ok(())
    }
}

/// Full schema of `vertical`
#[must_use]
pub fn schema_for(vertical: Vertical) -> &'static VerticalSchema {
    match vertical {
        Vertical::Crop => &crop::SCHEMA,
        Vertical::Diabetes => &diabetes::SCHEMA,
        Vertical::Liver => &liver::SCHEMA,
    }
}

/// Raw fields of `vertical`, in declaration order
#[must_use]
pub fn fields_for(vertical: Vertical) -> &'static [FieldSpec] {
    schema_for(vertical).fields
}

/// Derived features of `vertical`, dependencies first
#[must_use]
pub fn derived_features_for(vertical: Vertical) -> &'static [DerivedFeatureSpec] {
    schema_for(vertical).derived
}
