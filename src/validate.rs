//! Input validation: raw submitted values to a typed record
//!
//! Validation runs in two phases and reports every violation it finds:
//!
//! 1. presence and parseability of each declared field
//! 2. domain (range) checks, only if phase 1 found nothing
//!
//! So a request missing `Potassium` is told only about `Potassium`, even if
//! other fields are also out of range.

use std::collections::{BTreeMap, HashMap};

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::schema::{schema_for, FieldSpec, Vertical, VerticalSchema};

/// Message for values that are present but not a finite number
pub const INVALID_NUMERIC: &str = "Invalid numeric value";

// ============================================================================
// Raw input
// ============================================================================

/// One submitted value before validation
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Text as received from a form field or CSV cell
    Text(String),
    /// Already-numeric value (JSON number)
    Number(f64),
}

impl RawValue {
    /// Whether this is text with nothing but whitespace
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, RawValue::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

/// Untyped record: submitted key to raw value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    values: HashMap<String, RawValue>,
}

impl RawRecord {
    /// Empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any earlier value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`RawRecord::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value submitted under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    /// Remove the value under `key`
    pub fn remove(&mut self, key: &str) -> Option<RawValue> {
        self.values.remove(key)
    }

    /// Number of submitted keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was submitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First non-blank value under the field's name or any alias
    fn lookup(&self, field: &FieldSpec) -> Option<&RawValue> {
        field
            .keys()
            .filter_map(|k| self.values.get(k))
            .find(|v| !v.is_blank())
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RawRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let values = map
            .into_iter()
            .filter_map(|(k, v)| {
                let raw = match v {
                    serde_json::Value::Null => return None,
                    serde_json::Value::Number(n) => match n.as_f64() {
                        Some(f) => RawValue::Number(f),
                        None => RawValue::Text(n.to_string()),
                    },
                    serde_json::Value::String(s) => RawValue::Text(s),
                    other => RawValue::Text(other.to_string()),
                };
                Some((k, raw))
            })
            .collect();
        Self { values }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Kind of a per-field problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldErrorKind {
    /// Required field absent or blank
    MissingField,
    /// Present but not a finite number
    InvalidFormat,
    /// Number outside the declared domain
    OutOfRange,
    /// Derived feature could not be computed (e.g. divide by zero)
    UndefinedDerivation,
    /// Request-level failure not tied to a field (`general` entry)
    General,
}

/// One per-field problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// What went wrong
    pub kind: FieldErrorKind,
    /// Message shown to the caller
    pub message: String,
}

/// Field name to problem; serializes as `{field: message}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    entries: BTreeMap<String, FieldError>,
}

impl ErrorMap {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem for `field`; a later entry for the same field wins
    pub fn insert(&mut self, field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) {
        self.entries.insert(
            field.into(),
            FieldError {
                kind,
                message: message.into(),
            },
        );
    }

    /// Problem recorded for `field`
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.entries.get(field)
    }

    /// Message recorded for `field`
    #[must_use]
    pub fn message(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(|e| e.message.as_str())
    }

    /// Number of fields with problems
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no problems were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(field, problem)` in field-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether every entry has `kind`
    #[must_use]
    pub fn all_of_kind(&self, kind: FieldErrorKind) -> bool {
        self.entries.values().all(|e| e.kind == kind)
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, error) in &self.entries {
            map.serialize_entry(field, &error.message)?;
        }
        map.end()
    }
}

// ============================================================================
// Validated output
// ============================================================================

/// Column name to finite value, raw columns first then derived ones
///
/// Constructed only by [`validate`] and extended by feature derivation, so
/// every value in it is finite and every raw value is inside its domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRecord {
    values: Vec<(&'static str, f64)>,
}

impl ValidatedRecord {
    /// Value of `column`
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, v)| *v)
    }

    /// Column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(name, _)| *name)
    }

    /// `(column, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn push(&mut self, column: &'static str, value: f64) {
        debug_assert!(value.is_finite(), "{column} must be finite");
        self.values.push((column, value));
    }
}

// ============================================================================
// Validation
// ============================================================================

enum Parsed {
    Absent,
    Invalid,
    Value(f64),
}

fn parse(raw: Option<&RawValue>) -> Parsed {
    let value = match raw {
        None => return Parsed::Absent,
        Some(RawValue::Number(v)) => *v,
        Some(RawValue::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Parsed::Absent;
            }
            match s.parse::<f64>() {
                Ok(v) => v,
                Err(_) => return Parsed::Invalid,
            }
        }
    };
    if value.is_finite() {
        Parsed::Value(value)
    } else {
        Parsed::Invalid
    }
}

/// Validate `raw` against the fields declared for `vertical`
///
/// # Errors
///
/// Returns a non-empty [`ErrorMap`] listing every missing or unparseable
/// field, or, when all fields parse, every out-of-range field.
pub fn validate(vertical: Vertical, raw: &RawRecord) -> Result<ValidatedRecord, ErrorMap> {
    validate_against(schema_for(vertical), raw)
}

/// Validate `raw` against an explicit schema
///
/// # Errors
///
/// See [`validate`].
pub fn validate_against(
    schema: &VerticalSchema,
    raw: &RawRecord,
) -> Result<ValidatedRecord, ErrorMap> {
    let mut errors = ErrorMap::new();
    let mut parsed: Vec<(&FieldSpec, f64)> = Vec::with_capacity(schema.fields.len());

    // Phase 1: presence and parseability
    for field in schema.fields {
        match parse(raw.lookup(field)) {
            Parsed::Value(v) => parsed.push((field, v)),
            Parsed::Absent if field.required => {
                errors.insert(field.name, FieldErrorKind::MissingField, field.missing_message());
            }
            Parsed::Absent => {}
            Parsed::Invalid => {
                errors.insert(field.name, FieldErrorKind::InvalidFormat, INVALID_NUMERIC);
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    // Phase 2: domains
    for (field, value) in &parsed {
        if !field.domain.contains(*value) {
            errors.insert(field.name, FieldErrorKind::OutOfRange, field.range_message());
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut record = ValidatedRecord::default();
    for (field, value) in parsed {
        record.push(field.column, value);
    }
    Ok(record)
}
