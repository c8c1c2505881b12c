//! Label decoding and response assembly
//!
//! The numeric model output is mapped through the vertical's [`LabelMap`];
//! anything that is not an integral, mapped code is an `UnknownLabel` failure,
//! never a fallback category. Successful results echo the configured raw
//! fields rounded half-to-even at two decimals.
//!
//! [`LabelMap`]: crate::schema::LabelMap

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    pipeline::{Outcome, PredictionError},
    schema::VerticalSchema,
    validate::ValidatedRecord,
};

/// Decimal places kept on echoed fields
pub const ECHO_DECIMALS: i32 = 2;

/// Round half-to-even at [`ECHO_DECIMALS`] places
#[must_use]
pub fn round_echo(value: f64) -> f64 {
    let factor = 10f64.powi(ECHO_DECIMALS);
    (value * factor).round_ties_even() / factor
}

/// A decoded, successful prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// JSON key carrying the category
    pub response_key: &'static str,
    /// Decoded category
    pub category: &'static str,
    /// Numeric label the model produced
    pub code: i64,
    /// Human-readable sentence, for verticals that define one
    pub result: Option<String>,
    /// `(field name, rounded value)` pairs echoed back to the caller
    pub echoed: Vec<(&'static str, f64)>,
}

impl Prediction {
    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("success", &true)?;
        map.serialize_entry(self.response_key, self.category)?;
        map.serialize_entry("prediction_code", &self.code)?;
        if let Some(result) = &self.result {
            map.serialize_entry("result", result)?;
        }
        for (field, value) in &self.echoed {
            map.serialize_entry(field, value)?;
        }
        Ok(())
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

/// Convert a model output to a label code, if it is an exact integer
#[allow(clippy::cast_possible_truncation)]
fn label_code(label: f64) -> Option<i64> {
    // 2^53: beyond this not every integer is representable
    const EXACT: f64 = 9_007_199_254_740_992.0;
    (label.is_finite() && label.fract() == 0.0 && label.abs() <= EXACT).then(|| label as i64)
}

/// Decode `label` for `schema` and build the success payload from `record`
///
/// # Errors
///
/// Returns [`PredictionError::UnknownLabel`] if `label` is not integral or is
/// absent from the label map.
pub fn decode(
    schema: &VerticalSchema,
    label: f64,
    record: &ValidatedRecord,
) -> Result<Prediction, PredictionError> {
    let (code, category) = label_code(label)
        .and_then(|code| schema.labels.get(code).map(|category| (code, category)))
        .ok_or(PredictionError::UnknownLabel { label })?;

    let echoed = schema
        .echo_fields
        .iter()
        .filter_map(|name| {
            let field = schema.field(name)?;
            record.get(field.column).map(|v| (field.name, round_echo(v)))
        })
        .collect();

    Ok(Prediction {
        response_key: schema.response_key,
        category,
        code,
        result: schema.result_template.map(|t| t.replacen("{}", category, 1)),
        echoed,
    })
}

/// Outcome of one record: a prediction or the failure that ended it
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    /// Reached `Completed`
    Success(Prediction),
    /// Ended in one of the failure outcomes
    Failure(PredictionError),
}

impl PredictionResult {
    /// Whether the record completed
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    /// Terminal outcome of the record
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            PredictionResult::Success(_) => Outcome::Completed,
            PredictionResult::Failure(err) => err.outcome(),
        }
    }

    /// HTTP status code for a single-record response
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PredictionResult::Success(_) => 200,
            PredictionResult::Failure(err) => err.status_code(),
        }
    }

    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match self {
            PredictionResult::Success(p) => p.serialize_entries(map),
            PredictionResult::Failure(e) => e.serialize_entries(map),
        }
    }
}

impl From<Result<Prediction, PredictionError>> for PredictionResult {
    fn from(result: Result<Prediction, PredictionError>) -> Self {
        match result {
            Ok(p) => PredictionResult::Success(p),
            Err(e) => PredictionResult::Failure(e),
        }
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::derive,
        schema::{schema_for, Vertical},
        validate::{validate, RawRecord},
    };

    fn diabetes_record() -> ValidatedRecord {
        let raw = RawRecord::new()
            .with("AGE", "50")
            .with("Urea", "4.125")
            .with("Cr", "46")
            .with("HbA1c", "4.9")
            .with("Chol", "4.2")
            .with("TG", "0.9")
            .with("HDL", "2.4")
            .with("LDL", "1.4")
            .with("VLDL", "0.5")
            .with("BMI", "24.456");
        let record = validate(Vertical::Diabetes, &raw).expect("test");
        derive(record, schema_for(Vertical::Diabetes).derived).expect("test")
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_echo(4.125), 4.12);
        assert_eq!(round_echo(0.375), 0.38);
        assert_eq!(round_echo(24.456), 24.46);
        assert_eq!(round_echo(-1.005), -1.0);
    }

    #[test]
    fn test_decode_diabetes_echoes_raw_fields() {
        let prediction =
            decode(schema_for(Vertical::Diabetes), 2.0, &diabetes_record()).expect("test");
        assert_eq!(prediction.category, "Prediabetic");
        assert_eq!(prediction.echoed.len(), 10);
        let json = serde_json::to_value(&prediction).expect("test");
        assert_eq!(json["success"], true);
        assert_eq!(json["Diagnosis_Result"], "Prediabetic");
        assert_eq!(json["prediction_code"], 2);
        assert_eq!(json["Urea"], 4.12);
        assert_eq!(json["BMI"], 24.46);
        assert!(json.get("TG_HDL").is_none());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_crop_result_sentence() {
        let raw = RawRecord::new()
            .with("Nitrogen", "90")
            .with("Phosporus", "42")
            .with("Potassium", "43")
            .with("Temperature", "20.8")
            .with("Humidity", "82")
            .with("pH", "6.5")
            .with("Rainfall", "202.9");
        let record = validate(Vertical::Crop, &raw).expect("test");
        let prediction = decode(schema_for(Vertical::Crop), 1.0, &record).expect("test");
        assert_eq!(prediction.category, "Rice");
        assert_eq!(
            prediction.result.as_deref(),
            Some("Rice is the best crop to be cultivated with these conditions")
        );
        assert!(prediction.echoed.is_empty());
    }

    #[test]
    fn test_unknown_labels() {
        let schema = schema_for(Vertical::Diabetes);
        let record = diabetes_record();
        for label in [3.0, -1.0, 1.5, f64::NAN, 1e300] {
            let err = decode(schema, label, &record).expect_err("test");
            assert!(matches!(err, PredictionError::UnknownLabel { .. }), "{label}");
        }
    }

    #[test]
    fn test_failure_result_serialization() {
        let result = PredictionResult::Failure(PredictionError::UnknownLabel { label: 9.0 });
        assert_eq!(result.outcome(), Outcome::DecodeFailed);
        assert_eq!(result.status_code(), 400);
        let json = serde_json::to_value(&result).expect("test");
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "UnknownLabel");
        assert_eq!(json["errors"]["general"], "Could not determine result");
    }
}
