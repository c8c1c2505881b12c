//! CSV batch ingestion
//!
//! A batch is a CSV file with a header row. Headers are matched against each
//! field's submission key or aliases after trimming. Whole-batch checks
//! (readable CSV, every required column present, row limit) run before any
//! row is predicted; after that each row succeeds or fails on its own.

use serde::{ser::SerializeMap, Serialize, Serializer};
use thiserror::Error;

use crate::{
    decode::PredictionResult,
    pipeline::Pipeline,
    schema::VerticalSchema,
    validate::RawRecord,
};

/// Reason a whole batch was rejected before any row ran
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Required columns are absent from the header row
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The file has a header but no data rows
    #[error("CSV file has no data rows.")]
    NoRows,

    /// More rows than the configured limit
    #[error("Too many rows: the limit is {limit}.")]
    TooManyRows {
        /// Configured maximum
        limit: usize,
    },

    /// The file is not readable CSV
    #[error("Could not read CSV: {0}")]
    Malformed(String),
}

impl Serialize for BatchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("success", &false)?;
        map.serialize_entry("error_kind", "BatchRejected")?;
        map.serialize_entry("errors", &serde_json::json!({ "general": self.to_string() }))?;
        map.end()
    }
}

impl From<csv::Error> for BatchError {
    fn from(err: csv::Error) -> Self {
        BatchError::Malformed(err.to_string())
    }
}

/// Parse CSV bytes into one raw record per data row
///
/// # Errors
///
/// Returns a [`BatchError`] when the file is unreadable, lacks a required
/// column, has no rows, or exceeds `max_rows`.
pub fn parse_csv(
    schema: &VerticalSchema,
    bytes: &[u8],
    max_rows: usize,
) -> Result<Vec<RawRecord>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let missing: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.required && !f.keys().any(|k| headers.iter().any(|h| h == k)))
        .map(|f| f.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(BatchError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if rows.len() == max_rows {
            return Err(BatchError::TooManyRows { limit: max_rows });
        }
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect::<RawRecord>(),
        );
    }
    if rows.is_empty() {
        return Err(BatchError::NoRows);
    }
    Ok(rows)
}

/// Per-row results of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One result per data row, in file order
    pub results: Vec<PredictionResult>,
}

impl BatchReport {
    /// Number of rows processed
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.results.len()
    }

    /// Rows that completed
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Rows that ended in a failure outcome
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total_rows() - self.succeeded()
    }
}

struct Row<'a>(usize, &'a PredictionResult);

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("row", &self.0)?;
        self.1.serialize_entries(&mut map)?;
        map.end()
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Row<'_>> = self
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| Row(i + 1, r))
            .collect();
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("success", &true)?;
        map.serialize_entry("total_rows", &self.total_rows())?;
        map.serialize_entry("succeeded", &self.succeeded())?;
        map.serialize_entry("failed", &self.failed())?;
        map.serialize_entry("results", &rows)?;
        map.end()
    }
}

/// Parse `bytes` and run every row through `pipeline`
///
/// # Errors
///
/// See [`parse_csv`].
pub fn run_csv(
    pipeline: &Pipeline,
    bytes: &[u8],
    max_rows: usize,
) -> Result<BatchReport, BatchError> {
    let rows = parse_csv(pipeline.schema(), bytes, max_rows)?;
    Ok(BatchReport {
        results: pipeline.run_batch(&rows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        demo,
        pipeline::Outcome,
        schema::{schema_for, Vertical},
    };

    const DIABETES_CSV: &str = "\
AGE, Urea, Cr, HbA1c, Chol, TG, HDL, LDL, VLDL, BMI
50,4.7,46,4.9,4.2,0.9,2.4,1.4,0.5,24
55,5.3,72,8.9,5.0,2.4,0,2.6,2.0,30.8
";

    fn diabetes() -> Pipeline {
        demo::bundle(Vertical::Diabetes)
            .expect("test")
            .into_pipeline(Vertical::Diabetes)
            .expect("test")
    }

    #[test]
    fn test_second_row_failure_keeps_first() {
        let report = run_csv(&diabetes(), DIABETES_CSV.as_bytes(), 100).expect("test");
        assert_eq!(report.total_rows(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.results[1].outcome(), Outcome::DerivationFailed);

        let json = serde_json::to_value(&report).expect("test");
        assert_eq!(json["results"][0]["row"], 1);
        assert_eq!(json["results"][0]["success"], true);
        assert_eq!(json["results"][1]["row"], 2);
        assert_eq!(json["results"][1]["error_kind"], "UndefinedDerivation");
        assert!(json["results"][1]["errors"]["TG_HDL"].is_string());
    }

    #[test]
    fn test_missing_columns_reject_whole_batch() {
        let csv = "AGE,Urea\n50,4.7\n";
        let err = parse_csv(schema_for(Vertical::Diabetes), csv.as_bytes(), 100).expect_err("test");
        let BatchError::MissingColumns(columns) = &err else {
            panic!("expected MissingColumns, got {err:?}");
        };
        assert_eq!(columns.len(), 8);
        assert!(err.to_string().starts_with("Missing columns: Cr, HbA1c"));
    }

    #[test]
    fn test_alias_header_accepted() {
        let csv = "Nitrogen,Phosphorus,Potassium,Temperature,Humidity,pH,Rainfall\n90,42,43,20.8,82,6.5,202.9\n";
        let rows = parse_csv(schema_for(Vertical::Crop), csv.as_bytes(), 10).expect("test");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_row_limit() {
        let err = parse_csv(schema_for(Vertical::Diabetes), DIABETES_CSV.as_bytes(), 1)
            .expect_err("test");
        assert_eq!(err, BatchError::TooManyRows { limit: 1 });
    }

    #[test]
    fn test_header_only() {
        let csv = DIABETES_CSV.lines().next().expect("test");
        let err = parse_csv(schema_for(Vertical::Diabetes), csv.as_bytes(), 10).expect_err("test");
        assert_eq!(err, BatchError::NoRows);
    }

    #[test]
    fn test_short_row_reports_missing_fields() {
        let csv = "AGE,Urea,Cr,HbA1c,Chol,TG,HDL,LDL,VLDL,BMI\n50,4.7,46\n";
        let report = run_csv(&diabetes(), csv.as_bytes(), 10).expect("test");
        let PredictionResult::Failure(err) = &report.results[0] else {
            panic!("expected failure");
        };
        assert_eq!(err.error_kind(), "MissingField");
        assert_eq!(err.errors().len(), 7);
    }

    #[test]
    fn test_batch_error_body() {
        let json = serde_json::to_value(BatchError::NoRows).expect("test");
        assert_eq!(json["errors"]["general"], "CSV file has no data rows.");
        assert_eq!(json["success"], false);
    }
}
