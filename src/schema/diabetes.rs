//! Diabetes classification vertical
//!
//! Ten blood-panel and body measurements plus seven engineered columns:
//! three lipid ratios over HDL, two clinical threshold flags and two
//! interaction products.

use super::{Comparison, DerivedFeatureSpec, FieldSpec, LabelMap, Vertical, VerticalSchema};
use crate::transform::TransformKind;

static FIELDS: [FieldSpec; 10] = [
    FieldSpec::ranged("AGE", 0.0, 120.0),
    FieldSpec::ranged("Urea", 0.0, 100.0),
    FieldSpec::ranged("Cr", 0.0, 1000.0),
    FieldSpec::ranged("HbA1c", 0.0, 20.0),
    FieldSpec::ranged("Chol", 0.0, 20.0),
    FieldSpec::ranged("TG", 0.0, 20.0),
    FieldSpec::ranged("HDL", 0.0, 10.0),
    FieldSpec::ranged("LDL", 0.0, 10.0),
    FieldSpec::ranged("VLDL", 0.0, 50.0),
    FieldSpec::ranged("BMI", 10.0, 70.0),
];

/// BMI at or above which a patient counts as obese
const OBESITY_BMI: f64 = 30.0;

/// HbA1c (%) at or above which the diabetic threshold is met
const DIABETIC_HBA1C: f64 = 6.5;

static DERIVED: [DerivedFeatureSpec; 7] = [
    DerivedFeatureSpec::ratio("TG_HDL", "TG", "HDL"),
    DerivedFeatureSpec::ratio("LDL_HDL", "LDL", "HDL"),
    DerivedFeatureSpec::ratio("Chol_HDL", "Chol", "HDL"),
    DerivedFeatureSpec::threshold("Obese", "BMI", Comparison::AtLeast, OBESITY_BMI),
    DerivedFeatureSpec::threshold("High_HbA1c", "HbA1c", Comparison::AtLeast, DIABETIC_HBA1C),
    DerivedFeatureSpec::product("Age_BMI", "AGE", "BMI"),
    DerivedFeatureSpec::product("HbA1c_Chol", "HbA1c", "Chol"),
];

static RAW_COLUMNS: [&str; 10] = [
    "AGE", "Urea", "Cr", "HbA1c", "Chol", "TG", "HDL", "LDL", "VLDL", "BMI",
];

pub(super) static SCHEMA: VerticalSchema = VerticalSchema {
    vertical: Vertical::Diabetes,
    fields: &FIELDS,
    derived: &DERIVED,
    feature_columns: &[
        "AGE", "Urea", "Cr", "HbA1c", "Chol", "TG", "HDL", "LDL", "VLDL", "BMI", "TG_HDL",
        "LDL_HDL", "Chol_HDL", "Obese", "High_HbA1c", "Age_BMI", "HbA1c_Chol",
    ],
    transform_order: &[TransformKind::Standard],
    echo_fields: &RAW_COLUMNS,
    labels: LabelMap::new(&[(0, "Non-diabetic"), (1, "Diabetic"), (2, "Prediabetic")]),
    response_key: "Diagnosis_Result",
    result_template: None,
};
