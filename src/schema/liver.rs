//! Liver disease vertical

use super::{Comparison, DerivedFeatureSpec, FieldSpec, LabelMap, Vertical, VerticalSchema};

static FIELDS: [FieldSpec; 10] = [
    FieldSpec::ranged("Age", 0.0, 120.0),
    FieldSpec::ranged("Gender", 0.0, 1.0),
    FieldSpec::ranged("BMI", 10.0, 70.0),
    FieldSpec::ranged("AlcoholConsumption", 0.0, 50.0),
    FieldSpec::ranged("Smoking", 0.0, 1.0),
    FieldSpec::ranged("GeneticRisk", 0.0, 2.0),
    FieldSpec::ranged("PhysicalActivity", 0.0, 24.0),
    FieldSpec::ranged("Diabetes", 0.0, 1.0),
    FieldSpec::ranged("Hypertension", 0.0, 1.0),
    FieldSpec::ranged("LiverFunctionTest", 0.0, 200.0),
];

// Units per week
const HEAVY_DRINKING: f64 = 14.0;

static DERIVED: [DerivedFeatureSpec; 3] = [
    DerivedFeatureSpec::ratio_with_offset("BMI_Age_Ratio", "BMI", "Age", 1.0),
    DerivedFeatureSpec::threshold(
        "HeavyDrinker",
        "AlcoholConsumption",
        Comparison::Above,
        HEAVY_DRINKING,
    ),
    DerivedFeatureSpec::product("Risk_Smoke_Alcohol", "Smoking", "AlcoholConsumption"),
];

pub(super) static SCHEMA: VerticalSchema = VerticalSchema {
    vertical: Vertical::Liver,
    fields: &FIELDS,
    derived: &DERIVED,
    feature_columns: &[
        "Age",
        "Gender",
        "BMI",
        "AlcoholConsumption",
        "Smoking",
        "GeneticRisk",
        "PhysicalActivity",
        "Diabetes",
        "Hypertension",
        "LiverFunctionTest",
        "BMI_Age_Ratio",
        "HeavyDrinker",
        "Risk_Smoke_Alcohol",
    ],
    transform_order: &[],
    echo_fields: &[],
    labels: LabelMap::new(&[(0, "Absent"), (1, "Present")]),
    response_key: "prediction",
    result_template: None,
};
