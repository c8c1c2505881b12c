//! Crop recommendation vertical
//!
//! Seven soil and weather readings, no derived features. The fitted chain is
//! min-max scaling followed by standardization.

use super::{Domain, FieldSpec, LabelMap, Vertical, VerticalSchema};
use crate::transform::TransformKind;

const fn soil(name: &'static str, column: &'static str, label: &'static str, max: f64) -> FieldSpec {
    FieldSpec {
        name,
        column,
        label,
        aliases: &[],
        domain: Domain::Range { min: 0.0, max },
        unit: " ppm",
        required: true,
    }
}

static FIELDS: [FieldSpec; 7] = [
    soil("Nitrogen", "N", "Nitrogen", 140.0),
    FieldSpec {
        aliases: &["Phosphorus"],
        ..soil("Phosporus", "P", "Phosphorus", 145.0)
    },
    soil("Potassium", "K", "Potassium", 205.0),
    FieldSpec {
        name: "Temperature",
        column: "temperature",
        label: "Temperature",
        aliases: &[],
        domain: Domain::Range {
            min: -10.0,
            max: 50.0,
        },
        unit: " °C",
        required: true,
    },
    FieldSpec {
        name: "Humidity",
        column: "humidity",
        label: "Humidity",
        aliases: &[],
        domain: Domain::Range {
            min: 0.0,
            max: 100.0,
        },
        unit: "%",
        required: true,
    },
    FieldSpec {
        name: "pH",
        column: "ph",
        label: "Soil pH",
        aliases: &[],
        domain: Domain::Range { min: 0.0, max: 14.0 },
        unit: "",
        required: true,
    },
    FieldSpec {
        name: "Rainfall",
        column: "rainfall",
        label: "Rainfall",
        aliases: &[],
        domain: Domain::NonNegative,
        unit: " mm",
        required: true,
    },
];

static LABELS: [(i64, &str); 22] = [
    (1, "Rice"),
    (2, "Maize"),
    (3, "Jute"),
    (4, "Cotton"),
    (5, "Coconut"),
    (6, "Papaya"),
    (7, "Orange"),
    (8, "Apple"),
    (9, "Muskmelon"),
    (10, "Watermelon"),
    (11, "Grapes"),
    (12, "Mango"),
    (13, "Banana"),
    (14, "Pomegranate"),
    (15, "Lentil"),
    (16, "Blackgram"),
    (17, "Mungbean"),
    (18, "Mothbeans"),
    (19, "Pigeonpeas"),
    (20, "Kidneybeans"),
    (21, "Chickpea"),
    (22, "Coffee"),
];

pub(super) static SCHEMA: VerticalSchema = VerticalSchema {
    vertical: Vertical::Crop,
    fields: &FIELDS,
    derived: &[],
    feature_columns: &["N", "P", "K", "temperature", "humidity", "ph", "rainfall"],
    transform_order: &[TransformKind::MinMax, TransformKind::Standard],
    echo_fields: &[],
    labels: LabelMap::new(&LABELS),
    response_key: "crop",
    result_template: Some("{} is the best crop to be cultivated with these conditions"),
};
