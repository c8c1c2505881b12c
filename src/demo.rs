//! Reference artifact bundles
//!
//! Small, self-contained fitted artifacts for every vertical, used by
//! `prever serve --demo`, `prever export-demo` and the test suites. The
//! scaler statistics are the published summary statistics of the public
//! training sets; the classifiers are nearest-centroid models over per-class
//! means (crop, diabetes) and a three-tree ensemble (liver).
//!
//! A nearest-centroid classifier is linear: for centroid `c`,
//! `argmin |x - c|^2 = argmax (2c·x - |c|^2)`, so it is exported as a
//! `linear` model with `coef = 2c` and `intercept = -|c|^2` in transformed
//! space.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    artifact::{bundle_path, ArtifactBundle, ModelArtifact, TransformArtifact, TreeArtifact, FORMAT_VERSION},
    error::{PreverError, Result},
    features::{derive, FeatureVector},
    model::TreeNode,
    schema::{schema_for, Vertical},
    transform::TransformChain,
    validate::{validate_against, RawRecord},
};

// ============================================================================
// Crop
// ============================================================================

/// Per-column (min, max) of the crop training set
const CROP_RANGE: [(f64, f64); 7] = [
    (0.0, 140.0),
    (5.0, 145.0),
    (5.0, 205.0),
    (8.83, 43.68),
    (14.26, 99.98),
    (3.50, 9.94),
    (20.21, 298.56),
];

/// Per-column (mean, std) of the crop training set, raw units
const CROP_MOMENTS: [(f64, f64); 7] = [
    (50.55, 36.92),
    (53.36, 32.99),
    (48.15, 50.65),
    (25.62, 5.06),
    (71.48, 22.26),
    (6.47, 0.77),
    (103.46, 54.96),
];

/// Per-crop means: N, P, K, temperature, humidity, ph, rainfall
const CROP_CENTROIDS: [(i64, [f64; 7]); 22] = [
    (1, [79.89, 47.58, 39.87, 23.69, 82.27, 6.43, 236.18]),
    (2, [77.76, 48.44, 19.79, 22.39, 65.09, 6.25, 84.77]),
    (3, [78.40, 46.86, 39.99, 24.96, 79.64, 6.73, 174.79]),
    (4, [117.77, 46.24, 19.56, 23.99, 79.84, 6.91, 80.40]),
    (5, [21.98, 16.93, 30.59, 27.41, 94.84, 5.98, 175.69]),
    (6, [49.88, 59.05, 50.04, 33.72, 92.40, 6.74, 142.63]),
    (7, [19.58, 16.55, 10.01, 22.77, 92.17, 7.02, 110.47]),
    (8, [20.80, 134.22, 199.89, 22.63, 92.33, 5.93, 112.65]),
    (9, [100.32, 17.72, 50.08, 28.66, 92.34, 6.36, 24.69]),
    (10, [99.42, 17.00, 50.22, 25.59, 85.16, 6.50, 50.79]),
    (11, [23.18, 132.53, 200.11, 23.85, 81.88, 6.03, 69.61]),
    (12, [20.07, 27.18, 29.92, 31.21, 50.16, 5.77, 94.70]),
    (13, [100.23, 82.01, 50.05, 27.38, 80.36, 5.98, 104.63]),
    (14, [18.87, 18.75, 40.21, 21.84, 90.13, 6.43, 107.53]),
    (15, [18.77, 68.36, 19.41, 24.51, 64.80, 6.93, 45.68]),
    (16, [40.02, 67.47, 19.24, 29.97, 65.12, 7.13, 67.88]),
    (17, [20.99, 47.28, 19.87, 28.53, 85.50, 6.72, 48.40]),
    (18, [21.44, 48.01, 20.23, 28.19, 53.16, 6.83, 51.20]),
    (19, [20.73, 67.73, 20.29, 27.74, 48.06, 5.79, 149.46]),
    (20, [20.75, 67.54, 20.05, 20.12, 21.61, 5.75, 105.92]),
    (21, [40.09, 67.79, 79.92, 18.87, 16.86, 7.34, 80.06]),
    (22, [101.20, 28.74, 29.94, 25.54, 58.87, 6.79, 158.07]),
];

fn crop_transforms(columns: &[String]) -> Vec<TransformArtifact> {
    // The standard scaler was fitted after min-max scaling, so its moments
    // live in min-max space
    let span = |(lo, hi): (f64, f64)| hi - lo;
    let mean = CROP_MOMENTS
        .iter()
        .zip(CROP_RANGE)
        .map(|((m, _), range)| (m - range.0) / span(range))
        .collect();
    let scale = CROP_MOMENTS
        .iter()
        .zip(CROP_RANGE)
        .map(|((_, s), range)| s / span(range))
        .collect();
    vec![
        TransformArtifact::MinMax {
            feature_names: columns.to_vec(),
            data_min: CROP_RANGE.iter().map(|r| r.0).collect(),
            data_max: CROP_RANGE.iter().map(|r| r.1).collect(),
            feature_range: [0.0, 1.0],
        },
        TransformArtifact::Standard {
            feature_names: columns.to_vec(),
            mean,
            scale,
            with_mean: true,
            with_std: true,
        },
    ]
}

// ============================================================================
// Diabetes
// ============================================================================

/// Per-column (mean, std): 10 raw columns then 7 derived
const DIABETES_MOMENTS: [(f64, f64); 17] = [
    (53.5, 8.8),
    (5.1, 2.9),
    (68.9, 59.98),
    (8.28, 2.53),
    (4.86, 1.30),
    (2.35, 1.40),
    (1.20, 0.66),
    (2.61, 1.12),
    (1.85, 3.66),
    (29.58, 4.96),
    (2.3, 1.9),
    (2.5, 1.5),
    (4.6, 2.0),
    (0.55, 0.5),
    (0.75, 0.43),
    (1590.0, 380.0),
    (40.0, 17.0),
];

/// Per-class means of the raw fields: AGE, Urea, Cr, HbA1c, Chol, TG, HDL, LDL, VLDL, BMI
const DIABETES_CENTROIDS: [(i64, [f64; 10]); 3] = [
    (0, [44.0, 4.6, 62.0, 4.6, 4.3, 1.6, 1.2, 2.6, 0.9, 22.4]),
    (1, [55.0, 5.3, 72.0, 8.9, 5.0, 2.4, 1.2, 2.6, 2.0, 30.8]),
    (2, [43.0, 4.5, 60.0, 6.0, 4.6, 2.1, 1.1, 2.7, 0.9, 23.9]),
];

fn diabetes_transforms(columns: &[String]) -> Vec<TransformArtifact> {
    vec![TransformArtifact::Standard {
        feature_names: columns.to_vec(),
        mean: DIABETES_MOMENTS.iter().map(|m| m.0).collect(),
        scale: DIABETES_MOMENTS.iter().map(|m| m.1).collect(),
        with_mean: true,
        with_std: true,
    }]
}

// ============================================================================
// Liver
// ============================================================================

fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
    TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    }
}

fn leaf(absent: f64, present: f64) -> TreeNode {
    TreeNode::Leaf {
        value: vec![absent, present],
    }
}

fn liver_model(columns: &[String]) -> Result<ModelArtifact> {
    let index = |name: &str| {
        columns.iter().position(|c| c == name).ok_or_else(|| {
            PreverError::InvalidConfiguration(format!("liver column '{name}' not declared"))
        })
    };
    let lft = index("LiverFunctionTest")?;
    let alcohol = index("AlcoholConsumption")?;
    let genetic = index("GeneticRisk")?;
    let bmi_age = index("BMI_Age_Ratio")?;
    let smoke_alcohol = index("Risk_Smoke_Alcohol")?;

    let trees = vec![
        vec![
            split(lft, 60.0, 1, 4),
            split(alcohol, 14.0, 2, 3),
            leaf(8.0, 2.0),
            leaf(2.0, 8.0),
            leaf(1.0, 9.0),
        ],
        vec![
            split(genetic, 1.5, 1, 4),
            split(bmi_age, 0.9, 2, 3),
            leaf(7.0, 3.0),
            leaf(4.0, 6.0),
            leaf(2.0, 8.0),
        ],
        vec![split(smoke_alcohol, 10.0, 1, 2), leaf(9.0, 1.0), leaf(3.0, 7.0)],
    ];

    Ok(ModelArtifact::TreeEnsemble {
        feature_names: columns.to_vec(),
        classes: vec![0, 1],
        trees: trees.into_iter().map(|nodes| TreeArtifact { nodes }).collect(),
    })
}

// ============================================================================
// Assembly
// ============================================================================

/// Push raw centroid values through validation, derivation and `transforms`
fn transformed_point(
    vertical: Vertical,
    raw_values: &[f64],
    transforms: &[TransformArtifact],
) -> Result<Vec<f64>> {
    let schema = schema_for(vertical);
    let raw: RawRecord = schema
        .fields
        .iter()
        .zip(raw_values)
        .map(|(f, v)| (f.name, *v))
        .collect();
    let unusable = |what: &str| {
        PreverError::InvalidConfiguration(format!("{vertical} reference centroid {what}"))
    };
    let record = validate_against(schema, &raw).map_err(|_| unusable("fails validation"))?;
    let record = derive(record, schema.derived).map_err(|_| unusable("has undefined features"))?;
    let vector = FeatureVector::project(&record, schema.feature_columns)?;
    let chain = TransformChain::new(
        transforms
            .iter()
            .cloned()
            .map(TransformArtifact::build)
            .collect::<Result<Vec<_>>>()?,
    );
    chain.apply(vector.as_slice())
}

fn nearest_centroid(
    columns: &[String],
    centroids: Vec<(i64, Vec<f64>)>,
) -> ModelArtifact {
    let (classes, points): (Vec<i64>, Vec<Vec<f64>>) = centroids.into_iter().unzip();
    ModelArtifact::Linear {
        feature_names: columns.to_vec(),
        classes,
        coef: points
            .iter()
            .map(|c| c.iter().map(|v| 2.0 * v).collect())
            .collect(),
        intercept: points
            .iter()
            .map(|c| -c.iter().map(|v| v * v).sum::<f64>())
            .collect(),
    }
}

/// Reference bundle for `vertical`
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the built-in reference data does not
/// fit the vertical's schema.
pub fn bundle(vertical: Vertical) -> Result<ArtifactBundle> {
    let columns = schema_for(vertical).feature_column_names();
    let (transforms, model) = match vertical {
        Vertical::Crop => {
            let transforms = crop_transforms(&columns);
            let centroids = CROP_CENTROIDS
                .iter()
                .map(|(code, raw)| Ok((*code, transformed_point(vertical, raw, &transforms)?)))
                .collect::<Result<Vec<_>>>()?;
            let model = nearest_centroid(&columns, centroids);
            (transforms, model)
        }
        Vertical::Diabetes => {
            let transforms = diabetes_transforms(&columns);
            let centroids = DIABETES_CENTROIDS
                .iter()
                .map(|(code, raw)| Ok((*code, transformed_point(vertical, raw, &transforms)?)))
                .collect::<Result<Vec<_>>>()?;
            let model = nearest_centroid(&columns, centroids);
            (transforms, model)
        }
        Vertical::Liver => (Vec::new(), liver_model(&columns)?),
    };

    Ok(ArtifactBundle {
        format_version: FORMAT_VERSION,
        vertical,
        feature_names: columns,
        transforms,
        model,
    })
}

/// Write every reference bundle into `dir`, creating it if needed
///
/// # Errors
///
/// Returns `IoError` if the directory or a file cannot be written.
pub fn export(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| PreverError::io(dir, &e))?;
    Vertical::ALL
        .iter()
        .map(|&vertical| {
            let path = bundle_path(dir, vertical);
            bundle(vertical)?.save(&path)?;
            info!(vertical = %vertical, path = %path.display(), "Wrote reference bundle");
            Ok(path)
        })
        .collect()
}
