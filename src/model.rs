//! Frozen classifiers and the adapter that invokes them
//!
//! Two model families cover the exported classifiers:
//!
//! - [`LinearClassifier`]: multinomial linear scores, `classes[argmax(W·x + b)]`
//!   (logistic regression, linear SVM, nearest-centroid in linear form)
//! - [`TreeEnsemble`]: averaged per-class leaf distributions of one or more
//!   decision trees (decision tree, random forest, extra trees)
//!
//! The pipeline treats both as opaque: it only reads the declared feature
//! names and classes, and calls [`invoke`], which turns any internal fault
//! (wrong shape, panic, non-finite output) into an error string.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{PreverError, Result},
    features::FeatureVector,
};

/// A fitted, deterministic classifier
pub trait Predictor: fmt::Debug + Send + Sync {
    /// Model family name (`linear`, `tree_ensemble`)
    fn kind(&self) -> &'static str;

    /// Column names, in the order the model was fitted on
    fn feature_names(&self) -> &[String];

    /// Numeric class labels the model can emit
    fn classes(&self) -> &[i64];

    /// Predict the numeric label of one row
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `features` has the wrong length.
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

fn invalid(artifact: &str, reason: impl Into<String>) -> PreverError {
    PreverError::InvalidArtifact {
        artifact: artifact.to_string(),
        reason: reason.into(),
    }
}

fn check_shape(expected: usize, features: &[f64]) -> Result<()> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(PreverError::ShapeMismatch {
            expected,
            actual: features.len(),
        })
    }
}

/// Index of the largest score; ties resolve to the lowest index
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

// ============================================================================
// Linear
// ============================================================================

/// Linear multi-class classifier
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LinearClassifier {
    /// Build from fitted coefficients
    ///
    /// `coef` has one row per class, or a single row for a binary model
    /// (positive score selects `classes[1]`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` when shapes disagree or a parameter is not
    /// finite.
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> Result<Self> {
        const ARTIFACT: &str = "linear";
        if classes.len() < 2 {
            return Err(invalid(ARTIFACT, "needs at least two classes"));
        }
        let rows = if classes.len() == 2 && coef.len() == 1 {
            1
        } else {
            classes.len()
        };
        if coef.len() != rows || intercept.len() != rows {
            return Err(invalid(
                ARTIFACT,
                format!(
                    "{} classes need {rows} coefficient rows and intercepts, got {} and {}",
                    classes.len(),
                    coef.len(),
                    intercept.len()
                ),
            ));
        }
        for (i, row) in coef.iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(invalid(
                    ARTIFACT,
                    format!(
                        "coef[{i}] has {} entries for {} features",
                        row.len(),
                        feature_names.len()
                    ),
                ));
            }
        }
        if coef.iter().flatten().chain(&intercept).any(|v| !v.is_finite()) {
            return Err(invalid(ARTIFACT, "parameters must be finite"));
        }
        Ok(Self {
            feature_names,
            classes,
            coef,
            intercept,
        })
    }

    /// Raw per-row scores `W·x + b`
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `features` has the wrong length.
    pub fn decision_function(&self, features: &[f64]) -> Result<Vec<f64>> {
        check_shape(self.feature_names.len(), features)?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect())
    }
}

impl Predictor for LinearClassifier {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, features: &[f64]) -> Result<f64> {
        let scores = self.decision_function(features)?;
        let index = if scores.len() == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores)
        };
        Ok(self.classes[index] as f64)
    }
}

// ============================================================================
// Trees
// ============================================================================

/// Node of a fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal node: `x[feature] <= threshold` goes left
    Split {
        /// Feature index
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node with per-class weights (counts or probabilities)
    Leaf {
        /// One weight per class
        value: Vec<f64>,
    },
}

/// Fitted decision tree stored as a flat node array, root at index 0
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Build and check a tree
    ///
    /// Children must have a larger index than their parent, so traversal
    /// always terminates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` describing the first malformed node.
    pub fn new(nodes: Vec<TreeNode>, n_features: usize, n_classes: usize) -> Result<Self> {
        const ARTIFACT: &str = "tree";
        if nodes.is_empty() {
            return Err(invalid(ARTIFACT, "tree has no nodes"));
        }
        for (i, node) in nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(
                            ARTIFACT,
                            format!("node {i} splits on feature {feature} of {n_features}"),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(ARTIFACT, format!("node {i} threshold is not finite")));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= nodes.len() {
                            return Err(invalid(
                                ARTIFACT,
                                format!("node {i} has out-of-order child {child}"),
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(invalid(
                            ARTIFACT,
                            format!("leaf {i} has {} weights for {n_classes} classes", value.len()),
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(invalid(ARTIFACT, format!("leaf {i} has a negative or non-finite weight")));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(invalid(ARTIFACT, format!("leaf {i} has zero total weight")));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    /// Leaf weights reached by `features`
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

/// Ensemble of decision trees voting by averaged class distributions
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Build from node arrays, one per tree
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` if there are no trees or any tree is malformed.
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<i64>,
        trees: Vec<Vec<TreeNode>>,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(invalid("tree_ensemble", "needs at least one class"));
        }
        if trees.is_empty() {
            return Err(invalid("tree_ensemble", "needs at least one tree"));
        }
        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(i, nodes)| {
                DecisionTree::new(nodes, feature_names.len(), classes.len()).map_err(|e| match e {
                    PreverError::InvalidArtifact { reason, .. } => {
                        invalid(&format!("tree_ensemble.trees[{i}]"), reason)
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            feature_names,
            classes,
            trees,
        })
    }

    /// Averaged class probabilities for one row
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `features` has the wrong length.
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        check_shape(self.feature_names.len(), features)?;
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let total: f64 = leaf.iter().sum();
            for (p, w) in proba.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}

impl Predictor for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, features: &[f64]) -> Result<f64> {
        let proba = self.predict_proba(features)?;
        Ok(self.classes[argmax(&proba)] as f64)
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Invoke `model` on one row, containing any fault inside the call
///
/// # Errors
///
/// Returns a description of the fault when the model errors, panics, or
/// produces a non-finite label. The caller reports it generically.
pub fn invoke(model: &dyn Predictor, features: &FeatureVector) -> std::result::Result<f64, String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.predict(features.as_slice())));
    match outcome {
        Ok(Ok(label)) if label.is_finite() => Ok(label),
        Ok(Ok(label)) => Err(format!("{} model returned non-finite label {label}", model.kind())),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("{} model panicked", model.kind())),
    }
}
