//! Regression model artifact: loading, validation and batch prediction.
//!
//! The artifact is a JSON export of a trained estimator. Two shapes are
//! understood: a random forest of binary regression trees (split rule
//! `x[feature] <= threshold` goes left, the forest averages its trees) and a
//! plain linear model. The column contract is checked against
//! [`FEATURE_NAMES`] when the file is read, so a loaded model can never be
//! fed columns in the wrong order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::forecast::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// Narrow capability the prediction pipeline needs from a model.
pub trait GenerationModel: Send + Sync {
    /// One output per input row, same order.
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64>;

    fn metadata(&self) -> &ModelMetadata;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelMetadata {
    pub model_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_names: Vec<String>,
    /// Name and unit of the predicted quantity
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    RandomForest { trees: Vec<RegressionTree> },
    Linear { coefficients: Vec<f64>, intercept: f64 },
}

/// Nodes in pre-order; node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { value: f64 },
}

impl RegressionTree {
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split { feature, threshold, left, right } => {
                    if feature >= FEATURE_COUNT {
                        return Err(format!("node {} splits on unknown feature {}", idx, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", idx));
                    }
                    // Children after the parent keeps traversal acyclic.
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child index {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has a non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if x.get(feature) <= threshold { left } else { right };
                }
            }
        }
    }
}

/// A validated, immutable model. Shared across requests behind an `Arc`.
#[derive(Debug)]
pub struct WindModel {
    metadata: ModelMetadata,
    estimator: Estimator,
}

impl WindModel {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, String> {
        let names: Vec<&str> = artifact.metadata.feature_names.iter().map(String::as_str).collect();
        if names != FEATURE_NAMES {
            return Err(format!(
                "feature contract mismatch: expected {:?}, found {:?}",
                FEATURE_NAMES, names
            ));
        }

        match &artifact.estimator {
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random forest has no trees".into());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate().map_err(|e| format!("tree {}: {}", i, e))?;
                }
            }
            Estimator::Linear { coefficients, intercept } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(format!(
                        "linear model has {} coefficients, expected {}",
                        coefficients.len(),
                        FEATURE_COUNT
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite parameters".into());
                }
            }
        }

        Ok(Self { metadata: artifact.metadata, estimator: artifact.estimator })
    }

    /// Parse and validate artifact text; `path` is only used for error reporting.
    pub fn from_json_str(path: &Path, text: &str) -> Result<Self, AppError> {
        let corrupt = |reason: String| AppError::ArtifactCorrupt { path: path.to_path_buf(), reason };
        let artifact: ModelArtifact = serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
        Self::from_artifact(artifact).map_err(corrupt)
    }

    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        match &self.estimator {
            Estimator::RandomForest { trees } => {
                let sum: f64 = trees.iter().map(|t| t.predict_one(x)).sum();
                sum / trees.len() as f64
            }
            Estimator::Linear { coefficients, intercept } => {
                x.values().iter().zip(coefficients).map(|(v, c)| v * c).sum::<f64>() + intercept
            }
        }
    }

    pub fn estimator_kind(&self) -> &'static str {
        match self.estimator {
            Estimator::RandomForest { .. } => "random_forest",
            Estimator::Linear { .. } => "linear",
        }
    }
}

impl GenerationModel for WindModel {
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Reads the artifact once and hands out the same instance afterwards.
#[derive(Debug)]
pub struct ModelLoader {
    path: PathBuf,
    cell: OnceCell<Arc<WindModel>>,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cell: OnceCell::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<WindModel>, AppError> {
        self.cell
            .get_or_try_init(|| {
                debug!(path = %self.path.display(), "reading model artifact");
                let text = std::fs::read_to_string(&self.path)
                    .map_err(|_| AppError::ArtifactMissing { path: self.path.clone() })?;
                let model = WindModel::from_json_str(&self.path, &text)?;
                info!(
                    model_id = %model.metadata.model_id,
                    kind = model.estimator_kind(),
                    "model artifact loaded"
                );
                Ok(Arc::new(model))
            })
            .map(Arc::clone)
    }
}
