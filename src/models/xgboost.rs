//! Native XGBoost model evaluation
//!
//! Loads a booster written by `Booster.save_model("*.json")` and scores rows
//! without linking against libxgboost. Only tree boosters with numeric splits
//! and a single target are supported, which covers regression models trained
//! with the default `reg:squarederror` objective.
//!
//! Evaluation follows XGBoost's own float semantics: features and split
//! thresholds are compared as `f32`, and leaf values are accumulated in `f32`.

use super::{ModelError, Regressor};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Link function applied to the summed tree margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Output is the raw margin
    Identity,
    /// Output is `sigmoid(margin)`
    Logistic,
}

impl Objective {
    fn from_name(name: &str) -> Result<Self, ModelError> {
        match name {
            "reg:squarederror"
            | "reg:squaredlogerror"
            | "reg:pseudohubererror"
            | "reg:absoluteerror"
            | "reg:quantileerror" => Ok(Objective::Identity),
            "reg:logistic" | "binary:logistic" => Ok(Objective::Logistic),
            other => Err(ModelError::Unsupported(format!("objective '{}'", other))),
        }
    }

    /// Convert a base score from output space into margin space
    fn base_margin(&self, base_score: f32) -> Result<f32, ModelError> {
        match self {
            Objective::Identity => Ok(base_score),
            Objective::Logistic => {
                if base_score <= 0.0 || base_score >= 1.0 {
                    return Err(ModelError::InvalidModel(format!(
                        "base_score {} outside (0, 1) for a logistic objective",
                        base_score
                    )));
                }
                Ok((base_score / (1.0 - base_score)).ln())
            }
        }
    }

    fn transform(&self, margin: f32) -> f32 {
        match self {
            Objective::Identity => margin,
            Objective::Logistic => 1.0 / (1.0 + (-margin).exp()),
        }
    }
}

// On-disk layout. XGBoost stores most scalar parameters as strings.

#[derive(Deserialize)]
struct ModelFile {
    learner: LearnerSpec,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Deserialize)]
struct LearnerSpec {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterSpec,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveSpec,
}

#[derive(Deserialize)]
struct BoosterSpec {
    name: String,
    #[serde(default)]
    model: Value,
}

#[derive(Deserialize)]
struct GbTreeSpec {
    trees: Vec<TreeSpec>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_feature: Option<String>,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Deserialize)]
struct ObjectiveSpec {
    name: String,
}

/// `default_left` is written as 0/1 by recent releases and as booleans by older ones
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Deserialize)]
struct TreeSpec {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold for internal nodes, leaf value for leaves
    value: f32,
    default_left: bool,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left < 0
    }
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_spec(index: usize, spec: TreeSpec, num_feature: usize) -> Result<Self, ModelError> {
        let n = spec.left_children.len();
        if n == 0 {
            return Err(ModelError::InvalidModel(format!("tree {} has no nodes", index)));
        }
        if spec.right_children.len() != n
            || spec.split_indices.len() != n
            || spec.split_conditions.len() != n
            || spec.default_left.len() != n
        {
            return Err(ModelError::InvalidModel(format!(
                "tree {} has inconsistent node arrays",
                index
            )));
        }
        if spec.split_type.iter().any(|t| *t != 0) {
            return Err(ModelError::Unsupported(format!(
                "categorical splits in tree {}",
                index
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (spec.left_children[i], spec.right_children[i]);
            let feature = spec.split_indices[i] as usize;
            if left >= 0 {
                let in_range = |c: i32| c >= 0 && (c as usize) < n && c as usize != i;
                if !in_range(left) || !in_range(right) {
                    return Err(ModelError::InvalidModel(format!(
                        "tree {} node {} has out-of-range children",
                        index, i
                    )));
                }
                if feature >= num_feature {
                    return Err(ModelError::InvalidModel(format!(
                        "tree {} node {} splits on feature {} of {}",
                        index, i, feature, num_feature
                    )));
                }
            }
            nodes.push(Node {
                left,
                right,
                feature,
                value: spec.split_conditions[i],
                default_left: spec.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f32]) -> Result<f32, ModelError> {
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return Ok(node.value);
            }
            let x = row[node.feature];
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x < node.value
            };
            let next = if go_left { node.left } else { node.right };
            idx = next as usize;
        }
        Err(ModelError::PredictionFailed(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }
}

/// A gradient boosted tree ensemble loaded from XGBoost's JSON format
#[derive(Debug, Clone)]
pub struct XgbRegressor {
    objective_name: String,
    objective: Objective,
    base_score: f32,
    base_margin: f32,
    num_feature: usize,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
    version: Option<String>,
}

impl XgbRegressor {
    /// Load a model from a `.json` file written by XGBoost
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path.as_ref())?;
        let model = Self::from_slice(&bytes)?;
        info!(
            "Loaded XGBoost model from {:?} ({} trees, {} features)",
            path.as_ref(),
            model.num_trees(),
            model.num_feature
        );
        Ok(model)
    }

    /// Parse a model from its JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_slice(bytes)?;
        let learner = file.learner;
        let params = learner.learner_model_param;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::Unsupported(format!(
                "booster '{}'",
                learner.gradient_booster.name
            )));
        }

        let num_class = parse_param(params.num_class.as_deref(), "num_class")?.unwrap_or(0);
        let num_target = parse_param(params.num_target.as_deref(), "num_target")?.unwrap_or(1);
        if num_class > 1 || num_target > 1 {
            return Err(ModelError::Unsupported(format!(
                "multi-output model (num_class={}, num_target={})",
                num_class, num_target
            )));
        }

        let num_feature = match parse_param(params.num_feature.as_deref(), "num_feature")? {
            Some(n) => n,
            None if !learner.feature_names.is_empty() => learner.feature_names.len(),
            None => {
                return Err(ModelError::InvalidModel(
                    "num_feature is not recorded".to_string(),
                ))
            }
        };

        let objective = Objective::from_name(&learner.objective.name)?;
        let base_score = parse_base_score(&params.base_score)?;
        let base_margin = objective.base_margin(base_score)?;

        let gbtree: GbTreeSpec = serde_json::from_value(learner.gradient_booster.model)?;
        let trees = gbtree
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Tree::from_spec(i, spec, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        let version = if file.version.is_empty() {
            None
        } else {
            Some(
                file.version
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
            )
        };

        debug!(
            "Parsed booster: objective={}, base_score={}, trees={}",
            learner.objective.name,
            base_score,
            trees.len()
        );

        Ok(Self {
            objective_name: learner.objective.name,
            objective,
            base_score,
            base_margin,
            num_feature,
            feature_names: learner.feature_names,
            trees,
            version,
        })
    }

    /// Score a single row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.num_feature {
            return Err(ModelError::FeatureShapeMismatch {
                expected: self.num_feature,
                got: row.len(),
            });
        }

        let row: Vec<f32> = row.iter().map(|x| *x as f32).collect();
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.leaf_value(&row)?;
        }

        Ok(self.objective.transform(margin) as f64)
    }

    /// Feature names stored in the artifact, empty if training used a bare matrix
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn objective_name(&self) -> &str {
        &self.objective_name
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// XGBoost release that wrote the artifact, e.g. `2.0.3`
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl Regressor for XgbRegressor {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features.iter().map(|row| self.predict_row(row)).collect()
    }

    fn num_features(&self) -> Option<usize> {
        Some(self.num_feature)
    }

    fn describe(&self) -> String {
        format!(
            "xgboost gbtree ({}, {} trees)",
            self.objective_name,
            self.trees.len()
        )
    }
}

fn parse_param(raw: Option<&str>, name: &str) -> Result<Option<usize>, ModelError> {
    raw.map(|s| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| ModelError::InvalidModel(format!("{} '{}' is not an integer", name, s)))
    })
    .transpose()
}

/// XGBoost writes `"5E-1"`; 3.x wraps it in brackets as `"[5E-1]"`
fn parse_base_score(raw: &str) -> Result<f32, ModelError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    trimmed
        .parse::<f32>()
        .map_err(|_| ModelError::InvalidModel(format!("base_score '{}' is not a number", raw)))
}
