//! XGBoost JSON model loader.
//!
//! Parses the document written by `Booster.save_model("model.json")` and
//! converts it into a [`BoostedModel`]. Only the fields needed for
//! single-output prediction are modelled; everything else in the document is
//! ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};
use std::path::Path;

use super::booster::{BoostedModel, Booster, LinearBooster, OutputTransform, RegressionTree};

/// Error type for XGBoost model conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: array `{field}` has {actual} entries, expected {expected}")]
    ArrayLength {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree}: node {node} uses a categorical split, which is not supported")]
    CategoricalSplit { tree: usize, node: usize },
    #[error("model has {0} outputs per row; only single-output regressors are supported")]
    MultiOutput(i64),
    #[error("dart model has {trees} trees but {weights} drop weights")]
    DartWeights { trees: usize, weights: usize },
    #[error(
        "gblinear weights length {actual} doesn't match num_features + 1 = {expected}"
    )]
    InvalidLinearWeights { actual: usize, expected: usize },
}

// =============================================================================
// Custom deserializers for XGBoost-specific formats
// =============================================================================

/// `base_score` appears as a number, a string (`"5E-1"`) or a bracketed
/// vector (`"[8.9E1]"`) depending on the XGBoost version.
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let mut cur = Value::deserialize(deserializer)?;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SerdeError::custom("invalid number"));
            }
            Value::String(s) => {
                let t = s.trim();
                if let Ok(f) = t.parse::<f32>() {
                    return Ok(f);
                }
                if let Some(inner) = t.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    if let Ok(f) = inner.trim().parse::<f32>() {
                        return Ok(f);
                    }
                }
                return Err(SerdeError::custom(format!(
                    "cannot parse base_score from string: {}",
                    s
                )));
            }
            Value::Array(arr) => match arr.into_iter().next() {
                Some(first) => cur = first,
                None => return Err(SerdeError::custom("empty base_score array")),
            },
            _ => {
                return Err(SerdeError::custom(
                    "base_score must be number, string, or array",
                ))
            }
        }
    }
}

/// `default_left` is a list of integers in XGBoost >= 1.6 and of booleans before.
fn deserialize_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => n
                .as_f64()
                .map(|f| f != 0.0)
                .ok_or_else(|| SerdeError::custom("invalid number for flag")),
            other => Err(SerdeError::custom(format!("unsupported flag value: {}", other))),
        })
        .collect()
}

fn default_one() -> i64 {
    1
}

// =============================================================================
// Foreign types
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_nodes: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_one")]
    pub size_leaf_vector: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub tree_param: TreeParam,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i32>,
    /// Split thresholds; holds the leaf value at leaf nodes
    pub split_conditions: Vec<f32>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub default_left: Vec<bool>,
    #[serde(default)]
    pub split_type: Vec<i32>,
    #[serde(default)]
    pub categories_nodes: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTrees {
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GbLinearModel {
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GBTreeDefinition {
    pub model: ModelTrees,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Gblinear {
        model: GbLinearModel,
    },
    Dart {
        gbtree: GBTreeDefinition,
        weight_drop: Vec<f32>,
    },
}

/// Objective descriptor; its parameters do not affect prediction.
#[derive(Debug, Clone, Deserialize)]
pub struct Objective {
    pub name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    pub base_score: f32,
    #[serde_as(as = "DisplayFromStr")]
    pub num_class: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_feature: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_one")]
    pub num_target: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub gradient_booster: GradientBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerModelParam,
}

/// Top-level XGBoost model document.
#[derive(Debug, Clone, Deserialize)]
pub struct XgbModel {
    pub version: [u32; 3],
    pub learner: Learner,
}

impl XgbModel {
    /// Load a model from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Convert to a native single-output model.
    pub fn to_model(&self) -> Result<BoostedModel, ConversionError> {
        let param = &self.learner.learner_model_param;
        if param.num_class > 1 {
            return Err(ConversionError::MultiOutput(param.num_class));
        }
        if param.num_target > 1 {
            return Err(ConversionError::MultiOutput(param.num_target));
        }

        let num_features = param.num_feature.max(0) as usize;
        let transform = OutputTransform::from_objective(&self.learner.objective.name);
        let base_margin = transform.base_score_to_margin(param.base_score);

        let booster = match &self.learner.gradient_booster {
            GradientBooster::Gbtree { model } => {
                let trees = convert_trees(model)?;
                let tree_weights = vec![1.0; trees.len()];
                Booster::Trees {
                    trees,
                    tree_weights,
                }
            }
            GradientBooster::Dart {
                gbtree,
                weight_drop,
            } => {
                let trees = convert_trees(&gbtree.model)?;
                if weight_drop.len() != trees.len() {
                    return Err(ConversionError::DartWeights {
                        trees: trees.len(),
                        weights: weight_drop.len(),
                    });
                }
                Booster::Trees {
                    trees,
                    tree_weights: weight_drop.clone(),
                }
            }
            GradientBooster::Gblinear { model } => {
                Booster::Linear(convert_linear(&model.weights, num_features)?)
            }
        };

        Ok(BoostedModel {
            booster,
            base_margin,
            transform,
            num_features,
            feature_names: self.learner.feature_names.clone(),
        })
    }
}

/// XGBoost stores weights as `[num_features + 1]` with the bias last.
fn convert_linear(weights: &[f32], num_features: usize) -> Result<LinearBooster, ConversionError> {
    let expected = num_features + 1;
    if weights.len() != expected {
        return Err(ConversionError::InvalidLinearWeights {
            actual: weights.len(),
            expected,
        });
    }

    Ok(LinearBooster {
        weights: weights[..num_features].to_vec(),
        bias: weights[num_features],
    })
}

fn convert_trees(model: &ModelTrees) -> Result<Vec<RegressionTree>, ConversionError> {
    model
        .trees
        .iter()
        .enumerate()
        .map(|(tree_idx, tree)| convert_tree(tree, tree_idx))
        .collect()
}

/// Convert a single XGBoost tree to a native `RegressionTree`.
fn convert_tree(xgb_tree: &Tree, tree_idx: usize) -> Result<RegressionTree, ConversionError> {
    let num_nodes = xgb_tree.tree_param.num_nodes.max(0) as usize;
    if num_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx));
    }
    if xgb_tree.tree_param.size_leaf_vector > 1 {
        return Err(ConversionError::MultiOutput(
            xgb_tree.tree_param.size_leaf_vector,
        ));
    }

    let arrays: [(&'static str, usize); 5] = [
        ("left_children", xgb_tree.left_children.len()),
        ("right_children", xgb_tree.right_children.len()),
        ("split_indices", xgb_tree.split_indices.len()),
        ("split_conditions", xgb_tree.split_conditions.len()),
        ("default_left", xgb_tree.default_left.len()),
    ];
    for (field, actual) in arrays {
        if actual != num_nodes {
            return Err(ConversionError::ArrayLength {
                tree: tree_idx,
                field,
                actual,
                expected: num_nodes,
            });
        }
    }

    if let Some(&node) = xgb_tree.categories_nodes.first() {
        return Err(ConversionError::CategoricalSplit {
            tree: tree_idx,
            node: node.max(0) as usize,
        });
    }

    let mut tree = RegressionTree::with_capacity(num_nodes);

    for node_idx in 0..num_nodes {
        let left_child = xgb_tree.left_children[node_idx];
        let right_child = xgb_tree.right_children[node_idx];

        // A node is a leaf if left_child == -1 (XGBoost convention)
        if left_child == -1 {
            tree.push_leaf(xgb_tree.split_conditions[node_idx]);
            continue;
        }

        if xgb_tree.split_type.get(node_idx).copied().unwrap_or(0) == 1 {
            return Err(ConversionError::CategoricalSplit {
                tree: tree_idx,
                node: node_idx,
            });
        }

        // Children are stored after their parent; anything else would allow cycles
        for child in [left_child, right_child] {
            if child <= node_idx as i32 || child as usize >= num_nodes {
                return Err(ConversionError::InvalidNodeIndex {
                    tree: tree_idx,
                    node: node_idx,
                    child,
                    num_nodes,
                });
            }
        }

        tree.push_split(
            xgb_tree.split_indices[node_idx].max(0) as u32,
            xgb_tree.split_conditions[node_idx],
            xgb_tree.default_left[node_idx],
            left_child as u32,
            right_child as u32,
        );
    }

    Ok(tree)
}
