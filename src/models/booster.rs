//! Native gradient boosted model used for XGBoost JSON artifacts.
//!
//! Trees are stored as structure-of-arrays and evaluated by walking from the
//! root to a leaf. Split semantics follow XGBoost: go left when
//! `value < threshold`, missing (NaN) values take the node's default branch.

/// Transform applied to the raw margin to obtain the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTransform {
    /// Regression objectives that predict in margin space (squared error, etc.)
    Identity,
    /// `reg:logistic` / `binary:logistic`
    Sigmoid,
    /// `binary:logitraw`: logit base score, raw margin output
    LogitRaw,
    /// Log-link objectives (`count:poisson`, `reg:gamma`, `reg:tweedie`, `survival:*`)
    Exp,
    /// `binary:hinge`
    Hinge,
}

impl OutputTransform {
    /// Map an XGBoost objective name to its prediction transform.
    pub fn from_objective(name: &str) -> Self {
        match name {
            "reg:logistic" | "binary:logistic" => OutputTransform::Sigmoid,
            "binary:logitraw" => OutputTransform::LogitRaw,
            "count:poisson" | "reg:gamma" | "reg:tweedie" | "survival:cox" | "survival:aft" => {
                OutputTransform::Exp
            }
            "binary:hinge" => OutputTransform::Hinge,
            _ => OutputTransform::Identity,
        }
    }

    /// Convert a base score stored in output space into margin space.
    pub fn base_score_to_margin(self, base_score: f32) -> f32 {
        match self {
            OutputTransform::Sigmoid | OutputTransform::LogitRaw => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln()
            }
            OutputTransform::Exp => base_score.max(1e-7).ln(),
            OutputTransform::Identity | OutputTransform::Hinge => base_score,
        }
    }

    /// Apply the transform to a raw margin.
    pub fn apply(self, margin: f32) -> f32 {
        match self {
            OutputTransform::Identity | OutputTransform::LogitRaw => margin,
            OutputTransform::Sigmoid => 1.0 / (1.0 + (-margin).exp()),
            OutputTransform::Exp => margin.exp(),
            OutputTransform::Hinge => {
                if margin > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Immutable regression tree in structure-of-arrays layout.
///
/// Node 0 is the root. Children always have a larger index than their parent,
/// which the XGBoost conversion verifies, so traversal always terminates.
#[derive(Debug, Clone, Default)]
pub struct RegressionTree {
    is_leaf: Vec<bool>,
    split_index: Vec<u32>,
    threshold: Vec<f32>,
    default_left: Vec<bool>,
    left: Vec<u32>,
    right: Vec<u32>,
    leaf_value: Vec<f32>,
}

impl RegressionTree {
    pub fn with_capacity(n_nodes: usize) -> Self {
        Self {
            is_leaf: Vec::with_capacity(n_nodes),
            split_index: Vec::with_capacity(n_nodes),
            threshold: Vec::with_capacity(n_nodes),
            default_left: Vec::with_capacity(n_nodes),
            left: Vec::with_capacity(n_nodes),
            right: Vec::with_capacity(n_nodes),
            leaf_value: Vec::with_capacity(n_nodes),
        }
    }

    /// Append a numeric split node.
    pub fn push_split(
        &mut self,
        feature: u32,
        threshold: f32,
        default_left: bool,
        left: u32,
        right: u32,
    ) {
        self.is_leaf.push(false);
        self.split_index.push(feature);
        self.threshold.push(threshold);
        self.default_left.push(default_left);
        self.left.push(left);
        self.right.push(right);
        self.leaf_value.push(0.0);
    }

    /// Append a leaf node.
    pub fn push_leaf(&mut self, value: f32) {
        self.is_leaf.push(true);
        self.split_index.push(0);
        self.threshold.push(0.0);
        self.default_left.push(false);
        self.left.push(0);
        self.right.push(0);
        self.leaf_value.push(value);
    }

    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Walk from the root to the leaf selected by `features`.
    pub fn traverse_to_leaf(&self, features: &[f32]) -> usize {
        let mut idx = 0;

        while !self.is_leaf[idx] {
            let fvalue = features
                .get(self.split_index[idx] as usize)
                .copied()
                .unwrap_or(f32::NAN);

            let go_left = if fvalue.is_nan() {
                self.default_left[idx]
            } else {
                fvalue < self.threshold[idx]
            };

            idx = if go_left {
                self.left[idx] as usize
            } else {
                self.right[idx] as usize
            };
        }

        idx
    }

    /// Leaf value reached by `features`.
    pub fn predict(&self, features: &[f32]) -> f32 {
        self.leaf_value[self.traverse_to_leaf(features)]
    }
}

/// Linear booster: one weight per feature plus a bias.
#[derive(Debug, Clone)]
pub struct LinearBooster {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LinearBooster {
    /// Margin starting from `base + bias`, adding features in column order.
    pub fn margin_from(&self, base: f32, features: &[f32]) -> f32 {
        let mut out = base + self.bias;
        for (w, x) in self.weights.iter().zip(features) {
            if !x.is_nan() {
                out += w * x;
            }
        }
        out
    }
}

/// Booster variants a model can carry.
#[derive(Debug, Clone)]
pub enum Booster {
    /// Additive tree ensemble; `tree_weights` is all ones except for DART.
    Trees {
        trees: Vec<RegressionTree>,
        tree_weights: Vec<f32>,
    },
    Linear(LinearBooster),
}

/// A complete single-output boosted regressor.
#[derive(Debug, Clone)]
pub struct BoostedModel {
    pub booster: Booster,
    /// Base score already converted to margin space
    pub base_margin: f32,
    pub transform: OutputTransform,
    /// Number of input columns declared by the artifact (0 if unknown)
    pub num_features: usize,
    /// Column names recorded at training time, if any
    pub feature_names: Vec<String>,
}

impl BoostedModel {
    /// Raw margin before the output transform.
    ///
    /// Accumulates onto the base margin one tree at a time, in tree order, so
    /// `f32` rounding matches XGBoost's CPU predictor.
    pub fn predict_margin(&self, features: &[f32]) -> f32 {
        match &self.booster {
            Booster::Trees {
                trees,
                tree_weights,
            } => {
                let mut out = self.base_margin;
                for (tree, weight) in trees.iter().zip(tree_weights) {
                    out += weight * tree.predict(features);
                }
                out
            }
            Booster::Linear(linear) => linear.margin_from(self.base_margin, features),
        }
    }

    /// Predict one row.
    pub fn predict(&self, features: &[f32]) -> f32 {
        self.transform.apply(self.predict_margin(features))
    }

    pub fn num_trees(&self) -> usize {
        match &self.booster {
            Booster::Trees { trees, .. } => trees.len(),
            Booster::Linear(_) => 0,
        }
    }
}
