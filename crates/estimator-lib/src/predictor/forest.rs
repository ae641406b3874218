//! Random forest regression
//!
//! CART regression trees (squared-error splits, mean-valued leaves) fitted
//! on seeded bootstrap samples and averaged. Every tree considers all
//! features at each split, so the only randomness is the bootstrap, and a
//! fixed `random_state` makes training fully reproducible.

use crate::error::{EstimatorError, Result};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to be accepted
const MIN_GAIN: f64 = 1e-12;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Maximum tree depth (root is depth 0), `None` for unlimited
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(20),
            min_samples_split: 5,
            min_samples_leaf: 2,
            random_state: 42,
        }
    }
}

/// A node in a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        /// Samples with `x[feature] <= threshold` go left
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Single CART regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    /// Fit on the rows of `x` selected by `indices` (duplicates allowed)
    fn fit(x: &[Vec<f64>], y: &[f64], indices: Vec<usize>, params: &ForestParams) -> Self {
        Self {
            root: build_node(x, y, indices, 0, params),
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn predict_one(&self, sample: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit the forest on row-major samples `x` and targets `y`
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Result<Self> {
        if x.len() != y.len() {
            return Err(EstimatorError::Data(format!(
                "{} samples but {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_samples = x.len();
        if n_samples == 0 {
            return Err(EstimatorError::Data("cannot fit forest on zero rows".into()));
        }
        if params.n_estimators == 0 {
            return Err(EstimatorError::Config("forest needs at least one tree".into()));
        }

        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(EstimatorError::Data("samples have differing widths".into()));
        }

        let trees = (0..params.n_estimators)
            .map(|i| {
                let seed = params.random_state.wrapping_add(i as u64);
                let indices = bootstrap_sample(n_samples, seed);
                RegressionTree::fit(x, y, indices, &params)
            })
            .collect();

        Ok(Self {
            params,
            n_features,
            trees,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Structural check for a decoded forest: at least one tree, split
    /// indices inside `n_features`, finite thresholds and leaf values
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(EstimatorError::Artifact("model has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            let mut pending = vec![&tree.root];
            while let Some(node) = pending.pop() {
                match node {
                    TreeNode::Leaf { value, .. } if !value.is_finite() => {
                        return Err(EstimatorError::Artifact(format!(
                            "tree {} has a non-finite leaf value",
                            i
                        )));
                    }
                    TreeNode::Leaf { .. } => {}
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(EstimatorError::Artifact(format!(
                                "tree {} splits on feature index {} of {}",
                                i, feature, self.n_features
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(EstimatorError::Artifact(format!(
                                "tree {} has a non-finite threshold",
                                i
                            )));
                        }
                        pending.push(left);
                        pending.push(right);
                    }
                }
            }
        }
        Ok(())
    }

    /// Average of all tree predictions for one standardized sample
    pub fn predict(&self, sample: &[f64]) -> Result<f64> {
        if sample.len() != self.n_features {
            return Err(EstimatorError::Artifact(format!(
                "model expects {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(EstimatorError::Artifact("model has no trees".into()));
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_one(sample)).sum();
        Ok(total / self.trees.len() as f64)
    }
}

/// Sample `n_samples` row indices with replacement
fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
}

fn build_node(
    x: &[Vec<f64>],
    y: &[f64],
    indices: Vec<usize>,
    depth: usize,
    params: &ForestParams,
) -> TreeNode {
    let n_samples = indices.len();
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let mean = sum / n_samples as f64;
    let leaf = TreeNode::Leaf {
        value: mean,
        n_samples,
    };

    let sse = sum_sq - sum * sum / n_samples as f64;
    if n_samples < params.min_samples_split
        || params.max_depth.is_some_and(|max| depth >= max)
        || sse <= MIN_GAIN
    {
        return leaf;
    }

    let Some((feature, threshold)) = best_split(x, y, &indices, sse, params.min_samples_leaf)
    else {
        return leaf;
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| x[i][feature] <= threshold);

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(build_node(x, y, left, depth + 1, params)),
        right: Box::new(build_node(x, y, right, depth + 1, params)),
    }
}

/// Best (feature, threshold) by squared-error reduction, honoring the
/// minimum leaf size on both sides
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    parent_sse: f64,
    min_samples_leaf: usize,
) -> Option<(usize, f64)> {
    let n = indices.len();
    let n_features = x[indices[0]].len();
    let min_leaf = min_samples_leaf.max(1);
    if n < 2 * min_leaf {
        return None;
    }

    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = MIN_GAIN;
    let mut order = indices.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[prev][feature];
            let hi = x[order[k]][feature];
            if k < min_leaf || n - k < min_leaf || lo >= hi {
                continue;
            }

            let n_left = k as f64;
            let n_right = (n - k) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let split_sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);
            let gain = parent_sse - split_sse;

            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, lo + (hi - lo) / 2.0));
            }
        }
    }

    best
}
