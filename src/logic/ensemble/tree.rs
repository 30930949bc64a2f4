//! Regression Tree - Single boosting round learner
//!
//! Axis-aligned tree grown greedily on gradient/hessian sums with
//! Newton-step leaf values. Split selection is deterministic: features
//! are scanned in ascending index order and only a strictly better gain
//! replaces the incumbent, so equal-gain ties resolve to the lowest
//! feature index.

use serde::{Deserialize, Serialize};

// ============================================================================
// TREE STRUCTURE
// ============================================================================

/// Flat tree node; children are indices into the node arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f32,
    },
}

/// One fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Leaf contribution for one fused vector
    pub fn predict(&self, x: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Scale every leaf value (learning-rate shrinkage)
    pub fn scale_leaves(&mut self, factor: f32) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf { value } = node {
                *value *= factor;
            }
        }
    }
}

// ============================================================================
// GROWTH PARAMETERS
// ============================================================================

/// Complexity bounds for one tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Minimum examples on each side of a split
    pub min_leaf: usize,
    /// L2 regularization on leaf values
    pub lambda: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_leaf: 20,
            lambda: 1.0,
        }
    }
}

// ============================================================================
// FITTING
// ============================================================================

/// Grow a tree on the loss gradients of the current ensemble
///
/// `rows` indexes into the (feature, grad, hess) arrays. Returns the tree
/// and the per-feature gain it accrued (importance accounting).
pub fn fit(
    features: &[Vec<f32>],
    grad: &[f32],
    hess: &[f32],
    params: &TreeParams,
) -> (DecisionTree, Vec<f32>) {
    let n_features = features.first().map(|r| r.len()).unwrap_or(0);
    let rows: Vec<usize> = (0..features.len()).collect();

    let mut nodes = Vec::new();
    let mut importance = vec![0.0f32; n_features];
    grow(
        features,
        grad,
        hess,
        params,
        &rows,
        0,
        &mut nodes,
        &mut importance,
    );

    (DecisionTree { nodes }, importance)
}

/// Newton-step leaf value for a gradient/hessian sum
fn leaf_value(grad_sum: f64, hess_sum: f64, lambda: f32) -> f32 {
    (-grad_sum / (hess_sum + lambda as f64)) as f32
}

/// Split gain (unscaled xgboost-style objective reduction)
fn split_gain(gl: f64, hl: f64, gr: f64, hr: f64, lambda: f64) -> f64 {
    gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - (gl + gr) * (gl + gr) / (hl + hr + lambda)
}

#[allow(clippy::too_many_arguments)]
fn grow(
    features: &[Vec<f32>],
    grad: &[f32],
    hess: &[f32],
    params: &TreeParams,
    rows: &[usize],
    depth: usize,
    nodes: &mut Vec<TreeNode>,
    importance: &mut [f32],
) -> usize {
    let grad_sum: f64 = rows.iter().map(|&i| grad[i] as f64).sum();
    let hess_sum: f64 = rows.iter().map(|&i| hess[i] as f64).sum();

    let make_leaf = |nodes: &mut Vec<TreeNode>| {
        let idx = nodes.len();
        nodes.push(TreeNode::Leaf {
            value: leaf_value(grad_sum, hess_sum, params.lambda),
        });
        idx
    };

    if depth >= params.max_depth || rows.len() < 2 * params.min_leaf {
        return make_leaf(nodes);
    }

    let best = find_best_split(features, grad, hess, params, rows);
    let (feature, threshold, gain) = match best {
        Some(split) => split,
        None => return make_leaf(nodes),
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&i| features[i][feature] <= threshold);

    importance[feature] += gain as f32;

    // Reserve this node's slot before recursing so child indices are stable
    let idx = nodes.len();
    nodes.push(TreeNode::Leaf { value: 0.0 });

    let left = grow(features, grad, hess, params, &left_rows, depth + 1, nodes, importance);
    let right = grow(features, grad, hess, params, &right_rows, depth + 1, nodes, importance);

    nodes[idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };

    idx
}

/// Exact greedy split search over all features, lowest index wins ties
fn find_best_split(
    features: &[Vec<f32>],
    grad: &[f32],
    hess: &[f32],
    params: &TreeParams,
    rows: &[usize],
) -> Option<(usize, f32, f64)> {
    let n_features = features.first().map(|r| r.len()).unwrap_or(0);
    let total_grad: f64 = rows.iter().map(|&i| grad[i] as f64).sum();
    let total_hess: f64 = rows.iter().map(|&i| hess[i] as f64).sum();
    let lambda = params.lambda as f64;

    let mut best: Option<(usize, f32, f64)> = None;

    for feature in 0..n_features {
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|&a, &b| {
            features[a][feature]
                .partial_cmp(&features[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut gl = 0.0f64;
        let mut hl = 0.0f64;

        for pos in 0..sorted.len() - 1 {
            let i = sorted[pos];
            gl += grad[i] as f64;
            hl += hess[i] as f64;

            let here = features[i][feature];
            let next = features[sorted[pos + 1]][feature];
            if here == next {
                continue; // no boundary between equal values
            }

            let left_count = pos + 1;
            let right_count = sorted.len() - left_count;
            if left_count < params.min_leaf || right_count < params.min_leaf {
                continue;
            }

            let gain = split_gain(gl, hl, total_grad - gl, total_hess - hl, lambda);

            // Strict improvement only: equal gains keep the earlier
            // (lower-index) feature and the earlier threshold
            if gain > 1e-12 && best.map(|(_, _, g)| gain > g).unwrap_or(true) {
                let threshold = 0.5 * (here + next);
                best = Some((feature, threshold, gain));
            }
        }
    }

    best
}

// ============================================================================
// TESTS
// ============================================================================
