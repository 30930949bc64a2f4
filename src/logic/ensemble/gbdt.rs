//! Gradient-Boosted Ensemble - Additive trees on binary log-loss
//!
//! Constant prior-log-odds baseline, then bounded rounds each adding one
//! shrunken tree fitted to the loss gradient. Validation log-loss drives
//! early stopping; the returned model is always the best-round prefix,
//! never the final round.

use serde::{Deserialize, Serialize};

use super::tree::{self, DecisionTree, TreeParams};
use crate::logic::encoder::sigmoid;

// ============================================================================
// CONFIG
// ============================================================================

/// Boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtConfig {
    pub max_rounds: usize,
    pub learning_rate: f32,
    pub tree: TreeParams,
    /// Rounds without validation improvement before stopping
    pub patience: usize,
    /// Minimum validation-loss improvement that resets patience
    pub min_delta: f64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            max_rounds: 200,
            learning_rate: 0.1,
            tree: TreeParams::default(),
            patience: 15,
            min_delta: 1e-5,
        }
    }
}

/// Outcome of an ensemble fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtTrainReport {
    pub rounds_run: usize,
    pub best_round: usize,
    pub best_val_loss: f64,
    /// False when the round budget ran out without early stopping
    pub early_stopped: bool,
}

// ============================================================================
// MODEL
// ============================================================================

/// Fitted boosted-tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Prior log-odds of the training labels
    pub base_score: f32,
    /// Trees with shrinkage already applied to leaf values
    pub trees: Vec<DecisionTree>,
    /// Gain accrued per fused-vector slot across kept trees
    pub feature_importance: Vec<f32>,
    pub n_features: usize,
}

impl GbdtModel {
    /// Phishing probability for one fused vector
    ///
    /// Independent per call: no shared mutable state.
    pub fn predict(&self, x: &[f32]) -> f32 {
        let margin: f32 = self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f32>();
        sigmoid(margin)
    }
}

// ============================================================================
// FITTING
// ============================================================================

/// Fit the ensemble on fused training vectors, validating each round
pub fn fit(
    train_x: &[Vec<f32>],
    train_y: &[f32],
    val_x: &[Vec<f32>],
    val_y: &[f32],
    config: &GbdtConfig,
) -> (GbdtModel, GbdtTrainReport) {
    let n_features = train_x.first().map(|r| r.len()).unwrap_or(0);

    // Prior log-odds baseline
    let positive_rate = if train_y.is_empty() {
        0.5
    } else {
        (train_y.iter().sum::<f32>() / train_y.len() as f32).clamp(1e-4, 1.0 - 1e-4)
    };
    let base_score = (positive_rate / (1.0 - positive_rate)).ln();

    let mut train_margin = vec![base_score; train_x.len()];
    let mut val_margin = vec![base_score; val_x.len()];

    let mut trees: Vec<DecisionTree> = Vec::new();
    let mut per_tree_importance: Vec<Vec<f32>> = Vec::new();

    let mut best_val_loss = log_loss(&val_margin, val_y);
    let mut best_round = 0usize;
    let mut stale_rounds = 0usize;
    let mut early_stopped = false;
    let mut rounds_run = 0usize;

    for round in 1..=config.max_rounds {
        rounds_run = round;

        // Gradient and hessian of the log-loss at the current margin
        let mut grad = Vec::with_capacity(train_x.len());
        let mut hess = Vec::with_capacity(train_x.len());
        for (margin, &y) in train_margin.iter().zip(train_y) {
            let p = sigmoid(*margin);
            grad.push(p - y);
            hess.push((p * (1.0 - p)).max(1e-6));
        }

        let (mut round_tree, importance) = tree::fit(train_x, &grad, &hess, &config.tree);
        round_tree.scale_leaves(config.learning_rate);

        for (margin, x) in train_margin.iter_mut().zip(train_x) {
            *margin += round_tree.predict(x);
        }
        for (margin, x) in val_margin.iter_mut().zip(val_x) {
            *margin += round_tree.predict(x);
        }

        trees.push(round_tree);
        per_tree_importance.push(importance);

        let val_loss = log_loss(&val_margin, val_y);
        log::debug!(
            "Boosting round {}/{}: val_logloss={:.5}",
            round,
            config.max_rounds,
            val_loss
        );

        if val_loss < best_val_loss - config.min_delta {
            best_val_loss = val_loss;
            best_round = round;
            stale_rounds = 0;
        } else {
            stale_rounds += 1;
            if stale_rounds >= config.patience {
                log::info!(
                    "Boosting early stop at round {} (best round {}, val_logloss={:.5})",
                    round,
                    best_round,
                    best_val_loss
                );
                early_stopped = true;
                break;
            }
        }
    }

    if !early_stopped {
        log::warn!(
            "Boosting hit the round budget ({}) without converging; keeping best round {}",
            config.max_rounds,
            best_round
        );
    }

    // Best-validation snapshot, not the final round
    trees.truncate(best_round);
    per_tree_importance.truncate(best_round);

    let mut feature_importance = vec![0.0f32; n_features];
    for importance in &per_tree_importance {
        for (total, gain) in feature_importance.iter_mut().zip(importance) {
            *total += gain;
        }
    }

    let model = GbdtModel {
        base_score,
        trees,
        feature_importance,
        n_features,
    };

    let report = GbdtTrainReport {
        rounds_run,
        best_round,
        best_val_loss,
        early_stopped,
    };

    (model, report)
}

/// Mean binary log-loss over margins
fn log_loss(margins: &[f32], labels: &[f32]) -> f64 {
    if margins.is_empty() {
        return f64::INFINITY;
    }

    let total: f64 = margins
        .iter()
        .zip(labels)
        .map(|(&margin, &y)| {
            let p = (sigmoid(margin) as f64).clamp(1e-9, 1.0 - 1e-9);
            -(y as f64 * p.ln() + (1.0 - y as f64) * (1.0 - p).ln())
        })
        .sum();

    total / margins.len() as f64
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Linearly separable toy set on slot 0
    fn toy_data() -> (Vec<Vec<f32>>, Vec<f32>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            x.push(vec![(i % 5) as f32 * 0.1, 1.0]);
            y.push(0.0);
        }
        for i in 0..30 {
            x.push(vec![3.0 + (i % 5) as f32 * 0.1, 1.0]);
            y.push(1.0);
        }
        (x, y)
    }

    fn toy_config() -> GbdtConfig {
        GbdtConfig {
            max_rounds: 40,
            learning_rate: 0.3,
            tree: TreeParams {
                max_depth: 3,
                min_leaf: 5,
                lambda: 1.0,
            },
            patience: 10,
            min_delta: 1e-6,
        }
    }

    #[test]
    fn test_fit_separates_toy_data() {
        let (x, y) = toy_data();
        let (model, report) = fit(&x, &y, &x, &y, &toy_config());

        assert!(report.best_round > 0);
        assert!(model.predict(&[0.1, 1.0]) < 0.3);
        assert!(model.predict(&[3.2, 1.0]) > 0.7);
    }

    #[test]
    fn test_predict_in_unit_interval() {
        let (x, y) = toy_data();
        let (model, _) = fit(&x, &y, &x, &y, &toy_config());

        for row in &x {
            let p = model.predict(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_feature_importance_on_informative_slot() {
        let (x, y) = toy_data();
        let (model, _) = fit(&x, &y, &x, &y, &toy_config());

        // Slot 0 separates the classes; slot 1 is constant
        assert!(model.feature_importance[0] > 0.0);
        assert_eq!(model.feature_importance[1], 0.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy_data();
        let (a, _) = fit(&x, &y, &x, &y, &toy_config());
        let (b, _) = fit(&x, &y, &x, &y, &toy_config());

        assert_eq!(a.trees.len(), b.trees.len());
        for (row, _) in x.iter().zip(&y) {
            assert_eq!(a.predict(row), b.predict(row));
        }
    }

    #[test]
    fn test_best_round_snapshot_kept() {
        let (x, y) = toy_data();
        let (model, report) = fit(&x, &y, &x, &y, &toy_config());

        assert_eq!(model.trees.len(), report.best_round);
        assert!(report.rounds_run >= report.best_round);
    }

    #[test]
    fn test_predict_independent_across_calls() {
        let (x, y) = toy_data();
        let (model, _) = fit(&x, &y, &x, &y, &toy_config());

        let first = model.predict(&x[0]);
        for _ in 0..5 {
            model.predict(&x[40]);
        }
        assert_eq!(model.predict(&x[0]), first);
    }
}
