//! Threshold Calibration - Cost-weighted decision cutoff
//!
//! A missed phishing URL costs more than a false alarm, so the threshold
//! is chosen to minimize `fn_cost * FN + fp_cost * FP` over the
//! validation probabilities. The decision rule is `probability >=
//! threshold`: 0.0 classifies everything positive, 1.0 everything
//! negative.

use serde::{Deserialize, Serialize};

// ============================================================================
// COST CONFIG
// ============================================================================

/// Asymmetric error costs for calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Cost of classifying a phishing URL as legitimate
    pub fn_cost: f32,
    /// Cost of classifying a legitimate URL as phishing
    pub fp_cost: f32,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            fn_cost: 5.0,
            fp_cost: 1.0,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Confusion counts and derived rates at a fixed threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdMetrics {
    pub threshold: f32,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub cost: f32,
}

/// Evaluate a threshold against labeled probabilities
pub fn evaluate(probs: &[f32], labels: &[f32], threshold: f32, cost: &CostConfig) -> ThresholdMetrics {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut tn = 0usize;
    let mut fn_ = 0usize;

    for (&p, &y) in probs.iter().zip(labels) {
        let predicted_positive = p >= threshold;
        match (predicted_positive, y >= 0.5) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }

    let total = probs.len().max(1) as f32;
    ThresholdMetrics {
        threshold,
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fn_,
        accuracy: (tp + tn) as f32 / total,
        precision: if tp + fp > 0 {
            tp as f32 / (tp + fp) as f32
        } else {
            0.0
        },
        recall: if tp + fn_ > 0 {
            tp as f32 / (tp + fn_) as f32
        } else {
            0.0
        },
        cost: cost.fn_cost * fn_ as f32 + cost.fp_cost * fp as f32,
    }
}

// ============================================================================
// CALIBRATION
// ============================================================================

/// Select the cost-minimizing threshold over validation probabilities
///
/// Candidates are 0.0, 1.0, and every observed probability. Equal costs
/// resolve to the lowest candidate, which favors recall under the
/// asymmetric cost model.
pub fn calibrate(probs: &[f32], labels: &[f32], cost: &CostConfig) -> f32 {
    let mut candidates: Vec<f32> = Vec::with_capacity(probs.len() + 2);
    candidates.push(0.0);
    candidates.extend_from_slice(probs);
    candidates.push(1.0);
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    candidates.dedup();

    let mut best_threshold = 0.0f32;
    let mut best_cost = f32::INFINITY;

    for &candidate in &candidates {
        let metrics = evaluate(probs, labels, candidate, cost);
        if metrics.cost < best_cost {
            best_cost = metrics.cost;
            best_threshold = candidate;
        }
    }

    debug_assert!((0.0..=1.0).contains(&best_threshold));
    best_threshold.clamp(0.0, 1.0)
}

// ============================================================================
// TESTS
// ============================================================================
