//! Encoder Trainer - Mini-batch Adam with early stopping
//!
//! Epochs shuffle with a seeded RNG, gradients are accumulated over each
//! mini-batch and applied in one update by the single training owner.
//! The best-validation-loss snapshot is kept at epoch boundaries; budget
//! exhaustion without an early stop logs a convergence warning but still
//! returns the best snapshot.

use ndarray::{Array, Array1, Dimension};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{bce_loss, EncoderConfig, EncoderGradients, EncoderParams};

// ============================================================================
// CONFIG
// ============================================================================

/// Optimization hyperparameters for the encoder loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderTrainConfig {
    pub max_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    /// Minimum validation-loss improvement that resets patience
    pub min_delta: f32,
}

impl Default for EncoderTrainConfig {
    fn default() -> Self {
        Self {
            max_epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            patience: 3,
            min_delta: 1e-4,
        }
    }
}

/// Outcome of an encoder training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderTrainReport {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f32,
    /// False when the epoch budget ran out without early stopping
    pub early_stopped: bool,
}

// ============================================================================
// ADAM
// ============================================================================

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;

/// First/second moment accumulators shaped like the parameters
struct AdamState {
    embedding: (ndarray::Array2<f32>, ndarray::Array2<f32>),
    conv_weights: Vec<(ndarray::Array2<f32>, ndarray::Array2<f32>)>,
    conv_bias: Vec<(Array1<f32>, Array1<f32>)>,
    proj_weight: (ndarray::Array2<f32>, ndarray::Array2<f32>),
    proj_bias: (Array1<f32>, Array1<f32>),
    head_weight: (Array1<f32>, Array1<f32>),
    head_bias: (f32, f32),
    step: i32,
}

impl AdamState {
    fn zeros_like(params: &EncoderParams) -> Self {
        let pair2 = |a: &ndarray::Array2<f32>| {
            (
                ndarray::Array2::zeros(a.raw_dim()),
                ndarray::Array2::zeros(a.raw_dim()),
            )
        };
        let pair1 = |a: &Array1<f32>| (Array1::zeros(a.raw_dim()), Array1::zeros(a.raw_dim()));

        Self {
            embedding: pair2(&params.embedding),
            conv_weights: params.conv_weights.iter().map(pair2).collect(),
            conv_bias: params.conv_bias.iter().map(pair1).collect(),
            proj_weight: pair2(&params.proj_weight),
            proj_bias: pair1(&params.proj_bias),
            head_weight: pair1(&params.head_weight),
            head_bias: (0.0, 0.0),
            step: 0,
        }
    }

    fn apply(&mut self, params: &mut EncoderParams, grads: &EncoderGradients, lr: f32) {
        self.step += 1;
        let t = self.step;

        adam_step(&mut params.embedding, &grads.embedding, &mut self.embedding, lr, t);
        for i in 0..params.conv_weights.len() {
            adam_step(
                &mut params.conv_weights[i],
                &grads.conv_weights[i],
                &mut self.conv_weights[i],
                lr,
                t,
            );
            adam_step(
                &mut params.conv_bias[i],
                &grads.conv_bias[i],
                &mut self.conv_bias[i],
                lr,
                t,
            );
        }
        adam_step(&mut params.proj_weight, &grads.proj_weight, &mut self.proj_weight, lr, t);
        adam_step(&mut params.proj_bias, &grads.proj_bias, &mut self.proj_bias, lr, t);
        adam_step(&mut params.head_weight, &grads.head_weight, &mut self.head_weight, lr, t);

        // Scalar head bias
        let (m, v) = &mut self.head_bias;
        *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * grads.head_bias;
        *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * grads.head_bias * grads.head_bias;
        let m_hat = *m / (1.0 - ADAM_BETA1.powi(t));
        let v_hat = *v / (1.0 - ADAM_BETA2.powi(t));
        params.head_bias -= lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
    }
}

/// One Adam update for a parameter tensor of any dimensionality
fn adam_step<D: Dimension>(
    param: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    moments: &mut (Array<f32, D>, Array<f32, D>),
    lr: f32,
    t: i32,
) {
    let (m, v) = moments;
    let bias1 = 1.0 - ADAM_BETA1.powi(t);
    let bias2 = 1.0 - ADAM_BETA2.powi(t);

    ndarray::Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
        });
}

// ============================================================================
// TRAINER
// ============================================================================

/// Labeled token sequence consumed by the trainer
pub type TokenExample = (Vec<usize>, f32);

pub struct EncoderTrainer {
    config: EncoderTrainConfig,
    seed: u64,
}

impl EncoderTrainer {
    pub fn new(config: EncoderTrainConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Train an encoder, returning the best-validation-loss snapshot
    pub fn train(
        &self,
        encoder_config: EncoderConfig,
        train: &[TokenExample],
        val: &[TokenExample],
    ) -> (EncoderParams, EncoderTrainReport) {
        let mut params = EncoderParams::init(encoder_config, self.seed);
        let mut adam = AdamState::zeros_like(&params);

        let mut best = params.clone();
        let mut best_val_loss = validation_loss(&params, val);
        let mut best_epoch = 0usize;
        let mut stale_epochs = 0usize;
        let mut early_stopped = false;
        let mut epochs_run = 0usize;

        let dropout = params.config.dropout;
        let total_filters = params.config.total_filters();
        let mut indices: Vec<usize> = (0..train.len()).collect();

        for epoch in 1..=self.config.max_epochs {
            epochs_run = epoch;

            // Reshuffle with a seeded RNG derived from base seed + epoch
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            indices.shuffle(&mut rng);

            let mut epoch_loss = 0.0f32;

            for batch in indices.chunks(self.config.batch_size) {
                let mut grads = EncoderGradients::zeros_like(&params);

                for &i in batch {
                    let (tokens, label) = &train[i];
                    let mask = dropout_mask(&mut rng, total_filters, dropout);
                    let state = params.forward_train(tokens, *label, mask);
                    epoch_loss += bce_loss(state.prob, *label);
                    params.backward(&state, &mut grads);
                }

                // Averaged gradients, applied atomically by the owner
                grads.scale(1.0 / batch.len() as f32);
                adam.apply(&mut params, &grads, self.config.learning_rate);
            }

            let val_loss = validation_loss(&params, val);
            log::debug!(
                "Encoder epoch {}/{}: train_loss={:.4} val_loss={:.4}",
                epoch,
                self.config.max_epochs,
                epoch_loss / train.len().max(1) as f32,
                val_loss
            );

            // Checkpoint at the epoch boundary
            if val_loss < best_val_loss - self.config.min_delta {
                best_val_loss = val_loss;
                best_epoch = epoch;
                best = params.clone();
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= self.config.patience {
                    log::info!(
                        "Encoder early stop at epoch {} (best epoch {}, val_loss={:.4})",
                        epoch,
                        best_epoch,
                        best_val_loss
                    );
                    early_stopped = true;
                    break;
                }
            }
        }

        if !early_stopped {
            log::warn!(
                "Encoder hit the epoch budget ({}) without converging; keeping best epoch {}",
                self.config.max_epochs,
                best_epoch
            );
        }

        let report = EncoderTrainReport {
            epochs_run,
            best_epoch,
            best_val_loss,
            early_stopped,
        };

        (best, report)
    }
}

/// Inverted dropout mask; None when the rate is zero
fn dropout_mask(rng: &mut StdRng, width: usize, rate: f32) -> Option<Array1<f32>> {
    if rate <= 0.0 {
        return None;
    }

    let keep = 1.0 - rate;
    Some(Array1::from_shape_fn(width, |_| {
        if rng.gen::<f32>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    }))
}

/// Mean BCE over a validation set with the frozen head
pub fn validation_loss(params: &EncoderParams, val: &[TokenExample]) -> f32 {
    if val.is_empty() {
        return f32::INFINITY;
    }

    let total: f32 = val
        .iter()
        .map(|(tokens, label)| {
            let state = params.forward_train(tokens, *label, None);
            bce_loss(state.prob, *label)
        })
        .sum();

    total / val.len() as f32
}

// ============================================================================
// TESTS
// ============================================================================
