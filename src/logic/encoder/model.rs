//! Sequence Encoder - Character-level convolutional model
//!
//! Embedding table → parallel 1-D convolutions → ReLU → global max pool
//! → linear projection. The training head (logistic unit over the
//! projection) exists only to drive the supervised objective; frozen
//! inference runs the projection alone and is fully deterministic.
//!
//! The forward/backward math is written against `ndarray` directly: the
//! model is small enough that explicit gradients beat dragging in a
//! framework.

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::vocab::VOCAB_SIZE;

// ============================================================================
// CONFIG
// ============================================================================

/// Encoder hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Fixed tokenization width (prefix kept on truncation)
    pub max_len: usize,
    /// Embedding dimension per character
    pub embed_dim: usize,
    /// Convolution kernel widths, one bank per entry
    pub kernel_sizes: Vec<usize>,
    /// Filters per kernel bank
    pub num_filters: usize,
    /// Output embedding dimension
    pub output_dim: usize,
    /// Dropout rate on the pooled layer (training only)
    pub dropout: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_len: 128,
            embed_dim: 16,
            kernel_sizes: vec![3, 5],
            num_filters: 32,
            output_dim: 32,
            dropout: 0.3,
        }
    }
}

impl EncoderConfig {
    /// Pooled width across all kernel banks
    pub fn total_filters(&self) -> usize {
        self.kernel_sizes.len() * self.num_filters
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Complete encoder parameter set
///
/// Serialized into the model artifact; a loaded set runs frozen inference
/// bit-identically to the training-time snapshot it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderParams {
    pub config: EncoderConfig,
    /// [VOCAB_SIZE, embed_dim]
    pub embedding: Array2<f32>,
    /// Per kernel bank: [kernel * embed_dim, num_filters]
    pub conv_weights: Vec<Array2<f32>>,
    /// Per kernel bank: [num_filters]
    pub conv_bias: Vec<Array1<f32>>,
    /// [total_filters, output_dim]
    pub proj_weight: Array2<f32>,
    /// [output_dim]
    pub proj_bias: Array1<f32>,
    /// Training head: [output_dim]
    pub head_weight: Array1<f32>,
    pub head_bias: f32,
}

/// Xavier-uniform bound for a weight matrix
fn xavier_bound(fan_in: usize, fan_out: usize) -> f32 {
    (6.0 / (fan_in + fan_out) as f32).sqrt()
}

fn uniform_matrix(rng: &mut StdRng, rows: usize, cols: usize, bound: f32) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound))
}

impl EncoderParams {
    /// Initialize parameters from a seed
    pub fn init(config: EncoderConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let d = config.embed_dim;

        let embedding = uniform_matrix(&mut rng, VOCAB_SIZE, d, xavier_bound(VOCAB_SIZE, d));

        let mut conv_weights = Vec::new();
        let mut conv_bias = Vec::new();
        for &k in &config.kernel_sizes {
            let fan_in = k * d;
            conv_weights.push(uniform_matrix(
                &mut rng,
                fan_in,
                config.num_filters,
                xavier_bound(fan_in, config.num_filters),
            ));
            conv_bias.push(Array1::zeros(config.num_filters));
        }

        let total = config.total_filters();
        let proj_weight = uniform_matrix(
            &mut rng,
            total,
            config.output_dim,
            xavier_bound(total, config.output_dim),
        );
        let proj_bias = Array1::zeros(config.output_dim);

        let head_bound = xavier_bound(config.output_dim, 1);
        let head_weight =
            Array1::from_shape_fn(config.output_dim, |_| rng.gen_range(-head_bound..head_bound));

        Self {
            config,
            embedding,
            conv_weights,
            conv_bias,
            proj_weight,
            proj_bias,
            head_weight,
            head_bias: 0.0,
        }
    }

    /// Gather embedding rows for a token sequence
    fn embed(&self, tokens: &[usize]) -> Array2<f32> {
        let mut out = Array2::zeros((tokens.len(), self.config.embed_dim));
        for (t, &tok) in tokens.iter().enumerate() {
            out.row_mut(t).assign(&self.embedding.row(tok));
        }
        out
    }

    /// Conv banks + ReLU + global max pool over an embedded sequence
    ///
    /// Returns the pooled activations plus the argmax window position and
    /// winning pre-activation per filter (needed for the backward pass).
    fn pool(&self, embedded: &Array2<f32>) -> (Array1<f32>, Vec<Vec<usize>>, Vec<Vec<f32>>) {
        let cfg = &self.config;
        let len = embedded.nrows();
        let mut pooled = Array1::zeros(cfg.total_filters());
        let mut pool_argmax = Vec::with_capacity(cfg.kernel_sizes.len());
        let mut pool_preact = Vec::with_capacity(cfg.kernel_sizes.len());

        for (ki, &k) in cfg.kernel_sizes.iter().enumerate() {
            let weights = &self.conv_weights[ki];
            let bias = &self.conv_bias[ki];
            let mut argmax = vec![0usize; cfg.num_filters];
            let mut best = vec![f32::NEG_INFINITY; cfg.num_filters];

            for t in 0..=(len - k) {
                let window: Array1<f32> = Array1::from_iter(
                    embedded.slice(s![t..t + k, ..]).iter().cloned(),
                );
                let preact = window.dot(weights) + bias;

                for f in 0..cfg.num_filters {
                    if preact[f] > best[f] {
                        best[f] = preact[f];
                        argmax[f] = t;
                    }
                }
            }

            let offset = ki * cfg.num_filters;
            for f in 0..cfg.num_filters {
                pooled[offset + f] = best[f].max(0.0);
            }

            pool_argmax.push(argmax);
            pool_preact.push(best);
        }

        (pooled, pool_argmax, pool_preact)
    }

    /// Frozen forward pass: deterministic, no dropout, no head
    pub fn encode(&self, tokens: &[usize]) -> Vec<f32> {
        let embedded = self.embed(tokens);
        let (pooled, _, _) = self.pool(&embedded);
        let projected = pooled.dot(&self.proj_weight) + &self.proj_bias;
        projected.to_vec()
    }

    /// Training forward pass with cache for backprop
    pub fn forward_train(
        &self,
        tokens: &[usize],
        label: f32,
        dropout_mask: Option<Array1<f32>>,
    ) -> ForwardState {
        let embedded = self.embed(tokens);
        let (mut pooled, pool_argmax, pool_preact) = self.pool(&embedded);

        if let Some(mask) = &dropout_mask {
            pooled *= mask;
        }

        let projected = pooled.dot(&self.proj_weight) + &self.proj_bias;
        let logit = projected.dot(&self.head_weight) + self.head_bias;
        let prob = sigmoid(logit);

        ForwardState {
            tokens: tokens.to_vec(),
            embedded,
            pool_argmax,
            pool_preact,
            dropout_mask,
            pooled,
            projected,
            prob,
            label,
        }
    }

    /// Accumulate gradients for one example into `grads`
    pub fn backward(&self, state: &ForwardState, grads: &mut EncoderGradients) {
        let cfg = &self.config;
        let dlogit = state.prob - state.label;

        // Head
        grads.head_weight.scaled_add(dlogit, &state.projected);
        grads.head_bias += dlogit;

        // Projection
        let dproj = &self.head_weight * dlogit;
        let outer = state
            .pooled
            .clone()
            .insert_axis(Axis(1))
            .dot(&dproj.clone().insert_axis(Axis(0)));
        grads.proj_weight += &outer;
        grads.proj_bias += &dproj;

        let mut dpooled = self.proj_weight.dot(&dproj);
        if let Some(mask) = &state.dropout_mask {
            dpooled *= mask;
        }

        // Conv banks + embedding, routed through the argmax positions
        let mut dembedded: Array2<f32> = Array2::zeros(state.embedded.raw_dim());

        for (ki, &k) in cfg.kernel_sizes.iter().enumerate() {
            let offset = ki * cfg.num_filters;

            for f in 0..cfg.num_filters {
                let g = dpooled[offset + f];
                if g == 0.0 || state.pool_preact[ki][f] <= 0.0 {
                    continue; // dropout- or relu-gated
                }

                let t = state.pool_argmax[ki][f];
                let window: Array1<f32> = Array1::from_iter(
                    state.embedded.slice(s![t..t + k, ..]).iter().cloned(),
                );

                grads.conv_weights[ki].column_mut(f).scaled_add(g, &window);
                grads.conv_bias[ki][f] += g;

                let dwindow = &self.conv_weights[ki].column(f) * g;
                let dwindow = dwindow
                    .into_shape_with_order((k, cfg.embed_dim))
                    .expect("window gradient reshape");
                let mut target = dembedded.slice_mut(s![t..t + k, ..]);
                target += &dwindow;
            }
        }

        for (t, &tok) in state.tokens.iter().enumerate() {
            let mut row = grads.embedding.row_mut(tok);
            row += &dembedded.row(t);
        }
    }
}

/// Cached activations from a training forward pass
pub struct ForwardState {
    tokens: Vec<usize>,
    embedded: Array2<f32>,
    pool_argmax: Vec<Vec<usize>>,
    pool_preact: Vec<Vec<f32>>,
    dropout_mask: Option<Array1<f32>>,
    pooled: Array1<f32>,
    projected: Array1<f32>,
    pub prob: f32,
    pub label: f32,
}

// ============================================================================
// GRADIENTS
// ============================================================================

/// Gradient accumulator shaped like `EncoderParams`
pub struct EncoderGradients {
    pub embedding: Array2<f32>,
    pub conv_weights: Vec<Array2<f32>>,
    pub conv_bias: Vec<Array1<f32>>,
    pub proj_weight: Array2<f32>,
    pub proj_bias: Array1<f32>,
    pub head_weight: Array1<f32>,
    pub head_bias: f32,
}

impl EncoderGradients {
    pub fn zeros_like(params: &EncoderParams) -> Self {
        Self {
            embedding: Array2::zeros(params.embedding.raw_dim()),
            conv_weights: params
                .conv_weights
                .iter()
                .map(|w| Array2::zeros(w.raw_dim()))
                .collect(),
            conv_bias: params
                .conv_bias
                .iter()
                .map(|b| Array1::zeros(b.raw_dim()))
                .collect(),
            proj_weight: Array2::zeros(params.proj_weight.raw_dim()),
            proj_bias: Array1::zeros(params.proj_bias.raw_dim()),
            head_weight: Array1::zeros(params.head_weight.raw_dim()),
            head_bias: 0.0,
        }
    }

    /// Scale all gradients (batch averaging)
    pub fn scale(&mut self, factor: f32) {
        self.embedding *= factor;
        for w in &mut self.conv_weights {
            *w *= factor;
        }
        for b in &mut self.conv_bias {
            *b *= factor;
        }
        self.proj_weight *= factor;
        self.proj_bias *= factor;
        self.head_weight *= factor;
        self.head_bias *= factor;
    }
}

// ============================================================================
// MATH HELPERS
// ============================================================================

pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary cross-entropy with probability clamping
pub fn bce_loss(prob: f32, label: f32) -> f32 {
    let p = prob.clamp(1e-7, 1.0 - 1e-7);
    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::encoder::vocab;

    fn small_config() -> EncoderConfig {
        EncoderConfig {
            max_len: 32,
            embed_dim: 8,
            kernel_sizes: vec![3],
            num_filters: 4,
            output_dim: 8,
            dropout: 0.0,
        }
    }

    #[test]
    fn test_encode_output_dim() {
        let params = EncoderParams::init(small_config(), 7);
        let tokens = vocab::tokenize("http://example.com", 32).unwrap();

        let embedding = params.encode(&tokens);
        assert_eq!(embedding.len(), 8);
        assert!(embedding.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_encode_deterministic() {
        let params = EncoderParams::init(small_config(), 7);
        let tokens = vocab::tokenize("http://example.com/login", 32).unwrap();

        assert_eq!(params.encode(&tokens), params.encode(&tokens));
    }

    #[test]
    fn test_init_seeded() {
        let a = EncoderParams::init(small_config(), 42);
        let b = EncoderParams::init(small_config(), 42);
        let c = EncoderParams::init(small_config(), 43);

        assert_eq!(a.embedding, b.embedding);
        assert_ne!(a.embedding, c.embedding);
    }

    #[test]
    fn test_forward_prob_in_unit_interval() {
        let params = EncoderParams::init(small_config(), 7);
        let tokens = vocab::tokenize("http://example.com", 32).unwrap();

        let state = params.forward_train(&tokens, 1.0, None);
        assert!(state.prob > 0.0 && state.prob < 1.0);
    }

    #[test]
    fn test_gradient_step_reduces_loss() {
        // One full-batch gradient step on a single example must reduce BCE
        let params = EncoderParams::init(small_config(), 7);
        let tokens = vocab::tokenize("http://phish.example.ru/verify", 32).unwrap();

        let state = params.forward_train(&tokens, 1.0, None);
        let loss_before = bce_loss(state.prob, 1.0);

        let mut grads = EncoderGradients::zeros_like(&params);
        params.backward(&state, &mut grads);

        let mut stepped = params.clone();
        let lr = 0.1;
        stepped.embedding.scaled_add(-lr, &grads.embedding);
        for (w, g) in stepped.conv_weights.iter_mut().zip(&grads.conv_weights) {
            w.scaled_add(-lr, g);
        }
        for (b, g) in stepped.conv_bias.iter_mut().zip(&grads.conv_bias) {
            b.scaled_add(-lr, g);
        }
        stepped.proj_weight.scaled_add(-lr, &grads.proj_weight);
        stepped.proj_bias.scaled_add(-lr, &grads.proj_bias);
        stepped.head_weight.scaled_add(-lr, &grads.head_weight);
        stepped.head_bias -= lr * grads.head_bias;

        let state_after = stepped.forward_train(&tokens, 1.0, None);
        let loss_after = bce_loss(state_after.prob, 1.0);

        assert!(loss_after < loss_before);
    }

    #[test]
    fn test_bce_loss_bounds() {
        assert!(bce_loss(0.5, 1.0) > 0.0);
        assert!(bce_loss(1.0, 1.0) < 1e-5);
        assert!(bce_loss(0.0, 1.0) > 10.0);
    }
}
