//! Sequence Encoder - Character-level URL embedding
//!
//! ## Architecture
//! - `vocab.rs` - Fixed character vocabulary + bounded tokenization
//! - `model.rs` - Conv encoder forward/backward (ndarray)
//! - `trainer.rs` - Mini-batch Adam loop with best-epoch checkpointing
//!
//! Training mutates parameters only inside the trainer (single owner);
//! everywhere else the encoder is frozen and `encode` is deterministic.

pub mod model;
pub mod trainer;
pub mod vocab;

pub use model::{bce_loss, sigmoid, EncoderConfig, EncoderParams};
pub use trainer::{EncoderTrainConfig, EncoderTrainReport, EncoderTrainer, TokenExample};
pub use vocab::{tokenize, VOCAB_SIZE};

use crate::logic::features::MalformedInputError;

/// Tokenize and encode a URL with a frozen encoder
pub fn encode_url(params: &EncoderParams, url: &str) -> Result<Vec<f32>, MalformedInputError> {
    let tokens = vocab::tokenize(url, params.config.max_len)?;
    Ok(params.encode(&tokens))
}
