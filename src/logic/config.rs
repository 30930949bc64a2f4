//! Training Configuration
//!
//! One serde-able bundle of every knob a training run consumes. Defaults
//! are the validated starting point; the early-stopping machinery in the
//! encoder and ensemble trainers does the real hyperparameter policing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::logic::encoder::{EncoderConfig, EncoderTrainConfig};
use crate::logic::ensemble::GbdtConfig;
use crate::logic::training::calibrate::CostConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for splitting, shuffling, dropout, and parameter init
    pub seed: u64,
    /// Fraction of the corpus assigned to the training split
    pub train_fraction: f32,
    /// Fraction assigned to validation; the remainder is held-out test
    pub val_fraction: f32,
    pub encoder: EncoderConfig,
    pub encoder_train: EncoderTrainConfig,
    pub ensemble: GbdtConfig,
    pub cost: CostConfig,
    /// Auxiliary lookup timeout during feature materialization
    pub lookup_timeout_ms: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            train_fraction: 0.7,
            val_fraction: 0.15,
            encoder: EncoderConfig::default(),
            encoder_train: EncoderTrainConfig::default(),
            ensemble: GbdtConfig::default(),
            cost: CostConfig::default(),
            lookup_timeout_ms: constants::DEFAULT_LOOKUP_TIMEOUT_MS,
        }
    }
}

impl TrainingConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fractions_leave_test_split() {
        let config = TrainingConfig::default();
        assert!(config.train_fraction + config.val_fraction < 1.0);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = TrainingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TrainingConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.seed, config.seed);
        assert_eq!(back.encoder.max_len, config.encoder.max_len);
    }
}
