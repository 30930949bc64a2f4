//! Feature Fusion - Handcrafted + embedding concatenation
//!
//! Standardizes the handcrafted block with statistics frozen at training
//! time and appends the raw embedding. The stats carry the feature schema
//! version + hash so a stale artifact is rejected instead of silently
//! misaligning slots.
//!
//! Stats are write-once: `NormStats::fit` runs on the training split
//! during feature materialization and nothing mutates them afterwards.

use serde::{Deserialize, Serialize};

use crate::logic::features::layout::{self, FEATURE_COUNT, SCHEMA_VERSION};
use crate::logic::features::{FeatureVector, SchemaMismatchError};

/// Floor applied to per-dimension scales so near-constant features do not
/// blow up the standardized value
pub const SCALE_FLOOR: f32 = 1e-6;

// ============================================================================
// NORMALIZATION STATS
// ============================================================================

/// Per-dimension standardization statistics for the handcrafted block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    /// Feature schema version these stats were fitted against
    pub schema_version: u8,
    /// Feature schema hash these stats were fitted against
    pub schema_hash: u32,
    pub means: Vec<f32>,
    /// Standard deviations, floored at `SCALE_FLOOR`
    pub scales: Vec<f32>,
}

impl NormStats {
    /// Fit statistics over training-split feature vectors only
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let n = vectors.len().max(1) as f64;
        let mut means = vec![0.0f64; FEATURE_COUNT];
        let mut scales = vec![0.0f64; FEATURE_COUNT];

        for vector in vectors {
            for (i, &v) in vector.values.iter().enumerate() {
                means[i] += v as f64;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        for vector in vectors {
            for (i, &v) in vector.values.iter().enumerate() {
                let d = v as f64 - means[i];
                scales[i] += d * d;
            }
        }

        Self {
            schema_version: SCHEMA_VERSION,
            schema_hash: layout::schema_hash(),
            means: means.iter().map(|&m| m as f32).collect(),
            scales: scales
                .iter()
                .map(|&s| ((s / n).sqrt() as f32).max(SCALE_FLOOR))
                .collect(),
        }
    }

    /// Validate against the running feature schema
    pub fn validate(&self) -> Result<(), SchemaMismatchError> {
        layout::validate_schema(self.schema_version, self.schema_hash)
    }
}

// ============================================================================
// FUSED VECTOR
// ============================================================================

/// Concatenation of the standardized handcrafted block and the embedding
///
/// Order is fixed: handcrafted-then-embedding. Length is
/// `FEATURE_COUNT + embedding_dim` for every vector a given artifact
/// produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedVector {
    pub schema_version: u8,
    pub schema_hash: u32,
    pub values: Vec<f32>,
}

impl FusedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fuse one handcrafted vector with its embedding
///
/// Pure and allocation-light: one output vector, no stat mutation.
/// Fails when the vector or the stats disagree with the running schema.
pub fn fuse(
    features: &FeatureVector,
    embedding: &[f32],
    stats: &NormStats,
) -> Result<FusedVector, SchemaMismatchError> {
    features.validate()?;
    stats.validate()?;

    let mut values = Vec::with_capacity(FEATURE_COUNT + embedding.len());

    for i in 0..FEATURE_COUNT {
        values.push((features.values[i] - stats.means[i]) / stats.scales[i]);
    }
    values.extend_from_slice(embedding);

    Ok(FusedVector {
        schema_version: features.version,
        schema_hash: features.schema_hash,
        values,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vectors() -> Vec<FeatureVector> {
        let mut a = FeatureVector::new();
        let mut b = FeatureVector::new();
        a.values[0] = 10.0;
        b.values[0] = 30.0;
        a.values[9] = 0.2;
        b.values[9] = 0.4;
        vec![a, b]
    }

    #[test]
    fn test_fit_means_and_scales() {
        let stats = NormStats::fit(&sample_vectors());

        assert_eq!(stats.means[0], 20.0);
        assert_eq!(stats.scales[0], 10.0);
        assert!((stats.means[9] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_constant_feature_hits_scale_floor() {
        let stats = NormStats::fit(&sample_vectors());

        // Slot 1 is constant zero across the sample
        assert_eq!(stats.scales[1], SCALE_FLOOR);
    }

    #[test]
    fn test_fuse_order_and_length() {
        let vectors = sample_vectors();
        let stats = NormStats::fit(&vectors);
        let embedding = vec![0.5, -0.5, 2.0];

        let fused = fuse(&vectors[0], &embedding, &stats).unwrap();

        assert_eq!(fused.len(), FEATURE_COUNT + 3);
        // Handcrafted block standardized: (10 - 20) / 10 = -1
        assert!((fused.values[0] + 1.0).abs() < 1e-6);
        // Embedding appended raw
        assert_eq!(&fused.values[FEATURE_COUNT..], &embedding[..]);
    }

    #[test]
    fn test_fuse_rejects_stale_stats() {
        let vectors = sample_vectors();
        let mut stats = NormStats::fit(&vectors);
        stats.schema_version += 1;

        assert!(fuse(&vectors[0], &[0.0], &stats).is_err());
    }

    #[test]
    fn test_fuse_is_deterministic() {
        let vectors = sample_vectors();
        let stats = NormStats::fit(&vectors);

        let a = fuse(&vectors[0], &[1.0, 2.0], &stats).unwrap();
        let b = fuse(&vectors[0], &[1.0, 2.0], &stats).unwrap();
        assert_eq!(a.values, b.values);
    }
}
