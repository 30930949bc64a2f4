//! Feature Vector - Core data structure for classifier input
//!
//! **Versioned feature vector with schema validation**
//!
//! Uses the centralized layout from `layout.rs` for:
//! - Consistent feature ordering
//! - Version tracking
//! - Schema hash for mismatch detection

use serde::{Deserialize, Serialize};
use super::layout::{
    FEATURE_COUNT, SCHEMA_VERSION, FEATURE_LAYOUT,
    schema_hash, validate_schema, SchemaMismatchError,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned feature vector with schema metadata
///
/// This struct MUST be used for all handcrafted feature data. Raw
/// `Vec<f32>` slices lose the schema tag and defeat mismatch detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature schema version
    pub version: u8,
    /// CRC32 hash of the feature schema (for mismatch detection)
    pub schema_hash: u32,
    /// Feature values in the order defined by FEATURE_LAYOUT
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a new zeroed feature vector with the current version
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            schema_hash: schema_hash(),
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// Create from raw values with the current version
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: SCHEMA_VERSION,
            schema_hash: schema_hash(),
            values,
        }
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Set feature by index
    pub fn set(&mut self, index: usize, value: f32) {
        if index < FEATURE_COUNT {
            self.values[index] = value;
        }
    }

    /// Set feature by name
    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        if let Some(index) = super::layout::feature_index(name) {
            self.set(index, value);
            true
        } else {
            false
        }
    }

    /// Validate that this vector is compatible with the current schema
    pub fn validate(&self) -> Result<(), SchemaMismatchError> {
        validate_schema(self.version, self.schema_hash)
    }

    /// Check if this vector is compatible with the current schema
    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    /// Feature names for this vector
    pub fn feature_names(&self) -> &'static [&'static str] {
        FEATURE_LAYOUT
    }

    /// Convert to a JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "schema_version": self.version,
            "schema_hash": self.schema_hash,
            "values": self.values,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::HashMap<_, _>>(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

// ============================================================================
// FEATURE EXTRACTOR TRAIT
// ============================================================================

/// Trait for per-family feature extractors
///
/// Each family writes only its own slots; `features::extract` wires the
/// families together into one vector.
pub trait FeatureFamily {
    /// Extract features and update the vector
    fn extract(&self, vector: &mut FeatureVector);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_new() {
        let vector = FeatureVector::new();
        assert_eq!(vector.version, SCHEMA_VERSION);
        assert_eq!(vector.schema_hash, schema_hash());
        assert_eq!(vector.values.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_feature_vector_set_by_name() {
        let mut vector = FeatureVector::new();
        assert!(vector.set_by_name("url_length", 42.0));
        assert_eq!(vector.get_by_name("url_length"), Some(42.0));

        assert!(!vector.set_by_name("nonexistent", 0.0));
    }

    #[test]
    fn test_feature_vector_validation() {
        let vector = FeatureVector::new();
        assert!(vector.is_compatible());
        assert!(vector.validate().is_ok());

        let mut stale = FeatureVector::new();
        stale.version = SCHEMA_VERSION + 1;
        assert!(!stale.is_compatible());
    }

    #[test]
    fn test_feature_vector_from_array() {
        let array = [1.0; FEATURE_COUNT];
        let vector: FeatureVector = array.into();

        assert_eq!(vector.version, SCHEMA_VERSION);
        assert_eq!(vector.values, array);
    }

    #[test]
    fn test_to_log_entry() {
        let mut vector = FeatureVector::new();
        vector.set_by_name("url_length", 50.0);

        let log = vector.to_log_entry();
        assert_eq!(log["schema_version"], SCHEMA_VERSION);
        assert!(log["schema_hash"].as_u64().is_some());
    }
}
