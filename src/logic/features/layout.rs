//! Feature Layout - Centralized Feature Schema
//!
//! **CRITICAL: This file controls the feature schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment SCHEMA_VERSION
//! 2. Change order → increment SCHEMA_VERSION
//! 3. Remove feature → increment SCHEMA_VERSION
//!
//! ## Why versioning matters:
//! - Artifact compatibility (normalization stats + trees index by slot)
//! - Training data replay
//! - Cross-version migrations

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current feature schema version
/// MUST be incremented when the layout changes
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in the exact order they appear in the vector
/// This is the SINGLE SOURCE OF TRUTH for the feature schema
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Structural (0-8) ===
    "url_length",            // 0: Total URL length in characters
    "num_dots",              // 1: '.' count across the whole URL
    "num_hyphens",           // 2: '-' count across the whole URL
    "num_slashes",           // 3: '/' count across the whole URL
    "path_depth",            // 4: Non-empty path segments
    "domain_length",         // 5: Host length in characters
    "num_query_params",      // 6: Query parameter count
    "query_length",          // 7: Query string length
    "long_url",              // 8: 1.0 if URL length > 54

    // === Lexical (9-16) ===
    "digit_ratio",           // 9: Digits / total characters
    "url_entropy",           // 10: Shannon entropy of the full URL
    "query_entropy",         // 11: Shannon entropy of the query string
    "domain_entropy",        // 12: Shannon entropy of the host
    "suspicious_words",      // 13: 1.0 if a phishing keyword appears
    "suspicious_extension",  // 14: 1.0 if path ends in a dropper extension
    "contains_at_symbol",    // 15: 1.0 if '@' appears anywhere
    "double_slash_redirect", // 16: 1.0 if "//" recurs past the scheme

    // === Host (17-25) ===
    "num_subdomains",        // 17: '.' count inside the host
    "subdomain_complexity",  // 18: 1.0 if more than two host dots
    "has_ip_literal",        // 19: 1.0 if the host is an IPv4 literal
    "https_scheme",          // 20: 1.0 if the scheme is https
    "non_standard_port",     // 21: 1.0 if an explicit port other than 80/443
    "shortening_service",    // 22: 1.0 if the host is a known shortener
    "unusual_tld",           // 23: 1.0 if the TLD is outside the common set
    "domain_hyphen",         // 24: 1.0 if the host contains '-'
    "domain_underscore",     // 25: 1.0 if the host contains '_'

    // === Registrar / temporal (26-29) ===
    "domain_age_days",       // 26: Days since registration, -1.0 unknown
    "registration_period_days", // 27: Registration window, -1.0 unknown
    "registrar_reputation",  // 28: Registrar score [0,1], -1.0 unknown
    "intel_missing",         // 29: 1.0 when the lookup produced no data
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 30;

// ============================================================================
// SCHEMA HASH
// ============================================================================

/// Compute the CRC32 hash of the feature layout
/// Used to detect schema mismatches when loading artifacts
pub fn compute_schema_hash() -> u32 {
    let mut hasher = Hasher::new();

    // Include version in hash
    hasher.update(&[SCHEMA_VERSION]);

    // Hash all feature names in order
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Get the schema hash (inputs are const, so this is stable per build)
pub fn schema_hash() -> u32 {
    compute_schema_hash()
}

// ============================================================================
// SCHEMA INFO
// ============================================================================

/// Complete schema information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl SchemaInfo {
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            hash: schema_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for SchemaInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// SCHEMA VALIDATION
// ============================================================================

/// Error when a feature schema doesn't match the running extractor
#[derive(Debug, Clone)]
pub struct SchemaMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for SchemaMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature schema mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash
        )
    }
}

impl std::error::Error for SchemaMismatchError {}

/// Validate that incoming data matches the current schema
pub fn validate_schema(incoming_version: u8, incoming_hash: u32) -> Result<(), SchemaMismatchError> {
    let current_hash = schema_hash();

    if incoming_version != SCHEMA_VERSION || incoming_hash != current_hash {
        return Err(SchemaMismatchError {
            expected_version: SCHEMA_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Check if a schema is compatible (same version, same hash)
pub fn is_schema_compatible(version: u8, hash: u32) -> bool {
    version == SCHEMA_VERSION && hash == schema_hash()
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name (O(n) but features are few)
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================
