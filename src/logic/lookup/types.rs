//! Auxiliary Lookup Types
//!
//! Tagged results for the pluggable domain-intelligence capability.
//! Extraction consumes `IntelOutcome` uniformly instead of branching on
//! ad-hoc presence checks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// DOMAIN INTEL
// ============================================================================

/// Registrar/temporal facts about a domain, as far as the source knows them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainIntel {
    /// Days since registration
    pub age_days: Option<i64>,
    /// Days between registration and expiration
    pub registration_period_days: Option<i64>,
    /// Registrar name or handle
    pub registrar: Option<String>,
    /// Registrar reputation in [0, 1]
    pub registrar_reputation: Option<f32>,
}

/// Tagged lookup outcome consumed by the feature extractor
///
/// `Missing` carries the reason for logging but extraction treats every
/// missing outcome the same way: sentinel values plus the missingness
/// indicator feature.
#[derive(Debug, Clone)]
pub enum IntelOutcome {
    Present(DomainIntel),
    Missing(LookupError),
}

impl IntelOutcome {
    pub fn is_present(&self) -> bool {
        matches!(self, IntelOutcome::Present(_))
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Lookup error types
///
/// None of these are fatal for classification: the extractor recovers
/// locally with sentinel features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LookupError {
    /// Lookup exceeded the caller-supplied timeout
    Timeout { timeout_ms: u64 },
    /// Network error
    Network { message: String },
    /// Response could not be parsed
    Parse { message: String },
    /// Domain not found at the source
    NotFound,
    /// Lookup disabled or not configured
    Unavailable,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Timeout { timeout_ms } => {
                write!(f, "Lookup timed out after {} ms", timeout_ms)
            }
            LookupError::Network { message } => write!(f, "Network error: {}", message),
            LookupError::Parse { message } => write!(f, "Parse error: {}", message),
            LookupError::NotFound => write!(f, "Domain not found"),
            LookupError::Unavailable => write!(f, "Lookup unavailable"),
        }
    }
}

impl std::error::Error for LookupError {}

// ============================================================================
// CAPABILITY TRAIT
// ============================================================================

/// Pluggable domain-intelligence capability
///
/// The timeout is supplied by the caller on every invocation; an
/// implementation must return within it or report `LookupError::Timeout`.
/// The result is advisory - callers never hard-depend on it.
pub trait DomainLookup: Send + Sync {
    fn lookup(&self, domain: &str, timeout: Duration) -> Result<DomainIntel, LookupError>;
}

/// Lookup that always reports unavailability
///
/// Used when classification should run on lexical/host features alone.
#[derive(Debug, Clone, Default)]
pub struct NoLookup;

impl DomainLookup for NoLookup {
    fn lookup(&self, _domain: &str, _timeout: Duration) -> Result<DomainIntel, LookupError> {
        Err(LookupError::Unavailable)
    }
}

/// In-memory lookup backed by a fixed table
///
/// Test double, also usable for replaying recorded intel.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: std::collections::HashMap<String, DomainIntel>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str, intel: DomainIntel) {
        self.entries.insert(domain.to_lowercase(), intel);
    }
}

impl DomainLookup for StaticLookup {
    fn lookup(&self, domain: &str, _timeout: Duration) -> Result<DomainIntel, LookupError> {
        self.entries
            .get(&domain.to_lowercase())
            .cloned()
            .ok_or(LookupError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup() {
        let mut lookup = StaticLookup::new();
        lookup.insert(
            "example.com",
            DomainIntel {
                age_days: Some(9000),
                ..Default::default()
            },
        );

        let intel = lookup
            .lookup("EXAMPLE.com", Duration::from_millis(100))
            .unwrap();
        assert_eq!(intel.age_days, Some(9000));

        assert!(lookup
            .lookup("missing.com", Duration::from_millis(100))
            .is_err());
    }

    #[test]
    fn test_no_lookup_is_always_missing() {
        let lookup = NoLookup;
        assert!(lookup
            .lookup("example.com", Duration::from_millis(100))
            .is_err());
    }
}
