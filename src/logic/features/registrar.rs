//! Registrar / Temporal Feature Extraction
//!
//! Encodes the auxiliary lookup outcome. Missing data never fails
//! extraction: the affected slots take the sentinel value and the
//! companion `intel_missing` indicator is raised so downstream trees can
//! split on missingness itself.

use super::vector::{FeatureFamily, FeatureVector};
use crate::logic::lookup::IntelOutcome;

/// Sentinel for unknown age/period/reputation values
pub const INTEL_SENTINEL: f32 = -1.0;

/// Registrar and temporal features
#[derive(Debug, Clone)]
pub struct RegistrarFeatures {
    pub domain_age_days: f32,
    pub registration_period_days: f32,
    pub registrar_reputation: f32,
    pub intel_missing: bool,
}

impl Default for RegistrarFeatures {
    fn default() -> Self {
        Self {
            domain_age_days: INTEL_SENTINEL,
            registration_period_days: INTEL_SENTINEL,
            registrar_reputation: INTEL_SENTINEL,
            intel_missing: true,
        }
    }
}

impl RegistrarFeatures {
    pub fn from_outcome(outcome: &IntelOutcome) -> Self {
        match outcome {
            IntelOutcome::Present(intel) => Self {
                domain_age_days: intel
                    .age_days
                    .map(|d| d.max(0) as f32)
                    .unwrap_or(INTEL_SENTINEL),
                registration_period_days: intel
                    .registration_period_days
                    .map(|d| d.max(0) as f32)
                    .unwrap_or(INTEL_SENTINEL),
                registrar_reputation: intel
                    .registrar_reputation
                    .unwrap_or(INTEL_SENTINEL),
                // Present-but-empty intel carries no temporal signal
                intel_missing: intel.age_days.is_none(),
            },
            IntelOutcome::Missing(_) => Self::default(),
        }
    }
}

impl FeatureFamily for RegistrarFeatures {
    fn extract(&self, vector: &mut FeatureVector) {
        vector.values[26] = self.domain_age_days;            // domain_age_days
        vector.values[27] = self.registration_period_days;   // registration_period_days
        vector.values[28] = self.registrar_reputation;       // registrar_reputation
        vector.values[29] = if self.intel_missing { 1.0 } else { 0.0 }; // intel_missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::lookup::{DomainIntel, LookupError};

    #[test]
    fn test_present_intel() {
        let outcome = IntelOutcome::Present(DomainIntel {
            age_days: Some(8000),
            registration_period_days: Some(10000),
            registrar: Some("MarkMonitor".to_string()),
            registrar_reputation: Some(0.95),
        });

        let feats = RegistrarFeatures::from_outcome(&outcome);
        assert_eq!(feats.domain_age_days, 8000.0);
        assert_eq!(feats.registration_period_days, 10000.0);
        assert!(!feats.intel_missing);
    }

    #[test]
    fn test_missing_intel_uses_sentinels() {
        let outcome = IntelOutcome::Missing(LookupError::Timeout { timeout_ms: 1500 });

        let feats = RegistrarFeatures::from_outcome(&outcome);
        assert_eq!(feats.domain_age_days, INTEL_SENTINEL);
        assert_eq!(feats.registration_period_days, INTEL_SENTINEL);
        assert_eq!(feats.registrar_reputation, INTEL_SENTINEL);
        assert!(feats.intel_missing);

        let mut vector = FeatureVector::new();
        feats.extract(&mut vector);
        assert_eq!(vector.get_by_name("intel_missing"), Some(1.0));
        assert_eq!(vector.get_by_name("domain_age_days"), Some(INTEL_SENTINEL));
    }

    #[test]
    fn test_present_but_empty_intel_flags_missing() {
        let outcome = IntelOutcome::Present(DomainIntel::default());

        let feats = RegistrarFeatures::from_outcome(&outcome);
        assert!(feats.intel_missing);
        assert_eq!(feats.domain_age_days, INTEL_SENTINEL);
    }

    #[test]
    fn test_negative_age_clamped() {
        // A registration date in the future must not leak a negative age
        let outcome = IntelOutcome::Present(DomainIntel {
            age_days: Some(-3),
            ..Default::default()
        });

        let feats = RegistrarFeatures::from_outcome(&outcome);
        assert_eq!(feats.domain_age_days, 0.0);
    }
}
