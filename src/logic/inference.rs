//! Inference Service - Artifact-driven URL classification
//!
//! Stateless and deterministic for a fixed artifact: extract, encode,
//! fuse, score, threshold. The artifact is read-only and safely shared
//! across any number of concurrent calls; only the auxiliary lookup may
//! touch the network, and it degrades to sentinel features on timeout.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::logic::corpus::UrlRecord;
use crate::logic::encoder;
use crate::logic::features::{self, MalformedInputError, SchemaMismatchError};
use crate::logic::fusion;
use crate::logic::lookup::DomainLookup;
use crate::logic::model::ModelArtifact;

// ============================================================================
// DECISION
// ============================================================================

/// The unit returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Calibrated phishing probability
    pub probability: f32,
    /// 1 = phishing, 0 = legitimate
    pub label: u8,
    /// Threshold the label was cut at
    pub threshold: f32,
    /// Artifact that produced this decision
    pub artifact_version: String,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ClassifyError {
    /// Empty or non-parseable URL; surfaced, never guessed around
    MalformedInput(MalformedInputError),
    /// Artifact feature schema does not match the running extractor
    SchemaMismatch(SchemaMismatchError),
}

impl std::fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifyError::MalformedInput(e) => write!(f, "{}", e),
            ClassifyError::SchemaMismatch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ClassifyError {}

impl From<MalformedInputError> for ClassifyError {
    fn from(e: MalformedInputError) -> Self {
        ClassifyError::MalformedInput(e)
    }
}

impl From<SchemaMismatchError> for ClassifyError {
    fn from(e: SchemaMismatchError) -> Self {
        ClassifyError::SchemaMismatch(e)
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classify one URL against a loaded artifact
pub fn classify(
    record: &UrlRecord,
    artifact: &ModelArtifact,
    lookup: &dyn DomainLookup,
    timeout: Duration,
) -> Result<Decision, ClassifyError> {
    artifact.validate_schema()?;

    let started = Instant::now();

    let vector = features::extract(record, lookup, timeout)?;
    let embedding = encoder::encode_url(&artifact.encoder, &record.url)?;
    let fused = fusion::fuse(&vector, &embedding, &artifact.norm_stats)?;

    let probability = artifact.ensemble.predict(fused.as_slice());
    let label = u8::from(probability >= artifact.threshold);

    log::debug!(
        "Classified '{}' as {} (p={:.4}) in {}us",
        record.url,
        label,
        probability,
        started.elapsed().as_micros()
    );

    Ok(Decision {
        probability,
        label,
        threshold: artifact.threshold,
        artifact_version: artifact.artifact_version.clone(),
    })
}

/// Classify a batch of URLs, fanning out across worker threads
///
/// Each record is an independent pure computation over the shared
/// read-only artifact; per-record failures stay per-record and results
/// come back in input order.
pub fn classify_batch(
    records: &[UrlRecord],
    artifact: &ModelArtifact,
    lookup: &dyn DomainLookup,
    timeout: Duration,
) -> Vec<Result<Decision, ClassifyError>> {
    if records.is_empty() {
        return Vec::new();
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(records.len());

    if workers <= 1 {
        return records
            .iter()
            .map(|r| classify(r, artifact, lookup, timeout))
            .collect();
    }

    let chunk_size = records.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|r| classify(r, artifact, lookup, timeout))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().expect("classification worker panicked"))
            .collect()
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::lookup::{LookupError, NoLookup};
    use crate::logic::model;
    use crate::logic::training::tests::{toy_config, toy_corpus};
    use crate::logic::training::Orchestrator;

    fn trained_artifact() -> ModelArtifact {
        let records = toy_corpus();
        let (artifact, _) = Orchestrator::new(toy_config())
            .run(&records, &NoLookup)
            .unwrap();
        artifact
    }

    #[test]
    fn test_classify_returns_decision() {
        let artifact = trained_artifact();
        let record = UrlRecord::new("http://login-verify.account-check.ru/reset");

        let decision =
            classify(&record, &artifact, &NoLookup, Duration::from_millis(10)).unwrap();

        assert!((0.0..=1.0).contains(&decision.probability));
        assert_eq!(decision.threshold, artifact.threshold);
        assert_eq!(decision.artifact_version, artifact.artifact_version);
    }

    #[test]
    fn test_classify_malformed_input_surfaces() {
        let artifact = trained_artifact();
        let record = UrlRecord::new("   ");

        let result = classify(&record, &artifact, &NoLookup, Duration::from_millis(10));
        assert!(matches!(result, Err(ClassifyError::MalformedInput(_))));
    }

    #[test]
    fn test_classify_survives_lookup_timeout() {
        /// Lookup that always reports a timeout
        struct TimingOut;
        impl DomainLookup for TimingOut {
            fn lookup(
                &self,
                _domain: &str,
                timeout: Duration,
            ) -> Result<crate::logic::lookup::DomainIntel, LookupError> {
                Err(LookupError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }

        let artifact = trained_artifact();
        let record = UrlRecord::new("https://www.example.com/page");

        let decision =
            classify(&record, &artifact, &TimingOut, Duration::from_millis(10)).unwrap();
        assert!((0.0..=1.0).contains(&decision.probability));
    }

    #[test]
    fn test_classify_stale_artifact_fails_fast() {
        let mut artifact = trained_artifact();
        artifact.schema_version = artifact.schema_version.wrapping_add(1);

        let record = UrlRecord::new("https://www.example.com/");
        let result = classify(&record, &artifact, &NoLookup, Duration::from_millis(10));

        assert!(matches!(result, Err(ClassifyError::SchemaMismatch(_))));
    }

    #[test]
    fn test_reloaded_artifact_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let artifact = trained_artifact();
        model::save(&artifact, &path).unwrap();
        let reloaded = model::load(&path).unwrap();

        let record = UrlRecord::new("http://secure-login.verify.tk/session");
        let timeout = Duration::from_millis(10);

        let a = classify(&record, &artifact, &NoLookup, timeout).unwrap();
        let b = classify(&record, &reloaded, &NoLookup, timeout).unwrap();
        let c = classify(&record, &reloaded, &NoLookup, timeout).unwrap();

        assert_eq!(a.probability, b.probability);
        assert_eq!(b.probability, c.probability);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn test_batch_matches_single_and_preserves_order() {
        let artifact = trained_artifact();
        let records: Vec<UrlRecord> = vec![
            UrlRecord::new("http://login-verify.account-check.ru/reset"),
            UrlRecord::new("https://www.wikipedia.org/wiki/Phishing"),
            UrlRecord::new(""),
            UrlRecord::new("https://docs.python.org/3/"),
        ];
        let timeout = Duration::from_millis(10);

        let batch = classify_batch(&records, &artifact, &NoLookup, timeout);
        assert_eq!(batch.len(), records.len());

        for (record, result) in records.iter().zip(&batch) {
            match classify(record, &artifact, &NoLookup, timeout) {
                Ok(single) => {
                    let batched = result.as_ref().unwrap();
                    assert_eq!(batched.probability, single.probability);
                    assert_eq!(batched.label, single.label);
                }
                Err(_) => assert!(result.is_err()),
            }
        }
    }
}
