//! Training Orchestrator - Strict forward state machine
//!
//! `Initialized → DataSplit → EncoderTraining → FeatureMaterialization →
//! EnsembleTraining → ThresholdCalibration → Finalized`, with `Aborted`
//! terminal on unrecoverable error. A run emits exactly one immutable
//! artifact; retraining is always a fresh orchestration, never a resume.
//!
//! Leakage rules enforced here: normalization statistics are fitted on
//! the training split only, encoder parameters come from the best
//! validation epoch, and the threshold is calibrated on validation and
//! reported against the untouched test split.

pub mod calibrate;
pub mod split;

use serde::{Deserialize, Serialize};

use crate::logic::config::TrainingConfig;
use crate::logic::corpus::UrlRecord;
use crate::logic::encoder::{self, EncoderTrainReport, EncoderTrainer, TokenExample};
use crate::logic::ensemble::{self, GbdtTrainReport};
use crate::logic::features::{self, FeatureVector, MalformedInputError};
use crate::logic::fusion::{self, NormStats};
use crate::logic::lookup::DomainLookup;
use crate::logic::model::{ArtifactError, ModelArtifact};
use calibrate::ThresholdMetrics;

// ============================================================================
// STAGES
// ============================================================================

/// Orchestration stages, strictly forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Initialized,
    DataSplit,
    EncoderTraining,
    FeatureMaterialization,
    EnsembleTraining,
    ThresholdCalibration,
    Finalized,
    Aborted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initialized => "Initialized",
            Stage::DataSplit => "DataSplit",
            Stage::EncoderTraining => "EncoderTraining",
            Stage::FeatureMaterialization => "FeatureMaterialization",
            Stage::EnsembleTraining => "EnsembleTraining",
            Stage::ThresholdCalibration => "ThresholdCalibration",
            Stage::Finalized => "Finalized",
            Stage::Aborted => "Aborted",
        }
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Unrecoverable training failure, tagged with the stage that hit it
#[derive(Debug)]
pub enum TrainingError {
    /// Empty or single-class data where training compute would be wasted
    DegenerateData { stage: &'static str, message: String },
    /// A corpus record that survived loading but cannot be featurized
    Input(MalformedInputError),
    Artifact(ArtifactError),
}

impl TrainingError {
    pub fn degenerate(stage: &'static str, message: impl Into<String>) -> Self {
        TrainingError::DegenerateData {
            stage,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingError::DegenerateData { stage, message } => {
                write!(f, "Degenerate training data at {}: {}", stage, message)
            }
            TrainingError::Input(e) => write!(f, "{}", e),
            TrainingError::Artifact(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrainingError {}

impl From<MalformedInputError> for TrainingError {
    fn from(e: MalformedInputError) -> Self {
        TrainingError::Input(e)
    }
}

impl From<ArtifactError> for TrainingError {
    fn from(e: ArtifactError) -> Self {
        TrainingError::Artifact(e)
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub artifact_version: String,
    pub train_size: usize,
    pub val_size: usize,
    pub test_size: usize,
    pub encoder: EncoderTrainReport,
    pub ensemble: GbdtTrainReport,
    pub threshold: f32,
    /// Calibration-split metrics at the chosen threshold
    pub validation: ThresholdMetrics,
    /// Held-out metrics at the chosen threshold
    pub test: ThresholdMetrics,
}

// ============================================================================
// MATERIALIZED SPLIT
// ============================================================================

/// One split with frozen fused vectors and labels
struct Materialized {
    fused: Vec<Vec<f32>>,
    labels: Vec<f32>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator {
    config: TrainingConfig,
    stage: Stage,
}

impl Orchestrator {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            stage: Stage::Initialized,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        log::info!("Training stage: {} -> {}", self.stage.as_str(), stage.as_str());
        self.stage = stage;
    }

    /// Run the full orchestration over a labeled corpus
    ///
    /// Any error leaves the orchestrator in `Aborted`; the partial state
    /// is dropped and no artifact is emitted.
    pub fn run(
        &mut self,
        records: &[UrlRecord],
        lookup: &dyn DomainLookup,
    ) -> Result<(ModelArtifact, TrainReport), TrainingError> {
        match self.run_stages(records, lookup) {
            Ok(result) => Ok(result),
            Err(e) => {
                log::error!("Training aborted at {}: {}", self.stage.as_str(), e);
                self.stage = Stage::Aborted;
                Err(e)
            }
        }
    }

    fn run_stages(
        &mut self,
        records: &[UrlRecord],
        lookup: &dyn DomainLookup,
    ) -> Result<(ModelArtifact, TrainReport), TrainingError> {
        let config = self.config.clone();

        // --- DataSplit ---
        self.advance(Stage::DataSplit);
        let sets = split::stratified_split(
            records,
            config.train_fraction,
            config.val_fraction,
            config.seed,
        )?;

        // --- EncoderTraining ---
        self.advance(Stage::EncoderTraining);
        let train_tokens = tokenize_split(&sets.train, config.encoder.max_len)?;
        let val_tokens = tokenize_split(&sets.val, config.encoder.max_len)?;

        let trainer = EncoderTrainer::new(config.encoder_train.clone(), config.seed);
        let (encoder_params, encoder_report) =
            trainer.train(config.encoder.clone(), &train_tokens, &val_tokens);

        // --- FeatureMaterialization ---
        self.advance(Stage::FeatureMaterialization);
        let timeout = config.lookup_timeout();

        let train_features = extract_split(&sets.train, lookup, timeout)?;

        // Stats come from the training split only; validation and test
        // are standardized with them, never refitted
        let norm_stats = NormStats::fit(&train_features);

        let train_mat = materialize(&sets.train, train_features, &encoder_params, &norm_stats)?;
        let val_features = extract_split(&sets.val, lookup, timeout)?;
        let val_mat = materialize(&sets.val, val_features, &encoder_params, &norm_stats)?;
        let test_features = extract_split(&sets.test, lookup, timeout)?;
        let test_mat = materialize(&sets.test, test_features, &encoder_params, &norm_stats)?;

        // --- EnsembleTraining ---
        self.advance(Stage::EnsembleTraining);
        let (ensemble_model, ensemble_report) = ensemble::fit(
            &train_mat.fused,
            &train_mat.labels,
            &val_mat.fused,
            &val_mat.labels,
            &config.ensemble,
        );

        if ensemble_report.best_round == 0 {
            log::warn!("Ensemble kept zero trees; the baseline prior carries all predictions");
        }

        // --- ThresholdCalibration ---
        self.advance(Stage::ThresholdCalibration);
        let val_probs: Vec<f32> = val_mat.fused.iter().map(|x| ensemble_model.predict(x)).collect();
        let test_probs: Vec<f32> = test_mat.fused.iter().map(|x| ensemble_model.predict(x)).collect();

        let threshold = calibrate::calibrate(&val_probs, &val_mat.labels, &config.cost);
        let validation = calibrate::evaluate(&val_probs, &val_mat.labels, threshold, &config.cost);
        let test = calibrate::evaluate(&test_probs, &test_mat.labels, threshold, &config.cost);

        log::info!(
            "Calibrated threshold {:.4}: val recall {:.3} precision {:.3}, test recall {:.3} precision {:.3}",
            threshold,
            validation.recall,
            validation.precision,
            test.recall,
            test.precision
        );

        // --- Finalized ---
        self.advance(Stage::Finalized);
        let artifact = ModelArtifact::assemble(encoder_params, norm_stats, ensemble_model, threshold);

        let report = TrainReport {
            artifact_version: artifact.artifact_version.clone(),
            train_size: sets.train.len(),
            val_size: sets.val.len(),
            test_size: sets.test.len(),
            encoder: encoder_report,
            ensemble: ensemble_report,
            threshold,
            validation,
            test,
        };

        Ok((artifact, report))
    }
}

// ============================================================================
// MATERIALIZATION HELPERS
// ============================================================================

fn tokenize_split(records: &[UrlRecord], max_len: usize) -> Result<Vec<TokenExample>, TrainingError> {
    records
        .iter()
        .map(|r| {
            let tokens = encoder::tokenize(&r.url, max_len)?;
            Ok((tokens, f32::from(r.label.unwrap_or(0))))
        })
        .collect()
}

fn extract_split(
    records: &[UrlRecord],
    lookup: &dyn DomainLookup,
    timeout: std::time::Duration,
) -> Result<Vec<FeatureVector>, TrainingError> {
    records
        .iter()
        .map(|r| Ok(features::extract(r, lookup, timeout)?))
        .collect()
}

/// Fuse frozen features and embeddings for one split
fn materialize(
    records: &[UrlRecord],
    feature_vectors: Vec<FeatureVector>,
    encoder_params: &crate::logic::encoder::EncoderParams,
    norm_stats: &NormStats,
) -> Result<Materialized, TrainingError> {
    let mut fused = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());

    for (record, vector) in records.iter().zip(&feature_vectors) {
        let embedding = encoder::encode_url(encoder_params, &record.url)?;
        let fused_vector = fusion::fuse(vector, &embedding, norm_stats)
            .map_err(|e| TrainingError::Artifact(ArtifactError::SchemaMismatch(e)))?;
        fused.push(fused_vector.values);
        labels.push(f32::from(record.label.unwrap_or(0)));
    }

    Ok(Materialized { fused, labels })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logic::encoder::{EncoderConfig, EncoderTrainConfig};
    use crate::logic::ensemble::{GbdtConfig, TreeParams};
    use crate::logic::lookup::{DomainIntel, NoLookup, StaticLookup};

    /// Small but separable corpus: phishing URLs carry keyword/hyphen/TLD
    /// markers, legitimate ones do not
    pub(crate) fn toy_corpus() -> Vec<UrlRecord> {
        let mut records = Vec::new();

        let phishing_hosts = [
            "paypal-login.verify-account.ru",
            "secure-update.bank-alerts.tk",
            "signin-appleid.confirm-info.cn",
            "account-verify.webmail-login.ru",
            "update-billing.secure-pay.tk",
            "login-session.bank-check.cn",
        ];
        for (i, host) in phishing_hosts.iter().enumerate() {
            for j in 0..4 {
                records.push(UrlRecord::labeled(
                    format!("http://{}/reset/{}{}", host, i, j),
                    1,
                ));
            }
        }

        let benign_hosts = [
            "www.wikipedia.org",
            "www.example.com",
            "docs.python.org",
            "news.mit.edu",
            "www.rust-lang.org",
            "store.example.net",
        ];
        for (i, host) in benign_hosts.iter().enumerate() {
            for j in 0..4 {
                records.push(UrlRecord::labeled(
                    format!("https://{}/articles/{}{}", host, i, j),
                    0,
                ));
            }
        }

        records
    }

    /// Fast hyperparameters for orchestration tests
    pub(crate) fn toy_config() -> TrainingConfig {
        TrainingConfig {
            seed: 42,
            train_fraction: 0.6,
            val_fraction: 0.2,
            encoder: EncoderConfig {
                max_len: 64,
                embed_dim: 8,
                kernel_sizes: vec![3],
                num_filters: 8,
                output_dim: 8,
                dropout: 0.0,
            },
            encoder_train: EncoderTrainConfig {
                max_epochs: 8,
                batch_size: 8,
                learning_rate: 0.01,
                patience: 8,
                min_delta: 0.0,
            },
            ensemble: GbdtConfig {
                max_rounds: 30,
                learning_rate: 0.3,
                tree: TreeParams {
                    max_depth: 3,
                    min_leaf: 2,
                    lambda: 1.0,
                },
                patience: 10,
                min_delta: 1e-6,
            },
            cost: Default::default(),
            lookup_timeout_ms: 10,
        }
    }

    #[test]
    fn test_full_orchestration_produces_artifact() {
        let records = toy_corpus();
        let mut orchestrator = Orchestrator::new(toy_config());

        let (artifact, report) = orchestrator.run(&records, &NoLookup).unwrap();

        assert_eq!(orchestrator.stage(), Stage::Finalized);
        assert!(!artifact.artifact_version.is_empty());
        assert!((0.0..=1.0).contains(&artifact.threshold));
        assert_eq!(report.threshold, artifact.threshold);
        assert_eq!(
            report.train_size + report.val_size + report.test_size,
            records.len()
        );
    }

    #[test]
    fn test_orchestration_aborts_on_single_class() {
        let records: Vec<UrlRecord> = toy_corpus()
            .into_iter()
            .filter(|r| r.label == Some(1))
            .collect();

        let mut orchestrator = Orchestrator::new(toy_config());
        let result = orchestrator.run(&records, &NoLookup);

        assert!(matches!(
            result,
            Err(TrainingError::DegenerateData { stage: "DataSplit", .. })
        ));
        assert_eq!(orchestrator.stage(), Stage::Aborted);
    }

    #[test]
    fn test_orchestration_aborts_on_empty_corpus() {
        let mut orchestrator = Orchestrator::new(toy_config());
        assert!(orchestrator.run(&[], &NoLookup).is_err());
        assert_eq!(orchestrator.stage(), Stage::Aborted);
    }

    #[test]
    fn test_norm_stats_fitted_on_train_only() {
        // Attach extreme intel to exactly one validation-destined record:
        // if stats leaked from validation, the mean of the age slot would
        // move. Instead we verify stats equal a manual fit on the train
        // split alone.
        let records = toy_corpus();
        let config = toy_config();
        let sets = split::stratified_split(
            &records,
            config.train_fraction,
            config.val_fraction,
            config.seed,
        )
        .unwrap();

        let timeout = config.lookup_timeout();
        let train_features = extract_split(&sets.train, &NoLookup, timeout).unwrap();
        let expected = NormStats::fit(&train_features);

        let mut orchestrator = Orchestrator::new(config);
        let (artifact, _) = orchestrator.run(&records, &NoLookup).unwrap();

        assert_eq!(artifact.norm_stats, expected);
    }

    #[test]
    fn test_artifact_scores_scenario_urls() {
        let records = toy_corpus();
        let mut lookup = StaticLookup::new();
        lookup.insert(
            "paypal-secure-login.verify-account.ru",
            DomainIntel {
                age_days: Some(12),
                registration_period_days: Some(365),
                registrar: Some("REG.RU".to_string()),
                registrar_reputation: Some(0.2),
            },
        );
        lookup.insert(
            "www.wikipedia.org",
            DomainIntel {
                age_days: Some(9000),
                registration_period_days: Some(12000),
                registrar: Some("MarkMonitor".to_string()),
                registrar_reputation: Some(0.95),
            },
        );

        let mut orchestrator = Orchestrator::new(toy_config());
        let (artifact, _) = orchestrator.run(&records, &lookup).unwrap();

        let classify = |url: &str| {
            crate::logic::inference::classify(
                &UrlRecord::new(url),
                &artifact,
                &lookup,
                std::time::Duration::from_millis(10),
            )
            .unwrap()
        };

        let phishy = classify("http://paypal-secure-login.verify-account.ru/reset");
        let benign = classify("https://www.wikipedia.org/wiki/Phishing");

        assert!(
            phishy.probability > benign.probability,
            "phishing URL must outscore the benign one ({} vs {})",
            phishy.probability,
            benign.probability
        );
        assert!(phishy.probability >= artifact.threshold);
        assert_eq!(phishy.label, 1);
        assert!(benign.probability < artifact.threshold);
        assert_eq!(benign.label, 0);
    }

    #[test]
    fn test_two_runs_produce_distinct_artifacts() {
        let records = toy_corpus();

        let (a, _) = Orchestrator::new(toy_config()).run(&records, &NoLookup).unwrap();
        let (b, _) = Orchestrator::new(toy_config()).run(&records, &NoLookup).unwrap();

        // Same seed, same data: same model, but always a new artifact id
        assert_ne!(a.artifact_version, b.artifact_version);
        assert_eq!(a.threshold, b.threshold);
        assert_eq!(a.norm_stats, b.norm_stats);
    }
}
