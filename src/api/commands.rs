//! Command Surface - train / predict operations
//!
//! Thin boundary between the CLI and the engines: engine errors are
//! mapped to user-facing strings here, nowhere else.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::config::TrainingConfig;
use crate::logic::corpus::{self, UrlRecord};
use crate::logic::inference::{self, Decision};
use crate::logic::lookup::RdapClient;
use crate::logic::model;
use crate::logic::training::{Orchestrator, TrainReport};

/// Result of a `train` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub artifact_path: String,
    pub report: TrainReport,
}

/// Train a model from a labeled corpus and write the artifact
pub fn train(corpus_path: &str, artifact_out: Option<&str>) -> Result<TrainOutcome, String> {
    let (records, report) = corpus::load(Path::new(corpus_path)).map_err(|e| e.to_string())?;

    if report.rejected > 0 {
        log::warn!("{} corpus rows rejected during load", report.rejected);
    }

    let config = TrainingConfig::default();
    let lookup = RdapClient::new();

    let mut orchestrator = Orchestrator::new(config);
    let (artifact, train_report) = orchestrator
        .run(&records, &lookup)
        .map_err(|e| e.to_string())?;

    let out_path: PathBuf = artifact_out
        .map(PathBuf::from)
        .unwrap_or_else(constants::get_default_artifact_path);
    model::save(&artifact, &out_path).map_err(|e| e.to_string())?;

    Ok(TrainOutcome {
        artifact_path: out_path.to_string_lossy().into_owned(),
        report: train_report,
    })
}

/// Classify one URL against a stored artifact
pub fn predict(url: &str, artifact_path: Option<&str>) -> Result<Decision, String> {
    let path: PathBuf = artifact_path
        .map(PathBuf::from)
        .unwrap_or_else(constants::get_default_artifact_path);

    let artifact = model::load(&path).map_err(|e| e.to_string())?;
    let lookup = RdapClient::new();
    let record = UrlRecord::new(url);

    inference::classify(&record, &artifact, &lookup, constants::get_lookup_timeout())
        .map_err(|e| e.to_string())
}
