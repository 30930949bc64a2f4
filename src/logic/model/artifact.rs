//! Model Artifact - Versioned, self-describing model bundle
//!
//! A training run emits exactly one artifact; nothing ever mutates one in
//! place. The on-disk form wraps the serialized payload with a sha256
//! checksum, and loading fails fast on checksum or feature-schema
//! mismatch instead of silently misaligning vectors.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants;
use crate::logic::encoder::EncoderParams;
use crate::logic::ensemble::GbdtModel;
use crate::logic::features::layout::{self, SchemaMismatchError};
use crate::logic::fusion::NormStats;

/// Bundle format version (the wrapper, not the feature schema)
const BUNDLE_FORMAT: u8 = 1;

// ============================================================================
// ARTIFACT
// ============================================================================

/// Immutable model bundle produced by one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Unique id of this training run's output
    pub artifact_version: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Engine version that produced the artifact
    pub app_version: String,
    /// Feature schema the fusion stats and trees index into
    pub schema_version: u8,
    pub schema_hash: u32,
    pub encoder: EncoderParams,
    pub norm_stats: NormStats,
    pub ensemble: GbdtModel,
    /// Calibrated decision threshold
    pub threshold: f32,
}

impl ModelArtifact {
    /// Assemble a fresh artifact with a new version id
    pub fn assemble(
        encoder: EncoderParams,
        norm_stats: NormStats,
        ensemble: GbdtModel,
        threshold: f32,
    ) -> Self {
        Self {
            artifact_version: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            app_version: constants::APP_VERSION.to_string(),
            schema_version: layout::SCHEMA_VERSION,
            schema_hash: layout::schema_hash(),
            encoder,
            norm_stats,
            ensemble,
            threshold,
        }
    }

    /// Validate against the running feature schema
    pub fn validate_schema(&self) -> Result<(), SchemaMismatchError> {
        layout::validate_schema(self.schema_version, self.schema_hash)
    }

    /// Width of the fused vectors this artifact consumes
    pub fn fused_width(&self) -> usize {
        layout::FEATURE_COUNT + self.encoder.config.output_dim
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ArtifactError {
    Io { message: String },
    Parse { message: String },
    /// Stored checksum does not match the payload
    ChecksumMismatch,
    /// Artifact feature schema does not match the running extractor
    SchemaMismatch(SchemaMismatchError),
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactError::Io { message } => write!(f, "Artifact I/O error: {}", message),
            ArtifactError::Parse { message } => write!(f, "Artifact parse error: {}", message),
            ArtifactError::ChecksumMismatch => write!(f, "Artifact checksum mismatch"),
            ArtifactError::SchemaMismatch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ArtifactError {}

impl From<SchemaMismatchError> for ArtifactError {
    fn from(e: SchemaMismatchError) -> Self {
        ArtifactError::SchemaMismatch(e)
    }
}

// ============================================================================
// ON-DISK BUNDLE
// ============================================================================

/// Wrapper stored on disk: payload JSON plus its sha256
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactBundle {
    format: u8,
    checksum_sha256: String,
    payload: String,
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ============================================================================
// SAVE / LOAD
// ============================================================================

/// Write an artifact bundle to disk
pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ArtifactError::Io {
            message: format!("cannot create {:?}: {}", parent, e),
        })?;
    }

    let payload = serde_json::to_string(artifact).map_err(|e| ArtifactError::Parse {
        message: e.to_string(),
    })?;

    let bundle = ArtifactBundle {
        format: BUNDLE_FORMAT,
        checksum_sha256: sha256_hex(payload.as_bytes()),
        payload,
    };

    let serialized = serde_json::to_string(&bundle).map_err(|e| ArtifactError::Parse {
        message: e.to_string(),
    })?;

    fs::write(path, serialized).map_err(|e| ArtifactError::Io {
        message: format!("cannot write {:?}: {}", path, e),
    })?;

    log::info!(
        "Saved model artifact {} to {:?}",
        artifact.artifact_version,
        path
    );

    Ok(())
}

/// Load and verify an artifact bundle
///
/// Fails fast on checksum mismatch and on feature-schema mismatch; a
/// stale artifact is never auto-migrated.
pub fn load(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let serialized = fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        message: format!("cannot read {:?}: {}", path, e),
    })?;

    let bundle: ArtifactBundle =
        serde_json::from_str(&serialized).map_err(|e| ArtifactError::Parse {
            message: e.to_string(),
        })?;

    if sha256_hex(bundle.payload.as_bytes()) != bundle.checksum_sha256 {
        return Err(ArtifactError::ChecksumMismatch);
    }

    let artifact: ModelArtifact =
        serde_json::from_str(&bundle.payload).map_err(|e| ArtifactError::Parse {
            message: e.to_string(),
        })?;

    artifact.validate_schema()?;
    artifact.norm_stats.validate()?;

    log::info!(
        "Loaded model artifact {} (created {}, threshold {:.3})",
        artifact.artifact_version,
        artifact.created_at,
        artifact.threshold
    );

    Ok(artifact)
}

// ============================================================================
// TESTS
// ============================================================================
