//! Model Module - Artifact bundle and persistence
//!
//! The artifact is the only persistence surface of the engine: encoder
//! parameters, fusion statistics, ensemble trees, and the calibrated
//! threshold travel together under one version id.

pub mod artifact;

pub use artifact::{load, save, ArtifactError, ModelArtifact};
