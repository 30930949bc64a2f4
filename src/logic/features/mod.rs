//! Feature Extraction - Handcrafted URL features
//!
//! ## Architecture
//! - `layout.rs` - Feature schema (versioned, hashed)
//! - `vector.rs` - Versioned FeatureVector
//! - `structural.rs` / `lexical.rs` / `host.rs` / `registrar.rs` - families
//!
//! `extract` is a pure function of the record, the parsed URL, and the
//! lookup outcome. The lookup is the only side effect and is bounded by
//! the caller-supplied timeout; its failure is never fatal.

pub mod host;
pub mod layout;
pub mod lexical;
pub mod registrar;
pub mod structural;
pub mod vector;


pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, SCHEMA_VERSION, SchemaInfo, SchemaMismatchError};
pub use vector::{FeatureFamily, FeatureVector};

use std::time::Duration;
use url::Url;

use crate::logic::corpus::UrlRecord;
use crate::logic::lookup::{self, DomainLookup, IntelOutcome};

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Input that cannot be featurized: empty or non-parseable URL
///
/// Surfaced to the caller, never retried.
#[derive(Debug, Clone)]
pub struct MalformedInputError {
    pub reason: String,
}

impl MalformedInputError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl std::fmt::Display for MalformedInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed input: {}", self.reason)
    }
}

impl std::error::Error for MalformedInputError {}

// ============================================================================
// PARSED URL
// ============================================================================

/// Decomposed URL view shared by the feature families
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    /// Trimmed original string
    pub raw: String,
    pub scheme: String,
    /// Lowercased host
    pub host: String,
    /// Explicit non-default port, if any
    pub port: Option<u16>,
    pub path: String,
    pub query: String,
    pub num_query_params: usize,
    /// Host parsed as an IP literal
    pub is_ip_host: bool,
}

impl ParsedUrl {
    pub fn parse(input: &str) -> Result<Self, MalformedInputError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(MalformedInputError::new("empty URL"));
        }

        // Corpus URLs frequently omit the scheme ("example.com:8080/x"
        // even parses as scheme-only); retry with a default scheme
        // whenever the first parse yields no host.
        let parsed = match Url::parse(raw) {
            Ok(u) if u.host().is_some() => u,
            _ => Url::parse(&format!("http://{}", raw))
                .map_err(|e| MalformedInputError::new(format!("unparseable URL: {}", e)))?,
        };

        let host = match parsed.host() {
            Some(h) => h.to_string().to_lowercase(),
            None => return Err(MalformedInputError::new("URL has no host")),
        };

        let is_ip_host = matches!(
            parsed.host(),
            Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))
        );

        Ok(Self {
            raw: raw.to_string(),
            scheme: parsed.scheme().to_string(),
            host,
            port: parsed.port(),
            path: parsed.path().to_string(),
            query: parsed.query().unwrap_or("").to_string(),
            num_query_params: parsed.query_pairs().count(),
            is_ip_host,
        })
    }
}

// ============================================================================
// EXTRACTION ENTRY POINT
// ============================================================================

/// Extract the full handcrafted feature vector for a record
///
/// Registrar/temporal slots come from the record's attached intel when
/// present, otherwise from the lookup capability under `timeout`. Lookup
/// unavailability degrades to sentinel features.
pub fn extract(
    record: &UrlRecord,
    lookup: &dyn DomainLookup,
    timeout: Duration,
) -> Result<FeatureVector, MalformedInputError> {
    let parsed = ParsedUrl::parse(&record.url)?;

    let outcome = match &record.intel {
        Some(intel) => IntelOutcome::Present(intel.clone()),
        None => lookup::resolve(lookup, &parsed.host, timeout),
    };

    Ok(extract_with_outcome(&parsed, &outcome))
}

/// Extraction once the lookup outcome is fixed (pure)
pub fn extract_with_outcome(parsed: &ParsedUrl, outcome: &IntelOutcome) -> FeatureVector {
    let mut vector = FeatureVector::new();

    structural::StructuralFeatures::from_parsed(parsed).extract(&mut vector);
    lexical::LexicalFeatures::from_parsed(parsed).extract(&mut vector);
    host::HostFeatures::from_parsed(parsed).extract(&mut vector);
    registrar::RegistrarFeatures::from_outcome(outcome).extract(&mut vector);

    vector
}
