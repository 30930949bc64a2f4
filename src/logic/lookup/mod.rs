//! Auxiliary Domain Lookup
//!
//! Pluggable capability for registrar/temporal domain facts (age,
//! registration window, registrar reputation). Always invoked with a
//! caller-supplied timeout; failures degrade to sentinel features, never
//! to a failed classification.

pub mod rdap;
pub mod types;

pub use rdap::RdapClient;
pub use types::{DomainIntel, DomainLookup, IntelOutcome, LookupError, NoLookup, StaticLookup};

use std::time::Duration;

/// Run a lookup and fold the result into a tagged outcome
///
/// This is the only place where lookup errors are absorbed: timeouts and
/// other failures are logged at debug level and become `Missing`.
pub fn resolve(lookup: &dyn DomainLookup, domain: &str, timeout: Duration) -> IntelOutcome {
    match lookup.lookup(domain, timeout) {
        Ok(intel) => IntelOutcome::Present(intel),
        Err(e) => {
            log::debug!("Domain lookup for '{}' unavailable: {}", domain, e);
            IntelOutcome::Missing(e)
        }
    }
}
