//! RDAP Lookup Client
//!
//! Queries an RDAP endpoint for domain registration facts.
//!
//! Features:
//! - Registration / expiration event parsing
//! - Registrar identification with a static reputation table
//! - Local caching to reduce network calls
//! - Per-request timeout supplied by the caller

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;

use super::types::{DomainIntel, DomainLookup, LookupError};
use crate::constants;

// ============================================================================
// CONSTANTS
// ============================================================================

const CACHE_MAX_SIZE: usize = 1000;
const CACHE_TTL_HOURS: i64 = 24;

/// Reputation scores for registrars commonly seen in phishing corpora.
/// Unlisted registrars score neutral.
static REGISTRAR_REPUTATION: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("markmonitor", 0.95);
    m.insert("csc corporate domains", 0.9);
    m.insert("cloudflare", 0.8);
    m.insert("gandi", 0.75);
    m.insert("godaddy", 0.7);
    m.insert("tucows", 0.65);
    m.insert("namecheap", 0.6);
    m.insert("namesilo", 0.4);
    m.insert("publicdomainregistry", 0.3);
    m.insert("reg.ru", 0.2);
    m.insert("eranet", 0.2);
    m
});

const NEUTRAL_REPUTATION: f32 = 0.5;

// ============================================================================
// RDAP CLIENT
// ============================================================================

pub struct RdapClient {
    base_url: String,
    cache: RwLock<HashMap<String, CachedIntel>>,
}

struct CachedIntel {
    intel: DomainIntel,
    cached_at: i64,
}

impl RdapClient {
    pub fn new() -> Self {
        Self::with_base_url(constants::get_rdap_url())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get from cache
    fn get_cached(&self, domain: &str) -> Option<DomainIntel> {
        let key = domain.to_lowercase();
        let cache = self.cache.read();

        if let Some(cached) = cache.get(&key) {
            let now = chrono::Utc::now().timestamp();
            let age_hours = (now - cached.cached_at) / 3600;

            if age_hours < CACHE_TTL_HOURS {
                return Some(cached.intel.clone());
            }
        }

        None
    }

    /// Add to cache
    fn cache_intel(&self, domain: &str, intel: DomainIntel) {
        let key = domain.to_lowercase();
        let mut cache = self.cache.write();

        // Evict oldest entries if full
        if cache.len() >= CACHE_MAX_SIZE {
            let mut entries: Vec<_> = cache
                .iter()
                .map(|(k, v)| (k.clone(), v.cached_at))
                .collect();
            entries.sort_by(|a, b| a.1.cmp(&b.1));

            for (key, _) in entries.into_iter().take(CACHE_MAX_SIZE / 10) {
                cache.remove(&key);
            }
        }

        cache.insert(
            key,
            CachedIntel {
                intel,
                cached_at: chrono::Utc::now().timestamp(),
            },
        );
    }

    /// Query the RDAP endpoint (blocking, timeout-bounded)
    fn fetch(&self, domain: &str, timeout: Duration) -> Result<DomainIntel, LookupError> {
        let url = format!("{}/domain/{}", self.base_url, domain);

        let response = ureq::get(&url).timeout(timeout).call();

        match response {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| LookupError::Parse { message: e.to_string() })?;

                let rdap: RdapResponse = serde_json::from_str(&body)
                    .map_err(|e| LookupError::Parse { message: e.to_string() })?;

                Ok(parse_rdap_response(rdap))
            }
            Err(ureq::Error::Status(404, _)) => Err(LookupError::NotFound),
            Err(ureq::Error::Status(code, _)) => Err(LookupError::Network {
                message: format!("HTTP {}", code),
            }),
            Err(e) => {
                let message = e.to_string();
                if message.contains("timed out") || message.contains("timeout") {
                    Err(LookupError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    })
                } else {
                    Err(LookupError::Network { message })
                }
            }
        }
    }

    /// Cache stats
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache.read().len(), CACHE_MAX_SIZE)
    }

    /// Clear cache
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

impl Default for RdapClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainLookup for RdapClient {
    fn lookup(&self, domain: &str, timeout: Duration) -> Result<DomainIntel, LookupError> {
        if domain.is_empty() {
            return Err(LookupError::NotFound);
        }

        if let Some(cached) = self.get_cached(domain) {
            return Ok(cached);
        }

        let intel = self.fetch(domain, timeout)?;
        self.cache_intel(domain, intel.clone());

        Ok(intel)
    }
}

// ============================================================================
// PARSE RESPONSE
// ============================================================================

fn parse_rdap_response(resp: RdapResponse) -> DomainIntel {
    let now = chrono::Utc::now();

    let mut registration = None;
    let mut expiration = None;

    for event in resp.events.unwrap_or_default() {
        let date = event
            .event_date
            .as_deref()
            .and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&chrono::Utc));

        match event.event_action.as_deref() {
            Some("registration") => registration = date,
            Some("expiration") => expiration = date,
            _ => {}
        }
    }

    let age_days = registration.map(|reg| (now - reg).num_days());
    let registration_period_days = match (registration, expiration) {
        (Some(reg), Some(exp)) => Some((exp - reg).num_days()),
        _ => None,
    };

    let registrar = resp
        .entities
        .unwrap_or_default()
        .into_iter()
        .find(|e| {
            e.roles
                .as_ref()
                .map(|r| r.iter().any(|role| role == "registrar"))
                .unwrap_or(false)
        })
        .and_then(|e| e.handle.or(e.name));

    let registrar_reputation = registrar.as_ref().map(|name| registrar_score(name));

    DomainIntel {
        age_days,
        registration_period_days,
        registrar,
        registrar_reputation,
    }
}

/// Score a registrar by name against the static reputation table
fn registrar_score(name: &str) -> f32 {
    let lower = name.to_lowercase();
    for (known, score) in REGISTRAR_REPUTATION.iter() {
        if lower.contains(known) {
            return *score;
        }
    }
    NEUTRAL_REPUTATION
}

// ============================================================================
// RDAP RESPONSE TYPES (for parsing)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RdapResponse {
    pub events: Option<Vec<RdapEvent>>,
    pub entities: Option<Vec<RdapEntity>>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    pub event_action: Option<String>,
    #[serde(rename = "eventDate")]
    pub event_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    pub handle: Option<String>,
    pub name: Option<String>,
    pub roles: Option<Vec<String>>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rdap_response() {
        let body = r#"{
            "events": [
                {"eventAction": "registration", "eventDate": "2001-01-13T00:12:14Z"},
                {"eventAction": "expiration", "eventDate": "2031-01-13T00:12:14Z"}
            ],
            "entities": [
                {"handle": "MarkMonitor Inc.", "roles": ["registrar"]}
            ]
        }"#;

        let resp: RdapResponse = serde_json::from_str(body).unwrap();
        let intel = parse_rdap_response(resp);

        assert!(intel.age_days.unwrap() > 8000);
        assert!(intel.registration_period_days.unwrap() > 10000);
        assert_eq!(intel.registrar.as_deref(), Some("MarkMonitor Inc."));
        assert!(intel.registrar_reputation.unwrap() > 0.9);
    }

    #[test]
    fn test_parse_rdap_response_without_events() {
        let resp: RdapResponse = serde_json::from_str("{}").unwrap();
        let intel = parse_rdap_response(resp);

        assert!(intel.age_days.is_none());
        assert!(intel.registrar.is_none());
    }

    #[test]
    fn test_registrar_score() {
        assert!(registrar_score("MarkMonitor Inc.") > 0.9);
        assert!(registrar_score("REG.RU LLC") < 0.3);
        assert_eq!(registrar_score("Some Unknown Registrar"), NEUTRAL_REPUTATION);
    }

    #[test]
    fn test_cache_roundtrip() {
        let client = RdapClient::with_base_url("http://unreachable.invalid".to_string());
        let intel = DomainIntel {
            age_days: Some(100),
            ..Default::default()
        };

        client.cache_intel("example.com", intel);
        let cached = client.get_cached("EXAMPLE.COM").unwrap();
        assert_eq!(cached.age_days, Some(100));

        client.clear_cache();
        assert!(client.get_cached("example.com").is_none());
    }
}
