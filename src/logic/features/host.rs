//! Host Feature Extraction
//!
//! Subdomain structure, scheme, port, shortener and TLD signals.

use once_cell::sync::Lazy;
use regex::Regex;

use super::vector::{FeatureFamily, FeatureVector};
use super::ParsedUrl;

/// Domains operating as URL shorteners
const SHORTENING_SERVICES: &[&str] = &[
    "bit.ly", "tinyurl.com", "goo.gl", "ow.ly", "is.gd", "buff.ly", "t.co",
];

/// TLDs considered unremarkable; everything else raises the flag
const COMMON_TLDS: &[&str] = &["com", "org", "net", "edu"];

static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").expect("static IPv4 pattern"));

/// Host-based features
#[derive(Debug, Clone, Default)]
pub struct HostFeatures {
    pub num_subdomains: usize,
    pub has_ip_literal: bool,
    pub https_scheme: bool,
    pub non_standard_port: bool,
    pub shortening_service: bool,
    pub unusual_tld: bool,
    pub domain_hyphen: bool,
    pub domain_underscore: bool,
}

impl HostFeatures {
    pub fn from_parsed(parsed: &ParsedUrl) -> Self {
        let host = parsed.host.as_str();

        Self {
            num_subdomains: host.matches('.').count(),
            has_ip_literal: parsed.is_ip_host || IPV4_RE.is_match(host),
            https_scheme: parsed.scheme == "https",
            non_standard_port: parsed.port.map(|p| p != 80 && p != 443).unwrap_or(false),
            shortening_service: SHORTENING_SERVICES.iter().any(|s| host == *s || host.ends_with(&format!(".{}", s))),
            unusual_tld: {
                let tld = host.rsplit('.').next().unwrap_or("");
                !COMMON_TLDS.contains(&tld)
            },
            domain_hyphen: host.contains('-'),
            domain_underscore: host.contains('_'),
        }
    }

    /// More than two host dots marks a deep subdomain chain
    pub fn complex_subdomains(&self) -> bool {
        self.num_subdomains > 2
    }
}

impl FeatureFamily for HostFeatures {
    fn extract(&self, vector: &mut FeatureVector) {
        vector.values[17] = self.num_subdomains as f32; // num_subdomains
        vector.values[18] = if self.complex_subdomains() { 1.0 } else { 0.0 }; // subdomain_complexity
        vector.values[19] = if self.has_ip_literal { 1.0 } else { 0.0 }; // has_ip_literal
        vector.values[20] = if self.https_scheme { 1.0 } else { 0.0 }; // https_scheme
        vector.values[21] = if self.non_standard_port { 1.0 } else { 0.0 }; // non_standard_port
        vector.values[22] = if self.shortening_service { 1.0 } else { 0.0 }; // shortening_service
        vector.values[23] = if self.unusual_tld { 1.0 } else { 0.0 }; // unusual_tld
        vector.values[24] = if self.domain_hyphen { 1.0 } else { 0.0 }; // domain_hyphen
        vector.values[25] = if self.domain_underscore { 1.0 } else { 0.0 }; // domain_underscore
    }
}
