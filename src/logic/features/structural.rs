//! Structural Feature Extraction
//!
//! Counts and lengths over the URL's components.

use super::vector::{FeatureFamily, FeatureVector};
use super::ParsedUrl;

/// URL length above which the long-URL flag trips
const LONG_URL_CHARS: usize = 54;

/// Structural features from the decomposed URL
#[derive(Debug, Clone, Default)]
pub struct StructuralFeatures {
    pub url_length: usize,
    pub num_dots: usize,
    pub num_hyphens: usize,
    pub num_slashes: usize,
    pub path_depth: usize,
    pub domain_length: usize,
    pub num_query_params: usize,
    pub query_length: usize,
}

impl StructuralFeatures {
    pub fn from_parsed(parsed: &ParsedUrl) -> Self {
        Self {
            url_length: parsed.raw.chars().count(),
            num_dots: parsed.raw.matches('.').count(),
            num_hyphens: parsed.raw.matches('-').count(),
            num_slashes: parsed.raw.matches('/').count(),
            path_depth: parsed.path.split('/').filter(|seg| !seg.is_empty()).count(),
            domain_length: parsed.host.chars().count(),
            num_query_params: parsed.num_query_params,
            query_length: parsed.query.chars().count(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.url_length > LONG_URL_CHARS
    }
}

impl FeatureFamily for StructuralFeatures {
    fn extract(&self, vector: &mut FeatureVector) {
        vector.values[0] = self.url_length as f32;      // url_length
        vector.values[1] = self.num_dots as f32;        // num_dots
        vector.values[2] = self.num_hyphens as f32;     // num_hyphens
        vector.values[3] = self.num_slashes as f32;     // num_slashes
        vector.values[4] = self.path_depth as f32;      // path_depth
        vector.values[5] = self.domain_length as f32;   // domain_length
        vector.values[6] = self.num_query_params as f32; // num_query_params
        vector.values[7] = self.query_length as f32;    // query_length
        vector.values[8] = if self.is_long() { 1.0 } else { 0.0 }; // long_url
    }
}
