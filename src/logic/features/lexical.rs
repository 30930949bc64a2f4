//! Lexical Feature Extraction
//!
//! Character-distribution and keyword signals over the URL string.

use super::vector::{FeatureFamily, FeatureVector};
use super::ParsedUrl;

/// Keywords that phishing URLs impersonate flows with
const SUSPICIOUS_WORDS: &[&str] = &["login", "verify", "secure", "account", "update", "signin", "confirm"];

/// Payload extensions that should not terminate a landing URL
const SUSPICIOUS_EXTENSIONS: &[&str] = &[".exe", ".zip", ".scr", ".bat"];

/// Shannon entropy over the character distribution of a string
pub fn shannon_entropy(s: &str) -> f32 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts = std::collections::HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
        total += 1;
    }

    let total = total as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    entropy as f32
}

/// Lexical features from the raw URL string
#[derive(Debug, Clone, Default)]
pub struct LexicalFeatures {
    pub digit_ratio: f32,
    pub url_entropy: f32,
    pub query_entropy: f32,
    pub domain_entropy: f32,
    pub has_suspicious_word: bool,
    pub has_suspicious_extension: bool,
    pub contains_at_symbol: bool,
    pub double_slash_redirect: bool,
}

impl LexicalFeatures {
    pub fn from_parsed(parsed: &ParsedUrl) -> Self {
        let lower = parsed.raw.to_lowercase();
        let char_count = parsed.raw.chars().count();
        let digits = parsed.raw.chars().filter(|c| c.is_ascii_digit()).count();

        Self {
            digit_ratio: if char_count > 0 {
                digits as f32 / char_count as f32
            } else {
                0.0
            },
            url_entropy: shannon_entropy(&parsed.raw),
            query_entropy: shannon_entropy(&parsed.query),
            domain_entropy: shannon_entropy(&parsed.host),
            has_suspicious_word: SUSPICIOUS_WORDS.iter().any(|w| lower.contains(w)),
            has_suspicious_extension: SUSPICIOUS_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)),
            contains_at_symbol: parsed.raw.contains('@'),
            // A second "//" past the scheme separator signals an embedded redirect
            double_slash_redirect: parsed.raw.matches("//").count() > 1,
        }
    }
}

impl FeatureFamily for LexicalFeatures {
    fn extract(&self, vector: &mut FeatureVector) {
        vector.values[9] = self.digit_ratio;        // digit_ratio
        vector.values[10] = self.url_entropy;       // url_entropy
        vector.values[11] = self.query_entropy;     // query_entropy
        vector.values[12] = self.domain_entropy;    // domain_entropy
        vector.values[13] = if self.has_suspicious_word { 1.0 } else { 0.0 }; // suspicious_words
        vector.values[14] = if self.has_suspicious_extension { 1.0 } else { 0.0 }; // suspicious_extension
        vector.values[15] = if self.contains_at_symbol { 1.0 } else { 0.0 }; // contains_at_symbol
        vector.values[16] = if self.double_slash_redirect { 1.0 } else { 0.0 }; // double_slash_redirect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);

        // Uniform two-symbol string = exactly 1 bit
        let e = shannon_entropy("abab");
        assert!((e - 1.0).abs() < 1e-6);

        // More symbols, more entropy
        assert!(shannon_entropy("abcdefgh") > shannon_entropy("aabb"));
    }

    #[test]
    fn test_suspicious_word_detection() {
        let parsed = ParsedUrl::parse("http://paypal-secure-login.example.ru/verify").unwrap();
        let feats = LexicalFeatures::from_parsed(&parsed);

        assert!(feats.has_suspicious_word);
        assert!(!feats.has_suspicious_extension);
    }

    #[test]
    fn test_digit_ratio() {
        let parsed = ParsedUrl::parse("http://example.com/1234").unwrap();
        let feats = LexicalFeatures::from_parsed(&parsed);

        assert!(feats.digit_ratio > 0.1);
        assert!(feats.digit_ratio < 0.3);
    }

    #[test]
    fn test_double_slash_redirect() {
        let clean = ParsedUrl::parse("https://example.com/a").unwrap();
        assert!(!LexicalFeatures::from_parsed(&clean).double_slash_redirect);

        let shady = ParsedUrl::parse("https://example.com//http://evil.com").unwrap();
        assert!(LexicalFeatures::from_parsed(&shady).double_slash_redirect);
    }

    #[test]
    fn test_suspicious_extension() {
        let parsed = ParsedUrl::parse("http://example.com/invoice.exe").unwrap();
        assert!(LexicalFeatures::from_parsed(&parsed).has_suspicious_extension);
    }
}
