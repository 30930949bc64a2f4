//! Training Corpus - Labeled URL records and file loading
//!
//! Accepted formats:
//! - CSV with a `url,label` header; the label is taken from the final
//!   comma-separated field so URLs containing commas survive
//! - JSONL with one `{"url": ..., "label": ...}` object per line
//!
//! Absent or invalid rows are rejected and counted, never coerced.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::logic::lookup::DomainIntel;

// ============================================================================
// URL RECORD
// ============================================================================

/// A single URL observation
///
/// Immutable once created: construction is the only place fields are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    /// 0 = legitimate, 1 = phishing; None for inference requests
    pub label: Option<u8>,
    /// Pre-resolved intel attached to the record, if any
    pub intel: Option<DomainIntel>,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
            intel: None,
        }
    }

    pub fn labeled(url: impl Into<String>, label: u8) -> Self {
        Self {
            url: url.into(),
            label: Some(label),
            intel: None,
        }
    }

    pub fn with_intel(mut self, intel: DomainIntel) -> Self {
        self.intel = Some(intel);
        self
    }
}

/// JSONL row shape (the dataset log format)
#[derive(Debug, Deserialize)]
struct JsonRow {
    url: String,
    label: u8,
}

// ============================================================================
// LOAD REPORT
// ============================================================================

/// Outcome of a corpus load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusReport {
    pub accepted: usize,
    pub rejected: usize,
    pub positives: usize,
    pub negatives: usize,
}

// ============================================================================
// LOADING
// ============================================================================

/// Load a labeled corpus from a CSV or JSONL file
///
/// Format is chosen by extension: `.jsonl`/`.ndjson` parse as JSON lines,
/// everything else as CSV.
pub fn load(path: &Path) -> io::Result<(Vec<UrlRecord>, CorpusReport)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"))
        .unwrap_or(false);

    let mut records = Vec::new();
    let mut rejected = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let parsed = if jsonl {
            parse_json_row(trimmed)
        } else {
            // Skip a header row if present
            if idx == 0 && trimmed.to_lowercase().starts_with("url") {
                continue;
            }
            parse_csv_row(trimmed)
        };

        match parsed {
            Some(record) => records.push(record),
            None => {
                rejected += 1;
                log::debug!("Rejected corpus row {}: {:?}", idx + 1, trimmed);
            }
        }
    }

    let positives = records.iter().filter(|r| r.label == Some(1)).count();
    let report = CorpusReport {
        accepted: records.len(),
        rejected,
        positives,
        negatives: records.len() - positives,
    };

    log::info!(
        "Loaded corpus {:?}: {} accepted ({} phishing / {} legitimate), {} rejected",
        path,
        report.accepted,
        report.positives,
        report.negatives,
        report.rejected
    );

    Ok((records, report))
}

/// Parse `url,label` with the label in the final field
fn parse_csv_row(line: &str) -> Option<UrlRecord> {
    let (url, label) = line.rsplit_once(',')?;
    let url = url.trim().trim_matches('"');
    let label = parse_label(label.trim())?;

    if url.is_empty() {
        return None;
    }

    Some(UrlRecord::labeled(url, label))
}

fn parse_json_row(line: &str) -> Option<UrlRecord> {
    let row: JsonRow = serde_json::from_str(line).ok()?;

    if row.url.trim().is_empty() || row.label > 1 {
        return None;
    }

    Some(UrlRecord::labeled(row.url, row.label))
}

/// Labels must be exactly 0 or 1; anything else is rejected
fn parse_label(s: &str) -> Option<u8> {
    match s {
        "0" => Some(0),
        "1" => Some(1),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_csv_row() {
        let record = parse_csv_row("http://example.com/login,1").unwrap();
        assert_eq!(record.url, "http://example.com/login");
        assert_eq!(record.label, Some(1));
    }

    #[test]
    fn test_csv_url_with_comma_survives() {
        let record = parse_csv_row("http://example.com/a,b,0").unwrap();
        assert_eq!(record.url, "http://example.com/a,b");
        assert_eq!(record.label, Some(0));
    }

    #[test]
    fn test_invalid_rows_rejected() {
        assert!(parse_csv_row("http://example.com/no-label").is_none());
        assert!(parse_csv_row("http://example.com,2").is_none());
        assert!(parse_csv_row("http://example.com,yes").is_none());
        assert!(parse_csv_row(",1").is_none());
    }

    #[test]
    fn test_load_csv_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "url,label").unwrap();
        writeln!(file, "http://phish.example.ru/verify,1").unwrap();
        writeln!(file, "https://www.wikipedia.org/,0").unwrap();
        writeln!(file, "bad row without label").unwrap();
        file.flush().unwrap();

        let (records, report) = load(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.positives, 1);
        assert_eq!(report.negatives, 1);
    }

    #[test]
    fn test_load_jsonl_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(file, r#"{{"url": "http://phish.example.ru/verify", "label": 1}}"#).unwrap();
        writeln!(file, r#"{{"url": "https://www.wikipedia.org/", "label": 0}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        file.flush().unwrap();

        let (records, report) = load(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.rejected, 1);
    }
}
