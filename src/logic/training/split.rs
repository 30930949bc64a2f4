//! Dataset Splitting - Seeded stratified train/validation/test
//!
//! Each class is shuffled with the run seed and allocated proportionally,
//! so label ratios survive into every split and reruns with the same seed
//! produce the same partition. No record ever lands in more than one
//! split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::TrainingError;
use crate::logic::corpus::UrlRecord;

/// The three disjoint splits of a labeled corpus
#[derive(Debug, Clone)]
pub struct SplitSets {
    pub train: Vec<UrlRecord>,
    pub val: Vec<UrlRecord>,
    pub test: Vec<UrlRecord>,
}

impl SplitSets {
    pub fn summary(&self) -> String {
        format!(
            "train={} val={} test={}",
            self.train.len(),
            self.val.len(),
            self.test.len()
        )
    }
}

/// Stratified split by label ratio with a fixed seed
pub fn stratified_split(
    records: &[UrlRecord],
    train_fraction: f32,
    val_fraction: f32,
    seed: u64,
) -> Result<SplitSets, TrainingError> {
    if records.is_empty() {
        return Err(TrainingError::degenerate("DataSplit", "corpus is empty"));
    }
    if !(0.0..1.0).contains(&train_fraction)
        || !(0.0..1.0).contains(&val_fraction)
        || train_fraction + val_fraction >= 1.0
    {
        return Err(TrainingError::degenerate(
            "DataSplit",
            format!(
                "invalid split fractions: train={} val={}",
                train_fraction, val_fraction
            ),
        ));
    }

    let mut positives: Vec<UrlRecord> = Vec::new();
    let mut negatives: Vec<UrlRecord> = Vec::new();

    for record in records {
        match record.label {
            Some(1) => positives.push(record.clone()),
            Some(0) => negatives.push(record.clone()),
            _ => {
                return Err(TrainingError::degenerate(
                    "DataSplit",
                    format!("unlabeled record in corpus: {}", record.url),
                ))
            }
        }
    }

    if positives.is_empty() || negatives.is_empty() {
        return Err(TrainingError::degenerate(
            "DataSplit",
            format!(
                "corpus is single-class ({} phishing / {} legitimate)",
                positives.len(),
                negatives.len()
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    positives.shuffle(&mut rng);
    negatives.shuffle(&mut rng);

    let mut sets = SplitSets {
        train: Vec::new(),
        val: Vec::new(),
        test: Vec::new(),
    };

    for class in [positives, negatives] {
        let n = class.len();
        let n_train = ((n as f32) * train_fraction).round() as usize;
        let n_val = ((n as f32) * val_fraction).round() as usize;

        for (i, record) in class.into_iter().enumerate() {
            if i < n_train {
                sets.train.push(record);
            } else if i < n_train + n_val {
                sets.val.push(record);
            } else {
                sets.test.push(record);
            }
        }
    }

    validate_splits(&sets)?;

    log::info!(
        "Stratified split (seed {}): {}",
        seed,
        sets.summary()
    );

    Ok(sets)
}

/// Reject splits that cannot drive training or evaluation
fn validate_splits(sets: &SplitSets) -> Result<(), TrainingError> {
    for (name, split) in [
        ("train", &sets.train),
        ("validation", &sets.val),
        ("test", &sets.test),
    ] {
        if split.is_empty() {
            return Err(TrainingError::degenerate(
                "DataSplit",
                format!("{} split is empty; corpus too small for the fractions", name),
            ));
        }
    }

    for (name, split) in [("train", &sets.train), ("validation", &sets.val)] {
        let positives = split.iter().filter(|r| r.label == Some(1)).count();
        if positives == 0 || positives == split.len() {
            return Err(TrainingError::degenerate(
                "DataSplit",
                format!(
                    "{} split is single-class ({}/{} phishing)",
                    name,
                    positives,
                    split.len()
                ),
            ));
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn corpus(positives: usize, negatives: usize) -> Vec<UrlRecord> {
        let mut records = Vec::new();
        for i in 0..positives {
            records.push(UrlRecord::labeled(format!("http://phish-{}.example.ru/", i), 1));
        }
        for i in 0..negatives {
            records.push(UrlRecord::labeled(format!("https://site-{}.example.com/", i), 0));
        }
        records
    }

    #[test]
    fn test_splits_are_disjoint_and_exhaustive() {
        let records = corpus(40, 60);
        let sets = stratified_split(&records, 0.7, 0.15, 42).unwrap();

        let all: Vec<&str> = sets
            .train
            .iter()
            .chain(&sets.val)
            .chain(&sets.test)
            .map(|r| r.url.as_str())
            .collect();

        assert_eq!(all.len(), records.len());
        let unique: HashSet<&str> = all.into_iter().collect();
        assert_eq!(unique.len(), records.len(), "no URL appears twice");
    }

    #[test]
    fn test_split_preserves_label_ratio() {
        let records = corpus(50, 50);
        let sets = stratified_split(&records, 0.6, 0.2, 42).unwrap();

        let positives = sets.train.iter().filter(|r| r.label == Some(1)).count();
        let ratio = positives as f32 / sets.train.len() as f32;
        assert!((ratio - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_split_reproducible_with_seed() {
        let records = corpus(30, 30);
        let a = stratified_split(&records, 0.7, 0.15, 7).unwrap();
        let b = stratified_split(&records, 0.7, 0.15, 7).unwrap();

        let urls = |s: &[UrlRecord]| s.iter().map(|r| r.url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&a.train), urls(&b.train));
        assert_eq!(urls(&a.val), urls(&b.val));
        assert_eq!(urls(&a.test), urls(&b.test));
    }

    #[test]
    fn test_different_seed_changes_partition() {
        let records = corpus(30, 30);
        let a = stratified_split(&records, 0.7, 0.15, 7).unwrap();
        let b = stratified_split(&records, 0.7, 0.15, 8).unwrap();

        let urls = |s: &[UrlRecord]| s.iter().map(|r| r.url.clone()).collect::<Vec<_>>();
        assert_ne!(urls(&a.train), urls(&b.train));
    }

    #[test]
    fn test_empty_corpus_aborts() {
        assert!(stratified_split(&[], 0.7, 0.15, 1).is_err());
    }

    #[test]
    fn test_single_class_corpus_aborts() {
        let records = corpus(50, 0);
        assert!(stratified_split(&records, 0.7, 0.15, 1).is_err());
    }

    #[test]
    fn test_tiny_corpus_aborts() {
        // Too small to leave a non-empty test split per class
        let records = corpus(2, 2);
        assert!(stratified_split(&records, 0.7, 0.15, 1).is_err());
    }

    #[test]
    fn test_unlabeled_record_aborts() {
        let mut records = corpus(10, 10);
        records.push(UrlRecord::new("http://unlabeled.example.com/"));
        assert!(stratified_split(&records, 0.7, 0.15, 1).is_err());
    }
}
