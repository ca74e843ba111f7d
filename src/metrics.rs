// ==============================================================================
// metrics.rs - Classifier Evaluation Metrics
// ==============================================================================
// Description: Accuracy summaries and one-vs-rest ROC AUC for class scores
// Author: Matt Barham
// Created: 2026-01-12
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================

use csv::ReaderBuilder;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::labels::IrisPlexClass;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Score table is missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid score '{value}' for sample {sample}")]
    InvalidScore { sample: String, value: String },
}

/// Correct / total counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }

    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }
}

/// Overall and per-true-class accuracy
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub overall: Tally,
    pub per_class: BTreeMap<IrisPlexClass, Tally>,
}

/// Tally (truth, prediction) pairs
pub fn accuracy_report(pairs: impl IntoIterator<Item = (IrisPlexClass, IrisPlexClass)>) -> AccuracyReport {
    let mut report = AccuracyReport::default();
    for (truth, predicted) in pairs {
        let correct = truth == predicted;
        report.overall.record(correct);
        report.per_class.entry(truth).or_default().record(correct);
    }
    report
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank. None when either class is absent.
pub fn roc_auc(scores: &[f64], positives: &[bool]) -> Option<f64> {
    let n_pos = positives.iter().filter(|&&p| p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1 ..= j+1
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let rank_sum: f64 = ranks
        .iter()
        .zip(positives)
        .filter(|(_, p)| **p)
        .map(|(r, _)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Per-class and micro-averaged AUC
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocSummary {
    pub per_class: Vec<Option<f64>>,
    pub micro: Option<f64>,
}

/// One-vs-rest AUC for a samples x classes score matrix and integer labels
pub fn one_vs_rest_auc(scores: &Array2<f64>, labels: &[u8]) -> RocSummary {
    let n_classes = scores.ncols();
    let mut per_class = Vec::with_capacity(n_classes);
    let mut all_scores = Vec::with_capacity(scores.len());
    let mut all_positives = Vec::with_capacity(scores.len());

    for class in 0..n_classes {
        let column: Vec<f64> = scores.column(class).to_vec();
        let positives: Vec<bool> = labels.iter().map(|&l| usize::from(l) == class).collect();
        per_class.push(roc_auc(&column, &positives));
        all_scores.extend(column);
        all_positives.extend(positives);
    }

    RocSummary {
        per_class,
        micro: roc_auc(&all_scores, &all_positives),
    }
}

/// Class scores keyed by sample id, columns in label-code order
/// (brown, blue, green/other)
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub sample_ids: Vec<String>,
    pub scores: Array2<f64>,
}

fn detect_delimiter(path: &Path) -> Result<u8, MetricsError> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    Ok(if header.contains('\t') { b'\t' } else { b',' })
}

/// Read a score table with an id first column and `brown`, `blue` and
/// `other` (or `green`) probability columns, comma- or tab-delimited
pub fn read_score_table(path: impl AsRef<Path>) -> Result<ScoreTable, MetricsError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(path)?)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h.trim()))
            .ok_or_else(|| MetricsError::MissingColumn(names[0].to_string()))
    };
    let columns = [find(&["brown"])?, find(&["blue"])?, find(&["other", "green"])?];

    let mut sample_ids = Vec::new();
    let mut values = Vec::new();

    for result in reader.records() {
        let row = result?;
        let sample = row.get(0).unwrap_or("").trim().to_string();
        for &c in &columns {
            let raw = row.get(c).unwrap_or("").trim();
            let value = raw.parse::<f64>().map_err(|_| MetricsError::InvalidScore {
                sample: sample.clone(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }
        sample_ids.push(sample);
    }

    let scores = Array2::from_shape_vec((sample_ids.len(), columns.len()), values)
        .map_err(|e| MetricsError::InvalidScore {
            sample: String::new(),
            value: e.to_string(),
        })?;

    Ok(ScoreTable { sample_ids, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_perfect_and_inverted_auc() {
        let positives = [false, false, true, true];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &positives), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &positives), Some(0.0));
    }

    #[test]
    fn test_ties_count_half() {
        assert_eq!(roc_auc(&[0.5, 0.5], &[true, false]), Some(0.5));
    }

    #[test]
    fn test_auc_undefined_for_single_class() {
        assert_eq!(roc_auc(&[0.1, 0.2], &[true, true]), None);
    }

    #[test]
    fn test_one_vs_rest() {
        let scores = array![[0.8, 0.1, 0.1], [0.2, 0.7, 0.1], [0.1, 0.2, 0.7], [0.6, 0.3, 0.1]];
        let labels = [0u8, 1, 2, 0];
        let summary = one_vs_rest_auc(&scores, &labels);

        assert_eq!(summary.per_class, vec![Some(1.0), Some(1.0), Some(1.0)]);
        assert_eq!(summary.micro, Some(1.0));
    }

    #[test]
    fn test_accuracy_report() {
        use IrisPlexClass::*;
        let report = accuracy_report(vec![(Brown, Brown), (Blue, Brown), (Blue, Blue), (Other, Blue)]);

        assert_eq!(report.overall, Tally { correct: 2, total: 4 });
        assert_eq!(report.overall.accuracy(), Some(0.5));
        assert_eq!(report.per_class[&Blue], Tally { correct: 1, total: 2 });
        assert_eq!(report.per_class[&Other].accuracy(), Some(0.0));
    }

    #[test]
    fn test_read_score_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.tsv");
        std::fs::write(&path, "sample_id\tpred1\tblue\tother\tbrown\nNA1\t0.3\t0.7\t0.2\t0.1\n").unwrap();

        let table = read_score_table(&path).unwrap();
        assert_eq!(table.sample_ids, vec!["NA1"]);
        assert_eq!(table.scores, array![[0.1, 0.7, 0.2]]);
    }
}
