// ==============================================================================
// normalize.rs - Per-SNP Z-Score Normalization
// ==============================================================================
// Description: Standardizes allele counts per SNP and imputes missing to zero
// Author: Matt Barham
// Created: 2026-01-10
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Algorithm:
//   For each SNP row:
//   1. μ = mean of non-missing counts
//   2. σ = sample standard deviation of non-missing counts (n - 1)
//   3. z = (x - μ) / σ
//   4. Any undefined z (missing x, σ = 0, fewer than two calls) becomes 0
// ==============================================================================

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{CountTable, SampleMatrix, TableError};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("No reference statistics for SNP {0}")]
    MissingStats(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Mean and spread of one SNP across a population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnpStats {
    pub rsid: String,
    pub mean: f64,
    /// Sample standard deviation; NaN with fewer than two calls
    pub std_dev: f64,
    /// Number of non-missing calls the statistics were computed from
    pub count: usize,
}

impl SnpStats {
    /// Compute statistics over the non-missing values of a row
    pub fn from_values(rsid: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let present: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        let n = present.len();

        let mean = if n > 0 {
            present.iter().sum::<f64>() / n as f64
        } else {
            f64::NAN
        };

        let std_dev = if n > 1 {
            let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            rsid: rsid.into(),
            mean,
            std_dev,
            count: n,
        }
    }

    /// Raw z-score; NaN when undefined
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

/// Per-SNP statistics of a reference population, in table row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceStats {
    stats: Vec<SnpStats>,
    index: HashMap<String, usize>,
}

impl ReferenceStats {
    /// Index statistics by rsid; a repeated rsid keeps its first entry
    pub fn new(stats: Vec<SnpStats>) -> Self {
        let mut index = HashMap::with_capacity(stats.len());
        let mut unique = Vec::with_capacity(stats.len());
        for s in stats {
            if !index.contains_key(&s.rsid) {
                index.insert(s.rsid.clone(), unique.len());
                unique.push(s);
            }
        }
        Self { stats: unique, index }
    }

    /// Statistics for every row of a count table
    pub fn from_table(table: &CountTable) -> Self {
        let stats = table
            .snps
            .iter()
            .zip(&table.rows)
            .map(|(snp, row)| SnpStats::from_values(snp.rsid.clone(), row.iter().map(|c| as_value(*c))))
            .collect();
        Self::new(stats)
    }

    pub fn get(&self, rsid: &str) -> Option<&SnpStats> {
        self.index.get(rsid).map(|&i| &self.stats[i])
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnpStats> {
        self.stats.iter()
    }

    /// Write as tab-delimited `rsid mean std_dev count`
    pub fn write_tsv(&self, path: impl AsRef<Path>) -> Result<(), NormalizeError> {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path.as_ref())?;
        for s in &self.stats {
            writer.serialize(s)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_tsv(path: impl AsRef<Path>) -> Result<Self, NormalizeError> {
        let mut reader = ReaderBuilder::new().delimiter(b'\t').from_path(path.as_ref())?;
        let stats = reader
            .deserialize()
            .collect::<Result<Vec<SnpStats>, csv::Error>>()?;
        Ok(Self::new(stats))
    }
}

/// Source of the per-SNP mean and spread
#[derive(Debug, Clone, Copy)]
pub enum Scaling<'a> {
    /// Statistics from the table being normalized
    InSample,
    /// Statistics from a separate reference population
    Reference(&'a ReferenceStats),
}

fn as_value(cell: Option<u8>) -> f64 {
    cell.map(f64::from).unwrap_or(f64::NAN)
}

/// Z-score every SNP and transpose to a samples x SNPs matrix. Undefined
/// values become 0 so every sample keeps the same column count. A repeated
/// rsid keeps only its first row.
pub fn normalize(table: &CountTable, scaling: Scaling<'_>) -> Result<SampleMatrix, NormalizeError> {
    let in_sample;
    let stats = match scaling {
        Scaling::InSample => {
            in_sample = ReferenceStats::from_table(table);
            &in_sample
        }
        Scaling::Reference(stats) => stats,
    };

    let mut seen = HashSet::new();
    let kept: Vec<usize> = (0..table.num_snps())
        .filter(|&r| seen.insert(table.snps[r].rsid.as_str()))
        .collect();
    if kept.len() < table.num_snps() {
        warn!(
            "Normalizer: dropped {} repeated SNP rows (first kept)",
            table.num_snps() - kept.len()
        );
    }

    let n_samples = table.num_samples();
    let n_snps = kept.len();
    let mut values = Array2::<f64>::zeros((n_samples, n_snps));
    let mut imputed = 0usize;

    for (j, &r) in kept.iter().enumerate() {
        let (snp, row) = (&table.snps[r], &table.rows[r]);
        let snp_stats = stats
            .get(&snp.rsid)
            .ok_or_else(|| NormalizeError::MissingStats(snp.rsid.clone()))?;

        for (i, cell) in row.iter().enumerate() {
            let z = snp_stats.z_score(as_value(*cell));
            if z.is_finite() {
                values[[i, j]] = z;
            } else {
                imputed += 1;
            }
        }
    }

    debug!("Imputed {} undefined z-scores to 0", imputed);
    info!("Normalized {} SNPs across {} samples", n_snps, n_samples);

    Ok(SampleMatrix::new(
        table.sample_ids.clone(),
        kept.iter().map(|&r| table.snps[r].rsid.clone()).collect(),
        values,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenotypeTable, SnpInfo};
    use tempfile::tempdir;

    fn table(rows: Vec<Vec<Option<u8>>>) -> CountTable {
        let n = rows[0].len();
        let snps = (1..=rows.len()).map(|i| SnpInfo::new(format!("rs{}", i))).collect();
        GenotypeTable::new(snps, (1..=n).map(|i| format!("s{}", i)).collect(), rows).unwrap()
    }

    #[test]
    fn test_sample_standard_deviation() {
        let stats = SnpStats::from_values("rs1", vec![0.0, 1.0, 2.0]);
        assert!((stats.mean - 1.0).abs() < 1e-12);
        // sqrt(((1 + 0 + 1) / 2)) = 1
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_missing_values_skipped_in_stats() {
        let stats = SnpStats::from_values("rs1", vec![0.0, f64::NAN, 2.0]);
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mean_unit_std() {
        let t = table(vec![vec![Some(0), Some(1), Some(2), Some(2), Some(0)]]);
        let matrix = normalize(&t, Scaling::InSample).unwrap();
        let column: Vec<f64> = matrix.values.column(0).to_vec();

        let stats = SnpStats::from_values("z", column);
        assert!(stats.mean.abs() < 1e-10, "mean {}", stats.mean);
        assert!((stats.std_dev - 1.0).abs() < 1e-10, "std {}", stats.std_dev);
    }

    #[test]
    fn test_repeated_rsid_uses_first_row() {
        let t = GenotypeTable::new(
            vec![SnpInfo::new("rs1"), SnpInfo::new("rs10"), SnpInfo::new("rs10")],
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            vec![
                vec![Some(1), Some(1), Some(2)],
                vec![Some(0), Some(1), Some(2)],
                vec![Some(2), Some(2), Some(1)],
            ],
        )
        .unwrap();

        let matrix = normalize(&t, Scaling::InSample).unwrap();
        assert_eq!(matrix.snp_ids, vec!["rs1", "rs10"]);
        let column = matrix.values.column(1).to_vec();
        assert_eq!(column, vec![-1.0, 0.0, 1.0]);

        let stats = ReferenceStats::from_table(&t);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.get("rs10").unwrap().mean, 1.0);
    }

    #[test]
    fn test_transposed_orientation() {
        let t = table(vec![vec![Some(0), Some(2)], vec![Some(1), Some(1)], vec![Some(2), Some(0)]]);
        let matrix = normalize(&t, Scaling::InSample).unwrap();
        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(matrix.sample_ids, vec!["s1", "s2"]);
        assert_eq!(matrix.snp_ids, vec!["rs1", "rs2", "rs3"]);
    }

    #[test]
    fn test_invariant_and_missing_become_zero() {
        let t = table(vec![
            vec![Some(1), Some(1), Some(1)],
            vec![Some(0), None, Some(2)],
            vec![None, None, Some(2)],
        ]);
        let matrix = normalize(&t, Scaling::InSample).unwrap();

        assert!(matrix.values.iter().all(|v| v.is_finite()));
        // Zero variance row
        assert!(matrix.values.column(0).iter().all(|&v| v == 0.0));
        // Missing cell
        assert_eq!(matrix.values[[1, 1]], 0.0);
        // Single call: std undefined
        assert!(matrix.values.column(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reference_scaling() {
        let reference = ReferenceStats::new(vec![SnpStats {
            rsid: "rs1".into(),
            mean: 1.0,
            std_dev: 0.5,
            count: 10,
        }]);
        let t = table(vec![vec![Some(2), Some(0)]]);
        let matrix = normalize(&t, Scaling::Reference(&reference)).unwrap();

        assert!((matrix.values[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((matrix.values[[1, 0]] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reference_missing_snp_is_error() {
        let reference = ReferenceStats::new(vec![]);
        let t = table(vec![vec![Some(2), Some(0)]]);
        let result = normalize(&t, Scaling::Reference(&reference));
        assert!(matches!(result, Err(NormalizeError::MissingStats(id)) if id == "rs1"));
    }

    #[test]
    fn test_stats_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        let t = table(vec![vec![Some(0), Some(1), Some(2)], vec![Some(2), Some(2), Some(2)]]);
        let stats = ReferenceStats::from_table(&t);

        stats.write_tsv(&path).unwrap();
        let loaded = ReferenceStats::read_tsv(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("rs2").unwrap().std_dev, 0.0);
        assert!((loaded.get("rs1").unwrap().mean - 1.0).abs() < 1e-12);
    }
}
