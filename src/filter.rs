// ==============================================================================
// filter.rs - SNP Presence Filter
// ==============================================================================
// Description: Keeps SNPs genotyped in more than a fraction of samples
// Author: Matt Barham
// Created: 2026-01-10
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::GenotypeTable;

/// Default minimum presence fraction
pub const DEFAULT_PRESENCE_THRESHOLD: f64 = 0.8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Presence threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Table dimensions before and after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub snps_before: usize,
    pub snps_after: usize,
    pub samples: usize,
}

/// Keep rows whose non-missing fraction across samples is strictly greater
/// than `threshold`. Row order is preserved.
pub fn filter_by_presence<C>(
    table: GenotypeTable<C>,
    threshold: f64,
) -> Result<(GenotypeTable<C>, FilterReport), FilterError> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(FilterError::InvalidThreshold(threshold));
    }

    let snps_before = table.num_snps();
    let samples = table.num_samples();

    let keep: Vec<bool> = (0..snps_before).map(|i| table.presence(i) > threshold).collect();
    let mut keep = keep.into_iter();
    let filtered = table.retain_rows(|_, _| keep.next().unwrap_or(false));

    let report = FilterReport {
        snps_before,
        snps_after: filtered.num_snps(),
        samples,
    };

    info!(
        "Presence filter (> {}): {} -> {} SNPs across {} samples",
        threshold, report.snps_before, report.snps_after, report.samples
    );

    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawTable, SnpInfo};

    fn call(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn toy_table() -> RawTable {
        GenotypeTable::new(
            vec![
                SnpInfo::new("rs1"),
                SnpInfo::new("rs2"),
                SnpInfo::new("rs3"),
                SnpInfo::new("rs4"),
            ],
            (1..=5).map(|i| format!("s{}", i)).collect(),
            vec![
                vec![call("AA"), call("AG"), call("GG"), call("AA"), call("AA")],
                vec![call("CC"), None, call("CT"), call("TT"), call("CC")],
                vec![call("AT"), None, None, call("TT"), call("AA")],
                vec![call("GG"), call("GG"), call("GG"), call("GG"), None],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_strictly_greater_than_threshold() {
        // rs2 and rs4 are present in exactly 80% of samples
        let (filtered, report) = filter_by_presence(toy_table(), 0.8).unwrap();
        assert_eq!(filtered.rsids().collect::<Vec<_>>(), vec!["rs1"]);
        assert_eq!(report.snps_before, 4);
        assert_eq!(report.snps_after, 1);
        assert_eq!(report.samples, 5);
    }

    #[test]
    fn test_order_preserved() {
        // rs3 is present in 60% of samples
        let (filtered, _) = filter_by_presence(toy_table(), 0.7).unwrap();
        assert_eq!(filtered.rsids().collect::<Vec<_>>(), vec!["rs1", "rs2", "rs4"]);
    }

    #[test]
    fn test_idempotent() {
        let (once, first) = filter_by_presence(toy_table(), 0.7).unwrap();
        assert_eq!(first.snps_after, 3);
        let (twice, report) = filter_by_presence(once.clone(), 0.7).unwrap();
        assert_eq!(once, twice);
        assert_eq!(report.snps_before, report.snps_after);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            filter_by_presence(toy_table(), 0.0),
            Err(FilterError::InvalidThreshold(_))
        ));
        assert!(matches!(
            filter_by_presence(toy_table(), 1.5),
            Err(FilterError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_no_samples_keeps_nothing() {
        let table: RawTable = GenotypeTable::new(vec![SnpInfo::new("rs1")], vec![], vec![vec![]]).unwrap();
        let (filtered, _) = filter_by_presence(table, 0.8).unwrap();
        assert_eq!(filtered.num_snps(), 0);
    }
}
