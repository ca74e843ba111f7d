// ==============================================================================
// models.rs - Genotype Table Data Models
// ==============================================================================
// Description: SNP x sample tables, reference panel variants and matrices
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-01-17
// Version: 3.0.0
// ==============================================================================

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Number of non-reference alleles at a SNP (0, 1 or 2)
pub type AlleleCount = u8;

/// Columns that describe a SNP rather than a sample
pub const METADATA_COLUMNS: [&str; 10] = [
    "rsid", "ID", "chromosome", "position", "CHROM", "POS", "REF", "ALT", "chr", "pos",
];

/// Returns true when a column header names SNP metadata
pub fn is_metadata_column(name: &str) -> bool {
    METADATA_COLUMNS.contains(&name)
}

/// Returns true for identifiers of the form `rs[0-9]+`
pub fn is_valid_rsid(id: &str) -> bool {
    match id.strip_prefix("rs") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Errors raised when assembling a table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Row for {rsid} has {found} cells, expected {expected}")]
    RaggedRow {
        rsid: String,
        found: usize,
        expected: usize,
    },

    #[error("SNP list has {snps} entries but table has {rows} rows")]
    RowCountMismatch { snps: usize, rows: usize },

    #[error("Duplicate sample identifier: {0}")]
    DuplicateSample(String),

    #[error("Matrix shape mismatch: {0}")]
    Shape(String),
}

/// Per-SNP descriptive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnpInfo {
    /// SNP identifier (e.g., "rs12913832")
    pub rsid: String,
    /// Chromosome name if the source carried one
    pub chromosome: Option<String>,
    /// Base pair position if the source carried one
    pub position: Option<u64>,
}

impl SnpInfo {
    pub fn new(rsid: impl Into<String>) -> Self {
        Self {
            rsid: rsid.into(),
            chromosome: None,
            position: None,
        }
    }

    pub fn with_location(rsid: impl Into<String>, chromosome: impl Into<String>, position: u64) -> Self {
        Self {
            rsid: rsid.into(),
            chromosome: Some(chromosome.into()),
            position: Some(position),
        }
    }
}

/// SNP x sample table. Rows follow `snps`, columns follow `sample_ids`.
/// A `None` cell is a missing genotype.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeTable<C> {
    pub snps: Vec<SnpInfo>,
    pub sample_ids: Vec<String>,
    pub rows: Vec<Vec<Option<C>>>,
}

/// Raw nucleotide calls ("AG", "TT", ...)
pub type RawTable = GenotypeTable<String>;

/// Allele-count encoded table
pub type CountTable = GenotypeTable<AlleleCount>;

impl<C> GenotypeTable<C> {
    /// Build a table, checking that every row has one cell per sample
    pub fn new(
        snps: Vec<SnpInfo>,
        sample_ids: Vec<String>,
        rows: Vec<Vec<Option<C>>>,
    ) -> Result<Self, TableError> {
        if snps.len() != rows.len() {
            return Err(TableError::RowCountMismatch {
                snps: snps.len(),
                rows: rows.len(),
            });
        }

        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(TableError::DuplicateSample(id.clone()));
            }
        }

        for (snp, row) in snps.iter().zip(&rows) {
            if row.len() != sample_ids.len() {
                return Err(TableError::RaggedRow {
                    rsid: snp.rsid.clone(),
                    found: row.len(),
                    expected: sample_ids.len(),
                });
            }
        }

        Ok(Self {
            snps,
            sample_ids,
            rows,
        })
    }

    pub fn num_snps(&self) -> usize {
        self.snps.len()
    }

    pub fn num_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn rsids(&self) -> impl Iterator<Item = &str> {
        self.snps.iter().map(|s| s.rsid.as_str())
    }

    /// Fraction of samples with a non-missing call at row `index`
    pub fn presence(&self, index: usize) -> f64 {
        let row = &self.rows[index];
        if row.is_empty() {
            return 0.0;
        }
        let present = row.iter().filter(|c| c.is_some()).count();
        present as f64 / row.len() as f64
    }

    /// Keep the rows for which `keep` returns true, preserving order
    pub fn retain_rows(self, mut keep: impl FnMut(&SnpInfo, &[Option<C>]) -> bool) -> Self {
        let (snps, rows): (Vec<_>, Vec<_>) = self
            .snps
            .into_iter()
            .zip(self.rows)
            .filter(|(snp, row)| keep(snp, row))
            .unzip();

        Self {
            snps,
            sample_ids: self.sample_ids,
            rows,
        }
    }

    /// Drop rows whose rsid was already seen. Returns the table and the
    /// number of dropped rows.
    pub fn dedup_first(self) -> (Self, usize) {
        let before = self.num_snps();
        let mut seen = HashSet::new();
        let deduped = self.retain_rows(|snp, _| seen.insert(snp.rsid.clone()));
        let dropped = before - deduped.num_snps();
        (deduped, dropped)
    }

}

/// Reference panel entry for a single SNP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelVariant {
    pub rsid: String,
    /// Reference allele the encoder counts against
    pub ref_allele: char,
    /// Minor (alternate) allele, when the panel carries it
    pub minor_allele: Option<char>,
}

/// A genotype table joined against a reference panel. `variants[i]`
/// describes `table.rows[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable<C> {
    pub table: GenotypeTable<C>,
    pub variants: Vec<PanelVariant>,
}

/// Samples x SNPs numeric matrix handed to models
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    pub sample_ids: Vec<String>,
    pub snp_ids: Vec<String>,
    /// shape: (n_samples, n_snps)
    pub values: Array2<f64>,
}

impl SampleMatrix {
    pub fn new(sample_ids: Vec<String>, snp_ids: Vec<String>, values: Array2<f64>) -> Result<Self, TableError> {
        if values.dim() != (sample_ids.len(), snp_ids.len()) {
            return Err(TableError::Shape(format!(
                "values are {:?}, ids are ({}, {})",
                values.dim(),
                sample_ids.len(),
                snp_ids.len()
            )));
        }
        Ok(Self {
            sample_ids,
            snp_ids,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Select rows by index, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            sample_ids: indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            snp_ids: self.snp_ids.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Select columns by index, in the given order
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            sample_ids: self.sample_ids.clone(),
            snp_ids: indices.iter().map(|&j| self.snp_ids[j].clone()).collect(),
            values: self.values.select(Axis(1), indices),
        }
    }
}
