// ==============================================================================
// reference_panel.rs - Reference Panel Reader and SNP Aligner
// ==============================================================================
// Description: Loads reference-population SNP alleles and joins sample tables
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text with header
// Example:
//   ID            REF    ALT
//   rs12913832    A      G
//   rs1800407     C      T
// ==============================================================================

use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AlignedTable, GenotypeTable, PanelVariant};

/// Errors that can occur while loading a reference panel
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Reference panel is missing column '{0}'")]
    MissingColumn(String),

    #[error("Reference panel contains no usable variants")]
    EmptyPanel,
}

/// Reference panel: one entry per SNP identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePanel {
    variants: Vec<PanelVariant>,
}

impl ReferencePanel {
    /// Build a panel, keeping the first entry for each rsid
    pub fn new(variants: Vec<PanelVariant>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let before = variants.len();
        let variants: Vec<PanelVariant> = variants
            .into_iter()
            .filter(|v| seen.insert(v.rsid.clone()))
            .collect();

        if variants.len() < before {
            warn!(
                "Reference panel: dropped {} duplicate identifiers (first entry kept)",
                before - variants.len()
            );
        }

        Self { variants }
    }

    /// Load a tab-delimited panel with `ID` (or `rsid`) and `REF` columns and
    /// an optional `ALT` column. Rows whose REF is not a single nucleotide
    /// are skipped since two-letter calls cannot be counted against them.
    pub fn from_tsv(path: impl AsRef<Path>) -> Result<Self, PanelError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('#').to_string())
            .collect();

        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

        let id_idx = find(&["ID", "rsid"]).ok_or_else(|| PanelError::MissingColumn("ID".into()))?;
        let ref_idx = find(&["REF"]).ok_or_else(|| PanelError::MissingColumn("REF".into()))?;
        let alt_idx = find(&["ALT"]);

        let mut variants = Vec::new();
        let mut skipped = 0usize;

        for result in reader.records() {
            let record = result?;
            let rsid = record.get(id_idx).unwrap_or("").trim();
            let ref_allele = single_allele(record.get(ref_idx).unwrap_or(""));

            match ref_allele {
                Some(ref_allele) if !rsid.is_empty() => {
                    let minor_allele = alt_idx.and_then(|i| record.get(i)).and_then(single_allele);
                    variants.push(PanelVariant {
                        rsid: rsid.to_string(),
                        ref_allele,
                        minor_allele,
                    });
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Reference panel: skipped {} rows without a single-base REF", skipped);
        }

        if variants.is_empty() {
            return Err(PanelError::EmptyPanel);
        }

        let panel = Self::new(variants);
        info!("Loaded {} reference panel variants", panel.len());
        Ok(panel)
    }

    pub fn variants(&self) -> &[PanelVariant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

fn single_allele(field: &str) -> Option<char> {
    let mut chars = field.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// Counters gathered during alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlignReport {
    pub table_snps: usize,
    pub panel_snps: usize,
    pub duplicate_table_ids: usize,
    pub aligned_snps: usize,
}

/// Inner-join a sample table with the panel on rsid.
///
/// Duplicate identifiers in the table are resolved first-match-wins before
/// the join (the panel is already unique). Output rows follow the table's
/// row order and carry the matching panel entry.
pub fn align<C: Clone>(table: &GenotypeTable<C>, panel: &ReferencePanel) -> (AlignedTable<C>, AlignReport) {
    let lookup: HashMap<&str, &PanelVariant> =
        panel.variants().iter().map(|v| (v.rsid.as_str(), v)).collect();

    let (deduped, duplicate_table_ids) = table.clone().dedup_first();

    let mut variants = Vec::new();
    let aligned = deduped.retain_rows(|snp, _| match lookup.get(snp.rsid.as_str()) {
        Some(variant) => {
            variants.push((*variant).clone());
            true
        }
        None => false,
    });

    let report = AlignReport {
        table_snps: table.num_snps(),
        panel_snps: panel.len(),
        duplicate_table_ids,
        aligned_snps: aligned.num_snps(),
    };

    info!(
        "Aligned {} of {} SNPs against {} panel variants ({} duplicate ids dropped)",
        report.aligned_snps, report.table_snps, report.panel_snps, report.duplicate_table_ids
    );

    (
        AlignedTable {
            table: aligned,
            variants,
        },
        report,
    )
}
