// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for raw genotype, table, matrix and phenotype files
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================

pub mod ancestry;
pub mod genome23andme;
pub mod genotype_table;
pub mod matrix;
pub mod phenotypes;

pub use ancestry::{AncestryParseError, AncestryParser};
pub use genome23andme::{Genome23ParseError, Genome23Parser};
pub use genotype_table::{read_table, write_aligned_table, write_table, CellCodec, TableIoError};
pub use matrix::read_matrix_csv;
pub use phenotypes::{collapse_eye_color, PhenotypeParser, PhenotypeRecord};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One SNP call from a consumer genotyping file
#[derive(Debug, Clone, PartialEq)]
pub struct RawGenotypeRecord {
    /// SNP identifier (e.g., "rs548049170")
    pub rsid: String,
    /// Chromosome ("1"-"22", "X", "Y", "MT")
    pub chromosome: String,
    /// Base pair position
    pub position: u64,
    /// Two-letter call, None for a no-call
    pub genotype: Option<String>,
}

/// Missing-value markers shared by raw files and written tables
pub fn is_missing_marker(field: &str) -> bool {
    matches!(field.trim(), "" | "--" | "00" | "-" | "NA" | "nan" | "NaN")
}

/// Open a text file, decompressing when the name ends in `.gz`
pub fn open_text(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gz = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
