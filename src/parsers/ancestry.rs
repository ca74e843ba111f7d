// ==============================================================================
// ancestry.rs - AncestryDNA Raw Data Parser
// ==============================================================================
// Description: Parser for AncestryDNA raw data downloads
// Author: Matt Barham
// Created: 2026-01-10
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited text, '#' comments, then a header row
// Example:
//   #AncestryDNA raw data download
//   rsid    chromosome    position    allele1    allele2
//   rs4477212    1    82154    A    A
//   rs3131972    1    752721    0    0
// ==============================================================================

use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use super::{is_missing_marker, open_text, RawGenotypeRecord};

#[derive(Error, Debug)]
pub enum AncestryParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Header is missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: usize, details: String },

    #[error("Invalid position value at line {line}: {value}")]
    InvalidPosition { line: usize, value: String },

    #[error("File is empty or contains only comments")]
    EmptyFile,
}

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct Columns {
    rsid: usize,
    chromosome: usize,
    position: usize,
    allele1: usize,
    allele2: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, AncestryParseError> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or_else(|| AncestryParseError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            rsid: find("rsid")?,
            chromosome: find("chromosome")?,
            position: find("position")?,
            allele1: find("allele1")?,
            allele2: find("allele2")?,
        })
    }

    fn width(&self) -> usize {
        [self.rsid, self.chromosome, self.position, self.allele1, self.allele2]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Parser for AncestryDNA raw files; the genotype is allele1 + allele2
#[derive(Debug, Clone, Default)]
pub struct AncestryParser;

impl AncestryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<RawGenotypeRecord>, AncestryParseError> {
        let reader = open_text(path.as_ref())?;
        self.parse_reader(reader)
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Vec<RawGenotypeRecord>, AncestryParseError> {
        let mut columns: Option<Columns> = None;
        let mut records = Vec::new();

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_number = idx + 1;
            let trimmed = line.trim();

            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }

            let cols = match columns {
                Some(cols) => cols,
                None => {
                    columns = Some(Columns::from_header(&line)?);
                    continue;
                }
            };

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < cols.width() {
                return Err(AncestryParseError::InvalidFormat {
                    line: line_number,
                    details: format!("Expected at least {} fields, found {}", cols.width(), fields.len()),
                });
            }

            let position = fields[cols.position]
                .parse::<u64>()
                .map_err(|_| AncestryParseError::InvalidPosition {
                    line: line_number,
                    value: fields[cols.position].to_string(),
                })?;

            let (a1, a2) = (fields[cols.allele1], fields[cols.allele2]);
            let genotype = if is_missing_marker(a1) || is_missing_marker(a2) || a1 == "0" || a2 == "0" {
                None
            } else {
                Some(format!("{}{}", a1, a2).to_ascii_uppercase())
            };

            records.push(RawGenotypeRecord {
                rsid: fields[cols.rsid].to_string(),
                chromosome: fields[cols.chromosome].to_string(),
                position,
                genotype,
            });
        }

        if records.is_empty() {
            return Err(AncestryParseError::EmptyFile);
        }

        Ok(records)
    }
}
