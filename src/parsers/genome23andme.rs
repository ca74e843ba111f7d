// ==============================================================================
// genome23andme.rs - 23andMe Raw Data Parser
// ==============================================================================
// Description: Parser for 23andMe raw genome data files
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text with header comments
// Example:
//   # rsid    chromosome    position    genotype
//   rs548049170    1    69869    TT
//   rs13328684    1    74792    --
//   rs9283150    1    565508    AA
// ==============================================================================

use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use super::{is_missing_marker, open_text, RawGenotypeRecord};

/// Errors that can occur during 23andMe file parsing
#[derive(Error, Debug)]
pub enum Genome23ParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: usize, details: String },

    #[error("Invalid position value at line {line}: {value}")]
    InvalidPosition { line: usize, value: String },

    #[error("File is empty or contains only comments")]
    EmptyFile,
}

/// Parser for 23andMe raw genome files
#[derive(Debug, Clone, Default)]
pub struct Genome23Parser;

impl Genome23Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a 23andMe genome file (plain or `.gz`)
    ///
    /// Lines starting with '#' are comments. No-calls ("--") become
    /// records with a missing genotype.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<RawGenotypeRecord>, Genome23ParseError> {
        let reader = open_text(path.as_ref())?;
        self.parse_reader(reader)
    }

    /// Parse 23andMe records from any buffered reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Vec<RawGenotypeRecord>, Genome23ParseError> {
        let mut records = Vec::new();

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let trimmed = line.trim();

            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }

            records.push(self.parse_line(&line, idx + 1)?);
        }

        if records.is_empty() {
            return Err(Genome23ParseError::EmptyFile);
        }

        Ok(records)
    }

    fn parse_line(&self, line: &str, line_number: usize) -> Result<RawGenotypeRecord, Genome23ParseError> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() != 4 {
            return Err(Genome23ParseError::InvalidFormat {
                line: line_number,
                details: format!("Expected 4 tab-delimited fields, found {}", fields.len()),
            });
        }

        let position_str = fields[2].trim();
        let position = position_str
            .parse::<u64>()
            .map_err(|_| Genome23ParseError::InvalidPosition {
                line: line_number,
                value: position_str.to_string(),
            })?;

        let call = fields[3].trim();
        let genotype = if is_missing_marker(call) {
            None
        } else {
            Some(call.to_ascii_uppercase())
        };

        Ok(RawGenotypeRecord {
            rsid: fields[0].trim().to_string(),
            chromosome: fields[1].trim().to_string(),
            position,
            genotype,
        })
    }
}
