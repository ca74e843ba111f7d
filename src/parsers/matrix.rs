// ==============================================================================
// matrix.rs - Sample Matrix CSV Reader
// ==============================================================================
// Description: Reads samples x SNPs matrices written by the set-building stages
// Author: Matt Barham
// Created: 2026-01-12
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Format: Comma-delimited, header "sample_id,<rsid>,<rsid>,..."
// ==============================================================================

use csv::ReaderBuilder;
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

use crate::models::{SampleMatrix, TableError};

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid value '{value}' for sample {sample}, SNP {snp}")]
    InvalidValue {
        sample: String,
        snp: String,
        value: String,
    },

    #[error("Matrix file has no header")]
    EmptyHeader,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Read a matrix CSV into a [`SampleMatrix`]
pub fn read_matrix_csv(path: impl AsRef<Path>) -> Result<SampleMatrix, MatrixError> {
    let mut reader = ReaderBuilder::new().from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(MatrixError::EmptyHeader);
    }
    let snp_ids: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut sample_ids = Vec::new();
    let mut values = Vec::new();

    for result in reader.records() {
        let row = result?;
        let sample = row.get(0).unwrap_or("").trim().to_string();

        for (j, snp) in snp_ids.iter().enumerate() {
            let raw = row.get(j + 1).unwrap_or("").trim();
            let value = raw.parse::<f64>().map_err(|_| MatrixError::InvalidValue {
                sample: sample.clone(),
                snp: snp.clone(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }
        sample_ids.push(sample);
    }

    let values = Array2::from_shape_vec((sample_ids.len(), snp_ids.len()), values)
        .map_err(|e| TableError::Shape(e.to_string()))?;

    Ok(SampleMatrix::new(sample_ids, snp_ids, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_read_matrix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("val_set.csv");
        std::fs::write(&path, "sample_id,rs2,rs1\nNA1,0.5,-1\nNA2,0,1.25\n").unwrap();

        let matrix = read_matrix_csv(&path).unwrap();
        assert_eq!(matrix.sample_ids, vec!["NA1", "NA2"]);
        assert_eq!(matrix.snp_ids, vec!["rs2", "rs1"]);
        assert_eq!(matrix.values, array![[0.5, -1.0], [0.0, 1.25]]);
    }

    #[test]
    fn test_invalid_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "sample_id,rs1\nNA1,abc\n").unwrap();

        assert!(matches!(
            read_matrix_csv(&path),
            Err(MatrixError::InvalidValue { snp, .. }) if snp == "rs1"
        ));
    }
}
