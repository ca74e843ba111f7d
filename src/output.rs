// ==============================================================================
// output.rs - Matrix and Table Output
// ==============================================================================
// Description: Writes sample matrices as CSV or Parquet, plus TSV reports
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

// Apache Arrow/Parquet for columnar data
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::models::SampleMatrix;

/// Serialized form of a samples x SNPs matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-delimited, header "sample_id,<rsid>,..."
    #[default]
    Csv,
    /// Apache Parquet (best for data science: Python, R, Spark)
    Parquet,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    /// `<dir>/<stem>.<ext>`
    pub fn path_for(&self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", stem, self.extension()))
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(format!("unknown output format '{}' (expected csv or parquet)", other)),
        }
    }
}

/// Write a matrix in the requested format
pub fn write_matrix(path: &Path, matrix: &SampleMatrix, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => write_matrix_csv(path, matrix),
        OutputFormat::Parquet => write_matrix_parquet(path, matrix),
    }
}

/// One row per sample; values use the shortest round-trip decimal form
pub fn write_matrix_csv(path: &Path, matrix: &SampleMatrix) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = Vec::with_capacity(matrix.snp_ids.len() + 1);
    header.push("sample_id".to_string());
    header.extend(matrix.snp_ids.iter().cloned());
    writer.write_record(&header)?;

    for (sample, row) in matrix.sample_ids.iter().zip(matrix.values.rows()) {
        let mut record = Vec::with_capacity(header.len());
        record.push(sample.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(
        "Wrote {} ({} samples x {} SNPs)",
        path.display(),
        matrix.sample_ids.len(),
        matrix.snp_ids.len()
    );
    Ok(())
}

/// `sample_id` string column followed by one Float64 column per SNP
pub fn write_matrix_parquet(path: &Path, matrix: &SampleMatrix) -> Result<()> {
    let mut fields = Vec::with_capacity(matrix.snp_ids.len() + 1);
    fields.push(Field::new("sample_id", DataType::Utf8, false));
    fields.extend(
        matrix
            .snp_ids
            .iter()
            .map(|id| Field::new(id.as_str(), DataType::Float64, false)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(matrix.snp_ids.len() + 1);
    columns.push(Arc::new(StringArray::from(
        matrix.sample_ids.iter().map(String::as_str).collect::<Vec<_>>(),
    )));
    for column in matrix.values.columns() {
        columns.push(Arc::new(Float64Array::from(column.to_vec())));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("Failed to create Arrow RecordBatch")?;

    let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).context("Failed to create Parquet writer")?;
    writer.write(&batch).context("Failed to write Parquet data")?;
    writer.close().context("Failed to close Parquet writer")?;

    info!(
        "Parquet output complete: {} samples x {} SNPs",
        matrix.sample_ids.len(),
        matrix.snp_ids.len()
    );
    Ok(())
}

/// Serialize rows to a tab-delimited file with a header from the field names
pub fn write_tsv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
