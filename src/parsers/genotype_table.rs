// ==============================================================================
// genotype_table.rs - SNP x Sample Table Reader/Writer
// ==============================================================================
// Description: Tab-delimited genotype tables exchanged between pipeline stages
// Author: Matt Barham
// Created: 2026-01-09
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited, one header row, one row per SNP
// Example:
//   rsid          chromosome  position   user1  user2  REF
//   rs12913832    15          28365618   AG     GG     A
// Metadata columns are recognised by name; every other column is a sample.
// Missing cells are written empty.
// ==============================================================================

use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::is_missing_marker;
use crate::models::{is_metadata_column, AlignedTable, AlleleCount, GenotypeTable, SnpInfo, TableError};

#[derive(Error, Debug)]
pub enum TableIoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Table has no rsid/ID column")]
    MissingIdColumn,

    #[error("Invalid cell '{value}' for SNP {rsid}, sample {sample}")]
    InvalidCell {
        rsid: String,
        sample: String,
        value: String,
    },

    #[error("Invalid position '{value}' for SNP {rsid}")]
    InvalidPosition { rsid: String, value: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Text form of a table cell
pub trait CellCodec: Sized {
    /// Decode a non-missing field; None rejects the value
    fn decode(field: &str) -> Option<Self>;
    fn encode(&self) -> String;
}

impl CellCodec for String {
    fn decode(field: &str) -> Option<Self> {
        Some(field.trim().to_ascii_uppercase())
    }

    fn encode(&self) -> String {
        self.clone()
    }
}

impl CellCodec for AlleleCount {
    /// Accepts "0", "1", "2" and their float spellings ("1.0")
    fn decode(field: &str) -> Option<Self> {
        let value: f64 = field.trim().parse().ok()?;
        if value.fract() == 0.0 && (0.0..=2.0).contains(&value) {
            Some(value as AlleleCount)
        } else {
            None
        }
    }

    fn encode(&self) -> String {
        self.to_string()
    }
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

/// Read a tab-delimited genotype table
pub fn read_table<C: CellCodec>(path: impl AsRef<Path>) -> Result<GenotypeTable<C>, TableIoError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('#').to_string())
        .collect();

    let id_col = find_column(&headers, &["rsid", "ID"]).ok_or(TableIoError::MissingIdColumn)?;
    let chrom_col = find_column(&headers, &["chromosome", "CHROM", "chr"]);
    let pos_col = find_column(&headers, &["position", "POS", "pos"]);

    let sample_cols: Vec<usize> = (0..headers.len())
        .filter(|&i| !is_metadata_column(&headers[i]))
        .collect();
    let sample_ids: Vec<String> = sample_cols.iter().map(|&i| headers[i].clone()).collect();

    let mut snps = Vec::new();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let rsid = field(id_col).to_string();
        let chromosome = chrom_col.map(field).filter(|c| !c.is_empty()).map(str::to_string);
        let position = match pos_col.map(field).filter(|p| !p.is_empty()) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| TableIoError::InvalidPosition {
                rsid: rsid.clone(),
                value: raw.to_string(),
            })?),
            None => None,
        };

        let mut row = Vec::with_capacity(sample_cols.len());
        for (&col, sample) in sample_cols.iter().zip(&sample_ids) {
            let raw = field(col);
            if is_missing_marker(raw) {
                row.push(None);
                continue;
            }
            let cell = C::decode(raw).ok_or_else(|| TableIoError::InvalidCell {
                rsid: rsid.clone(),
                sample: sample.clone(),
                value: raw.to_string(),
            })?;
            row.push(Some(cell));
        }

        snps.push(SnpInfo {
            rsid,
            chromosome,
            position,
        });
        rows.push(row);
    }

    debug!("Read table {}: {} SNPs x {} samples", path.as_ref().display(), snps.len(), sample_ids.len());
    Ok(GenotypeTable::new(snps, sample_ids, rows)?)
}

fn write_rows<C: CellCodec>(
    path: &Path,
    table: &GenotypeTable<C>,
    extra_header: &[&str],
    mut extra: impl FnMut(usize) -> Vec<String>,
) -> Result<(), TableIoError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header = vec!["rsid".to_string(), "chromosome".to_string(), "position".to_string()];
    header.extend(table.sample_ids.iter().cloned());
    header.extend(extra_header.iter().map(|h| h.to_string()));
    writer.write_record(&header)?;

    for (i, (snp, row)) in table.snps.iter().zip(&table.rows).enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(snp.rsid.clone());
        record.push(snp.chromosome.clone().unwrap_or_default());
        record.push(snp.position.map(|p| p.to_string()).unwrap_or_default());
        record.extend(row.iter().map(|cell| cell.as_ref().map(C::encode).unwrap_or_default()));
        record.extend(extra(i));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a genotype table: rsid, chromosome, position, then samples
pub fn write_table<C: CellCodec>(path: impl AsRef<Path>, table: &GenotypeTable<C>) -> Result<(), TableIoError> {
    write_rows(path.as_ref(), table, &[], |_| Vec::new())
}

/// Write an aligned table with the panel's REF allele as the last column
pub fn write_aligned_table<C: CellCodec>(
    path: impl AsRef<Path>,
    aligned: &AlignedTable<C>,
) -> Result<(), TableIoError> {
    write_rows(path.as_ref(), &aligned.table, &["REF"], |i| {
        vec![aligned.variants[i].ref_allele.to_string()]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PanelVariant, RawTable};
    use tempfile::tempdir;

    #[test]
    fn test_read_raw_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("initial_genotypes.tsv");
        std::fs::write(
            &path,
            "rsid\tchromosome\tposition\tuser1\tuser2\nrs1\t15\t100\tag\t--\nrs2\t\t\tTT\t\n",
        )
        .unwrap();

        let table: RawTable = read_table(&path).unwrap();
        assert_eq!(table.sample_ids, vec!["user1", "user2"]);
        assert_eq!(table.snps[0], SnpInfo::with_location("rs1", "15", 100));
        assert_eq!(table.snps[1], SnpInfo::new("rs2"));
        assert_eq!(table.rows[0], vec![Some("AG".to_string()), None]);
        assert_eq!(table.rows[1], vec![Some("TT".to_string()), None]);
    }

    #[test]
    fn test_count_cells_accept_float_spelling() {
        assert_eq!(AlleleCount::decode("1.0"), Some(1));
        assert_eq!(AlleleCount::decode("2"), Some(2));
        assert_eq!(AlleleCount::decode("3"), None);
        assert_eq!(AlleleCount::decode("0.5"), None);
    }

    #[test]
    fn test_invalid_count_cell() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_genotypes.tsv");
        std::fs::write(&path, "rsid\ts1\nrs1\t7\n").unwrap();

        let result = read_table::<AlleleCount>(&path);
        assert!(matches!(result, Err(TableIoError::InvalidCell { value, .. }) if value == "7"));
    }

    #[test]
    fn test_write_aligned_then_read_ignores_ref() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_genotypes.tsv");
        let table = GenotypeTable::new(
            vec![SnpInfo::with_location("rs1", "1", 10)],
            vec!["s1".to_string(), "s2".to_string()],
            vec![vec![Some(2u8), None]],
        )
        .unwrap();
        let aligned = AlignedTable {
            table: table.clone(),
            variants: vec![PanelVariant {
                rsid: "rs1".into(),
                ref_allele: 'A',
                minor_allele: None,
            }],
        };

        write_aligned_table(&path, &aligned).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "rsid\tchromosome\tposition\ts1\ts2\tREF\nrs1\t1\t10\t2\t\tA\n");

        let back: GenotypeTable<AlleleCount> = read_table(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_missing_id_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "snp\ts1\nrs1\tAA\n").unwrap();
        assert!(matches!(read_table::<String>(&path), Err(TableIoError::MissingIdColumn)));
    }
}
