// ==============================================================================
// labels.rs - Eye Color Label Vocabularies
// ==============================================================================
// Description: Phenotype classes, numeric encodings and label/id list files
// Author: Matt Barham
// Created: 2026-01-10
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// The trained model uses {brown, blue, green}; IrisPlex reports
// {brown, blue, other}. EyeColor is canonical and green maps to other.
// Both encode as brown=0, blue=1, green/other=2.
// ==============================================================================

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Unknown eye color label: '{0}'")]
    UnknownLabel(String),

    #[error("Numeric label out of range: {0}")]
    InvalidCode(u8),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Self-reported eye color (canonical vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeColor {
    Brown,
    Blue,
    Green,
}

impl EyeColor {
    pub const ALL: [EyeColor; 3] = [EyeColor::Brown, EyeColor::Blue, EyeColor::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            EyeColor::Brown => "brown",
            EyeColor::Blue => "blue",
            EyeColor::Green => "green",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EyeColor::Brown => 0,
            EyeColor::Blue => 1,
            EyeColor::Green => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, LabelError> {
        match code {
            0 => Ok(EyeColor::Brown),
            1 => Ok(EyeColor::Blue),
            2 => Ok(EyeColor::Green),
            other => Err(LabelError::InvalidCode(other)),
        }
    }

    /// The IrisPlex class this color is scored as
    pub fn to_irisplex(&self) -> IrisPlexClass {
        match self {
            EyeColor::Brown => IrisPlexClass::Brown,
            EyeColor::Blue => IrisPlexClass::Blue,
            EyeColor::Green => IrisPlexClass::Other,
        }
    }
}

impl fmt::Display for EyeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EyeColor {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brown" => Ok(EyeColor::Brown),
            "blue" => Ok(EyeColor::Blue),
            "green" => Ok(EyeColor::Green),
            _ => Err(LabelError::UnknownLabel(s.to_string())),
        }
    }
}

/// IrisPlex prediction class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrisPlexClass {
    Brown,
    Blue,
    Other,
}

impl IrisPlexClass {
    pub const ALL: [IrisPlexClass; 3] = [IrisPlexClass::Brown, IrisPlexClass::Blue, IrisPlexClass::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            IrisPlexClass::Brown => "brown",
            IrisPlexClass::Blue => "blue",
            IrisPlexClass::Other => "other",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            IrisPlexClass::Brown => 0,
            IrisPlexClass::Blue => 1,
            IrisPlexClass::Other => 2,
        }
    }
}

impl fmt::Display for IrisPlexClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `id,label` row of a label file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub sample_id: String,
    pub label: u8,
}

/// Write `sample_id,label` rows
pub fn write_labels(path: impl AsRef<Path>, records: &[LabelRecord]) -> Result<(), LabelError> {
    let mut writer = WriterBuilder::new().from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a two-column label CSV. The header names are not checked, so files
/// with any index/label header are accepted.
pub fn read_labels(path: impl AsRef<Path>) -> Result<Vec<LabelRecord>, LabelError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path.as_ref())?;
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let sample_id = row.get(0).unwrap_or("").trim().to_string();
        let raw = row.get(1).unwrap_or("").trim();
        let label = raw
            .parse::<u8>()
            .map_err(|_| LabelError::UnknownLabel(raw.to_string()))?;
        EyeColor::from_code(label)?;
        records.push(LabelRecord { sample_id, label });
    }

    Ok(records)
}

/// Read a newline-delimited id list, skipping blank lines
pub fn read_id_list(path: impl AsRef<Path>) -> Result<Vec<String>, LabelError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Write a newline-delimited id list
pub fn write_id_list<S: AsRef<str>>(path: impl AsRef<Path>, ids: &[S]) -> Result<(), LabelError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for id in ids {
        writeln!(writer, "{}", id.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_eye_color() {
        assert_eq!("Brown".parse::<EyeColor>().unwrap(), EyeColor::Brown);
        assert_eq!("blue".parse::<EyeColor>().unwrap(), EyeColor::Blue);
        assert_eq!(" green ".parse::<EyeColor>().unwrap(), EyeColor::Green);
        assert!("hazel".parse::<EyeColor>().is_err());
    }

    #[test]
    fn test_codes_match_between_vocabularies() {
        for color in EyeColor::ALL {
            assert_eq!(color.code(), color.to_irisplex().code());
            assert_eq!(EyeColor::from_code(color.code()).unwrap(), color);
        }
        assert_eq!(EyeColor::Green.to_irisplex(), IrisPlexClass::Other);
        assert!(EyeColor::from_code(3).is_err());
    }

    #[test]
    fn test_label_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let records = vec![
            LabelRecord {
                sample_id: "NA12249".into(),
                label: 1,
            },
            LabelRecord {
                sample_id: "HG00096".into(),
                label: 0,
            },
        ];

        write_labels(&path, &records).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "sample_id,label\nNA12249,1\nHG00096,0\n");
        assert_eq!(read_labels(&path).unwrap(), records);
    }

    #[test]
    fn test_read_labels_rejects_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "user_id,label\n6,7\n").unwrap();
        assert!(matches!(read_labels(&path), Err(LabelError::InvalidCode(7))));
    }

    #[test]
    fn test_id_list_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "6\n\n  8 \n").unwrap();
        assert_eq!(read_id_list(&path).unwrap(), vec!["6", "8"]);

        write_id_list(&path, &["a", "b"]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
