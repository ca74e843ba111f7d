// ==============================================================================
// phenotypes.rs - openSNP Phenotype Export Parser
// ==============================================================================
// Description: Collapses self-reported eye color into one canonical label
// Author: Matt Barham
// Created: 2026-01-09
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Format: Semicolon-delimited with header; '-' marks an unanswered question
// Example:
//   user_id;genotype_filename;...;Eye color;...;Eye Color;...;Eye pigmentation
//   1;user1_file9_yearofbirth_1985_sex_XY.23andme.txt;...;Brown;...;-;...;-
// ==============================================================================

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::labels::EyeColor;

/// Eye color questions, checked in this order
pub const EYE_COLOR_COLUMNS: [&str; 3] = ["Eye color", "Eye Color", "Eye pigmentation "];

/// Answers accepted as a label
pub const ACCEPTED_ANSWERS: [&str; 6] = ["Brown", "brown", "Blue", "blue", "Green", "green"];

/// Genotype file sources kept for extraction
pub const SUPPORTED_SOURCES: [&str; 2] = ["ancestry", "23andme"];

#[derive(Error, Debug)]
pub enum PhenotypeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Phenotype export is missing column '{0}'")]
    MissingColumn(String),
}

/// One user with a usable eye color label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenotypeRecord {
    pub user_id: String,
    pub genotype_filename: String,
    pub eye_color: EyeColor,
}

/// First accepted answer across the eye color questions. Answers must match
/// one of the accepted spellings exactly, surrounding whitespace included.
pub fn collapse_eye_color(answers: &[&str]) -> Option<EyeColor> {
    answers
        .iter()
        .find(|a| ACCEPTED_ANSWERS.contains(*a))
        .and_then(|a| a.parse().ok())
}

#[derive(Debug, Clone, Default)]
pub struct PhenotypeParser;

impl PhenotypeParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the export, keeping labelled 23andMe/AncestryDNA users.
    /// Duplicate user ids keep their first row.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<PhenotypeRecord>, PhenotypeError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name.trim())
                .ok_or_else(|| PhenotypeError::MissingColumn(name.to_string()))
        };
        let user_col = column("user_id")?;
        let file_col = column("genotype_filename")?;
        let eye_cols = EYE_COLOR_COLUMNS
            .iter()
            .map(|name| column(*name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut rows = 0usize;
        let mut unlabelled = 0usize;
        let mut duplicates = 0usize;
        let mut unsupported = 0usize;

        for result in reader.records() {
            let row = result?;
            rows += 1;
            let field = |i: usize| row.get(i).unwrap_or("");

            let answers: Vec<&str> = eye_cols.iter().map(|&i| field(i)).collect();
            let Some(eye_color) = collapse_eye_color(&answers) else {
                unlabelled += 1;
                continue;
            };

            let user_id = field(user_col).trim().to_string();
            if !seen.insert(user_id.clone()) {
                duplicates += 1;
                continue;
            }

            let genotype_filename = field(file_col).trim().to_string();
            if !SUPPORTED_SOURCES.iter().any(|s| genotype_filename.contains(s)) {
                unsupported += 1;
                continue;
            }

            records.push(PhenotypeRecord {
                user_id,
                genotype_filename,
                eye_color,
            });
        }

        debug!(
            "Phenotype rows: {} read, {} unlabelled, {} duplicate, {} unsupported source",
            rows, unlabelled, duplicates, unsupported
        );
        info!("Kept {} labelled users", records.len());

        Ok(records)
    }
}

/// Write `initial_phenotypes.tsv`
pub fn write_phenotypes(path: impl AsRef<Path>, records: &[PhenotypeRecord]) -> Result<(), PhenotypeError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read `initial_phenotypes.tsv`
pub fn read_phenotypes(path: impl AsRef<Path>) -> Result<Vec<PhenotypeRecord>, PhenotypeError> {
    let mut reader = ReaderBuilder::new().delimiter(b'\t').from_path(path.as_ref())?;
    let records = reader.deserialize().collect::<Result<Vec<PhenotypeRecord>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const EXPORT: &str = "\
user_id;genotype_filename;date_of_birth;Eye color;Eye Color;Eye pigmentation
1;user1_file1_yearofbirth_1980_sex_XY.23andme.txt;1980;Brown;-;-
2;user2_file2_yearofbirth_1981_sex_XX.ancestry.txt;1981;-;blue;-
3;user3_file3_yearofbirth_1982_sex_XX.ftdna-illumina.txt;1982;Green;-;-
4;user4_file4_yearofbirth_1983_sex_XY.23andme.txt;1983;Hazel;-;-
1;user1_file5_yearofbirth_1980_sex_XY.23andme.txt;1980;Blue;-;-
5;user5_file6_yearofbirth_1984_sex_XY.23andme.txt;1984;Dark brown;-;green
";

    #[test]
    fn test_collapse_eye_color() {
        assert_eq!(collapse_eye_color(&["-", "Blue", "Brown"]), Some(EyeColor::Blue));
        assert_eq!(collapse_eye_color(&["Hazel", "-", "-"]), None);
        assert_eq!(collapse_eye_color(&["BROWN", "-", "-"]), None);
        assert_eq!(collapse_eye_color(&[" Brown", "-", "-"]), None);
        assert_eq!(collapse_eye_color(&["blue ", "green", "-"]), Some(EyeColor::Green));
    }

    #[test]
    fn test_parse_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phenotypes.csv");
        std::fs::write(&path, EXPORT).unwrap();

        let records = PhenotypeParser::new().parse(&path).unwrap();
        let summary: Vec<(&str, EyeColor)> = records
            .iter()
            .map(|r| (r.user_id.as_str(), r.eye_color))
            .collect();

        assert_eq!(
            summary,
            vec![("1", EyeColor::Brown), ("2", EyeColor::Blue), ("5", EyeColor::Green)]
        );
        assert_eq!(records[0].genotype_filename, "user1_file1_yearofbirth_1980_sex_XY.23andme.txt");
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phenotypes.csv");
        std::fs::write(&path, "user_id;genotype_filename;Eye color\n").unwrap();

        let result = PhenotypeParser::new().parse(&path);
        assert!(matches!(result, Err(PhenotypeError::MissingColumn(c)) if c == "Eye Color"));
    }

    #[test]
    fn test_tsv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("initial_phenotypes.tsv");
        let records = vec![PhenotypeRecord {
            user_id: "7".into(),
            genotype_filename: "user7_file1.ancestry.txt".into(),
            eye_color: EyeColor::Green,
        }];

        write_phenotypes(&path, &records).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "user_id\tgenotype_filename\teye_color\n7\tuser7_file1.ancestry.txt\tgreen\n"
        );
        assert_eq!(read_phenotypes(&path).unwrap(), records);
    }
}
