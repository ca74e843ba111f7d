// ==============================================================================
// validator.rs - Raw Genotype File Validation
// ==============================================================================
// Description: Locates per-user raw files and checks size, type and format
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================
// Supported names: user<ID>_*.23andme.txt, user<ID>_*.ancestry.txt,
// optionally gzip-compressed (.gz)
// ==============================================================================

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::parsers::open_text;

const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024; // 500 MB

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Consumer genotyping file layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    TwentyThreeAndMe,
    Ancestry,
}

impl RawFormat {
    /// Detect the format from the file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
        if stem.ends_with("23andme.txt") {
            Some(RawFormat::TwentyThreeAndMe)
        } else if stem.ends_with("ancestry.txt") {
            Some(RawFormat::Ancestry)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub format: RawFormat,
    pub compressed: bool,
    pub size: u64,
}

pub struct FileValidator {
    max_file_size: u64,
}

impl FileValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path"))?
            .to_string_lossy()
            .to_string();

        // 1. Size check
        let metadata = std::fs::metadata(file_path).context("Failed to get file metadata")?;
        let size = metadata.len();
        if size > self.max_file_size {
            anyhow::bail!("File too large: {} bytes (max: {} bytes)", size, self.max_file_size);
        }
        if size == 0 {
            anyhow::bail!("File is empty");
        }

        // 2. Type by name
        let format = RawFormat::from_file_name(&file_name)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized genotype file type: {}", file_name))?;

        // 3. Magic number for compressed files
        let compressed = file_name.to_ascii_lowercase().ends_with(".gz");
        if compressed && !self.has_gzip_magic(file_path)? {
            anyhow::bail!("Magic number mismatch for .gz file");
        }

        // 4. Content sniff
        self.validate_content(file_path, format)?;
        debug!("Validated {} as {:?}", file_name, format);

        Ok(ValidatedFile {
            path: file_path.to_path_buf(),
            format,
            compressed,
            size,
        })
    }

    fn has_gzip_magic(&self, path: &Path) -> Result<bool> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; 2];
        file.read_exact(&mut buffer)?;
        Ok(buffer == GZIP_MAGIC)
    }

    /// First non-comment line must look like the declared format
    fn validate_content(&self, path: &Path, format: RawFormat) -> Result<()> {
        let reader = open_text(path)?;

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let columns = trimmed.split('\t').count();
            return match format {
                RawFormat::TwentyThreeAndMe if columns == 4 => Ok(()),
                RawFormat::TwentyThreeAndMe => {
                    anyhow::bail!("Invalid 23andMe format: expected 4 columns, found {}", columns)
                }
                RawFormat::Ancestry if trimmed.starts_with("rsid") && trimmed.contains("allele1") => Ok(()),
                RawFormat::Ancestry => anyhow::bail!("Invalid AncestryDNA format: missing allele header"),
            };
        }

        anyhow::bail!("File contains no data lines")
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Files in `dir` named `user<ID>_*`, sorted by name
pub fn locate_user_files(dir: &Path, user_id: &str) -> Vec<PathBuf> {
    let prefix = format!("user{}_", user_id);
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_name() {
        assert_eq!(
            RawFormat::from_file_name("user1_file9_yearofbirth_1985_sex_XY.23andme.txt"),
            Some(RawFormat::TwentyThreeAndMe)
        );
        assert_eq!(
            RawFormat::from_file_name("user2_file3.ancestry.txt.gz"),
            Some(RawFormat::Ancestry)
        );
        assert_eq!(RawFormat::from_file_name("user3_file4.ftdna-illumina.txt"), None);
    }

    #[test]
    fn test_validate_23andme() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user1_file1.23andme.txt");
        std::fs::write(&path, "# This data file generated by 23andMe\nrs12345\t1\t12345\tAA\n").unwrap();

        let validated = FileValidator::new().validate(&path).unwrap();
        assert_eq!(validated.format, RawFormat::TwentyThreeAndMe);
        assert!(!validated.compressed);
    }

    #[test]
    fn test_validate_gzipped_ancestry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user2_file1.ancestry.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all(b"#AncestryDNA\nrsid\tchromosome\tposition\tallele1\tallele2\nrs1\t1\t1\tA\tG\n")
            .unwrap();
        encoder.finish().unwrap();

        let validated = FileValidator::new().validate(&path).unwrap();
        assert_eq!(validated.format, RawFormat::Ancestry);
        assert!(validated.compressed);
    }

    #[test]
    fn test_rejects_fake_gzip_and_wrong_layout() {
        let dir = tempdir().unwrap();
        let fake = dir.path().join("user3_file1.23andme.txt.gz");
        std::fs::write(&fake, "rs1\t1\t1\tAA\n").unwrap();
        assert!(FileValidator::new().validate(&fake).is_err());

        let wrong = dir.path().join("user3_file2.23andme.txt");
        std::fs::write(&wrong, "rs1,1,1,AA\n").unwrap();
        assert!(FileValidator::new().validate(&wrong).is_err());
    }

    #[test]
    fn test_size_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user4_file1.23andme.txt");
        std::fs::write(&path, "rs1\t1\t1\tAA\n").unwrap();
        assert!(FileValidator::with_max_size(4).validate(&path).is_err());
    }

    #[test]
    fn test_locate_user_files() {
        let dir = tempdir().unwrap();
        for name in ["user1_file2.23andme.txt", "user1_file1.ancestry.txt", "user12_file1.23andme.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let found = locate_user_files(dir.path(), "1");
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["user1_file1.ancestry.txt", "user1_file2.23andme.txt"]);
    }
}
