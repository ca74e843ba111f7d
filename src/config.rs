// ==============================================================================
// config.rs - Stage Configuration
// ==============================================================================
// Description: Explicit option structs for every pipeline stage
// Author: Matt Barham
// Created: 2026-01-11
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Defaults chain the stages together: each input defaults to the file the
// previous stage writes into the current directory.
// ==============================================================================

use std::path::PathBuf;

use crate::filter::DEFAULT_PRESENCE_THRESHOLD;
use crate::output::OutputFormat;
use crate::partition::{DEFAULT_SPLIT_SEED, DEFAULT_VAL_FRACTION};

// Stage output file names
pub const INITIAL_PHENOTYPES: &str = "initial_phenotypes.tsv";
pub const INITIAL_USERIDS: &str = "initial_userids.txt";
pub const INITIAL_GENOTYPES: &str = "initial_genotypes.tsv";
pub const FILTERED_GENOTYPES: &str = "filtered_genotypes.tsv";
pub const FILTERED_RSIDS: &str = "filtered_rsids.txt";
pub const FINAL_GENOTYPES: &str = "final_genotypes.tsv";
pub const FINAL_RSIDS: &str = "final_rsids.txt";
pub const TEST_SET: &str = "test_set";
pub const TEST_LABELS: &str = "test_labels.csv";
pub const REFERENCE_STATS: &str = "reference_snp_stats.tsv";
pub const TRAIN_SET: &str = "train_set";
pub const VAL_SET: &str = "val_set";
pub const IRISPLEX_PREDICTIONS: &str = "irisplex_predictions.tsv";
pub const TRAIN_LABELS: &str = "train_labels.csv";
pub const VAL_LABELS: &str = "val_labels.csv";
pub const TRAIN_IDS: &str = "train_ids.txt";
pub const VAL_IDS: &str = "val_ids.txt";
pub const IRISPLEX_TEST_PREDICTIONS: &str = "irisplex_test_predictions.tsv";

/// Where a stage writes its results and its run log
#[derive(Debug, Clone, PartialEq)]
pub struct RunDirs {
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for RunDirs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("."),
        }
    }
}

impl RunDirs {
    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeOptions {
    /// Semicolon-delimited phenotype export
    pub phenotype_file: PathBuf,
    pub dirs: RunDirs,
}

impl Default for PhenotypeOptions {
    fn default() -> Self {
        Self {
            phenotype_file: PathBuf::from("phenotypes.csv"),
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Newline-delimited user ids
    pub id_file: PathBuf,
    /// Directory holding `user<ID>_*` raw files
    pub genotype_dir: PathBuf,
    /// Only the first N ids
    pub subset: Option<usize>,
    pub dirs: RunDirs,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            id_file: PathBuf::from(INITIAL_USERIDS),
            genotype_dir: PathBuf::from("genotypes"),
            subset: None,
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub genotypes: PathBuf,
    /// Keep SNPs called in strictly more than this fraction of samples
    pub threshold: f64,
    pub dirs: RunDirs,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from(INITIAL_GENOTYPES),
            threshold: DEFAULT_PRESENCE_THRESHOLD,
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub genotypes: PathBuf,
    /// Reference panel TSV (`ID`, `REF`, optional `ALT`)
    pub panel: PathBuf,
    pub dirs: RunDirs,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from(FILTERED_GENOTYPES),
            panel: PathBuf::from("reference_panel.tsv"),
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSetOptions {
    /// Encoded table from the encode stage
    pub genotypes: PathBuf,
    pub phenotypes: PathBuf,
    /// Scale with reference-population statistics instead of in-sample
    pub reference_stats: Option<PathBuf>,
    /// Column order to impose on the matrix
    pub snp_order: Option<PathBuf>,
    pub format: OutputFormat,
    pub dirs: RunDirs,
}

impl Default for TestSetOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from(FINAL_GENOTYPES),
            phenotypes: PathBuf::from(INITIAL_PHENOTYPES),
            reference_stats: None,
            snp_order: None,
            format: OutputFormat::Csv,
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSetOptions {
    /// Numeric reference-population table
    pub genotypes: PathBuf,
    pub train_ids: PathBuf,
    pub val_ids: PathBuf,
    pub snp_order: Option<PathBuf>,
    pub format: OutputFormat,
    pub dirs: RunDirs,
}

impl Default for TrainSetOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from("reference_genotypes.tsv"),
            train_ids: PathBuf::from(TRAIN_IDS),
            val_ids: PathBuf::from(VAL_IDS),
            snp_order: Some(PathBuf::from(FINAL_RSIDS)),
            format: OutputFormat::Csv,
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictOptions {
    /// Numeric reference-population table
    pub genotypes: PathBuf,
    /// IrisPlex BED (`chr pos1 pos2 id minor_allele b1 b2`)
    pub irisplex_bed: PathBuf,
    pub val_fraction: f64,
    pub seed: u64,
    pub dirs: RunDirs,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from("reference_genotypes.tsv"),
            irisplex_bed: PathBuf::from("irisplex.bed"),
            val_fraction: DEFAULT_VAL_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrisTestOptions {
    /// Encoded sample table
    pub genotypes: PathBuf,
    pub irisplex_bed: PathBuf,
    pub phenotypes: PathBuf,
    pub dirs: RunDirs,
}

impl Default for IrisTestOptions {
    fn default() -> Self {
        Self {
            genotypes: PathBuf::from(FINAL_GENOTYPES),
            irisplex_bed: PathBuf::from("irisplex.bed"),
            phenotypes: PathBuf::from(INITIAL_PHENOTYPES),
            dirs: RunDirs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateOptions {
    /// Sample id + brown/blue/other probability columns
    pub scores: PathBuf,
    pub labels: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            scores: PathBuf::from(IRISPLEX_TEST_PREDICTIONS),
            labels: PathBuf::from(TEST_LABELS),
            log_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(FilterOptions::default().threshold, 0.8);
        assert_eq!(PredictOptions::default().val_fraction, 0.2);
        assert_eq!(PredictOptions::default().seed, 42);
        assert_eq!(RunDirs::default().output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_stage_inputs_chain() {
        assert_eq!(FilterOptions::default().genotypes, PathBuf::from(INITIAL_GENOTYPES));
        assert_eq!(EncodeOptions::default().genotypes, PathBuf::from(FILTERED_GENOTYPES));
        assert_eq!(TestSetOptions::default().genotypes, PathBuf::from(FINAL_GENOTYPES));
        assert_eq!(TrainSetOptions::default().train_ids, PathBuf::from(TRAIN_IDS));
    }
}
