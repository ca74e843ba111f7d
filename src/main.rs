// ==============================================================================
// main.rs - Eye Color Pipeline Entry Point
// ==============================================================================
// Description: Command line front end with one subcommand per pipeline stage
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eyecolor_pipeline::config::*;
use eyecolor_pipeline::filter::DEFAULT_PRESENCE_THRESHOLD;
use eyecolor_pipeline::output::OutputFormat;
use eyecolor_pipeline::partition::{DEFAULT_SPLIT_SEED, DEFAULT_VAL_FRACTION};
use eyecolor_pipeline::processor;
use eyecolor_pipeline::run_log::RunSummary;

#[derive(Parser, Debug)]
#[command(author, version, about = "SNP genotype preparation and IrisPlex eye color baseline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DirArgs {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory for <stage>.log and <stage>.summary.json
    #[arg(short, long, default_value = ".")]
    log_dir: PathBuf,
}

impl From<DirArgs> for RunDirs {
    fn from(args: DirArgs) -> Self {
        RunDirs {
            output_dir: args.output_dir,
            log_dir: args.log_dir,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collapse the phenotype export into labelled user ids
    Phenotypes {
        /// Semicolon-delimited phenotype export
        #[arg(short, long)]
        phenotype_file: PathBuf,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Merge per-user raw genotype files into one SNP x user table
    Extract {
        /// Newline-delimited user ids
        #[arg(short, long, default_value = INITIAL_USERIDS)]
        id_file: PathBuf,
        /// Directory holding user<ID>_* raw files
        #[arg(short, long)]
        genotype_dir: PathBuf,
        /// Only use the first N ids
        #[arg(short, long)]
        subset: Option<usize>,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Keep SNPs called in more than a fraction of samples
    Filter {
        #[arg(short, long, default_value = INITIAL_GENOTYPES)]
        genotypes: PathBuf,
        /// Presence threshold in (0, 1]
        #[arg(short, long, default_value_t = DEFAULT_PRESENCE_THRESHOLD)]
        threshold: f64,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Align to the reference panel and encode calls as allele counts
    Encode {
        #[arg(short, long, default_value = FILTERED_GENOTYPES)]
        genotypes: PathBuf,
        /// Reference panel TSV with ID and REF columns
        #[arg(short, long)]
        panel: PathBuf,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Z-score the encoded table into the test matrix and labels
    TestSet {
        #[arg(short, long, default_value = FINAL_GENOTYPES)]
        genotypes: PathBuf,
        #[arg(short, long, default_value = INITIAL_PHENOTYPES)]
        phenotypes: PathBuf,
        /// Scale with reference-population statistics
        #[arg(long)]
        reference_stats: Option<PathBuf>,
        /// SNP column order to match
        #[arg(long)]
        snp_order: Option<PathBuf>,
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Z-score the reference population and split train/validation matrices
    TrainSet {
        #[arg(short, long)]
        genotypes: PathBuf,
        #[arg(long, default_value = TRAIN_IDS)]
        train_ids: PathBuf,
        #[arg(long, default_value = VAL_IDS)]
        val_ids: PathBuf,
        /// SNP column order shared with the test matrix
        #[arg(long, default_value = FINAL_RSIDS)]
        snp_order: Option<PathBuf>,
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Label the reference population with IrisPlex and split it
    Predict {
        #[arg(short, long)]
        genotypes: PathBuf,
        /// IrisPlex BED (chr pos1 pos2 id minor_allele b1 b2)
        #[arg(short, long)]
        irisplex_bed: PathBuf,
        #[arg(long, default_value_t = DEFAULT_VAL_FRACTION)]
        val_fraction: f64,
        #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
        seed: u64,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Accuracy of IrisPlex against self-reported eye color
    TestIris {
        #[arg(short, long, default_value = FINAL_GENOTYPES)]
        genotypes: PathBuf,
        #[arg(short, long)]
        irisplex_bed: PathBuf,
        #[arg(short, long, default_value = INITIAL_PHENOTYPES)]
        phenotypes: PathBuf,
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// One-vs-rest ROC AUC of class scores against labels
    Evaluate {
        /// Sample id plus brown/blue/other probability columns
        #[arg(short, long, default_value = IRISPLEX_TEST_PREDICTIONS)]
        scores: PathBuf,
        #[arg(long, default_value = TEST_LABELS)]
        labels: PathBuf,
        #[arg(short, long, default_value = ".")]
        log_dir: PathBuf,
    },
}

fn run(command: Command) -> Result<RunSummary> {
    match command {
        Command::Phenotypes { phenotype_file, dirs } => processor::run_phenotypes(&PhenotypeOptions {
            phenotype_file,
            dirs: dirs.into(),
        }),
        Command::Extract {
            id_file,
            genotype_dir,
            subset,
            dirs,
        } => processor::run_extract(&ExtractOptions {
            id_file,
            genotype_dir,
            subset,
            dirs: dirs.into(),
        }),
        Command::Filter {
            genotypes,
            threshold,
            dirs,
        } => processor::run_filter(&FilterOptions {
            genotypes,
            threshold,
            dirs: dirs.into(),
        }),
        Command::Encode { genotypes, panel, dirs } => processor::run_encode(&EncodeOptions {
            genotypes,
            panel,
            dirs: dirs.into(),
        }),
        Command::TestSet {
            genotypes,
            phenotypes,
            reference_stats,
            snp_order,
            format,
            dirs,
        } => processor::run_test_set(&TestSetOptions {
            genotypes,
            phenotypes,
            reference_stats,
            snp_order,
            format,
            dirs: dirs.into(),
        }),
        Command::TrainSet {
            genotypes,
            train_ids,
            val_ids,
            snp_order,
            format,
            dirs,
        } => processor::run_train_set(&TrainSetOptions {
            genotypes,
            train_ids,
            val_ids,
            snp_order,
            format,
            dirs: dirs.into(),
        }),
        Command::Predict {
            genotypes,
            irisplex_bed,
            val_fraction,
            seed,
            dirs,
        } => processor::run_predict(&PredictOptions {
            genotypes,
            irisplex_bed,
            val_fraction,
            seed,
            dirs: dirs.into(),
        }),
        Command::TestIris {
            genotypes,
            irisplex_bed,
            phenotypes,
            dirs,
        } => processor::run_test_iris(&IrisTestOptions {
            genotypes,
            irisplex_bed,
            phenotypes,
            dirs: dirs.into(),
        }),
        Command::Evaluate { scores, labels, log_dir } => {
            processor::run_evaluate(&EvaluateOptions { scores, labels, log_dir })
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eyecolor_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(summary) => {
            info!(
                "Stage {} completed: {} outputs, {} warnings (run {})",
                summary.stage,
                summary.outputs.len(),
                summary.warnings,
                summary.run_id
            );
            Ok(())
        }
        Err(e) => {
            error!("Stage failed: {:#}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_set_defaults_match_options() {
        let cli = Cli::try_parse_from(["eyecolor-pipeline", "train-set", "-g", "reference.tsv"]).unwrap();
        let Command::TrainSet {
            train_ids,
            val_ids,
            snp_order,
            ..
        } = cli.command
        else {
            panic!("expected train-set");
        };

        let defaults = TrainSetOptions::default();
        assert_eq!(snp_order, defaults.snp_order);
        assert_eq!(train_ids, defaults.train_ids);
        assert_eq!(val_ids, defaults.val_ids);
    }

    #[test]
    fn test_filter_threshold_default() {
        let cli = Cli::try_parse_from(["eyecolor-pipeline", "filter"]).unwrap();
        assert!(matches!(cli.command, Command::Filter { threshold, .. } if threshold == DEFAULT_PRESENCE_THRESHOLD));
    }
}
