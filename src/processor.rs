// ==============================================================================
// processor.rs - Pipeline Stage Orchestration
// ==============================================================================
// Description: Runs each pipeline stage from files to files with a run log
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-01-17
// Version: 3.0.0
// ==============================================================================
// Stage order:
//   phenotypes -> extract -> filter -> encode -> test-set
//   (reference population) predict -> train-set
//   test-iris / evaluate score the baseline
// ==============================================================================

use anyhow::{Context, Result};
use ndarray::Array2;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::config::*;
use crate::filter::filter_by_presence;
use crate::genotype_converter::encode_table;
use crate::irisplex::{IrisPlexModel, IrisPlexPrediction};
use crate::labels::{read_id_list, read_labels, write_id_list, write_labels, EyeColor, LabelRecord};
use crate::metrics::{accuracy_report, one_vs_rest_auc, read_score_table, AccuracyReport};
use crate::models::{is_valid_rsid, CountTable, GenotypeTable, RawTable, SnpInfo};
use crate::normalize::{normalize, ReferenceStats, Scaling};
use crate::output::{write_matrix, write_tsv};
use crate::parsers::phenotypes::{read_phenotypes, write_phenotypes};
use crate::parsers::{
    read_table, write_aligned_table, write_table, AncestryParser, Genome23Parser, PhenotypeParser,
    RawGenotypeRecord,
};
use crate::partition::{partition, reorder_snps, stratified_split};
use crate::reference_panel::{align, ReferencePanel};
use crate::run_log::{RunLog, RunSummary};
use crate::validator::{locate_user_files, FileValidator, RawFormat};

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))
}

/// Read an allele-count table, keeping the first row of each repeated rsid
fn read_counts(path: &Path, log: &mut RunLog) -> Result<CountTable> {
    let table: CountTable =
        read_table(path).with_context(|| format!("Failed to read genotypes {}", path.display()))?;
    let (table, dropped) = table.dedup_first();
    if dropped > 0 {
        log.warn(format!("{} duplicate SNP identifiers in {} (first kept)", dropped, path.display()))?;
    }
    log.count("duplicate_snps", dropped)?;
    Ok(table)
}

/// Collapse the phenotype export into labelled users
pub fn run_phenotypes(opts: &PhenotypeOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "phenotypes")?;

    let records = PhenotypeParser::new()
        .parse(&opts.phenotype_file)
        .with_context(|| format!("Failed to parse phenotypes {}", opts.phenotype_file.display()))?;

    for color in EyeColor::ALL {
        let n = records.iter().filter(|r| r.eye_color == color).count();
        log.count(color.as_str(), n)?;
    }
    log.count("users", records.len())?;

    let table_path = opts.dirs.output(INITIAL_PHENOTYPES);
    write_phenotypes(&table_path, &records)?;
    log.output(&table_path)?;

    let ids: Vec<&str> = records.iter().map(|r| r.user_id.as_str()).collect();
    let ids_path = opts.dirs.output(INITIAL_USERIDS);
    write_id_list(&ids_path, &ids)?;
    log.output(&ids_path)?;

    Ok(log.finish()?)
}

fn parse_raw(format: RawFormat, path: &Path) -> Result<Vec<RawGenotypeRecord>> {
    Ok(match format {
        RawFormat::TwentyThreeAndMe => Genome23Parser::new().parse(path)?,
        RawFormat::Ancestry => AncestryParser::new().parse(path)?,
    })
}

/// Row set seeded by the first valid file; later samples are left-joined
#[derive(Default)]
struct MergedGenotypes {
    snps: Vec<SnpInfo>,
    index: HashMap<String, usize>,
    sample_ids: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
}

impl MergedGenotypes {
    fn add_sample(&mut self, sample_id: &str, records: Vec<RawGenotypeRecord>) {
        if self.sample_ids.is_empty() {
            for record in &records {
                if !self.index.contains_key(&record.rsid) {
                    self.index.insert(record.rsid.clone(), self.snps.len());
                    self.snps.push(SnpInfo::with_location(
                        record.rsid.clone(),
                        record.chromosome.clone(),
                        record.position,
                    ));
                }
            }
        }

        let mut column: Vec<Option<String>> = vec![None; self.snps.len()];
        let mut filled = vec![false; self.snps.len()];
        for record in records {
            if let Some(&row) = self.index.get(&record.rsid) {
                if !filled[row] {
                    filled[row] = true;
                    column[row] = record.genotype;
                }
            }
        }

        self.sample_ids.push(sample_id.to_string());
        self.columns.push(column);
    }

    fn into_table(self) -> Result<RawTable> {
        let rows = (0..self.snps.len())
            .map(|i| self.columns.iter().map(|col| col[i].clone()).collect())
            .collect();
        let table = GenotypeTable::new(self.snps, self.sample_ids, rows)?;
        Ok(table.retain_rows(|snp, _| is_valid_rsid(&snp.rsid)))
    }
}

/// Merge per-user raw files into one SNP x user table
pub fn run_extract(opts: &ExtractOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "extract")?;

    let mut ids = read_id_list(&opts.id_file)
        .with_context(|| format!("Failed to read id list {}", opts.id_file.display()))?;
    if let Some(n) = opts.subset {
        ids.truncate(n);
    }

    let validator = FileValidator::new();
    let mut merged = MergedGenotypes::default();
    let mut seen = HashSet::new();
    let mut bad_files = 0usize;

    for id in &ids {
        if !seen.insert(id.as_str()) {
            log.warn(format!("User {} listed more than once; skipped", id))?;
            continue;
        }

        let Some(path) = locate_user_files(&opts.genotype_dir, id).into_iter().next() else {
            log.warn(format!("No genotype file for user {}", id))?;
            bad_files += 1;
            continue;
        };

        let parsed = validator
            .validate(&path)
            .and_then(|file| parse_raw(file.format, &file.path));

        match parsed {
            Ok(records) => {
                debug!("User {}: {} records from {}", id, records.len(), path.display());
                merged.add_sample(id, records);
            }
            Err(e) => {
                log.warn(format!("Skipping {}: {:#}", path.display(), e))?;
                bad_files += 1;
            }
        }
    }

    let valid_files = merged.sample_ids.len();
    let table = merged.into_table()?;

    log.count("bad_files", bad_files)?;
    log.count("valid_files", valid_files)?;
    log.count("snps", table.num_snps())?;

    let path = opts.dirs.output(INITIAL_GENOTYPES);
    write_table(&path, &table)?;
    log.output(&path)?;

    Ok(log.finish()?)
}

/// Drop SNPs called in too few samples
pub fn run_filter(opts: &FilterOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "filter")?;

    let table: RawTable = read_table(&opts.genotypes)
        .with_context(|| format!("Failed to read genotypes {}", opts.genotypes.display()))?;

    let (filtered, report) = filter_by_presence(table, opts.threshold)?;
    log.count("threshold", opts.threshold)?;
    log.count("snps_before", report.snps_before)?;
    log.count("snps_after", report.snps_after)?;
    log.count("samples", report.samples)?;

    let table_path = opts.dirs.output(FILTERED_GENOTYPES);
    write_table(&table_path, &filtered)?;
    log.output(&table_path)?;

    let rsids: Vec<&str> = filtered.rsids().collect();
    let rsid_path = opts.dirs.output(FILTERED_RSIDS);
    write_id_list(&rsid_path, &rsids)?;
    log.output(&rsid_path)?;

    Ok(log.finish()?)
}

/// Align against the reference panel and encode calls as allele counts
pub fn run_encode(opts: &EncodeOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "encode")?;

    let table: RawTable = read_table(&opts.genotypes)
        .with_context(|| format!("Failed to read genotypes {}", opts.genotypes.display()))?;
    let panel = ReferencePanel::from_tsv(&opts.panel)
        .with_context(|| format!("Failed to load reference panel {}", opts.panel.display()))?;

    let (aligned, align_report) = align(&table, &panel);
    if align_report.duplicate_table_ids > 0 {
        log.warn(format!(
            "{} duplicate SNP identifiers in genotype table (first kept)",
            align_report.duplicate_table_ids
        ))?;
    }
    log.count("table_snps", align_report.table_snps)?;
    log.count("panel_snps", align_report.panel_snps)?;
    log.count("aligned_snps", align_report.aligned_snps)?;

    let (encoded, encode_report) = encode_table(&aligned);
    log.count("encoded_calls", encode_report.encoded)?;
    log.count("missing_calls", encode_report.missing)?;
    if encode_report.malformed > 0 {
        log.warn(format!("{} malformed calls set to missing", encode_report.malformed))?;
    }
    log.count("malformed_calls", encode_report.malformed)?;

    let path = opts.dirs.output(FINAL_GENOTYPES);
    write_aligned_table(&path, &encoded)?;
    log.output(&path)?;

    Ok(log.finish()?)
}

/// Normalize the encoded sample table into the held-out test matrix
pub fn run_test_set(opts: &TestSetOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "test-set")?;

    let table = read_counts(&opts.genotypes, &mut log)?;

    let stats = match &opts.reference_stats {
        Some(path) => Some(
            ReferenceStats::read_tsv(path)
                .with_context(|| format!("Failed to read reference statistics {}", path.display()))?,
        ),
        None => None,
    };
    let scaling = match &stats {
        Some(stats) => Scaling::Reference(stats),
        None => Scaling::InSample,
    };
    let mut matrix = normalize(&table, scaling)?;

    let rsid_path = opts.dirs.output(FINAL_RSIDS);
    write_id_list(&rsid_path, &matrix.snp_ids)?;
    log.output(&rsid_path)?;

    if let Some(order_path) = &opts.snp_order {
        let order = read_id_list(order_path)?;
        matrix = reorder_snps(&matrix, &order)
            .with_context(|| format!("Failed to apply SNP order {}", order_path.display()))?;
    }

    let (n_samples, n_snps) = matrix.shape();
    log.info(format!("Test matrix: {} samples x {} SNPs", n_samples, n_snps))?;

    let matrix_path = opts.format.path_for(&opts.dirs.output_dir, TEST_SET);
    write_matrix(&matrix_path, &matrix, opts.format)?;
    log.output(&matrix_path)?;

    let present: HashSet<&str> = matrix.sample_ids.iter().map(String::as_str).collect();
    let labels: Vec<LabelRecord> = read_phenotypes(&opts.phenotypes)?
        .into_iter()
        .filter(|p| present.contains(p.user_id.as_str()))
        .map(|p| LabelRecord {
            sample_id: p.user_id,
            label: p.eye_color.code(),
        })
        .collect();
    if labels.len() < n_samples {
        log.warn(format!("{} test samples have no phenotype", n_samples - labels.len()))?;
    }
    log.count("labelled_samples", labels.len())?;

    let labels_path = opts.dirs.output(TEST_LABELS);
    write_labels(&labels_path, &labels)?;
    log.output(&labels_path)?;

    Ok(log.finish()?)
}

/// Build train/validation matrices from the reference population
pub fn run_train_set(opts: &TrainSetOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "train-set")?;

    let table = read_counts(&opts.genotypes, &mut log)?;

    let stats = ReferenceStats::from_table(&table);
    let stats_path = opts.dirs.output(REFERENCE_STATS);
    stats.write_tsv(&stats_path)?;
    log.output(&stats_path)?;

    let matrix = normalize(&table, Scaling::InSample)?;

    let train_ids = read_id_list(&opts.train_ids)?;
    let val_ids = read_id_list(&opts.val_ids)?;
    let order = match &opts.snp_order {
        Some(path) => Some(
            read_id_list(path).with_context(|| format!("Failed to read SNP order {}", path.display()))?,
        ),
        None => None,
    };

    let parts = partition(&matrix, &train_ids, &val_ids, order.as_deref())?;
    log.count("train_samples", parts.train.shape().0)?;
    log.count("val_samples", parts.val.shape().0)?;
    log.count("snps", parts.train.shape().1)?;

    let train_path = opts.format.path_for(&opts.dirs.output_dir, TRAIN_SET);
    write_matrix(&train_path, &parts.train, opts.format)?;
    log.output(&train_path)?;

    let val_path = opts.format.path_for(&opts.dirs.output_dir, VAL_SET);
    write_matrix(&val_path, &parts.val, opts.format)?;
    log.output(&val_path)?;

    Ok(log.finish()?)
}

/// Label the reference population with IrisPlex and split it
pub fn run_predict(opts: &PredictOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "predict")?;

    let model = IrisPlexModel::from_bed(&opts.irisplex_bed)
        .with_context(|| format!("Failed to load IrisPlex model {}", opts.irisplex_bed.display()))?;
    let table = read_counts(&opts.genotypes, &mut log)?;

    let predictions = model.predict_table(&table);
    let predictions_path = opts.dirs.output(IRISPLEX_PREDICTIONS);
    write_tsv(&predictions_path, &predictions)?;
    log.output(&predictions_path)?;

    let labelled: Vec<LabelRecord> = predictions
        .iter()
        .map(|p| LabelRecord {
            sample_id: p.sample_id.clone(),
            label: p.predicted_eye_color.code(),
        })
        .collect();
    for class in crate::labels::IrisPlexClass::ALL {
        let n = labelled.iter().filter(|r| r.label == class.code()).count();
        log.count(class.as_str(), n)?;
    }

    let (train, val) = stratified_split(&labelled, opts.val_fraction, opts.seed)?;
    log.count("train_samples", train.len())?;
    log.count("val_samples", val.len())?;

    for (records, labels_name, ids_name) in [(&train, TRAIN_LABELS, TRAIN_IDS), (&val, VAL_LABELS, VAL_IDS)] {
        let labels_path = opts.dirs.output(labels_name);
        write_labels(&labels_path, records)?;
        log.output(&labels_path)?;

        let ids: Vec<&str> = records.iter().map(|r| r.sample_id.as_str()).collect();
        let ids_path = opts.dirs.output(ids_name);
        write_id_list(&ids_path, &ids)?;
        log.output(&ids_path)?;
    }

    Ok(log.finish()?)
}

fn log_accuracy(log: &mut RunLog, prefix: &str, report: &AccuracyReport) -> Result<()> {
    log.count(&format!("{}_correct", prefix), report.overall.correct)?;
    log.count(&format!("{}_total", prefix), report.overall.total)?;
    log.count(&format!("{}_accuracy", prefix), report.overall.accuracy())?;
    for (class, tally) in &report.per_class {
        log.count(&format!("{}_{}_accuracy", prefix, class), tally.accuracy())?;
    }
    Ok(())
}

/// Score IrisPlex against self-reported eye color
pub fn run_test_iris(opts: &IrisTestOptions) -> Result<RunSummary> {
    ensure_dir(&opts.dirs.output_dir)?;
    let mut log = RunLog::create(&opts.dirs.log_dir, "test-iris")?;

    let model = IrisPlexModel::from_bed(&opts.irisplex_bed)
        .with_context(|| format!("Failed to load IrisPlex model {}", opts.irisplex_bed.display()))?;
    let table = read_counts(&opts.genotypes, &mut log)?;
    let phenotypes: HashMap<String, EyeColor> = read_phenotypes(&opts.phenotypes)?
        .into_iter()
        .map(|p| (p.user_id, p.eye_color))
        .collect();

    let predictions = model.predict_table(&table);
    let predictions_path = opts.dirs.output(IRISPLEX_TEST_PREDICTIONS);
    write_tsv(&predictions_path, &predictions)?;
    log.output(&predictions_path)?;

    let scored: Vec<(&IrisPlexPrediction, EyeColor)> = predictions
        .iter()
        .filter_map(|p| phenotypes.get(&p.sample_id).map(|&color| (p, color)))
        .collect();
    if scored.len() < predictions.len() {
        log.warn(format!("{} samples have no phenotype", predictions.len() - scored.len()))?;
    }

    let all = accuracy_report(
        scored
            .iter()
            .map(|(p, color)| (color.to_irisplex(), p.predicted_eye_color)),
    );
    let complete = accuracy_report(
        scored
            .iter()
            .filter(|(p, _)| model.is_complete(p))
            .map(|(p, color)| (color.to_irisplex(), p.predicted_eye_color)),
    );

    log_accuracy(&mut log, "all", &all)?;
    log_accuracy(&mut log, "complete", &complete)?;

    Ok(log.finish()?)
}

/// One-vs-rest ROC AUC of a score table against integer labels
pub fn run_evaluate(opts: &EvaluateOptions) -> Result<RunSummary> {
    let mut log = RunLog::create(&opts.log_dir, "evaluate")?;

    let scores = read_score_table(&opts.scores)
        .with_context(|| format!("Failed to read scores {}", opts.scores.display()))?;
    let labels = read_labels(&opts.labels)?;

    let row_of: HashMap<&str, usize> = scores
        .sample_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut values = Vec::with_capacity(labels.len() * 3);
    let mut truth: Vec<u8> = Vec::with_capacity(labels.len());
    for record in &labels {
        if let Some(&row) = row_of.get(record.sample_id.as_str()) {
            values.extend(scores.scores.row(row).iter().copied());
            truth.push(record.label);
        }
    }
    if truth.len() < labels.len() {
        log.warn(format!("{} labelled samples have no scores", labels.len() - truth.len()))?;
    }

    let matrix = Array2::from_shape_vec((truth.len(), scores.scores.ncols()), values)
        .context("Score matrix shape mismatch")?;
    let summary = one_vs_rest_auc(&matrix, &truth);

    log.count("samples", truth.len())?;
    let per_class: BTreeMap<&str, Option<f64>> = EyeColor::ALL
        .iter()
        .map(|c| c.as_str())
        .zip(summary.per_class.iter().copied())
        .collect();
    for (class, auc) in &per_class {
        log.count(&format!("auc_{}", class), auc)?;
    }
    log.count("auc_micro", summary.micro)?;
    info!("Micro-averaged AUC: {:?}", summary.micro);

    Ok(log.finish()?)
}
