// ==============================================================================
// irisplex.rs - IrisPlex Baseline Eye Color Model
// ==============================================================================
// Description: Closed-form multinomial IrisPlex scoring with published weights
// Author: Matt Barham
// Created: 2026-01-11
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================
// Format: BED-like tab-delimited file without header
// Example:
//   15    28365617    28365618    rs12913832    G    -4.81    -1.79
//   chr   pos1        pos2        id            minor b1       b2
// ==============================================================================
// Model:
//   pred1 = a1 + Σ count_i * b1_i     (a1 = 3.94)
//   pred2 = a2 + Σ count_i * b2_i     (a2 = 0.65)
//   P(blue)  = e^pred1 / (1 + e^pred1 + e^pred2)
//   P(other) = e^pred2 / (1 + e^pred1 + e^pred2)
//   P(brown) = 1 - P(blue) - P(other)
// ==============================================================================

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::genotype_converter::invert_count;
use crate::labels::IrisPlexClass;
use crate::models::{AlleleCount, CountTable};

/// Intercept of the blue-vs-brown predictor
pub const INTERCEPT_BLUE: f64 = 3.94;

/// Intercept of the other-vs-brown predictor
pub const INTERCEPT_OTHER: f64 = 0.65;

/// SNPs whose panel reference allele is the model's counted allele, so the
/// allele count must be flipped before scoring
pub const STRAND_FLIPPED_SNPS: [&str; 3] = ["rs12896399", "rs12913832", "rs16891982"];

#[derive(Error, Debug)]
pub enum IrisPlexError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IrisPlex model file contains no SNPs")]
    EmptyModel,
}

/// Model weights for one SNP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrisPlexSnp {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub rsid: String,
    pub minor_allele: String,
    pub b1: f64,
    pub b2: f64,
}

/// Class probabilities for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub blue: f64,
    pub other: f64,
    pub brown: f64,
}

impl Probabilities {
    /// Softmax over the two linear predictors with brown as the base class
    pub fn from_predictors(pred1: f64, pred2: f64) -> Self {
        let e1 = pred1.exp();
        let e2 = pred2.exp();
        let denom = 1.0 + e1 + e2;
        let blue = e1 / denom;
        let other = e2 / denom;
        Self {
            blue,
            other,
            brown: 1.0 - blue - other,
        }
    }

    /// Blue wins ties with either class; brown wins ties with other
    pub fn classify(&self) -> IrisPlexClass {
        if self.blue >= self.brown && self.blue >= self.other {
            IrisPlexClass::Blue
        } else if self.brown >= self.other {
            IrisPlexClass::Brown
        } else {
            IrisPlexClass::Other
        }
    }
}

/// IrisPlex output for one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrisPlexPrediction {
    pub sample_id: String,
    pub pred1: f64,
    pub pred2: f64,
    pub blue: f64,
    pub other: f64,
    pub brown: f64,
    pub predicted_eye_color: IrisPlexClass,
    /// Model SNPs with a non-missing genotype for this sample
    pub snps_called: usize,
    /// Model SNPs present in the genotype table
    pub snps_available: usize,
}

/// IrisPlex model: per-SNP weights plus the two intercepts
#[derive(Debug, Clone, PartialEq)]
pub struct IrisPlexModel {
    snps: Vec<IrisPlexSnp>,
    intercept_blue: f64,
    intercept_other: f64,
}

impl IrisPlexModel {
    pub fn new(snps: Vec<IrisPlexSnp>) -> Self {
        Self {
            snps,
            intercept_blue: INTERCEPT_BLUE,
            intercept_other: INTERCEPT_OTHER,
        }
    }

    /// Load weights from the headerless BED file
    pub fn from_bed(path: impl AsRef<Path>) -> Result<Self, IrisPlexError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .from_path(path.as_ref())?;

        let snps = reader
            .deserialize()
            .collect::<Result<Vec<IrisPlexSnp>, csv::Error>>()?;

        if snps.is_empty() {
            return Err(IrisPlexError::EmptyModel);
        }

        info!("Loaded IrisPlex model with {} SNPs", snps.len());
        Ok(Self::new(snps))
    }

    pub fn snps(&self) -> &[IrisPlexSnp] {
        &self.snps
    }

    /// Linear predictors for one sample. `genotype` returns the panel-encoded
    /// allele count for an rsid; missing genotypes add nothing to the sums.
    /// Returns (pred1, pred2, snps_called).
    pub fn predictors(&self, mut genotype: impl FnMut(&str) -> Option<AlleleCount>) -> (f64, f64, usize) {
        let mut pred1 = self.intercept_blue;
        let mut pred2 = self.intercept_other;
        let mut called = 0;

        for snp in &self.snps {
            let Some(count) = genotype(&snp.rsid) else {
                continue;
            };
            let count = if STRAND_FLIPPED_SNPS.contains(&snp.rsid.as_str()) {
                invert_count(count)
            } else {
                count
            };
            pred1 += f64::from(count) * snp.b1;
            pred2 += f64::from(count) * snp.b2;
            called += 1;
        }

        (pred1, pred2, called)
    }

    /// Score every sample column of a count table. Only model SNPs present in
    /// the table contribute; duplicate table rows resolve to the first.
    pub fn predict_table(&self, table: &CountTable) -> Vec<IrisPlexPrediction> {
        let mut row_of: HashMap<&str, usize> = HashMap::new();
        for (i, rsid) in table.rsids().enumerate() {
            row_of.entry(rsid).or_insert(i);
        }

        let snps_available = self
            .snps
            .iter()
            .filter(|s| row_of.contains_key(s.rsid.as_str()))
            .count();

        debug!(
            "{} of {} IrisPlex SNPs present in genotype table",
            snps_available,
            self.snps.len()
        );

        table
            .sample_ids
            .iter()
            .enumerate()
            .map(|(col, sample_id)| {
                let (pred1, pred2, snps_called) = self.predictors(|rsid| {
                    row_of.get(rsid).and_then(|&row| table.rows[row][col])
                });
                let probs = Probabilities::from_predictors(pred1, pred2);

                IrisPlexPrediction {
                    sample_id: sample_id.clone(),
                    pred1,
                    pred2,
                    blue: probs.blue,
                    other: probs.other,
                    brown: probs.brown,
                    predicted_eye_color: probs.classify(),
                    snps_called,
                    snps_available,
                }
            })
            .collect()
    }

    /// True when every model SNP was genotyped for this prediction
    pub fn is_complete(&self, prediction: &IrisPlexPrediction) -> bool {
        prediction.snps_called == self.snps.len()
    }
}
