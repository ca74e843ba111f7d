// ==============================================================================
// dataset.rs - Labelled Sample Dataset
// ==============================================================================
// Description: Pairs matrix rows with labels and batches them for training
// Author: Matt Barham
// Created: 2026-01-14
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::labels::{read_labels, LabelError, LabelRecord};
use crate::models::SampleMatrix;
use crate::parsers::matrix::{read_matrix_csv, MatrixError};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    #[error("Labelled sample {0} is not in the matrix")]
    MissingSample(String),

    #[error("Index {index} out of range for dataset of {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Batch size must be positive")]
    ZeroBatchSize,
}

/// Matrix rows addressed through a label file. Item `i` is the row of the
/// i-th labelled sample.
#[derive(Debug, Clone)]
pub struct SnpDataset {
    matrix: SampleMatrix,
    labels: Vec<LabelRecord>,
    rows: HashMap<String, usize>,
}

impl SnpDataset {
    pub fn new(matrix: SampleMatrix, labels: Vec<LabelRecord>) -> Self {
        let rows = matrix
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self { matrix, labels, rows }
    }

    /// Open a matrix CSV and a labels CSV
    pub fn open(matrix_path: impl AsRef<Path>, labels_path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let matrix = read_matrix_csv(matrix_path)?;
        let labels = read_labels(labels_path)?;
        info!(
            "Dataset: {} labelled samples, {} features",
            labels.len(),
            matrix.snp_ids.len()
        );
        Ok(Self::new(matrix, labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.matrix.snp_ids.len()
    }

    /// Features and label of the i-th labelled sample
    pub fn get(&self, index: usize) -> Result<(Vec<f32>, u8), DatasetError> {
        let record = self.labels.get(index).ok_or(DatasetError::OutOfRange {
            index,
            len: self.labels.len(),
        })?;
        let row = self
            .rows
            .get(&record.sample_id)
            .ok_or_else(|| DatasetError::MissingSample(record.sample_id.clone()))?;

        let features = self.matrix.values.row(*row).iter().map(|&v| v as f32).collect();
        Ok((features, record.label))
    }

    /// Iterate over batches, optionally shuffled with a fixed seed
    pub fn loader(&self, batch_size: usize, shuffle: bool, seed: u64) -> Result<BatchLoader<'_>, DatasetError> {
        if batch_size == 0 {
            return Err(DatasetError::ZeroBatchSize);
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        if shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        Ok(BatchLoader {
            dataset: self,
            order,
            batch_size,
            cursor: 0,
        })
    }
}

/// One batch: (batch, features) matrix and labels
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub features: Array2<f32>,
    pub labels: Vec<u8>,
}

pub struct BatchLoader<'a> {
    dataset: &'a SnpDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for BatchLoader<'_> {
    type Item = Result<Batch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;

        let width = self.dataset.num_features();
        let mut features = Array2::<f32>::zeros((indices.len(), width));
        let mut labels = Vec::with_capacity(indices.len());

        for (r, &i) in indices.iter().enumerate() {
            let (x, y) = match self.dataset.get(i) {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            for (c, v) in x.into_iter().enumerate() {
                features[[r, c]] = v;
            }
            labels.push(y);
        }

        Some(Ok(Batch { features, labels }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset(label_ids: &[(&str, u8)]) -> SnpDataset {
        let matrix = SampleMatrix::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["rs1".into(), "rs2".into()],
            array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]],
        )
        .unwrap();
        let labels = label_ids
            .iter()
            .map(|(id, label)| LabelRecord {
                sample_id: id.to_string(),
                label: *label,
            })
            .collect();
        SnpDataset::new(matrix, labels)
    }

    #[test]
    fn test_get_follows_label_order() {
        let ds = dataset(&[("c", 2), ("a", 0)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap(), (vec![4.0, 5.0], 2));
        assert_eq!(ds.get(1).unwrap(), (vec![0.0, 1.0], 0));
        assert!(matches!(ds.get(2), Err(DatasetError::OutOfRange { index: 2, len: 2 })));
    }

    #[test]
    fn test_missing_sample() {
        let ds = dataset(&[("zzz", 1)]);
        assert!(matches!(ds.get(0), Err(DatasetError::MissingSample(id)) if id == "zzz"));
    }

    #[test]
    fn test_loader_batches() {
        let ds = dataset(&[("a", 0), ("b", 1), ("c", 2)]);
        let batches: Vec<Batch> = ds.loader(2, false, 0).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].features, array![[0.0f32, 1.0], [2.0, 3.0]]);
        assert_eq!(batches[1].labels, vec![2]);
    }

    #[test]
    fn test_shuffled_loader_is_seeded() {
        let ds = dataset(&[("a", 0), ("b", 1), ("c", 2)]);
        let first: Vec<Batch> = ds.loader(1, true, 9).unwrap().collect::<Result<_, _>>().unwrap();
        let second: Vec<Batch> = ds.loader(1, true, 9).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(first, second);

        let mut seen: Vec<u8> = first.iter().flat_map(|b| b.labels.clone()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(matches!(dataset(&[]).loader(0, false, 0), Err(DatasetError::ZeroBatchSize)));
    }
}
