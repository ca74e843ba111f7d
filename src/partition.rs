// ==============================================================================
// partition.rs - Train/Validation Matrix Partitioning
// ==============================================================================
// Description: Fixes SNP column order and selects sample rows by id list
// Author: Matt Barham
// Created: 2026-01-10
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::info;

use crate::labels::LabelRecord;
use crate::models::SampleMatrix;

/// Share of each class held out for validation
pub const DEFAULT_VAL_FRACTION: f64 = 0.2;

/// Seed for the stratified split
pub const DEFAULT_SPLIT_SEED: u64 = 42;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("SNP {0} from the ordering list is not in the matrix")]
    MissingSnp(String),

    #[error("Sample {0} from the id list is not in the matrix")]
    MissingSample(String),

    #[error("{count} sample ids appear in both train and validation lists (first: {first})")]
    OverlappingIds { count: usize, first: String },

    #[error("Validation fraction must be within [0, 1), got {0}")]
    InvalidFraction(f64),
}

/// Position of each id, keeping the first occurrence of a repeated id
fn first_positions(ids: &[String]) -> HashMap<&str, usize> {
    let mut positions = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        positions.entry(id.as_str()).or_insert(i);
    }
    positions
}

/// Reorder columns to `order`. Every listed SNP must be present; SNPs not
/// listed are dropped. A repeated SNP id resolves to its first column.
pub fn reorder_snps(matrix: &SampleMatrix, order: &[String]) -> Result<SampleMatrix, PartitionError> {
    let positions = first_positions(&matrix.snp_ids);

    let indices = order
        .iter()
        .map(|id| {
            positions
                .get(id.as_str())
                .copied()
                .ok_or_else(|| PartitionError::MissingSnp(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(matrix.select_columns(&indices))
}

/// Select rows in the order of `ids`. Every listed sample must be present.
pub fn select_samples(matrix: &SampleMatrix, ids: &[String]) -> Result<SampleMatrix, PartitionError> {
    let positions = first_positions(&matrix.sample_ids);

    let indices = ids
        .iter()
        .map(|id| {
            positions
                .get(id.as_str())
                .copied()
                .ok_or_else(|| PartitionError::MissingSample(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(matrix.select_rows(&indices))
}

/// Fail if any id appears in both lists
pub fn check_disjoint(train_ids: &[String], val_ids: &[String]) -> Result<(), PartitionError> {
    let train: HashSet<&str> = train_ids.iter().map(String::as_str).collect();
    let shared: Vec<&String> = val_ids.iter().filter(|id| train.contains(id.as_str())).collect();

    match shared.first() {
        None => Ok(()),
        Some(first) => Err(PartitionError::OverlappingIds {
            count: shared.len(),
            first: (*first).clone(),
        }),
    }
}

/// Train and validation matrices sharing one column order
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions {
    pub train: SampleMatrix,
    pub val: SampleMatrix,
}

/// Split `matrix` into train and validation rows, optionally fixing the
/// SNP column order first.
pub fn partition(
    matrix: &SampleMatrix,
    train_ids: &[String],
    val_ids: &[String],
    snp_order: Option<&[String]>,
) -> Result<Partitions, PartitionError> {
    check_disjoint(train_ids, val_ids)?;

    let ordered;
    let matrix = match snp_order {
        Some(order) => {
            ordered = reorder_snps(matrix, order)?;
            &ordered
        }
        None => matrix,
    };

    let train = select_samples(matrix, train_ids)?;
    let val = select_samples(matrix, val_ids)?;

    info!(
        "Partitioned: train {} x {}, val {} x {}",
        train.shape().0,
        train.shape().1,
        val.shape().0,
        val.shape().1
    );

    Ok(Partitions { train, val })
}

/// Stratified train/validation split of labelled samples.
///
/// Within each label, members are shuffled with a seeded generator and
/// `round(n * val_fraction)` of them go to validation. Both outputs keep
/// the input order, so the same seed always yields identical files.
pub fn stratified_split(
    records: &[LabelRecord],
    val_fraction: f64,
    seed: u64,
) -> Result<(Vec<LabelRecord>, Vec<LabelRecord>), PartitionError> {
    if !(0.0..1.0).contains(&val_fraction) {
        return Err(PartitionError::InvalidFraction(val_fraction));
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        by_class.entry(record.label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut in_val = vec![false; records.len()];

    for (label, mut members) in by_class {
        members.shuffle(&mut rng);
        let n_val = (members.len() as f64 * val_fraction).round() as usize;
        for &i in &members[..n_val] {
            in_val[i] = true;
        }
        info!("Label {}: {} train, {} val", label, members.len() - n_val, n_val);
    }

    let (val, train): (Vec<_>, Vec<_>) = records
        .iter()
        .cloned()
        .zip(in_val)
        .partition(|(_, v)| *v);

    Ok((
        train.into_iter().map(|(r, _)| r).collect(),
        val.into_iter().map(|(r, _)| r).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn matrix() -> SampleMatrix {
        SampleMatrix::new(
            ids(&["s1", "s2", "s3"]),
            ids(&["rs1", "rs2", "rs3"]),
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_reorder_snps() {
        let reordered = reorder_snps(&matrix(), &ids(&["rs3", "rs1"])).unwrap();
        assert_eq!(reordered.snp_ids, ids(&["rs3", "rs1"]));
        assert_eq!(reordered.values.row(0).to_vec(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_repeated_snp_resolves_to_first_column() {
        let dup = SampleMatrix::new(
            ids(&["s1", "s2"]),
            ids(&["rs1", "rs2", "rs1"]),
            array![[1.0, 2.0, 9.0], [4.0, 5.0, 9.0]],
        )
        .unwrap();
        let reordered = reorder_snps(&dup, &ids(&["rs2", "rs1"])).unwrap();
        assert_eq!(reordered.values.column(1).to_vec(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_missing_snp_is_error() {
        let result = reorder_snps(&matrix(), &ids(&["rs1", "rs404"]));
        assert_eq!(result, Err(PartitionError::MissingSnp("rs404".into())));
    }

    #[test]
    fn test_rows_follow_id_list_order() {
        let selected = select_samples(&matrix(), &ids(&["s3", "s1"])).unwrap();
        assert_eq!(selected.sample_ids, ids(&["s3", "s1"]));
        assert_eq!(selected.values.column(0).to_vec(), vec![7.0, 1.0]);
    }

    #[test]
    fn test_missing_sample_is_error() {
        let result = select_samples(&matrix(), &ids(&["s9"]));
        assert_eq!(result, Err(PartitionError::MissingSample("s9".into())));
    }

    #[test]
    fn test_overlap_rejected() {
        let result = partition(&matrix(), &ids(&["s1", "s2"]), &ids(&["s2"]), None);
        assert!(matches!(result, Err(PartitionError::OverlappingIds { count: 1, .. })));
    }

    #[test]
    fn test_partition_shares_column_order() {
        let order = ids(&["rs2", "rs1", "rs3"]);
        let parts = partition(&matrix(), &ids(&["s1"]), &ids(&["s2", "s3"]), Some(order.as_slice())).unwrap();

        assert_eq!(parts.train.shape(), (1, 3));
        assert_eq!(parts.val.shape(), (2, 3));
        assert_eq!(parts.train.snp_ids, parts.val.snp_ids);
        assert_eq!(parts.train.snp_ids, order);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let a = partition(&matrix(), &ids(&["s2"]), &ids(&["s3", "s1"]), None).unwrap();
        let b = partition(&matrix(), &ids(&["s2"]), &ids(&["s3", "s1"]), None).unwrap();
        assert_eq!(a, b);
    }

    fn labelled(n_per_class: usize) -> Vec<LabelRecord> {
        (0..3u8)
            .flat_map(|label| {
                (0..n_per_class).map(move |i| LabelRecord {
                    sample_id: format!("user{}_{}", label, i),
                    label,
                })
            })
            .collect()
    }

    #[test]
    fn test_stratified_split_per_class_counts() {
        let records = labelled(10);
        let (train, val) = stratified_split(&records, 0.2, 42).unwrap();

        assert_eq!(train.len(), 24);
        assert_eq!(val.len(), 6);
        for label in 0..3u8 {
            assert_eq!(val.iter().filter(|r| r.label == label).count(), 2);
        }

        let train_ids: Vec<String> = train.iter().map(|r| r.sample_id.clone()).collect();
        let val_ids: Vec<String> = val.iter().map(|r| r.sample_id.clone()).collect();
        assert!(check_disjoint(&train_ids, &val_ids).is_ok());
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let records = labelled(7);
        assert_eq!(
            stratified_split(&records, 0.2, 7).unwrap(),
            stratified_split(&records, 0.2, 7).unwrap()
        );
    }

    #[test]
    fn test_stratified_split_rejects_bad_fraction() {
        assert_eq!(
            stratified_split(&labelled(2), 1.0, 42),
            Err(PartitionError::InvalidFraction(1.0))
        );
    }
}
