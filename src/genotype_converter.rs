// ==============================================================================
// genotype_converter.rs - Nucleotide Genotype to Allele Count Conversion
// ==============================================================================
// Description: Converts two-letter genotype calls to non-reference allele counts
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================
// Algorithm:
//   Given the REF allele from the reference panel:
//   - REF/REF (e.g., TT where REF=T) → 0
//   - REF/other (e.g., TC where REF=T) → 1
//   - other/other (e.g., CC where REF=T) → 2
//   - missing call → missing (never zero)
// ==============================================================================

use tracing::debug;

use crate::models::{AlignedTable, AlleleCount, GenotypeTable};

const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Count of alleles in `genotype` that differ from `ref_allele`
///
/// Computed as `2 - (occurrences of ref_allele)`, case-insensitive. A call
/// made of characters unrelated to the reference (indel, null call) counts
/// as 2, so callers should screen calls with [`is_called`] first.
///
/// # Examples
/// ```
/// use eyecolor_pipeline::genotype_converter::allele_count;
///
/// assert_eq!(allele_count("AA", 'A'), 0);
/// assert_eq!(allele_count("AT", 'A'), 1);
/// assert_eq!(allele_count("TT", 'A'), 2);
/// ```
pub fn allele_count(genotype: &str, ref_allele: char) -> AlleleCount {
    let ref_allele = ref_allele.to_ascii_uppercase();
    let matches = genotype
        .chars()
        .filter(|c| c.to_ascii_uppercase() == ref_allele)
        .count();
    2u8.saturating_sub(matches.min(2) as u8)
}

/// Encode one cell. Missing cells stay missing.
pub fn encode_call(genotype: Option<&str>, ref_allele: char) -> Option<AlleleCount> {
    genotype.map(|g| allele_count(g, ref_allele))
}

/// True for a two-letter call over {A, C, G, T}
pub fn is_called(genotype: &str) -> bool {
    let mut count = 0;
    for c in genotype.chars() {
        if !NUCLEOTIDES.contains(&c.to_ascii_uppercase()) {
            return false;
        }
        count += 1;
    }
    count == 2
}

/// Flip an allele count to the opposite reference convention
pub fn invert_count(count: AlleleCount) -> AlleleCount {
    2u8.saturating_sub(count)
}

/// Counters gathered while encoding a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeReport {
    /// Cells converted to an allele count
    pub encoded: usize,
    /// Cells that were already missing
    pub missing: usize,
    /// Calls outside the two-letter nucleotide alphabet, set to missing
    pub malformed: usize,
}

/// Encode every sample cell of an aligned table against its row's REF allele
pub fn encode_table(aligned: &AlignedTable<String>) -> (AlignedTable<AlleleCount>, EncodeReport) {
    let mut report = EncodeReport::default();

    let rows = aligned
        .table
        .rows
        .iter()
        .zip(&aligned.variants)
        .map(|(row, variant)| {
            row.iter()
                .map(|cell| match cell.as_deref() {
                    None => {
                        report.missing += 1;
                        None
                    }
                    Some(call) if !is_called(call) => {
                        report.malformed += 1;
                        None
                    }
                    Some(call) => {
                        report.encoded += 1;
                        encode_call(Some(call), variant.ref_allele)
                    }
                })
                .collect()
        })
        .collect();

    debug!(
        "Encoded {} calls ({} missing, {} malformed)",
        report.encoded, report.missing, report.malformed
    );

    let table = GenotypeTable {
        snps: aligned.table.snps.clone(),
        sample_ids: aligned.table.sample_ids.clone(),
        rows,
    };

    (
        AlignedTable {
            table,
            variants: aligned.variants.clone(),
        },
        report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PanelVariant, SnpInfo};

    #[test]
    fn test_homozygous_reference() {
        assert_eq!(allele_count("AA", 'A'), 0);
        assert_eq!(allele_count("CC", 'C'), 0);
        assert_eq!(allele_count("GG", 'G'), 0);
        assert_eq!(allele_count("TT", 'T'), 0);
    }

    #[test]
    fn test_heterozygous() {
        assert_eq!(allele_count("AT", 'A'), 1);
        assert_eq!(allele_count("TA", 'A'), 1);
        assert_eq!(allele_count("CG", 'G'), 1);
    }

    #[test]
    fn test_homozygous_minor() {
        assert_eq!(allele_count("TT", 'A'), 2);
        assert_eq!(allele_count("GG", 'C'), 2);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(allele_count("aa", 'A'), 0);
        assert_eq!(allele_count("Ag", 'a'), 1);
    }

    #[test]
    fn test_unrelated_call_counts_as_two() {
        // Not screened: the count of REF is zero
        assert_eq!(allele_count("DI", 'A'), 2);
        assert!(!is_called("DI"));
    }

    #[test]
    fn test_missing_passes_through() {
        assert_eq!(encode_call(None, 'A'), None);
        assert_eq!(encode_call(Some("AG"), 'G'), Some(1));
    }

    #[test]
    fn test_is_called() {
        assert!(is_called("AG"));
        assert!(is_called("tt"));
        assert!(!is_called("A"));
        assert!(!is_called("AGT"));
        assert!(!is_called("--"));
        assert!(!is_called("II"));
    }

    #[test]
    fn test_invert_count() {
        assert_eq!(invert_count(0), 2);
        assert_eq!(invert_count(1), 1);
        assert_eq!(invert_count(2), 0);
    }

    #[test]
    fn test_encode_table() {
        let table = GenotypeTable::new(
            vec![SnpInfo::new("rs1"), SnpInfo::new("rs2")],
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            vec![
                vec![Some("AA".to_string()), Some("AG".to_string()), None],
                vec![Some("CC".to_string()), Some("D".to_string()), Some("TT".to_string())],
            ],
        )
        .unwrap();
        let aligned = AlignedTable {
            table,
            variants: vec![
                PanelVariant {
                    rsid: "rs1".into(),
                    ref_allele: 'A',
                    minor_allele: Some('G'),
                },
                PanelVariant {
                    rsid: "rs2".into(),
                    ref_allele: 'T',
                    minor_allele: None,
                },
            ],
        };

        let (encoded, report) = encode_table(&aligned);

        assert_eq!(encoded.table.rows[0], vec![Some(0), Some(1), None]);
        assert_eq!(encoded.table.rows[1], vec![Some(2), None, Some(0)]);
        assert_eq!(
            report,
            EncodeReport {
                encoded: 4,
                missing: 1,
                malformed: 1
            }
        );
    }
}
