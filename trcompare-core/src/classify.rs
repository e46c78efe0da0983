//! Concordance classification of an aligned call pair.
//!
//! Genotypes are unordered, so both calls are canonicalized before any
//! comparison: (sequence, length) haplotypes sorted by sequence for the
//! sequence verdict, and lengths sorted numerically for the length verdict.

use trcompare_geno::{GenotypeCall, Locus};

use crate::aligner::AlignedPair;

/// An aligned pair with its agreement verdicts.
#[derive(Debug, Clone)]
pub struct ClassifiedPair<'a> {
    pub locus: &'a Locus,
    pub sample: &'a str,
    pub call1: &'a GenotypeCall,
    pub call2: &'a GenotypeCall,
    /// Canonical haplotypes (sequence and length) are identical.
    pub sequence_match: bool,
    /// Canonical allele lengths are identical.
    pub length_match: bool,
    /// Sum over haplotypes of (length - reference length), set 1.
    pub length_diff1: i64,
    /// Same for set 2.
    pub length_diff2: i64,
}

/// (sequence, length) haplotypes in canonical (lexicographic) order.
pub fn canonical_haplotypes(call: &GenotypeCall) -> Vec<(&str, i64)> {
    let mut haps: Vec<(&str, i64)> = call
        .sequences
        .iter()
        .map(String::as_str)
        .zip(call.lengths.iter().copied())
        .collect();
    haps.sort_unstable();
    haps
}

/// Lengths in canonical (ascending) order.
pub fn canonical_lengths(call: &GenotypeCall) -> Vec<i64> {
    let mut lens = call.lengths.clone();
    lens.sort_unstable();
    lens
}

/// Net length difference of a call from the reference, summed over haplotypes.
pub fn length_diff(call: &GenotypeCall, locus: &Locus) -> i64 {
    let ref_len = locus.ref_len();
    call.lengths.iter().map(|&l| l - ref_len).sum()
}

/// Classify an aligned pair.
pub fn classify<'a>(pair: &AlignedPair<'a>) -> ClassifiedPair<'a> {
    ClassifiedPair {
        locus: pair.locus,
        sample: pair.sample,
        call1: pair.call1,
        call2: pair.call2,
        sequence_match: canonical_haplotypes(pair.call1) == canonical_haplotypes(pair.call2),
        length_match: canonical_lengths(pair.call1) == canonical_lengths(pair.call2),
        length_diff1: length_diff(pair.call1, pair.locus),
        length_diff2: length_diff(pair.call2, pair.locus),
    }
}
