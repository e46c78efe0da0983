//! Normalized tandem-repeat call records.
//!
//! These are the records every call source produces, whatever the VCF
//! dialect it was decoded from.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Which of the two compared call sets a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSet {
    Set1,
    Set2,
}

impl fmt::Display for InputSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSet::Set1 => write!(f, "set1"),
            InputSet::Set2 => write!(f, "set2"),
        }
    }
}

/// A reference tandem-repeat locus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locus {
    /// Chromosome / contig name.
    pub chrom: String,
    /// 1-based start position (VCF POS).
    pub start: u64,
    /// 1-based inclusive end position.
    pub end: u64,
    /// Repeat unit length in bp.
    pub period: u32,
    /// Reference allele sequence.
    pub ref_allele: String,
}

/// Identity of a locus: coordinates plus period. The reference allele is
/// deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocusKey {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub period: u32,
}

impl Locus {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, period: u32, ref_allele: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            period,
            ref_allele: ref_allele.into(),
        }
    }

    pub fn key(&self) -> LocusKey {
        LocusKey {
            chrom: self.chrom.clone(),
            start: self.start,
            end: self.end,
            period: self.period,
        }
    }

    /// Whether two loci share the same identity key.
    pub fn same_key(&self, other: &Locus) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.period == other.period
            && self.chrom == other.chrom
    }

    /// Reference allele length in bp.
    pub fn ref_len(&self) -> i64 {
        self.ref_allele.len() as i64
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// One sample's call at one locus from one input set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenotypeCall {
    /// Called allele sequences, one per haplotype. Empty when missing.
    pub sequences: Vec<String>,
    /// Called allele lengths in bp, same cardinality as `sequences`.
    pub lengths: Vec<i64>,
    /// Requested numeric annotations (e.g. "DP").
    pub annotations: BTreeMap<String, f64>,
}

impl GenotypeCall {
    /// Build a call whose lengths are the sequence lengths.
    pub fn from_sequences<S: Into<String>>(sequences: impl IntoIterator<Item = S>) -> Self {
        let sequences: Vec<String> = sequences.into_iter().map(Into::into).collect();
        let lengths = sequences.iter().map(|s| s.len() as i64).collect();
        Self {
            sequences,
            lengths,
            annotations: BTreeMap::new(),
        }
    }

    /// Build a call with explicit lengths (for dialects that report repeat
    /// lengths separately from sequences).
    pub fn from_parts(sequences: Vec<String>, lengths: Vec<i64>) -> Result<Self> {
        if sequences.len() != lengths.len() {
            bail!(
                "Call has {} allele sequences but {} allele lengths",
                sequences.len(),
                lengths.len()
            );
        }
        Ok(Self {
            sequences,
            lengths,
            annotations: BTreeMap::new(),
        })
    }

    /// A no-call.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn with_annotation(mut self, field: impl Into<String>, value: f64) -> Self {
        self.annotations.insert(field.into(), value);
        self
    }

    pub fn is_missing(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn ploidy(&self) -> usize {
        self.sequences.len()
    }

    pub fn annotation(&self, field: &str) -> Option<f64> {
        self.annotations.get(field).copied()
    }

    /// Mark the call missing if it does not have the expected number of
    /// alleles. Returns true if the call was discarded.
    pub fn conform_to_ploidy(&mut self, expected: usize) -> bool {
        if !self.is_missing() && self.ploidy() != expected {
            self.sequences.clear();
            self.lengths.clear();
            true
        } else {
            false
        }
    }
}

impl fmt::Display for GenotypeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.sequences.join("/"))
        }
    }
}

/// A sample ID paired with its call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCall {
    pub sample: String,
    pub call: GenotypeCall,
}

/// All calls of one input set at one locus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusCalls {
    pub locus: Locus,
    pub calls: Vec<SampleCall>,
}

impl LocusCalls {
    pub fn new(locus: Locus) -> Self {
        Self {
            locus,
            calls: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: impl Into<String>, call: GenotypeCall) {
        self.calls.push(SampleCall {
            sample: sample.into(),
            call,
        });
    }

    pub fn with_call(mut self, sample: impl Into<String>, call: GenotypeCall) -> Self {
        self.push(sample, call);
        self
    }

    pub fn call_for(&self, sample: &str) -> Option<&GenotypeCall> {
        self.calls
            .iter()
            .find(|sc| sc.sample == sample)
            .map(|sc| &sc.call)
    }
}
