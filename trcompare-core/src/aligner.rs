//! Per-sample call alignment at a matched locus.

use std::collections::{HashMap, HashSet};

use trcompare_geno::{GenotypeCall, Locus};

use crate::matcher::MatchedLocus;

/// Two comparable calls for one (locus, sample).
#[derive(Debug, Clone)]
pub struct AlignedPair<'a> {
    pub locus: &'a Locus,
    pub sample: &'a str,
    pub call1: &'a GenotypeCall,
    pub call2: &'a GenotypeCall,
}

/// What the aligner found for one sample at one locus.
#[derive(Debug, Clone)]
pub enum AlignOutcome<'a> {
    /// Both calls present with equal ploidy.
    Paired(AlignedPair<'a>),
    /// The sample has no usable call in one or both sets.
    Missing {
        sample: &'a str,
        in_set1: bool,
        in_set2: bool,
    },
    /// Both calls present but with different allele counts.
    PloidyMismatch {
        sample: &'a str,
        ploidy1: usize,
        ploidy2: usize,
    },
}

/// Pairs per-sample calls at matched loci.
#[derive(Debug, Clone, Default)]
pub struct CallAligner {
    samples: Option<HashSet<String>>,
}

impl CallAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict alignment to the given samples.
    pub fn with_samples(samples: &[String]) -> Self {
        Self {
            samples: Some(samples.iter().cloned().collect()),
        }
    }

    fn wanted(&self, sample: &str) -> bool {
        self.samples.as_ref().map_or(true, |s| s.contains(sample))
    }

    /// Align every sample present in either set: set-1 samples in set-1
    /// order, then samples only in set 2.
    pub fn align<'a>(&self, m: &'a MatchedLocus) -> Vec<AlignOutcome<'a>> {
        let in_set2: HashMap<&str, &GenotypeCall> = m
            .set2
            .calls
            .iter()
            .map(|sc| (sc.sample.as_str(), &sc.call))
            .collect();
        let in_set1: HashSet<&str> = m.set1.calls.iter().map(|sc| sc.sample.as_str()).collect();

        let mut out = Vec::with_capacity(m.set1.calls.len());
        for sc in &m.set1.calls {
            if self.wanted(&sc.sample) {
                out.push(self.align_one(&m.locus, &sc.sample, Some(&sc.call), in_set2.get(sc.sample.as_str()).copied()));
            }
        }
        for sc in &m.set2.calls {
            if !in_set1.contains(sc.sample.as_str()) && self.wanted(&sc.sample) {
                out.push(self.align_one(&m.locus, &sc.sample, None, Some(&sc.call)));
            }
        }
        out
    }

    fn align_one<'a>(
        &self,
        locus: &'a Locus,
        sample: &'a str,
        call1: Option<&'a GenotypeCall>,
        call2: Option<&'a GenotypeCall>,
    ) -> AlignOutcome<'a> {
        let usable = |c: Option<&'a GenotypeCall>| c.filter(|c| !c.is_missing());
        match (usable(call1), usable(call2)) {
            (Some(c1), Some(c2)) if c1.ploidy() != c2.ploidy() => AlignOutcome::PloidyMismatch {
                sample,
                ploidy1: c1.ploidy(),
                ploidy2: c2.ploidy(),
            },
            (Some(c1), Some(c2)) => AlignOutcome::Paired(AlignedPair {
                locus,
                sample,
                call1: c1,
                call2: c2,
            }),
            (c1, c2) => AlignOutcome::Missing {
                sample,
                in_set1: c1.is_none(),
                in_set2: c2.is_none(),
            },
        }
    }
}
