//! Comparison driver: matching, alignment, classification and aggregation.
//!
//! The sequential path streams matched loci through a single [`Tally`].
//! The parallel path collects matched loci first (matching is inherently
//! sequential), then folds per-worker tallies with rayon and merges them
//! in input order, so both paths produce identical reports.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trcompare_geno::sample::sample_overlap;
use trcompare_geno::{CallSource, ContigOrder, InputSet, LocusCalls};

use crate::aggregate::{ConcordanceAccumulator, OverallAggregator, SampleRollup};
use crate::aligner::{AlignOutcome, CallAligner};
use crate::bubble::BubbleCounts;
use crate::classify::classify;
use crate::config::CompareConfig;
use crate::error::Result;
use crate::matcher::{LocusMatcher, MatchStats, MatchedLocus};
use crate::report::{CallRow, ComparisonReport, LocusRow};

/// Counts of everything that was matched, skipped or compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub loci_matched: u64,
    pub loci_only_set1: u64,
    pub loci_only_set2: u64,
    /// Matched loci rejected by the locus filter.
    pub loci_filtered: u64,
    /// Matched loci with at least one compared pair.
    pub loci_compared: u64,
    /// (locus, sample) combinations missing a usable call in either set.
    pub missing_calls: u64,
    pub missing_set1: u64,
    pub missing_set2: u64,
    pub ploidy_mismatch: u64,
    pub pairs_compared: u64,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.loci_matched += other.loci_matched;
        self.loci_only_set1 += other.loci_only_set1;
        self.loci_only_set2 += other.loci_only_set2;
        self.loci_filtered += other.loci_filtered;
        self.loci_compared += other.loci_compared;
        self.missing_calls += other.missing_calls;
        self.missing_set1 += other.missing_set1;
        self.missing_set2 += other.missing_set2;
        self.ploidy_mismatch += other.ploidy_mismatch;
        self.pairs_compared += other.pairs_compared;
    }

    fn record_matching(&mut self, stats: &MatchStats) {
        self.loci_matched = stats.matched as u64;
        self.loci_only_set1 = stats.only_set1 as u64;
        self.loci_only_set2 = stats.only_set2 as u64;
    }
}

/// Which inputs lack a call, for log messages.
fn missing_sets(in_set1: bool, in_set2: bool) -> &'static str {
    match (in_set1, in_set2) {
        (true, true) => "set1 and set2",
        (true, false) => "set1",
        _ => "set2",
    }
}

/// Partial comparison state for a contiguous run of matched loci.
#[derive(Debug, Clone)]
struct Tally {
    overall: OverallAggregator,
    loci: Vec<LocusRow>,
    samples: SampleRollup,
    bubble: BubbleCounts,
    calls: Vec<CallRow>,
    diagnostics: Diagnostics,
}

impl Tally {
    fn new(config: &CompareConfig) -> Self {
        Self {
            overall: OverallAggregator::new(&config.stratify),
            loci: Vec::new(),
            samples: SampleRollup::default(),
            bubble: BubbleCounts::new(),
            calls: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    fn process_locus(&mut self, m: &MatchedLocus, aligner: &CallAligner, config: &CompareConfig) {
        if !config.filter.accepts(&m.locus) {
            self.diagnostics.loci_filtered += 1;
            return;
        }

        let mut locus_acc = ConcordanceAccumulator::new();
        for outcome in aligner.align(m) {
            match outcome {
                AlignOutcome::Paired(pair) => {
                    let c = classify(&pair);
                    self.overall.add(&c);
                    self.samples.add(&c);
                    self.bubble.add(&c);
                    locus_acc.add(&c);
                    if config.emit_calls {
                        self.calls.push(CallRow {
                            chrom: c.locus.chrom.clone(),
                            start: c.locus.start,
                            end: c.locus.end,
                            period: c.locus.period,
                            sample: c.sample.to_string(),
                            gt1: c.call1.to_string(),
                            gt2: c.call2.to_string(),
                            sequence_match: c.sequence_match,
                            length_match: c.length_match,
                            length_diff1: c.length_diff1,
                            length_diff2: c.length_diff2,
                        });
                    }
                }
                AlignOutcome::Missing {
                    sample,
                    in_set1,
                    in_set2,
                } => {
                    debug!(
                        "Missing call at {} for {}: absent from {}",
                        m.locus,
                        sample,
                        missing_sets(in_set1, in_set2)
                    );
                    self.diagnostics.missing_calls += 1;
                    self.diagnostics.missing_set1 += in_set1 as u64;
                    self.diagnostics.missing_set2 += in_set2 as u64;
                }
                AlignOutcome::PloidyMismatch {
                    sample,
                    ploidy1,
                    ploidy2,
                } => {
                    debug!(
                        "Ploidy mismatch at {} for {}: {} vs {}",
                        m.locus, sample, ploidy1, ploidy2
                    );
                    self.diagnostics.ploidy_mismatch += 1;
                }
            }
        }

        if locus_acc.n() > 0 {
            self.diagnostics.loci_compared += 1;
            self.diagnostics.pairs_compared += locus_acc.n();
            self.loci.push(LocusRow {
                chrom: m.locus.chrom.clone(),
                start: m.locus.start,
                end: m.locus.end,
                period: m.locus.period,
                metrics: locus_acc.metrics(),
            });
        }
    }

    /// Merge a tally covering loci that come after this one.
    fn merge(mut self, other: Tally) -> Tally {
        self.overall.merge(&other.overall);
        self.loci.extend(other.loci);
        self.samples.merge(&other.samples);
        self.bubble.merge(&other.bubble);
        self.calls.extend(other.calls);
        self.diagnostics.merge(&other.diagnostics);
        self
    }

    fn into_report(self, stats: &MatchStats) -> ComparisonReport {
        let mut diagnostics = self.diagnostics;
        diagnostics.record_matching(stats);
        ComparisonReport {
            overall: self.overall.rows(),
            calls: self.calls,
            loci: self.loci,
            samples: self.samples.rows(),
            bubble: self.bubble,
            diagnostics,
        }
    }
}

/// Compares two TR call sets under one configuration.
#[derive(Debug, Clone)]
pub struct CompareEngine {
    config: CompareConfig,
    aligner: CallAligner,
}

impl CompareEngine {
    pub fn new(config: CompareConfig) -> Self {
        let aligner = match &config.samples {
            Some(samples) => CallAligner::with_samples(samples),
            None => CallAligner::new(),
        };
        Self { config, aligner }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Single-pass comparison of two sorted locus streams.
    pub fn compare<I1, I2>(&self, set1: I1, set2: I2, contigs: ContigOrder) -> Result<ComparisonReport>
    where
        I1: Iterator<Item = anyhow::Result<LocusCalls>>,
        I2: Iterator<Item = anyhow::Result<LocusCalls>>,
    {
        let mut matcher = LocusMatcher::new(set1, set2, contigs);
        let mut tally = Tally::new(&self.config);
        for m in matcher.by_ref() {
            tally.process_locus(&m?, &self.aligner, &self.config);
        }
        let report = tally.into_report(&matcher.stats());
        self.log_summary(&report);
        Ok(report)
    }

    /// Same result as [`CompareEngine::compare`], with per-locus work
    /// spread over the rayon pool.
    pub fn compare_parallel<I1, I2>(
        &self,
        set1: I1,
        set2: I2,
        contigs: ContigOrder,
    ) -> Result<ComparisonReport>
    where
        I1: Iterator<Item = anyhow::Result<LocusCalls>>,
        I2: Iterator<Item = anyhow::Result<LocusCalls>>,
    {
        let mut matcher = LocusMatcher::new(set1, set2, contigs);
        let matched: Vec<MatchedLocus> = matcher.by_ref().collect::<Result<_>>()?;
        debug!("Collected {} matched loci for parallel comparison", matched.len());

        let config = &self.config;
        let aligner = &self.aligner;
        let tally = matched
            .par_iter()
            .fold(
                || Tally::new(config),
                |mut t, m| {
                    t.process_locus(m, aligner, config);
                    t
                },
            )
            .reduce(|| Tally::new(config), Tally::merge);

        let report = tally.into_report(&matcher.stats());
        self.log_summary(&report);
        Ok(report)
    }

    /// Resolve the configuration against two sources and compare them.
    pub fn compare_sources<S1, S2>(&self, mut set1: S1, mut set2: S2, parallel: bool) -> Result<ComparisonReport>
    where
        S1: CallSource,
        S2: CallSource,
    {
        self.config
            .resolve(set1.annotation_fields(), set2.annotation_fields())?;
        set1.set_requested_fields(&self.config.stratify.requested_fields(InputSet::Set1))?;
        set2.set_requested_fields(&self.config.stratify.requested_fields(InputSet::Set2))?;

        let overlap = sample_overlap(set1.sample_ids(), set2.sample_ids());
        info!(
            "Samples: {} shared, {} only in set1, {} only in set2",
            overlap.shared.len(),
            overlap.only_set1.len(),
            overlap.only_set2.len()
        );
        if overlap.shared.is_empty() {
            warn!("The two call sets share no samples; nothing will be compared");
        }

        let contigs = ContigOrder::from_headers(&[set1.contigs(), set2.contigs()]);
        if parallel {
            self.compare_parallel(set1.into_loci(), set2.into_loci(), contigs)
        } else {
            self.compare(set1.into_loci(), set2.into_loci(), contigs)
        }
    }

    fn log_summary(&self, report: &ComparisonReport) {
        let d = &report.diagnostics;
        info!(
            "Loci: {} matched, {} only in set1, {} only in set2, {} filtered, {} compared",
            d.loci_matched, d.loci_only_set1, d.loci_only_set2, d.loci_filtered, d.loci_compared
        );
        info!(
            "Calls: {} compared, {} missing (set1 {}, set2 {})",
            d.pairs_compared, d.missing_calls, d.missing_set1, d.missing_set2
        );
        if d.ploidy_mismatch > 0 {
            warn!("{} calls skipped due to ploidy mismatch", d.ploidy_mismatch);
        }
        if d.pairs_compared == 0 {
            warn!("No calls were compared");
        }
    }
}
