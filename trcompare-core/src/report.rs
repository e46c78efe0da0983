//! Comparison output tables and their writers.
//!
//! All tables are tab-separated with a header line. Undefined statistics
//! are written as `NA`.

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::aggregate::ConcordanceMetrics;
use crate::bubble::{BubbleCounts, BubbleRow};
use crate::config::CompareConfig;
use crate::engine::Diagnostics;

/// Label of the unconditional stratum and of the all-periods scope.
pub const ALL_LABEL: &str = "ALL";
/// Bin label of the unconditional stratum.
pub const NA_LABEL: &str = "NA";

const METRIC_COLUMNS: &str = "concordance-seq\tconcordance-len\tr2\tnumcalls";

/// One row of the overall (stratified) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallRow {
    /// "ALL" or the repeat period.
    pub period: String,
    /// "ALL" or the stratification field.
    pub field: String,
    /// "NA" or the bin label.
    pub bin: String,
    pub metrics: ConcordanceMetrics,
}

/// One compared call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRow {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub period: u32,
    pub sample: String,
    pub gt1: String,
    pub gt2: String,
    pub sequence_match: bool,
    pub length_match: bool,
    pub length_diff1: i64,
    pub length_diff2: i64,
}

/// Per-locus rollup row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusRow {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub period: u32,
    pub metrics: ConcordanceMetrics,
}

/// Per-sample rollup row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub sample: String,
    pub metrics: ConcordanceMetrics,
}

/// Everything a comparison run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub overall: Vec<OverallRow>,
    pub calls: Vec<CallRow>,
    pub loci: Vec<LocusRow>,
    pub samples: Vec<SampleRow>,
    pub bubble: BubbleCounts,
    pub diagnostics: Diagnostics,
}

impl ComparisonReport {
    /// The ALL/ALL/NA row.
    pub fn all_row(&self) -> Option<&OverallRow> {
        self.overall.first()
    }

    /// Overall row for (period, field, bin).
    pub fn overall_row(&self, period: &str, field: &str, bin: &str) -> Option<&OverallRow> {
        self.overall
            .iter()
            .find(|r| r.period == period && r.field == field && r.bin == bin)
    }
}

/// Run summary written next to the tables as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub vcf1: String,
    pub vcf2: String,
    pub config: CompareConfig,
    pub diagnostics: Diagnostics,
    /// Clip window for bubble rendering, passed through untouched.
    pub bubble_min: i64,
    pub bubble_max: i64,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{}", x),
        None => NA_LABEL.to_string(),
    }
}

fn fmt_metrics(m: &ConcordanceMetrics) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        fmt_opt(m.concordance_seq),
        fmt_opt(m.concordance_len),
        fmt_opt(m.r2),
        m.numcalls
    )
}

pub fn write_overall(writer: &mut impl Write, rows: &[OverallRow]) -> Result<()> {
    writeln!(writer, "period\tfield\tbin\t{}", METRIC_COLUMNS)?;
    for r in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            r.period,
            r.field,
            r.bin,
            fmt_metrics(&r.metrics)
        )?;
    }
    Ok(())
}

pub fn write_calls(writer: &mut impl Write, rows: &[CallRow]) -> Result<()> {
    writeln!(
        writer,
        "chrom\tstart\tend\tperiod\tsample\tgt1\tgt2\tsequence-match\tlength-match\tlength-diff1\tlength-diff2"
    )?;
    for r in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.chrom,
            r.start,
            r.end,
            r.period,
            r.sample,
            r.gt1,
            r.gt2,
            r.sequence_match as u8,
            r.length_match as u8,
            r.length_diff1,
            r.length_diff2
        )?;
    }
    Ok(())
}

pub fn write_loci(writer: &mut impl Write, rows: &[LocusRow]) -> Result<()> {
    writeln!(writer, "chrom\tstart\tend\tperiod\t{}", METRIC_COLUMNS)?;
    for r in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            r.chrom,
            r.start,
            r.end,
            r.period,
            fmt_metrics(&r.metrics)
        )?;
    }
    Ok(())
}

pub fn write_samples(writer: &mut impl Write, rows: &[SampleRow]) -> Result<()> {
    writeln!(writer, "sample\t{}", METRIC_COLUMNS)?;
    for r in rows {
        writeln!(writer, "{}\t{}", r.sample, fmt_metrics(&r.metrics))?;
    }
    Ok(())
}

/// Bubble table: `ALL` rows summed over periods, then one block per period.
pub fn write_bubble(writer: &mut impl Write, bubble: &BubbleCounts) -> Result<()> {
    writeln!(writer, "period\tlength-diff1\tlength-diff2\tcount")?;
    for ((length_diff1, length_diff2), count) in bubble.collapsed() {
        writeln!(writer, "{}\t{}\t{}\t{}", ALL_LABEL, length_diff1, length_diff2, count)?;
    }
    for BubbleRow {
        period,
        length_diff1,
        length_diff2,
        count,
    } in bubble.rows()
    {
        writeln!(writer, "{}\t{}\t{}\t{}", period, length_diff1, length_diff2, count)?;
    }
    Ok(())
}

pub fn write_summary(writer: &mut impl Write, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    Ok(())
}
