//! Bubble-plot aggregation of length differences.
//!
//! Counts compared calls per (period, length_diff1, length_diff2). Nothing is
//! clipped here; the display window belongs to whoever renders the plot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedPair;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BubbleCounts {
    counts: BTreeMap<(u32, i64, i64), u64>,
}

/// One bubble-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleRow {
    pub period: u32,
    pub length_diff1: i64,
    pub length_diff2: i64,
    pub count: u64,
}

impl BubbleCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pair: &ClassifiedPair<'_>) {
        self.add_point(pair.locus.period, pair.length_diff1, pair.length_diff2, 1);
    }

    pub fn add_point(&mut self, period: u32, diff1: i64, diff2: i64, count: u64) {
        *self.counts.entry((period, diff1, diff2)).or_insert(0) += count;
    }

    pub fn merge(&mut self, other: &BubbleCounts) {
        for (&(period, d1, d2), &count) in &other.counts {
            self.add_point(period, d1, d2, count);
        }
    }

    pub fn get(&self, period: u32, diff1: i64, diff2: i64) -> u64 {
        self.counts.get(&(period, diff1, diff2)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Counts summed over all periods.
    pub fn collapsed(&self) -> BTreeMap<(i64, i64), u64> {
        let mut out = BTreeMap::new();
        for (&(_, d1, d2), &count) in &self.counts {
            *out.entry((d1, d2)).or_insert(0) += count;
        }
        out
    }

    /// Rows ordered by period, then diff1, then diff2.
    pub fn rows(&self) -> Vec<BubbleRow> {
        self.counts
            .iter()
            .map(|(&(period, length_diff1, length_diff2), &count)| BubbleRow {
                period,
                length_diff1,
                length_diff2,
                count,
            })
            .collect()
    }
}
