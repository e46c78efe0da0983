//! Concordance and correlation aggregation.
//!
//! Every stratum, locus and sample keeps a [`ConcordanceAccumulator`] of
//! exact integer sufficient statistics (n, matches, Σx, Σy, Σx², Σy², Σxy).
//! Partial accumulators merge by addition and metrics are always recomputed
//! from the merged sums, so splitting the input never changes a result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedPair;
use crate::report::{OverallRow, SampleRow, ALL_LABEL, NA_LABEL};
use crate::stratify::{applicable_bins, StratifyConfig};

/// Mergeable sufficient statistics for one group of compared calls.
///
/// x is the set-1 length difference, y the set-2 length difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConcordanceAccumulator {
    n: u64,
    n_seq: u64,
    n_len: u64,
    sum_x: i128,
    sum_y: i128,
    sum_xx: i128,
    sum_yy: i128,
    sum_xy: i128,
}

/// Metrics derived from an accumulator. `None` means undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceMetrics {
    pub concordance_seq: Option<f64>,
    pub concordance_len: Option<f64>,
    pub r2: Option<f64>,
    pub numcalls: u64,
}

impl ConcordanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pair: &ClassifiedPair<'_>) {
        self.add_values(
            pair.sequence_match,
            pair.length_match,
            pair.length_diff1,
            pair.length_diff2,
        );
    }

    pub fn add_values(&mut self, sequence_match: bool, length_match: bool, x: i64, y: i64) {
        let (x, y) = (x as i128, y as i128);
        self.n += 1;
        self.n_seq += sequence_match as u64;
        self.n_len += length_match as u64;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    pub fn merge(&mut self, other: &ConcordanceAccumulator) {
        self.n += other.n;
        self.n_seq += other.n_seq;
        self.n_len += other.n_len;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.sum_xx += other.sum_xx;
        self.sum_yy += other.sum_yy;
        self.sum_xy += other.sum_xy;
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    /// Squared Pearson correlation of the length differences.
    ///
    /// Undefined for fewer than two calls or when either side is constant.
    pub fn r2(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        let n = self.n as i128;
        let var_x = n * self.sum_xx - self.sum_x * self.sum_x;
        let var_y = n * self.sum_yy - self.sum_y * self.sum_y;
        if var_x <= 0 || var_y <= 0 {
            return None;
        }
        let cov = (n * self.sum_xy - self.sum_x * self.sum_y) as f64;
        let r2 = (cov * cov) / (var_x as f64 * var_y as f64);
        Some(r2.clamp(0.0, 1.0))
    }

    pub fn metrics(&self) -> ConcordanceMetrics {
        let rate = |k: u64| (self.n > 0).then(|| k as f64 / self.n as f64);
        ConcordanceMetrics {
            concordance_seq: rate(self.n_seq),
            concordance_len: rate(self.n_len),
            r2: self.r2(),
            numcalls: self.n,
        }
    }
}

/// Accumulators for the ALL stratum plus every configured field bin.
#[derive(Debug, Clone, PartialEq)]
pub struct StratumTable {
    all: ConcordanceAccumulator,
    /// `fields[f][b]` for field `f`, bin `b`.
    fields: Vec<Vec<ConcordanceAccumulator>>,
}

impl StratumTable {
    pub fn new(config: &StratifyConfig) -> Self {
        Self {
            all: ConcordanceAccumulator::new(),
            fields: config
                .fields
                .iter()
                .map(|f| vec![ConcordanceAccumulator::new(); f.bins.n_bins()])
                .collect(),
        }
    }

    /// Add a pair given its precomputed bins per field.
    fn add(&mut self, pair: &ClassifiedPair<'_>, bins: &[Vec<usize>]) {
        self.all.add(pair);
        for (accs, field_bins) in self.fields.iter_mut().zip(bins) {
            for &b in field_bins {
                accs[b].add(pair);
            }
        }
    }

    pub fn merge(&mut self, other: &StratumTable) {
        self.all.merge(&other.all);
        for (mine, theirs) in self.fields.iter_mut().zip(&other.fields) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                a.merge(b);
            }
        }
    }

    /// Rows in output order: ALL first, then fields in configuration order
    /// with bins ascending.
    pub fn rows(&self, period: &str, config: &StratifyConfig) -> Vec<OverallRow> {
        let mut rows = vec![OverallRow {
            period: period.to_string(),
            field: ALL_LABEL.to_string(),
            bin: NA_LABEL.to_string(),
            metrics: self.all.metrics(),
        }];
        for (field, accs) in config.fields.iter().zip(&self.fields) {
            for (b, acc) in accs.iter().enumerate() {
                rows.push(OverallRow {
                    period: period.to_string(),
                    field: field.name.clone(),
                    bin: field.bins.label(b),
                    metrics: acc.metrics(),
                });
            }
        }
        rows
    }
}

/// Overall (stratified) aggregation, for all periods and per period.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallAggregator {
    config: StratifyConfig,
    total: StratumTable,
    by_period: BTreeMap<u32, StratumTable>,
}

impl OverallAggregator {
    pub fn new(config: &StratifyConfig) -> Self {
        Self {
            config: config.clone(),
            total: StratumTable::new(config),
            by_period: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, pair: &ClassifiedPair<'_>) {
        let bins: Vec<Vec<usize>> = self
            .config
            .fields
            .iter()
            .map(|f| {
                applicable_bins(
                    f,
                    &pair.call1.annotations,
                    &pair.call2.annotations,
                    self.config.source,
                    self.config.combine,
                )
            })
            .collect();
        self.total.add(pair, &bins);
        let config = &self.config;
        self.by_period
            .entry(pair.locus.period)
            .or_insert_with(|| StratumTable::new(config))
            .add(pair, &bins);
    }

    pub fn merge(&mut self, other: &OverallAggregator) {
        self.total.merge(&other.total);
        for (period, table) in &other.by_period {
            match self.by_period.get_mut(period) {
                Some(mine) => mine.merge(table),
                None => {
                    self.by_period.insert(*period, table.clone());
                }
            }
        }
    }

    /// Period "ALL" rows first, then each observed period ascending.
    pub fn rows(&self) -> Vec<OverallRow> {
        let mut rows = self.total.rows(ALL_LABEL, &self.config);
        for (period, table) in &self.by_period {
            rows.extend(table.rows(&period.to_string(), &self.config));
        }
        rows
    }
}

/// Per-sample rollup, keyed and reported by sample ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleRollup {
    samples: BTreeMap<String, ConcordanceAccumulator>,
}

impl SampleRollup {
    pub fn add(&mut self, pair: &ClassifiedPair<'_>) {
        match self.samples.get_mut(pair.sample) {
            Some(acc) => acc.add(pair),
            None => {
                let mut acc = ConcordanceAccumulator::new();
                acc.add(pair);
                self.samples.insert(pair.sample.to_string(), acc);
            }
        }
    }

    pub fn merge(&mut self, other: &SampleRollup) {
        for (sample, acc) in &other.samples {
            self.samples.entry(sample.clone()).or_default().merge(acc);
        }
    }

    pub fn rows(&self) -> Vec<SampleRow> {
        self.samples
            .iter()
            .map(|(sample, acc)| SampleRow {
                sample: sample.clone(),
                metrics: acc.metrics(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stratify::{BinSpec, CombineMode, StratField, StratifySource};
    use trcompare_geno::{GenotypeCall, Locus};

    fn acc_of(values: &[(bool, bool, i64, i64)]) -> ConcordanceAccumulator {
        let mut acc = ConcordanceAccumulator::new();
        for &(s, l, x, y) in values {
            acc.add_values(s, l, x, y);
        }
        acc
    }

    #[test]
    fn test_concordance_rates() {
        let acc = acc_of(&[(true, true, 0, 0), (false, true, 1, 1), (false, false, 2, 0), (false, false, 0, 3)]);
        let m = acc.metrics();
        assert_eq!(m.numcalls, 4);
        assert_eq!(m.concordance_seq, Some(0.25));
        assert_eq!(m.concordance_len, Some(0.5));
    }

    #[test]
    fn test_empty_metrics_undefined() {
        let m = ConcordanceAccumulator::new().metrics();
        assert_eq!(m.numcalls, 0);
        assert_eq!(m.concordance_seq, None);
        assert_eq!(m.r2, None);
    }

    #[test]
    fn test_r2_perfect_and_undefined() {
        let perfect = acc_of(&[(true, true, 0, 0), (true, true, 2, 4), (true, true, -2, -4)]);
        assert!((perfect.r2().unwrap() - 1.0).abs() < 1e-12);

        assert_eq!(acc_of(&[(true, true, 1, 1)]).r2(), None);
        // Constant x.
        assert_eq!(acc_of(&[(true, true, 0, 1), (true, true, 0, 2)]).r2(), None);
    }

    #[test]
    fn test_r2_known_value() {
        // x = [1, 2, 3], y = [1, 3, 2]: r = 0.5
        let acc = acc_of(&[(false, false, 1, 1), (false, false, 2, 3), (false, false, 3, 2)]);
        assert!((acc.r2().unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_merge_equals_direct() {
        let values = [(true, true, 0, 0), (false, true, 2, 1), (false, false, -3, 4), (true, true, 5, 5), (false, false, 1, -2)];
        let direct = acc_of(&values);
        let mut left = acc_of(&values[..2]);
        left.merge(&acc_of(&values[2..]));
        assert_eq!(left, direct);
        assert_eq!(left.metrics(), direct.metrics());
    }

    #[test]
    fn test_stratum_rows_order() {
        let config = StratifyConfig {
            fields: vec![
                StratField {
                    name: "DP".into(),
                    bins: BinSpec::new(0.0, 50.0, 10.0).unwrap(),
                },
                StratField {
                    name: "Q".into(),
                    bins: BinSpec::new(0.0, 1.0, 0.5).unwrap(),
                },
            ],
            source: StratifySource::Set1,
            combine: CombineMode::Union,
        };
        let locus = Locus::new("chr1", 1, 5, 1, "AAAAA");
        let c1 = GenotypeCall::from_sequences(["AAAAA", "AAAAA"])
            .with_annotation("DP", 35.0)
            .with_annotation("Q", 0.9);
        let c2 = GenotypeCall::from_sequences(["AAAAA", "AAAAAAA"]);
        let pair = ClassifiedPair {
            locus: &locus,
            sample: "S1",
            call1: &c1,
            call2: &c2,
            sequence_match: false,
            length_match: false,
            length_diff1: 0,
            length_diff2: 2,
        };

        let mut agg = OverallAggregator::new(&config);
        agg.add(&pair);
        let rows = agg.rows();
        // (1 + 5 + 2) rows for period ALL, same again for period 1.
        assert_eq!(rows.len(), 16);
        assert_eq!((rows[0].period.as_str(), rows[0].field.as_str(), rows[0].bin.as_str()), ("ALL", "ALL", "NA"));
        assert_eq!(rows[0].metrics.numcalls, 1);
        assert_eq!(rows[4].bin, "30.0-40.0");
        assert_eq!(rows[4].metrics.numcalls, 1);
        assert_eq!(rows[3].metrics.numcalls, 0);
        assert_eq!(rows[6].field, "Q");
        assert_eq!(rows[7].bin, "0.5-1.0");
        assert_eq!(rows[7].metrics.numcalls, 1);
        assert_eq!(rows[8].period, "1");
    }

    #[test]
    fn test_sample_rollup() {
        fn mk<'a>(locus: &'a Locus, c: &'a GenotypeCall, sample: &'a str, seq: bool) -> ClassifiedPair<'a> {
            ClassifiedPair {
                locus,
                sample,
                call1: c,
                call2: c,
                sequence_match: seq,
                length_match: true,
                length_diff1: 0,
                length_diff2: 0,
            }
        }
        let locus = Locus::new("chr1", 1, 5, 1, "AAAAA");
        let c = GenotypeCall::from_sequences(["AAAAA", "AAAAA"]);
        let mut a = SampleRollup::default();
        a.add(&mk(&locus, &c, "S2", true));
        a.add(&mk(&locus, &c, "S1", false));
        let mut b = SampleRollup::default();
        b.add(&mk(&locus, &c, "S2", false));
        a.merge(&b);

        let rows = a.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sample, "S1");
        assert_eq!(rows[1].metrics.numcalls, 2);
        assert_eq!(rows[1].metrics.concordance_seq, Some(0.5));
    }
}
