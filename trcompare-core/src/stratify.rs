//! Stratification of compared calls by numeric annotation fields.
//!
//! Each field is binned with a `min:max:width` specification into half-open
//! bins [lo, hi). Values outside [min, max), non-finite values and missing
//! annotations leave the pair out of that field's bins; the pair still
//! counts in the unconditional ALL stratum.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trcompare_geno::InputSet;

use crate::error::{CompareError, Result};

/// Upper bound on bins per field; larger specs are almost surely typos.
const MAX_BINS: usize = 100_000;

/// Bin edges generated from (min, max, width).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub min: f64,
    pub max: f64,
    pub width: f64,
}

impl BinSpec {
    pub fn new(min: f64, max: f64, width: f64) -> Result<Self> {
        let invalid = |reason: &str| CompareError::InvalidBinSpec {
            spec: format!("{}:{}:{}", min, max, width),
            reason: reason.to_string(),
        };
        if !(min.is_finite() && max.is_finite() && width.is_finite()) {
            return Err(invalid("bounds and width must be finite"));
        }
        if min >= max {
            return Err(invalid("min must be smaller than max"));
        }
        if width <= 0.0 {
            return Err(invalid("width must be positive"));
        }
        let spec = Self { min, max, width };
        if ((max - min) / width).ceil() > MAX_BINS as f64 {
            return Err(invalid("too many bins"));
        }
        Ok(spec)
    }

    /// Number of bins; the last one is truncated at `max`.
    pub fn n_bins(&self) -> usize {
        let mut n = (((self.max - self.min) / self.width).ceil() as usize).max(1);
        while n > 1 && self.min + (n - 1) as f64 * self.width >= self.max {
            n -= 1;
        }
        n
    }

    /// Bin of a value, `None` outside [min, max) or for non-finite values.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value >= self.max {
            return None;
        }
        let idx = ((value - self.min) / self.width).floor() as usize;
        Some(idx.min(self.n_bins() - 1))
    }

    /// Lower and upper edge of bin `i`.
    pub fn bounds(&self, i: usize) -> (f64, f64) {
        let lo = self.min + i as f64 * self.width;
        let hi = (self.min + (i + 1) as f64 * self.width).min(self.max);
        (lo, hi)
    }

    /// Label "lo-hi" using natural float rendering, e.g. "30.0-40.0".
    pub fn label(&self, i: usize) -> String {
        let (lo, hi) = self.bounds(i);
        format!("{:?}-{:?}", lo, hi)
    }
}

impl FromStr for BinSpec {
    type Err = CompareError;

    /// Parse "min:max:width".
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let invalid = |reason: &str| CompareError::InvalidBinSpec {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        if parts.len() != 3 {
            return Err(invalid("expected min:max:width"));
        }
        let mut nums = [0.0; 3];
        for (slot, p) in nums.iter_mut().zip(&parts) {
            *slot = p.parse().map_err(|_| invalid("not a number"))?;
        }
        BinSpec::new(nums[0], nums[1], nums[2]).map_err(|e| match e {
            CompareError::InvalidBinSpec { reason, .. } => invalid(&reason),
            other => other,
        })
    }
}

/// Which call set(s) supply stratification values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StratifySource {
    Set1,
    Set2,
    #[default]
    Both,
}

impl StratifySource {
    /// Parse the numeric form: 0 = both, 1 = set 1, 2 = set 2.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StratifySource::Both),
            1 => Some(StratifySource::Set1),
            2 => Some(StratifySource::Set2),
            _ => None,
        }
    }

    pub fn reads(&self, set: InputSet) -> bool {
        matches!(
            (self, set),
            (StratifySource::Both, _)
                | (StratifySource::Set1, InputSet::Set1)
                | (StratifySource::Set2, InputSet::Set2)
        )
    }
}

/// How set-1 and set-2 values combine when both sets are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombineMode {
    /// A bin applies if either value falls in it; each bin counts once.
    #[default]
    Union,
    /// A bin applies only if both values are present and fall in it.
    Intersection,
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineMode::Union => write!(f, "union"),
            CombineMode::Intersection => write!(f, "intersection"),
        }
    }
}

/// One stratification field and its bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratField {
    pub name: String,
    pub bins: BinSpec,
}

/// Stratification configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StratifyConfig {
    /// Fields in output order.
    pub fields: Vec<StratField>,
    pub source: StratifySource,
    pub combine: CombineMode,
}

impl StratifyConfig {
    /// Build from parallel lists of field names and "min:max:width" specs.
    pub fn from_specs(
        names: &[String],
        binsizes: &[String],
        source: StratifySource,
        combine: CombineMode,
    ) -> Result<Self> {
        if names.len() != binsizes.len() {
            return Err(CompareError::BinsizeCount {
                fields: names.len(),
                binsizes: binsizes.len(),
            });
        }
        let mut fields: Vec<StratField> = Vec::with_capacity(names.len());
        for (name, spec) in names.iter().zip(binsizes) {
            if fields.iter().any(|f| &f.name == name) {
                return Err(CompareError::DuplicateField(name.clone()));
            }
            fields.push(StratField {
                name: name.clone(),
                bins: spec.parse()?,
            });
        }
        Ok(Self {
            fields,
            source,
            combine,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields to request from `set`.
    pub fn requested_fields(&self, set: InputSet) -> Vec<String> {
        if self.source.reads(set) {
            self.fields.iter().map(|f| f.name.clone()).collect()
        } else {
            Vec::new()
        }
    }

    /// Check that every field is declared by the set(s) it is read from.
    pub fn validate_fields(&self, declared1: &[String], declared2: &[String]) -> Result<()> {
        for field in &self.fields {
            for (set, declared) in [(InputSet::Set1, declared1), (InputSet::Set2, declared2)] {
                if self.source.reads(set) && !declared.contains(&field.name) {
                    return Err(CompareError::UnknownField {
                        field: field.name.clone(),
                        set,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Bins of `field` a call pair belongs to, ascending and without repeats.
pub fn applicable_bins(
    field: &StratField,
    ann1: &BTreeMap<String, f64>,
    ann2: &BTreeMap<String, f64>,
    source: StratifySource,
    combine: CombineMode,
) -> Vec<usize> {
    let bin_of = |ann: &BTreeMap<String, f64>, set: InputSet| {
        if source.reads(set) {
            ann.get(&field.name).and_then(|&v| field.bins.bin_index(v))
        } else {
            None
        }
    };
    let b1 = bin_of(ann1, InputSet::Set1);
    let b2 = bin_of(ann2, InputSet::Set2);

    match (source, combine) {
        (StratifySource::Both, CombineMode::Intersection) => match (b1, b2) {
            (Some(a), Some(b)) if a == b => vec![a],
            _ => Vec::new(),
        },
        _ => {
            let mut bins: Vec<usize> = b1.into_iter().chain(b2).collect();
            bins.sort_unstable();
            bins.dedup();
            bins
        }
    }
}
