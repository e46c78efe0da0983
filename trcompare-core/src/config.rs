//! Comparison configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stratify::StratifyConfig;
use crate::filter::LocusFilter;

pub const DEFAULT_BUBBLE_MIN: i64 = -10;
pub const DEFAULT_BUBBLE_MAX: i64 = 10;

/// Everything that shapes a comparison run, apart from the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub stratify: StratifyConfig,
    pub filter: LocusFilter,
    /// Restrict comparison to these samples.
    pub samples: Option<Vec<String>>,
    /// Build the call-level table.
    pub emit_calls: bool,
    /// Clip range for bubble rendering. Not applied to the counts.
    pub bubble_min: i64,
    pub bubble_max: i64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            stratify: StratifyConfig::default(),
            filter: LocusFilter::default(),
            samples: None,
            emit_calls: true,
            bubble_min: DEFAULT_BUBBLE_MIN,
            bubble_max: DEFAULT_BUBBLE_MAX,
        }
    }
}

impl CompareConfig {
    pub fn with_stratify(mut self, stratify: StratifyConfig) -> Self {
        self.stratify = stratify;
        self
    }

    pub fn with_filter(mut self, filter: LocusFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Resolve stratification fields against the fields each set declares.
    pub fn resolve(&self, declared1: &[String], declared2: &[String]) -> Result<()> {
        self.stratify.validate_fields(declared1, declared2)
    }
}
