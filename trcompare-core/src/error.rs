//! Errors raised by the concordance engine.
//!
//! Only two things abort a run: malformed configuration (caught before any
//! record is read) and input streams that cannot be merged correctly.
//! Missing calls and ploidy mismatches are tallied, not raised.

use thiserror::Error;
use trcompare_geno::InputSet;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("{set} is not sorted: {chrom}:{pos} comes after {prev_chrom}:{prev_pos}")]
    UnsortedInput {
        set: InputSet,
        chrom: String,
        pos: u64,
        prev_chrom: String,
        prev_pos: u64,
    },

    #[error("{set} lists locus {chrom}:{start}-{end} (period {period}) more than once")]
    DuplicateLocus {
        set: InputSet,
        chrom: String,
        start: u64,
        end: u64,
        period: u32,
    },

    #[error("Invalid bin specification '{spec}': {reason}")]
    InvalidBinSpec { spec: String, reason: String },

    #[error("Stratification field '{field}' is not available in {set}")]
    UnknownField { field: String, set: InputSet },

    #[error("Stratification field '{0}' is listed more than once")]
    DuplicateField(String),

    #[error("Got {fields} stratification fields but {binsizes} bin specifications")]
    BinsizeCount { fields: usize, binsizes: usize },

    #[error("Invalid region '{region}': {reason}")]
    InvalidRegion { region: String, reason: String },

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl CompareError {
    /// Whether the error stems from the configuration rather than the input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CompareError::InvalidBinSpec { .. }
                | CompareError::UnknownField { .. }
                | CompareError::DuplicateField(_)
                | CompareError::BinsizeCount { .. }
                | CompareError::InvalidRegion { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
