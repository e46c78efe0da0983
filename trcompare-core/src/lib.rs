//! trcompare-core: tandem-repeat call set comparison.
//!
//! Matches loci between two sorted call sets, pairs per-sample calls,
//! classifies each pair at sequence and length resolution, and aggregates
//! concordance and length-difference correlation overall, per stratum,
//! per locus and per sample.

pub mod aggregate;
pub mod aligner;
pub mod bubble;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod report;
pub mod stratify;

pub use config::CompareConfig;
pub use engine::{CompareEngine, Diagnostics};
pub use error::{CompareError, Result};
pub use report::ComparisonReport;
