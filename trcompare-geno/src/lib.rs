//! trcompare-geno: Tandem-repeat call records and call sources.
//!
//! Provides the normalized record types the concordance engine consumes,
//! a `CallSource` trait with in-memory and VCF implementations, contig
//! ordering, and sample overlap helpers.

pub mod contig;
pub mod record;
pub mod sample;
pub mod traits;
pub mod vcf;

pub use contig::ContigOrder;
pub use record::{GenotypeCall, InputSet, Locus, LocusCalls, LocusKey, SampleCall};
pub use traits::{CallSource, MemorySource};
