//! Core trait for tandem-repeat call sources.

use anyhow::Result;

use crate::record::LocusCalls;

/// A coordinate-sorted source of per-locus call groups.
///
/// The VCF reader implements this; tests and embedding code can use
/// [`MemorySource`]. The engine and the CLI take concrete source types.
pub trait CallSource: Send {
    /// Sample IDs in file order.
    fn sample_ids(&self) -> &[String];

    /// Contig names declared by the source header, in header order.
    fn contigs(&self) -> &[String];

    /// Names of numeric annotation fields the source can supply.
    fn annotation_fields(&self) -> &[String];

    /// Request annotation fields to be attached to every call read.
    fn set_requested_fields(&mut self, fields: &[String]) -> Result<()>;

    /// Read the next locus group, `None` at end of input.
    fn next_locus(&mut self) -> Result<Option<LocusCalls>>;

    /// Turn the source into an iterator of locus groups.
    fn into_loci(self) -> SourceIter<Self>
    where
        Self: Sized,
    {
        SourceIter { source: self, done: false }
    }
}

/// Iterator adapter over a [`CallSource`]. Stops after the first error.
pub struct SourceIter<S> {
    source: S,
    done: bool,
}

impl<S: CallSource> Iterator for SourceIter<S> {
    type Item = Result<LocusCalls>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_locus() {
            Ok(Some(lc)) => Some(Ok(lc)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// An in-memory call source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sample_ids: Vec<String>,
    contigs: Vec<String>,
    fields: Vec<String>,
    loci: std::collections::VecDeque<LocusCalls>,
}

impl MemorySource {
    pub fn new(sample_ids: Vec<String>, loci: Vec<LocusCalls>) -> Self {
        let mut fields: Vec<String> = loci
            .iter()
            .flat_map(|lc| lc.calls.iter())
            .flat_map(|sc| sc.call.annotations.keys().cloned())
            .collect();
        fields.sort();
        fields.dedup();
        Self {
            sample_ids,
            contigs: Vec::new(),
            fields,
            loci: loci.into(),
        }
    }

    pub fn with_contigs(mut self, contigs: Vec<String>) -> Self {
        self.contigs = contigs;
        self
    }
}

impl CallSource for MemorySource {
    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn contigs(&self) -> &[String] {
        &self.contigs
    }

    fn annotation_fields(&self) -> &[String] {
        &self.fields
    }

    fn set_requested_fields(&mut self, _fields: &[String]) -> Result<()> {
        Ok(())
    }

    fn next_locus(&mut self) -> Result<Option<LocusCalls>> {
        Ok(self.loci.pop_front())
    }
}
