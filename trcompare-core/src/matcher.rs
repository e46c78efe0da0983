//! Locus matching between two coordinate-sorted call streams.
//!
//! Loci are paired by exact (chrom, start, end, period) identity. Records
//! that share a (chrom, start) position are grouped before matching, so two
//! files listing same-position loci in different orders still pair up.
//! Loci present in only one stream are dropped and counted.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use tracing::trace;
use trcompare_geno::{ContigOrder, InputSet, Locus, LocusCalls};

use crate::error::{CompareError, Result};

/// A locus present in both call sets.
#[derive(Debug, Clone)]
pub struct MatchedLocus {
    pub locus: Locus,
    pub set1: LocusCalls,
    pub set2: LocusCalls,
}

/// Locus-level matching diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MatchStats {
    pub matched: usize,
    pub only_set1: usize,
    pub only_set2: usize,
}

impl MatchStats {
    pub fn merge(&mut self, other: &MatchStats) {
        self.matched += other.matched;
        self.only_set1 += other.only_set1;
        self.only_set2 += other.only_set2;
    }
}

/// One input stream with a read-ahead buffer and a per-stream order check.
///
/// Each contig forms one contiguous block: once the stream moves to a new
/// contig it may not return to an earlier one, and starts never decrease
/// within a contig.
struct SortedStream<I> {
    set: InputSet,
    inner: I,
    /// Validated records not yet consumed, tagged with their contig block.
    buffer: VecDeque<(usize, LocusCalls)>,
    /// Contig -> block index, in the order the stream reached them.
    blocks: HashMap<String, usize>,
    last: Option<(String, u64)>,
    exhausted: bool,
}

impl<I> SortedStream<I>
where
    I: Iterator<Item = anyhow::Result<LocusCalls>>,
{
    fn new(set: InputSet, inner: I) -> Self {
        Self {
            set,
            inner,
            buffer: VecDeque::new(),
            blocks: HashMap::new(),
            last: None,
            exhausted: false,
        }
    }

    /// Read one more record into the buffer. Returns false at end of stream.
    fn pull(&mut self, contigs: &ContigOrder) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let lc = match self.inner.next() {
            None => {
                self.exhausted = true;
                return Ok(false);
            }
            Some(rec) => rec?,
        };
        let block = self.check_order(&lc.locus, contigs)?;
        self.buffer.push_back((block, lc));
        Ok(true)
    }

    fn check_order(&mut self, locus: &Locus, contigs: &ContigOrder) -> Result<usize> {
        if let Some((prev_chrom, prev_start)) = &self.last {
            let backwards = if *prev_chrom == locus.chrom {
                locus.start < *prev_start
            } else {
                let header_backwards = matches!(
                    (contigs.rank(prev_chrom), contigs.rank(&locus.chrom)),
                    (Some(a), Some(b)) if b < a
                );
                header_backwards || self.blocks.contains_key(&locus.chrom)
            };
            if backwards {
                return Err(CompareError::UnsortedInput {
                    set: self.set,
                    chrom: locus.chrom.clone(),
                    pos: locus.start,
                    prev_chrom: prev_chrom.clone(),
                    prev_pos: *prev_start,
                });
            }
        }
        let next_block = self.blocks.len();
        let block = *self.blocks.entry(locus.chrom.clone()).or_insert(next_block);
        self.last = Some((locus.chrom.clone(), locus.start));
        Ok(block)
    }

    /// (chrom, start) of the next record, pulling from the source if needed.
    fn peek(&mut self, contigs: &ContigOrder) -> Result<Option<(String, u64)>> {
        if self.buffer.is_empty() {
            self.pull(contigs)?;
        }
        Ok(self
            .buffer
            .front()
            .map(|(_, lc)| (lc.locus.chrom.clone(), lc.locus.start)))
    }

    /// Where `chrom` lies relative to the next record's contig, if this
    /// stream has reached it yet.
    fn relative(&self, chrom: &str) -> Option<Ordering> {
        let front = self.buffer.front().map(|(b, _)| *b)?;
        self.blocks.get(chrom).map(|b| b.cmp(&front))
    }

    /// Take every record at the next record's position.
    fn take_group(&mut self, contigs: &ContigOrder) -> Result<Vec<LocusCalls>> {
        let mut group: Vec<LocusCalls> = Vec::new();
        let Some(pos) = self.peek(contigs)? else {
            return Ok(group);
        };
        while self.peek(contigs)?.as_ref() == Some(&pos) {
            if let Some((_, lc)) = self.buffer.pop_front() {
                if group.iter().any(|g| g.locus.same_key(&lc.locus)) {
                    return Err(CompareError::DuplicateLocus {
                        set: self.set,
                        chrom: lc.locus.chrom,
                        start: lc.locus.start,
                        end: lc.locus.end,
                        period: lc.locus.period,
                    });
                }
                group.push(lc);
            }
        }
        Ok(group)
    }
}

/// Which stream holds the earlier position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Set1,
    Set2,
    Both,
}

/// Lazily pairs loci from two sorted streams.
pub struct LocusMatcher<I1, I2> {
    s1: SortedStream<I1>,
    s2: SortedStream<I2>,
    contigs: ContigOrder,
    ready: VecDeque<MatchedLocus>,
    stats: MatchStats,
    failed: bool,
}

impl<I1, I2> LocusMatcher<I1, I2>
where
    I1: Iterator<Item = anyhow::Result<LocusCalls>>,
    I2: Iterator<Item = anyhow::Result<LocusCalls>>,
{
    /// `contigs` holds the header-declared order; contigs it does not list
    /// are ordered by how each stream reaches them.
    pub fn new(set1: I1, set2: I2, contigs: ContigOrder) -> Self {
        Self {
            s1: SortedStream::new(InputSet::Set1, set1),
            s2: SortedStream::new(InputSet::Set2, set2),
            contigs,
            ready: VecDeque::new(),
            stats: MatchStats::default(),
            failed: false,
        }
    }

    /// Matching counts so far; final once the iterator is exhausted.
    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    /// Decide which stream goes first when their next records sit on
    /// different contigs `c1` (set 1) and `c2` (set 2).
    ///
    /// Header ranks win when both contigs are declared. Otherwise a contig
    /// the other stream has already passed is drained first, and a contig
    /// the other stream has not reached is resolved by reading ahead until
    /// one stream reaches the other's contig or ends without it.
    fn order_contigs(&mut self, c1: &str, c2: &str) -> Result<Advance> {
        if let (Some(a), Some(b)) = (self.contigs.rank(c1), self.contigs.rank(c2)) {
            return Ok(if a < b { Advance::Set1 } else { Advance::Set2 });
        }
        loop {
            match self.s2.relative(c1) {
                Some(Ordering::Less) => return Ok(Advance::Set1),
                Some(_) => return Ok(Advance::Set2),
                None => {}
            }
            match self.s1.relative(c2) {
                Some(Ordering::Less) => return Ok(Advance::Set2),
                Some(_) => return Ok(Advance::Set1),
                None => {}
            }
            if self.s2.exhausted {
                return Ok(Advance::Set1);
            }
            if self.s1.exhausted {
                return Ok(Advance::Set2);
            }
            self.s2.pull(&self.contigs)?;
            self.s1.pull(&self.contigs)?;
        }
    }

    /// Advance until at least one matched locus is ready or both streams end.
    fn fill(&mut self) -> Result<()> {
        while self.ready.is_empty() {
            let p1 = self.s1.peek(&self.contigs)?;
            let p2 = self.s2.peek(&self.contigs)?;
            let advance = match (p1, p2) {
                (None, None) => return Ok(()),
                (Some(_), None) => Advance::Set1,
                (None, Some(_)) => Advance::Set2,
                (Some((c1, a)), Some((c2, b))) if c1 == c2 => match a.cmp(&b) {
                    Ordering::Less => Advance::Set1,
                    Ordering::Greater => Advance::Set2,
                    Ordering::Equal => Advance::Both,
                },
                (Some((c1, _)), Some((c2, _))) => self.order_contigs(&c1, &c2)?,
            };
            match advance {
                Advance::Set1 => {
                    self.stats.only_set1 += self.s1.take_group(&self.contigs)?.len();
                }
                Advance::Set2 => {
                    self.stats.only_set2 += self.s2.take_group(&self.contigs)?.len();
                }
                Advance::Both => {
                    let g1 = self.s1.take_group(&self.contigs)?;
                    let mut g2 = self.s2.take_group(&self.contigs)?;
                    for lc1 in g1 {
                        match g2.iter().position(|lc2| lc2.locus.same_key(&lc1.locus)) {
                            Some(j) => {
                                let lc2 = g2.swap_remove(j);
                                self.stats.matched += 1;
                                self.ready.push_back(MatchedLocus {
                                    locus: lc1.locus.clone(),
                                    set1: lc1,
                                    set2: lc2,
                                });
                            }
                            None => {
                                trace!("Locus {} only in set1", lc1.locus);
                                self.stats.only_set1 += 1;
                            }
                        }
                    }
                    self.stats.only_set2 += g2.len();
                }
            }
        }
        Ok(())
    }
}

impl<I1, I2> Iterator for LocusMatcher<I1, I2>
where
    I1: Iterator<Item = anyhow::Result<LocusCalls>>,
    I2: Iterator<Item = anyhow::Result<LocusCalls>>,
{
    type Item = Result<MatchedLocus>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(e) = self.fill() {
            self.failed = true;
            return Some(Err(e));
        }
        self.ready.pop_front().map(Ok)
    }
}
