//! Locus filters applied to matched loci before comparison.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trcompare_geno::Locus;

use crate::error::{CompareError, Result};

/// A genomic region, `chrom` or `chrom:start-end` (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub chrom: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    /// Whether the locus overlaps the region.
    pub fn overlaps(&self, locus: &Locus) -> bool {
        locus.chrom == self.chrom
            && self.start.map_or(true, |s| locus.end >= s)
            && self.end.map_or(true, |e| locus.start <= e)
    }
}

impl FromStr for Region {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CompareError::InvalidRegion {
            region: s.to_string(),
            reason: reason.to_string(),
        };
        let (chrom, range) = match s.rsplit_once(':') {
            Some((c, r)) => (c, Some(r)),
            None => (s, None),
        };
        if chrom.is_empty() {
            return Err(invalid("missing chromosome"));
        }
        let (start, end) = match range {
            None => (None, None),
            Some(r) => {
                let (a, b) = r.split_once('-').ok_or_else(|| invalid("expected start-end"))?;
                let parse = |x: &str| {
                    x.replace(',', "")
                        .parse::<u64>()
                        .map_err(|_| invalid("coordinates must be integers"))
                };
                let (a, b) = (parse(a)?, parse(b)?);
                if a > b {
                    return Err(invalid("start is after end"));
                }
                (Some(a), Some(b))
            }
        };
        Ok(Region {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "{}:{}-{}", self.chrom, s, e),
            _ => write!(f, "{}", self.chrom),
        }
    }
}

/// Restricts which matched loci are compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocusFilter {
    pub region: Option<Region>,
    /// Only compare loci with one of these periods.
    pub periods: Option<Vec<u32>>,
}

impl LocusFilter {
    pub fn accepts(&self, locus: &Locus) -> bool {
        if let Some(region) = &self.region {
            if !region.overlaps(locus) {
                return false;
            }
        }
        if let Some(periods) = &self.periods {
            if !periods.contains(&locus.period) {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.periods.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let r: Region = "chr1:1,000-2,000".parse().unwrap();
        assert_eq!(r.chrom, "chr1");
        assert_eq!(r.start, Some(1000));
        assert_eq!(r.end, Some(2000));
        assert_eq!(r.to_string(), "chr1:1000-2000");

        let whole: Region = "chrX".parse().unwrap();
        assert_eq!(whole.start, None);
        assert_eq!(whole.to_string(), "chrX");

        assert!("chr1:200-100".parse::<Region>().is_err());
        assert!("chr1:abc-100".parse::<Region>().is_err());
        assert!("chr1:100".parse::<Region>().is_err());
        assert!(":1-2".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_overlap() {
        let r: Region = "chr1:100-200".parse().unwrap();
        assert!(r.overlaps(&Locus::new("chr1", 90, 100, 2, "A")));
        assert!(r.overlaps(&Locus::new("chr1", 150, 160, 2, "A")));
        assert!(r.overlaps(&Locus::new("chr1", 200, 260, 2, "A")));
        assert!(!r.overlaps(&Locus::new("chr1", 201, 260, 2, "A")));
        assert!(!r.overlaps(&Locus::new("chr2", 150, 160, 2, "A")));
    }

    #[test]
    fn test_period_filter() {
        let f = LocusFilter {
            region: None,
            periods: Some(vec![2, 3]),
        };
        assert!(f.accepts(&Locus::new("chr1", 1, 10, 2, "A")));
        assert!(!f.accepts(&Locus::new("chr1", 1, 10, 4, "A")));
        assert!(LocusFilter::default().accepts(&Locus::new("chr1", 1, 10, 4, "A")));
        assert!(LocusFilter::default().is_empty());
    }
}
