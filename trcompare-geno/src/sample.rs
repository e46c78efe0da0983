//! Sample ID overlap and subsetting.
//!
//! Handles the common operation of comparing the sample lists of the two
//! call sets and restricting a comparison to a user-supplied subset.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

/// Overlap between the sample lists of two call sets.
#[derive(Debug, Clone, Default)]
pub struct SampleOverlap {
    /// Samples in both sets, in set-1 order.
    pub shared: Vec<String>,
    /// Samples only in set 1, in set-1 order.
    pub only_set1: Vec<String>,
    /// Samples only in set 2, in set-2 order.
    pub only_set2: Vec<String>,
}

/// Compare two sample lists.
pub fn sample_overlap(set1: &[String], set2: &[String]) -> SampleOverlap {
    let in1: HashSet<&str> = set1.iter().map(String::as_str).collect();
    let in2: HashSet<&str> = set2.iter().map(String::as_str).collect();

    let mut overlap = SampleOverlap::default();
    for id in set1 {
        if in2.contains(id.as_str()) {
            overlap.shared.push(id.clone());
        } else {
            overlap.only_set1.push(id.clone());
        }
    }
    overlap.only_set2 = set2
        .iter()
        .filter(|id| !in1.contains(id.as_str()))
        .cloned()
        .collect();
    overlap
}

/// Parse a sample subset given either as a comma-separated list or as a
/// path to a file with one sample ID per line.
pub fn parse_sample_subset(arg: &str) -> Result<Vec<String>> {
    let path = Path::new(arg);
    let ids: Vec<String> = if path.is_file() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sample file: {}", path.display()))?;
        contents
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect()
    } else {
        arg.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    };
    if ids.is_empty() {
        anyhow::bail!("Sample subset '{}' is empty", arg);
    }
    Ok(ids)
}
