//! Summarize one TR call set.
//!
//! trcompare inspect --vcf calls.vcf.gz

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use trcompare_geno::vcf::TrVcfReader;
use trcompare_geno::CallSource;

#[derive(Args)]
pub struct InspectArgs {
    /// Call set (VCF, optionally gzipped)
    #[arg(long)]
    vcf: String,

    /// Expected ploidy; other calls are counted as missing
    #[arg(long)]
    ploidy: Option<usize>,
}

/// Counts gathered from a full pass over a call set.
#[derive(Debug, Default, PartialEq)]
struct CallSetSummary {
    n_loci: u64,
    n_calls: u64,
    n_missing: u64,
    /// Loci per repeat period.
    periods: BTreeMap<u32, u64>,
}

fn summarize(reader: &mut TrVcfReader) -> Result<CallSetSummary> {
    let mut summary = CallSetSummary::default();
    while let Some(lc) = reader.next_locus()? {
        summary.n_loci += 1;
        *summary.periods.entry(lc.locus.period).or_insert(0) += 1;
        for sc in &lc.calls {
            if sc.call.is_missing() {
                summary.n_missing += 1;
            } else {
                summary.n_calls += 1;
            }
        }
    }
    Ok(summary)
}

pub fn run(args: InspectArgs) -> Result<()> {
    let mut reader = TrVcfReader::new(&args.vcf)
        .with_context(|| format!("Failed to open call set {}", args.vcf))?;
    reader.set_expected_ploidy(args.ploidy);

    println!("File: {}", args.vcf);
    println!("Samples ({}): {}", reader.sample_ids().len(), reader.sample_ids().join(","));
    println!("Contigs ({}): {}", reader.contigs().len(), reader.contigs().join(","));
    println!("Numeric FORMAT fields: {}", reader.annotation_fields().join(","));

    info!("Scanning records...");
    let summary = summarize(&mut reader)?;
    println!("Loci: {}", summary.n_loci);
    println!("Calls: {} ({} missing)", summary.n_calls, summary.n_missing);
    if args.ploidy.is_some() {
        println!("Calls discarded for ploidy: {}", reader.n_ploidy_discarded());
    }
    for (period, n) in &summary.periods {
        println!("  period {}: {} loci", period, n);
    }

    Ok(())
}
