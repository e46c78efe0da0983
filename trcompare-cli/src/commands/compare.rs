//! Compare two TR call sets.
//!
//! trcompare compare --vcf1 ... --vcf2 ... --out prefix [--stratify-fields DP --stratify-binsizes 0:50:10]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use trcompare_core::filter::{LocusFilter, Region};
use trcompare_core::report::{self, RunSummary};
use trcompare_core::stratify::{CombineMode, StratifyConfig, StratifySource};
use trcompare_core::{CompareConfig, CompareEngine, ComparisonReport};
use trcompare_geno::sample::parse_sample_subset;
use trcompare_geno::vcf::TrVcfReader;
use trcompare_geno::CallSource;

#[derive(Args)]
pub struct CompareArgs {
    /// First call set (VCF, optionally gzipped)
    #[arg(long)]
    vcf1: String,

    /// Second call set (VCF, optionally gzipped)
    #[arg(long)]
    vcf2: String,

    /// Output prefix
    #[arg(long)]
    out: String,

    /// FORMAT fields to stratify by (comma-separated)
    #[arg(long, value_delimiter = ',')]
    stratify_fields: Vec<String>,

    /// Bins per field as min:max:width (comma-separated, same order)
    #[arg(long, value_delimiter = ',')]
    stratify_binsizes: Vec<String>,

    /// Which set supplies stratification values: 0 = both, 1 = vcf1, 2 = vcf2
    #[arg(long, default_value = "0")]
    stratify_file: u8,

    /// With --stratify-file 0, require both values in the same bin
    #[arg(long, default_value = "false")]
    stratify_intersect: bool,

    /// Only compare loci overlapping chrom or chrom:start-end
    #[arg(long)]
    region: Option<String>,

    /// Only compare loci with these repeat periods (comma-separated)
    #[arg(long, value_delimiter = ',')]
    period: Vec<u32>,

    /// Sample subset: comma-separated IDs or a file with one ID per line
    #[arg(long)]
    samples: Option<String>,

    /// Expected ploidy of vcf1 calls; others are treated as missing
    #[arg(long)]
    ploidy1: Option<usize>,

    /// Expected ploidy of vcf2 calls; others are treated as missing
    #[arg(long)]
    ploidy2: Option<usize>,

    /// Skip the per-call table
    #[arg(long, default_value = "false")]
    no_calls: bool,

    /// Lower clip bound for bubble plots
    #[arg(long, default_value = "-10", allow_hyphen_values = true)]
    bubble_min: i64,

    /// Upper clip bound for bubble plots
    #[arg(long, default_value = "10", allow_hyphen_values = true)]
    bubble_max: i64,
}

fn build_config(args: &CompareArgs) -> Result<CompareConfig> {
    let source = StratifySource::from_code(args.stratify_file)
        .with_context(|| format!("--stratify-file must be 0, 1 or 2, got {}", args.stratify_file))?;
    let combine = if args.stratify_intersect {
        CombineMode::Intersection
    } else {
        CombineMode::Union
    };
    let stratify =
        StratifyConfig::from_specs(&args.stratify_fields, &args.stratify_binsizes, source, combine)?;

    let region = args
        .region
        .as_deref()
        .map(str::parse::<Region>)
        .transpose()?;
    let periods = (!args.period.is_empty()).then(|| args.period.clone());

    let samples = args
        .samples
        .as_deref()
        .map(parse_sample_subset)
        .transpose()?;

    if args.bubble_min > args.bubble_max {
        bail!(
            "--bubble-min ({}) must not exceed --bubble-max ({})",
            args.bubble_min,
            args.bubble_max
        );
    }

    Ok(CompareConfig {
        stratify,
        filter: LocusFilter { region, periods },
        samples,
        emit_calls: !args.no_calls,
        bubble_min: args.bubble_min,
        bubble_max: args.bubble_max,
    })
}

fn open_reader(path: &str, ploidy: Option<usize>) -> Result<TrVcfReader> {
    let mut reader =
        TrVcfReader::new(path).with_context(|| format!("Failed to open call set {}", path))?;
    reader.set_expected_ploidy(ploidy);
    info!(
        "{}: {} samples, {} contigs, fields [{}]",
        path,
        reader.sample_ids().len(),
        reader.contigs().len(),
        reader.annotation_fields().join(",")
    );
    Ok(reader)
}

fn output_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}-{}", prefix, suffix))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_outputs(args: &CompareArgs, config: &CompareConfig, report: &ComparisonReport) -> Result<()> {
    if let Some(parent) = Path::new(&args.out).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }
    }

    let path = output_path(&args.out, "overall.tab");
    let mut w = create_output(&path)?;
    report::write_overall(&mut w, &report.overall)?;
    w.flush()?;
    info!("Overall concordance written to {}", path.display());

    if config.emit_calls {
        let path = output_path(&args.out, "callcompare.tab");
        let mut w = create_output(&path)?;
        report::write_calls(&mut w, &report.calls)?;
        w.flush()?;
        info!("Per-call comparison written to {}", path.display());
    }

    let path = output_path(&args.out, "locuscompare.tab");
    let mut w = create_output(&path)?;
    report::write_loci(&mut w, &report.loci)?;
    w.flush()?;

    let path = output_path(&args.out, "samplecompare.tab");
    let mut w = create_output(&path)?;
    report::write_samples(&mut w, &report.samples)?;
    w.flush()?;

    let path = output_path(&args.out, "bubble.tab");
    let mut w = create_output(&path)?;
    report::write_bubble(&mut w, &report.bubble)?;
    w.flush()?;

    let summary = RunSummary {
        version: env!("CARGO_PKG_VERSION").to_string(),
        vcf1: args.vcf1.clone(),
        vcf2: args.vcf2.clone(),
        config: config.clone(),
        diagnostics: report.diagnostics,
        bubble_min: config.bubble_min,
        bubble_max: config.bubble_max,
    };
    let path = output_path(&args.out, "summary.json");
    let mut w = create_output(&path)?;
    report::write_summary(&mut w, &summary)?;
    w.flush()?;
    info!("Run summary written to {}", path.display());

    Ok(())
}

pub fn run(args: CompareArgs) -> Result<()> {
    info!("=== Compare TR call sets ===");
    info!("Set 1: {}", args.vcf1);
    info!("Set 2: {}", args.vcf2);

    let config = build_config(&args)?;
    let set1 = open_reader(&args.vcf1, args.ploidy1)?;
    let set2 = open_reader(&args.vcf2, args.ploidy2)?;

    let parallel = rayon::current_num_threads() > 1;
    let engine = CompareEngine::new(config);
    let report = engine.compare_sources(set1, set2, parallel)?;

    write_outputs(&args, engine.config(), &report)?;

    if let Some(all) = report.all_row() {
        println!(
            "Compared {} calls at {} loci: sequence concordance {}, length concordance {}",
            all.metrics.numcalls,
            report.diagnostics.loci_compared,
            fmt_rate(all.metrics.concordance_seq),
            fmt_rate(all.metrics.concordance_len)
        );
    }

    Ok(())
}

fn fmt_rate(v: Option<f64>) -> String {
    v.map_or_else(|| "NA".to_string(), |x| format!("{:.4}", x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CompareArgs,
    }

    fn parse(extra: &[&str]) -> CompareArgs {
        let mut argv = vec!["compare", "--vcf1", "a.vcf", "--vcf2", "b.vcf", "--out", "x"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_build_config() {
        let args = parse(&[
            "--stratify-fields",
            "DP",
            "--stratify-binsizes",
            "0:50:10",
            "--stratify-file",
            "1",
            "--region",
            "chr1:100-200",
            "--period",
            "2,3",
            "--samples",
            "S1,S2",
            "--no-calls",
        ]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.stratify.fields.len(), 1);
        assert_eq!(cfg.stratify.source, StratifySource::Set1);
        assert_eq!(cfg.filter.periods, Some(vec![2, 3]));
        assert_eq!(cfg.filter.region.unwrap().to_string(), "chr1:100-200");
        assert_eq!(cfg.samples, Some(vec!["S1".to_string(), "S2".to_string()]));
        assert!(!cfg.emit_calls);
    }

    #[test]
    fn test_build_config_errors() {
        assert!(build_config(&parse(&["--stratify-file", "3"])).is_err());
        assert!(build_config(&parse(&["--stratify-fields", "DP"])).is_err());
        assert!(build_config(&parse(&["--region", "chr1:9-1"])).is_err());
        assert!(build_config(&parse(&["--bubble-min", "5", "--bubble-max", "1"])).is_err());
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let body = "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=1000>\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t10\t.\tATATAT\tATATATAT\t.\tPASS\tPERIOD=2\tGT:DP\t0/1:35\n";
        let vcf = dir.path().join("calls.vcf");
        std::fs::write(&vcf, body).unwrap();
        let out = dir.path().join("res").join("cmp");

        let vcf = vcf.to_str().unwrap();
        let out = out.to_str().unwrap();
        let args = Wrapper::try_parse_from([
            "compare",
            "--vcf1",
            vcf,
            "--vcf2",
            vcf,
            "--out",
            out,
            "--stratify-fields",
            "DP",
            "--stratify-binsizes",
            "0:50:10",
        ])
        .unwrap()
        .args;
        run(args).unwrap();

        for suffix in ["overall.tab", "callcompare.tab", "locuscompare.tab", "samplecompare.tab", "bubble.tab", "summary.json"] {
            assert!(output_path(out, suffix).exists(), "missing {}", suffix);
        }
        let overall = std::fs::read_to_string(output_path(out, "overall.tab")).unwrap();
        assert!(overall.contains("ALL\tDP\t30.0-40.0\t1\t1\tNA\t1"));
        let summary = std::fs::read_to_string(output_path(out, "summary.json")).unwrap();
        assert!(summary.contains("\"pairs_compared\": 1"));
    }
}
