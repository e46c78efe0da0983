//! End-to-end comparison tests.
//!
//! Builds small VCF call sets in temporary files and runs them through the
//! reader, the engine and the report writers.

use std::io::Write;

use tempfile::NamedTempFile;

fn header(samples: &[&str]) -> String {
    format!(
        "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=10000>\n\
##contig=<ID=chr2,length=10000>\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}\n",
        samples.join("\t")
    )
}

fn write_vcf(samples: &[&str], body: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".vcf").tempfile().unwrap();
    write!(f, "{}{}", header(samples), body).unwrap();
    f
}

/// Set 1: S1 and S2. S1 has DP 35 at the first locus and 55 at the second.
fn set1_vcf() -> NamedTempFile {
    write_vcf(
        &["S1", "S2"],
        "chr1\t100\t.\tACACACAC\tACACACACAC\t.\tPASS\tPERIOD=2\tGT:DP\t0/1:35\t0/0:12\n\
chr1\t200\t.\tAGCAGCAGC\tAGCAGC\t.\tPASS\tPERIOD=3\tGT:DP\t0/0:55\t1/1:42\n",
    )
}

/// Set 2: S1 and S3. S2 is absent, S3 is absent from set 1.
fn set2_vcf() -> NamedTempFile {
    write_vcf(
        &["S1", "S3"],
        "chr1\t100\t.\tACACACAC\tACACACACAC\t.\tPASS\tPERIOD=2\tGT:DP\t1/0:30\t0/0:8\n\
chr1\t200\t.\tAGCAGCAGC\tAGCAGC\t.\tPASS\tPERIOD=3\tGT:DP\t0/1:10\t0/0:9\n\
chr2\t50\t.\tATATAT\t.\t.\tPASS\tPERIOD=2\tGT:DP\t0/0:20\t0/0:20\n",
    )
}

mod vcf_comparison {
    use super::*;
    use trcompare_core::stratify::{CombineMode, StratifyConfig, StratifySource};
    use trcompare_core::{CompareConfig, CompareEngine};
    use trcompare_geno::vcf::TrVcfReader;

    fn dp_config(source: StratifySource) -> CompareConfig {
        CompareConfig::default().with_stratify(
            StratifyConfig::from_specs(&["DP".into()], &["0:50:10".into()], source, CombineMode::Union)
                .unwrap(),
        )
    }

    fn run(config: CompareConfig, parallel: bool) -> trcompare_core::ComparisonReport {
        let (f1, f2) = (set1_vcf(), set2_vcf());
        let r1 = TrVcfReader::new(f1.path()).unwrap();
        let r2 = TrVcfReader::new(f2.path()).unwrap();
        CompareEngine::new(config)
            .compare_sources(r1, r2, parallel)
            .unwrap()
    }

    #[test]
    fn test_overall_and_stratified() {
        let report = run(dp_config(StratifySource::Set1), false);

        let all = report.all_row().unwrap();
        assert_eq!(all.metrics.numcalls, 2);
        assert_eq!(all.metrics.concordance_seq, Some(0.5));
        assert_eq!(all.metrics.concordance_len, Some(0.5));
        // Two points with non-constant sides always correlate perfectly.
        assert!((all.metrics.r2.unwrap() - 1.0).abs() < 1e-12);

        let dp35 = report.overall_row("ALL", "DP", "30.0-40.0").unwrap();
        assert_eq!(dp35.metrics.numcalls, 1);
        assert_eq!(dp35.metrics.concordance_seq, Some(1.0));

        // DP=55 lies outside every bin but is still in ALL.
        let binned: u64 = report
            .overall
            .iter()
            .filter(|r| r.period == "ALL" && r.field == "DP")
            .map(|r| r.metrics.numcalls)
            .sum();
        assert_eq!(binned, 1);

        let period3 = report.overall_row("3", "ALL", "NA").unwrap();
        assert_eq!(period3.metrics.numcalls, 1);
        assert_eq!(period3.metrics.concordance_len, Some(0.0));
    }

    #[test]
    fn test_missing_samples_are_not_mismatches() {
        let report = run(CompareConfig::default(), false);
        let d = report.diagnostics;
        assert_eq!(d.loci_matched, 2);
        assert_eq!(d.loci_only_set2, 1);
        assert_eq!(d.pairs_compared, 2);
        assert_eq!(d.missing_set2, 2);
        assert_eq!(d.missing_set1, 2);
        assert_eq!(d.missing_calls, 4);
        assert_eq!(d.ploidy_mismatch, 0);
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].sample, "S1");
    }

    #[test]
    fn test_call_rows_and_bubble() {
        let report = run(CompareConfig::default(), false);
        assert_eq!(report.calls.len(), 2);
        let first = &report.calls[0];
        assert_eq!(first.gt1, "ACACACAC/ACACACACAC");
        assert_eq!(first.gt2, "ACACACACAC/ACACACAC");
        assert!(first.sequence_match);
        assert_eq!((first.length_diff1, first.length_diff2), (2, 2));

        let second = &report.calls[1];
        assert!(!second.length_match);
        assert_eq!((second.length_diff1, second.length_diff2), (0, -3));

        assert_eq!(report.bubble.get(2, 2, 2), 1);
        assert_eq!(report.bubble.get(3, 0, -3), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seq = run(dp_config(StratifySource::Both), false);
        let par = run(dp_config(StratifySource::Both), true);
        assert_eq!(seq, par);
    }

    #[test]
    fn test_unknown_field_rejected_before_reading() {
        let config = CompareConfig::default().with_stratify(
            StratifyConfig::from_specs(
                &["GQ".into()],
                &["0:100:10".into()],
                StratifySource::Both,
                CombineMode::Union,
            )
            .unwrap(),
        );
        let (f1, f2) = (set1_vcf(), set2_vcf());
        let err = CompareEngine::new(config)
            .compare_sources(
                TrVcfReader::new(f1.path()).unwrap(),
                TrVcfReader::new(f2.path()).unwrap(),
                false,
            )
            .unwrap_err();
        assert!(err.is_configuration());
    }
}

mod ordering {
    use trcompare_core::{CompareConfig, CompareEngine, CompareError};
    use trcompare_geno::{GenotypeCall, Locus, LocusCalls, MemorySource};

    fn lc(chrom: &str, start: u64) -> LocusCalls {
        LocusCalls::new(Locus::new(chrom, start, start + 3, 2, "ATAT"))
            .with_call("S1", GenotypeCall::from_sequences(["ATAT", "ATAT"]))
    }

    #[test]
    fn test_unsorted_input_is_fatal() {
        let s1 = MemorySource::new(vec!["S1".into()], vec![lc("chr1", 500), lc("chr1", 100)]);
        let s2 = MemorySource::new(vec!["S1".into()], vec![lc("chr1", 100), lc("chr1", 500)]);
        let err = CompareEngine::new(CompareConfig::default())
            .compare_sources(s1, s2, false)
            .unwrap_err();
        assert!(matches!(err, CompareError::UnsortedInput { .. }));
    }

    #[test]
    fn test_header_contig_order() {
        // chr10 before chr2, as declared.
        let contigs = vec!["chr10".to_string(), "chr2".to_string()];
        let loci = vec![lc("chr10", 5), lc("chr2", 5)];
        let s1 = MemorySource::new(vec!["S1".into()], loci.clone()).with_contigs(contigs.clone());
        let s2 = MemorySource::new(vec!["S1".into()], loci).with_contigs(contigs);
        let report = CompareEngine::new(CompareConfig::default())
            .compare_sources(s1, s2, true)
            .unwrap();
        assert_eq!(report.diagnostics.loci_matched, 2);
        assert_eq!(report.loci[0].chrom, "chr10");
    }
}

mod report_files {
    use super::*;
    use trcompare_core::report::{write_bubble, write_calls, write_loci, write_overall, write_samples};
    use trcompare_core::{CompareConfig, CompareEngine};
    use trcompare_geno::vcf::TrVcfReader;

    #[test]
    fn test_write_all_tables() {
        let (f1, f2) = (set1_vcf(), set2_vcf());
        let report = CompareEngine::new(CompareConfig::default())
            .compare_sources(
                TrVcfReader::new(f1.path()).unwrap(),
                TrVcfReader::new(f2.path()).unwrap(),
                false,
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("cmp");
        let path = |suffix: &str| format!("{}-{}.tab", prefix.display(), suffix);

        let mut f = std::fs::File::create(path("overall")).unwrap();
        write_overall(&mut f, &report.overall).unwrap();
        let mut f = std::fs::File::create(path("callcompare")).unwrap();
        write_calls(&mut f, &report.calls).unwrap();
        let mut f = std::fs::File::create(path("locuscompare")).unwrap();
        write_loci(&mut f, &report.loci).unwrap();
        let mut f = std::fs::File::create(path("samplecompare")).unwrap();
        write_samples(&mut f, &report.samples).unwrap();
        let mut f = std::fs::File::create(path("bubble")).unwrap();
        write_bubble(&mut f, &report.bubble).unwrap();

        let overall = std::fs::read_to_string(path("overall")).unwrap();
        let mut lines = overall.lines();
        assert!(lines.next().unwrap().starts_with("period\tfield\tbin"));
        assert_eq!(lines.next().unwrap(), "ALL\tALL\tNA\t0.5\t0.5\t1\t2");

        let loci = std::fs::read_to_string(path("locuscompare")).unwrap();
        // Single-call loci have no r2.
        assert_eq!(loci.lines().nth(1).unwrap(), "chr1\t100\t107\t2\t1\t1\tNA\t1");

        let calls = std::fs::read_to_string(path("callcompare")).unwrap();
        assert_eq!(calls.lines().count(), 3);
    }
}
