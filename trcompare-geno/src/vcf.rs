//! Generic tandem-repeat VCF reader.
//!
//! Streams records from plain or gzipped VCF text. Each record becomes one
//! [`LocusCalls`] group:
//! - period from INFO `PERIOD`, else the length of `RU`, else of `MOTIF`
//! - end from INFO `END`, else POS + len(REF) - 1
//! - GT indices decoded against REF/ALT into allele sequences
//! - requested FORMAT fields parsed as f64
//!
//! Tool-specific decoding (repeat lengths reported apart from sequences,
//! per-tool quality models) is out of scope here.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::record::{GenotypeCall, Locus, LocusCalls};
use crate::traits::CallSource;

/// Streaming reader for tandem-repeat VCF files.
pub struct TrVcfReader {
    path: PathBuf,
    reader: BufReader<Box<dyn Read + Send>>,
    sample_ids: Vec<String>,
    contigs: Vec<String>,
    /// Numeric (Integer/Float) FORMAT fields declared in the header.
    format_fields: Vec<String>,
    requested: Vec<String>,
    expected_ploidy: Option<usize>,
    line_no: usize,
    line: String,
    n_ploidy_discarded: usize,
}

/// Open a file for reading, transparently decompressing `.gz`.
pub fn open_text_reader(path: &Path) -> Result<BufReader<Box<dyn Read + Send>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let inner: Box<dyn Read + Send> = if is_gzipped {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::new(inner))
}

impl TrVcfReader {
    /// Open a VCF file and parse its header.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = open_text_reader(&path)?;
        let mut vcf = Self {
            path,
            reader,
            sample_ids: Vec::new(),
            contigs: Vec::new(),
            format_fields: Vec::new(),
            requested: Vec::new(),
            expected_ploidy: None,
            line_no: 0,
            line: String::new(),
            n_ploidy_discarded: 0,
        };
        vcf.read_header()?;
        Ok(vcf)
    }

    /// Calls whose allele count differs from `ploidy` are marked missing.
    pub fn set_expected_ploidy(&mut self, ploidy: Option<usize>) {
        self.expected_ploidy = ploidy;
    }

    /// Number of calls discarded for not matching the expected ploidy.
    pub fn n_ploidy_discarded(&self) -> usize {
        self.n_ploidy_discarded
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if n == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = self.line.trim_end_matches(['\n', '\r']).len();
        self.line.truncate(trimmed);
        Ok(true)
    }

    fn read_header(&mut self) -> Result<()> {
        loop {
            if !self.read_line()? {
                bail!("{}: missing #CHROM header line", self.path.display());
            }
            if let Some(meta) = self.line.strip_prefix("##") {
                if let Some(body) = meta.strip_prefix("contig=<") {
                    if let Some(id) = header_attr(body, "ID") {
                        self.contigs.push(id.to_string());
                    }
                } else if let Some(body) = meta.strip_prefix("FORMAT=<") {
                    let numeric = matches!(header_attr(body, "Type"), Some("Integer") | Some("Float"));
                    if let (true, Some(id)) = (numeric, header_attr(body, "ID")) {
                        self.format_fields.push(id.to_string());
                    }
                }
                continue;
            }
            if self.line.starts_with('#') {
                let fields: Vec<&str> = self.line.split('\t').collect();
                if fields.len() > 9 {
                    self.sample_ids = fields[9..].iter().map(|s| s.to_string()).collect();
                }
                return Ok(());
            }
            bail!(
                "{}:{}: record found before #CHROM header line",
                self.path.display(),
                self.line_no
            );
        }
    }

    fn parse_record(&mut self) -> Result<LocusCalls> {
        let fields: Vec<&str> = self.line.split('\t').collect();
        if fields.len() < 8 {
            bail!("VCF record has {} fields, expected at least 8", fields.len());
        }
        let chrom = fields[0];
        let start: u64 = fields[1]
            .parse()
            .with_context(|| format!("Invalid POS '{}'", fields[1]))?;
        let ref_allele = fields[3];
        let alts: Vec<&str> = if fields[4] == "." {
            Vec::new()
        } else {
            fields[4].split(',').collect()
        };

        let info = parse_info(fields[7]);
        let period = record_period(&info)
            .with_context(|| format!("Cannot determine repeat period at {}:{}", chrom, start))?;
        let end = match info.get("END") {
            Some(Some(v)) => v
                .parse::<u64>()
                .with_context(|| format!("Invalid INFO/END '{}'", v))?,
            _ => start + (ref_allele.len() as u64).saturating_sub(1),
        };

        let mut lc = LocusCalls::new(Locus::new(chrom, start, end, period, ref_allele));
        if fields.len() < 10 {
            return Ok(lc);
        }
        if fields.len() - 9 != self.sample_ids.len() {
            bail!(
                "Record at {}:{} has {} sample columns, header declares {}",
                chrom,
                start,
                fields.len() - 9,
                self.sample_ids.len()
            );
        }

        let format_keys: Vec<&str> = fields[8].split(':').collect();
        let gt_idx = format_keys.iter().position(|&k| k == "GT");
        let requested_idx: Vec<(&str, Option<usize>)> = self
            .requested
            .iter()
            .map(|r| (r.as_str(), format_keys.iter().position(|k| *k == r.as_str())))
            .collect();

        for (sample, column) in self.sample_ids.iter().zip(&fields[9..]) {
            let values: Vec<&str> = column.split(':').collect();
            let gt = gt_idx.and_then(|i| values.get(i)).copied().unwrap_or(".");
            let mut call = match decode_gt(gt, ref_allele, &alts)
                .with_context(|| format!("Bad GT '{}' for {} at {}:{}", gt, sample, chrom, start))?
            {
                Some(seqs) => GenotypeCall::from_sequences(seqs),
                None => GenotypeCall::missing(),
            };
            if let Some(ploidy) = self.expected_ploidy {
                if call.conform_to_ploidy(ploidy) {
                    self.n_ploidy_discarded += 1;
                    debug!(
                        "{}: {} at {}:{} does not have ploidy {}, marking missing",
                        self.path.display(),
                        sample,
                        chrom,
                        start,
                        ploidy
                    );
                }
            }
            for &(name, idx) in &requested_idx {
                if let Some(v) = idx.and_then(|i| values.get(i)).and_then(|v| parse_numeric(v)) {
                    call.annotations.insert(name.to_string(), v);
                }
            }
            lc.push(sample.clone(), call);
        }
        Ok(lc)
    }
}

impl CallSource for TrVcfReader {
    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn contigs(&self) -> &[String] {
        &self.contigs
    }

    fn annotation_fields(&self) -> &[String] {
        &self.format_fields
    }

    fn set_requested_fields(&mut self, fields: &[String]) -> Result<()> {
        for f in fields {
            if !self.format_fields.contains(f) {
                bail!(
                    "{}: field '{}' is not a numeric FORMAT field in the header",
                    self.path.display(),
                    f
                );
            }
        }
        self.requested = fields.to_vec();
        Ok(())
    }

    fn next_locus(&mut self) -> Result<Option<LocusCalls>> {
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if self.line.is_empty() {
                continue;
            }
            let line_no = self.line_no;
            let lc = self
                .parse_record()
                .with_context(|| format!("{}:{}", self.path.display(), line_no))?;
            return Ok(Some(lc));
        }
    }
}

/// Extract `KEY=value` from the body of a structured header line.
fn header_attr<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let body = body.strip_suffix('>').unwrap_or(body);
    body.split(',').find_map(|kv| {
        let (k, v) = kv.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn parse_info(info: &str) -> HashMap<&str, Option<&str>> {
    if info == "." {
        return HashMap::new();
    }
    info.split(';')
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (kv, None),
        })
        .collect()
}

fn record_period(info: &HashMap<&str, Option<&str>>) -> Result<u32> {
    if let Some(Some(p)) = info.get("PERIOD") {
        return p.parse().with_context(|| format!("Invalid INFO/PERIOD '{}'", p));
    }
    for key in ["RU", "MOTIF"] {
        if let Some(Some(motif)) = info.get(key) {
            let first = motif.split(',').next().unwrap_or_default();
            if !first.is_empty() {
                return Ok(first.len() as u32);
            }
        }
    }
    bail!("no PERIOD, RU or MOTIF INFO field")
}

/// Decode a GT string into allele sequences. `None` for a (partial) no-call.
fn decode_gt(gt: &str, ref_allele: &str, alts: &[&str]) -> Result<Option<Vec<String>>> {
    if gt.is_empty() || gt == "." {
        return Ok(None);
    }
    let mut seqs = Vec::with_capacity(2);
    for idx in gt.split(['/', '|']) {
        if idx == "." {
            return Ok(None);
        }
        let idx: usize = idx.parse().with_context(|| format!("Invalid allele index '{}'", idx))?;
        let allele = if idx == 0 {
            ref_allele
        } else {
            match alts.get(idx - 1) {
                Some(a) => *a,
                None => bail!("Allele index {} out of range ({} ALT alleles)", idx, alts.len()),
            }
        };
        if allele.starts_with('<') || allele == "*" {
            bail!("Symbolic allele '{}' cannot be compared by sequence", allele);
        }
        seqs.push(allele.to_string());
    }
    Ok(Some(seqs))
}

fn parse_numeric(v: &str) -> Option<f64> {
    let first = v.split(',').next()?;
    if first == "." {
        return None;
    }
    first.parse::<f64>().ok().filter(|x| x.is_finite())
}
