// src/qc_report.rs

use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::types::{AbundanceStatus, AbundanceSummary, QcBlock, QcReport, RunInfoMetrics, RunInfoStatus};

pub const RUN_INFO_FILE: &str = "run_info.json";
pub const ABUNDANCE_FILE: &str = "abundance.tsv";
/// Zero-based index of the TPM column in abundance.tsv
pub const TPM_COLUMN: usize = 4;

/// What the mean TPM is divided by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeanDenominator {
    /// Every row of the table, header included (the historical behaviour;
    /// biases the mean down by (n-1)/n).
    #[default]
    AllRows,
    /// Data rows only.
    DataRows,
}

#[derive(Debug, Deserialize)]
struct RunInfoFields {
    n_processed: Option<Box<RawValue>>,
    n_pseudoaligned: Option<Box<RawValue>>,
    p_pseudoaligned: Option<Box<RawValue>>,
}

/// The field exactly as written in the file; strings lose their quotes and
/// absent or null fields become "NA".
fn passthrough(v: Option<Box<RawValue>>) -> String {
    let Some(raw) = v else {
        return "NA".to_string();
    };
    let text = raw.get();
    if text.starts_with('"') {
        serde_json::from_str::<String>(text).unwrap_or_else(|_| text.to_string())
    } else {
        text.to_string()
    }
}

/// Extracts the three alignment counters from run_info.json text.
pub fn parse_run_info(text: &str) -> serde_json::Result<RunInfoMetrics> {
    let fields: RunInfoFields = serde_json::from_str(text)?;
    Ok(RunInfoMetrics {
        processed: passthrough(fields.n_processed),
        pseudoaligned: passthrough(fields.n_pseudoaligned),
        rate: passthrough(fields.p_pseudoaligned),
    })
}

fn read_run_info(path: &Path) -> RunInfoStatus {
    if !path.is_file() {
        return RunInfoStatus::Missing;
    }
    match fs::read_to_string(path) {
        Ok(text) => match parse_run_info(&text) {
            Ok(metrics) => RunInfoStatus::Present(metrics),
            Err(e) => RunInfoStatus::Unreadable(e.to_string()),
        },
        Err(e) => RunInfoStatus::Unreadable(e.to_string()),
    }
}

/// Reads a tab-separated abundance table (header row first).
///
/// Non-numeric or absent TPM cells count as 0.
pub fn summarize_abundance<R: Read>(reader: R, denominator: MeanDenominator) -> Result<AbundanceSummary, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut total_rows = 0usize;
    let mut quantified = 0usize;
    let mut tpm_sum = 0.0f64;

    for record in rdr.records() {
        let record = record?;
        let tpm = record
            .get(TPM_COLUMN)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        // row 0 is the header
        if total_rows > 0 && tpm > 0.0 {
            quantified += 1;
        }
        tpm_sum += tpm;
        total_rows += 1;
    }

    let divisor = match denominator {
        MeanDenominator::AllRows => total_rows,
        MeanDenominator::DataRows => total_rows.saturating_sub(1),
    };
    let mean_tpm = if divisor == 0 { 0.0 } else { tpm_sum / divisor as f64 };

    Ok(AbundanceSummary {
        total_rows,
        quantified,
        tpm_sum,
        mean_tpm,
    })
}

fn read_abundance(path: &Path, denominator: MeanDenominator) -> AbundanceStatus {
    if !path.is_file() {
        return AbundanceStatus::Missing;
    }
    let parsed = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|f| summarize_abundance(f, denominator).map_err(|e| e.to_string()));
    match parsed {
        Ok(summary) => AbundanceStatus::Present(summary),
        Err(e) => AbundanceStatus::Unreadable(e),
    }
}

/// Collects the QC block for one sample result directory.
pub fn inspect_sample(sample_dir: &Path, denominator: MeanDenominator) -> QcBlock {
    let sample_name = sample_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // The two checks are independent: a missing run_info.json does not stop
    // the abundance table from being read.
    QcBlock {
        sample_name,
        run_info: read_run_info(&sample_dir.join(RUN_INFO_FILE)),
        abundance: read_abundance(&sample_dir.join(ABUNDANCE_FILE), denominator),
    }
}

impl QcBlock {
    /// Plain-text block, ending with a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let name = &self.sample_name;

        writeln!(out, "Sample: {name}").unwrap();
        match &self.run_info {
            RunInfoStatus::Present(m) => {
                writeln!(out, "Total reads processed: {}", m.processed).unwrap();
                writeln!(out, "Reads pseudoaligned: {}", m.pseudoaligned).unwrap();
                writeln!(out, "Pseudoalignment rate: {}", m.rate).unwrap();
            }
            RunInfoStatus::Missing => {
                writeln!(out, "WARNING: {RUN_INFO_FILE} not found for sample {name}").unwrap();
            }
            RunInfoStatus::Unreadable(e) => {
                writeln!(out, "WARNING: {RUN_INFO_FILE} for sample {name} could not be read: {e}").unwrap();
            }
        }
        match &self.abundance {
            AbundanceStatus::Present(a) => {
                writeln!(out, "Transcripts with TPM > 0: {}", a.quantified).unwrap();
                writeln!(out, "Mean TPM: {:.4}", a.mean_tpm).unwrap();
            }
            AbundanceStatus::Missing => {
                writeln!(out, "WARNING: {ABUNDANCE_FILE} not found for sample {name}").unwrap();
            }
            AbundanceStatus::Unreadable(e) => {
                writeln!(out, "WARNING: {ABUNDANCE_FILE} for sample {name} could not be read: {e}").unwrap();
            }
        }
        out.push('\n');
        out
    }

    pub fn has_warnings(&self) -> bool {
        !matches!(self.run_info, RunInfoStatus::Present(_))
            || !matches!(self.abundance, AbundanceStatus::Present(_))
    }
}

pub const REPORT_TITLE: &str = "kallisto quantification QC report";

impl QcReport {
    pub fn render(&self) -> String {
        let mut out = format!("{REPORT_TITLE}\n\n");
        for block in &self.blocks {
            out.push_str(&block.render());
        }
        out
    }
}

/// Sample result directories under `quant_prefix`, sorted by name.
/// Log files and other plain files are ignored.
pub fn sample_dirs(quant_prefix: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(quant_prefix)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Scans every sample directory under `quant_prefix` and writes the report to
/// `report_path` one block at a time.
///
/// Missing or unreadable per-sample files become warning lines; only I/O
/// failures on the prefix or the report itself are returned as errors.
pub fn aggregate(quant_prefix: &Path, report_path: &Path, denominator: MeanDenominator) -> io::Result<QcReport> {
    let mut out = BufWriter::new(File::create(report_path)?);
    write!(out, "{REPORT_TITLE}\n\n")?;

    let mut report = QcReport::default();
    for dir in sample_dirs(quant_prefix)? {
        let block = inspect_sample(&dir, denominator);
        if block.has_warnings() {
            log::warn!("QC: incomplete results for sample {}", block.sample_name);
        }
        out.write_all(block.render().as_bytes())?;
        report.blocks.push(block);
    }
    out.flush()?;

    log::info!(
        "QC report with {} sample(s) written to {}",
        report.blocks.len(),
        report_path.display()
    );
    Ok(report)
}
