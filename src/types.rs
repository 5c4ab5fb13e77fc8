//src/types.rs

use std::path::PathBuf;

/// One reference entry as it is written to the cleaned FASTA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub header: Vec<u8>,   // full header line as read, including the leading '>'
    pub sequence: Vec<u8>, // only A, T, G, C, N
}

/// Counters collected while cleaning a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub records_seen: usize,
    pub records_kept: usize,
    pub records_discarded: usize,
    /// Bytes rewritten to `N`, counted over every record (kept or not)
    pub chars_replaced: usize,
    /// Sequence lines found before the first header
    pub orphan_lines: usize,
}

/// A paired-end sample: `<name>_R1.fastq.gz` + `<name>_R2.fastq.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleUnit {
    pub sample_name: String,
    pub read_file1: PathBuf,
    pub read_file2: PathBuf,
}

/// One invocation of `kallisto quant` for a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantificationAttempt {
    pub attempt_number: u32,
    /// `None` when the process could not be launched or was killed by a signal
    pub exit_code: Option<i32>,
    pub log_path: PathBuf,
}

impl QuantificationAttempt {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Terminal per-sample state of the quantification stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Succeeded {
        sample_name: String,
        output_dir: PathBuf,
        attempts: Vec<QuantificationAttempt>,
    },
    /// Every attempt failed; `log_path` holds the output of the last one.
    Failed {
        sample_name: String,
        log_path: PathBuf,
        attempts: Vec<QuantificationAttempt>,
    },
    /// The partner read file was not found; kallisto was never invoked.
    Skipped {
        sample_name: String,
        missing: PathBuf,
    },
}

impl SampleOutcome {
    pub fn sample_name(&self) -> &str {
        match self {
            SampleOutcome::Succeeded { sample_name, .. }
            | SampleOutcome::Failed { sample_name, .. }
            | SampleOutcome::Skipped { sample_name, .. } => sample_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SampleOutcome::Succeeded { .. })
    }

    /// Number of times kallisto was invoked for this sample.
    pub fn invocations(&self) -> usize {
        match self {
            SampleOutcome::Succeeded { attempts, .. } | SampleOutcome::Failed { attempts, .. } => {
                attempts.len()
            }
            SampleOutcome::Skipped { .. } => 0,
        }
    }
}

/// Values taken verbatim from a sample's `run_info.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfoMetrics {
    pub processed: String,
    pub pseudoaligned: String,
    pub rate: String,
}

/// Summary of a sample's `abundance.tsv`.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceSummary {
    /// Every row read from the table, header included
    pub total_rows: usize,
    /// Data rows with TPM strictly greater than 0
    pub quantified: usize,
    pub tpm_sum: f64,
    pub mean_tpm: f64,
}

/// What the QC stage found for one sample directory.
#[derive(Debug, Clone, PartialEq)]
pub enum RunInfoStatus {
    Present(RunInfoMetrics),
    Missing,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbundanceStatus {
    Present(AbundanceSummary),
    Missing,
    Unreadable(String),
}

/// One block of the QC report.
#[derive(Debug, Clone, PartialEq)]
pub struct QcBlock {
    pub sample_name: String,
    pub run_info: RunInfoStatus,
    pub abundance: AbundanceStatus,
}

/// Ordered QC blocks, one per sample result directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcReport {
    pub blocks: Vec<QcBlock>,
}
