use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::PipelineError;
use crate::fasta::MIN_SEQUENCE_LEN;
use crate::pipeline::{PipelineConfig, DEFAULT_INDEX_NAME, DEFAULT_QUANT_NAME, DEFAULT_WORKDIR};
use crate::qc_report::MeanDenominator;
use crate::quant::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::quant::DEFAULT_BOOTSTRAP;

#[derive(Debug, Parser)]
#[command(
    name = "pseudoquant-rs",
    version,
    about = "Clean a CDS reference, build a kallisto index, quantify paired-end samples and write a QC report"
)]
pub struct Args {
    #[arg(
        short = 'r',
        long = "reference",
        required = true,
        value_name = "PATH",
        help = "Reference coding sequences in FASTA format (.gz accepted)"
    )]
    pub reference: PathBuf,

    #[arg(
        short = 'k',
        long = "kmer-size",
        required = true,
        value_name = "K",
        help = "k-mer size for the index (odd, at most 31)"
    )]
    pub kmer_size: u32,

    #[arg(
        short = 't',
        long = "threads",
        required = true,
        value_name = "THREADS",
        help = "Threads passed to kallisto quant"
    )]
    pub threads: u32,

    #[arg(
        short = 'b',
        long = "bias",
        help = "Enable kallisto sequence-bias correction",
        action = ArgAction::SetTrue,
    )]
    pub bias: bool,

    #[arg(
        short = 'w',
        long = "workdir",
        value_name = "PATH",
        help = "Working directory for all outputs",
        default_value = DEFAULT_WORKDIR
    )]
    pub workdir: PathBuf,

    #[arg(
        long = "reads-dir",
        value_name = "PATH",
        help = "Directory holding <sample>_R1.fastq.gz / <sample>_R2.fastq.gz",
        default_value = "."
    )]
    pub reads_dir: PathBuf,

    #[arg(long = "index-name", value_name = "NAME", default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    #[arg(long = "quant-name", value_name = "NAME", default_value = DEFAULT_QUANT_NAME)]
    pub quant_name: String,

    #[arg(
        long = "kallisto",
        value_name = "PROGRAM",
        help = "kallisto executable",
        default_value = "kallisto"
    )]
    pub kallisto: OsString,

    #[arg(
        long = "max-attempts",
        value_name = "N",
        help = "kallisto quant attempts per sample",
        default_value_t = DEFAULT_MAX_ATTEMPTS
    )]
    pub max_attempts: u32,

    #[arg(
        long = "retry-delay",
        value_name = "SECONDS",
        help = "Pause between failed attempts",
        default_value_t = 5
    )]
    pub retry_delay: u64,

    #[arg(
        long = "bootstrap",
        value_name = "N",
        help = "Bootstrap samples for kallisto quant",
        default_value_t = DEFAULT_BOOTSTRAP
    )]
    pub bootstrap: u32,

    #[arg(
        long = "min-length",
        value_name = "NT",
        help = "Drop reference records shorter than this",
        default_value_t = MIN_SEQUENCE_LEN
    )]
    pub min_length: usize,

    #[arg(
        long = "mean-over-data-rows",
        help = "Divide mean TPM by the number of transcripts instead of all table rows",
        action = ArgAction::SetTrue,
    )]
    pub mean_over_data_rows: bool,
}

impl Args {
    /// Range checks that clap does not do; everything else is left to
    /// `PipelineConfig::validate`.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.max_attempts == 0 {
            return Err(PipelineError::Config("--max-attempts must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(PipelineError::Config("--threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.reference, self.kmer_size, self.threads);
        config.bias_correction = self.bias;
        config.workdir = self.workdir;
        config.reads_dir = self.reads_dir;
        config.index_name = self.index_name;
        config.quant_name = self.quant_name;
        config.kallisto = self.kallisto;
        config.retry = RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay));
        config.bootstrap = self.bootstrap;
        config.min_length = self.min_length;
        config.mean_denominator = if self.mean_over_data_rows {
            MeanDenominator::DataRows
        } else {
            MeanDenominator::AllRows
        };
        config
    }
}
