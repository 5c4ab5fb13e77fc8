//src/pipeline.rs

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use crate::command::{check_tool, CommandRunner};
use crate::error::{PipelineError, Result};
use crate::fasta::{SequenceCleaner, MIN_SEQUENCE_LEN};
use crate::index::{build_index, IndexArtifact};
use crate::layout::Layout;
use crate::qc_report::{aggregate, MeanDenominator};
use crate::quant::retry::RetryPolicy;
use crate::quant::{count_succeeded, log_summary, QuantSettings, SampleQuantifier, DEFAULT_BOOTSTRAP};
use crate::samples::discover_samples;
use crate::types::{CleanStats, QcReport, SampleOutcome, SampleUnit};

pub const DEFAULT_WORKDIR: &str = "kallisto_output";
pub const DEFAULT_INDEX_NAME: &str = "transcriptome_index";
pub const DEFAULT_QUANT_NAME: &str = "quant_results";
pub const MAX_KMER_SIZE: u32 = 31;

/// Everything the four stages need.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reference: PathBuf,
    pub kmer_size: u32,
    pub threads: u32,
    pub bias_correction: bool,
    pub workdir: PathBuf,
    /// Directory scanned for `<sample>_R1.fastq.gz` / `<sample>_R2.fastq.gz`
    pub reads_dir: PathBuf,
    pub index_name: String,
    pub quant_name: String,
    pub kallisto: OsString,
    pub retry: RetryPolicy,
    pub bootstrap: u32,
    pub min_length: usize,
    pub mean_denominator: MeanDenominator,
}

impl PipelineConfig {
    pub fn new<P: Into<PathBuf>>(reference: P, kmer_size: u32, threads: u32) -> Self {
        Self {
            reference: reference.into(),
            kmer_size,
            threads,
            bias_correction: false,
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            reads_dir: PathBuf::from("."),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            quant_name: DEFAULT_QUANT_NAME.to_string(),
            kallisto: OsString::from("kallisto"),
            retry: RetryPolicy::default(),
            bootstrap: DEFAULT_BOOTSTRAP,
            min_length: MIN_SEQUENCE_LEN,
            mean_denominator: MeanDenominator::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 || self.kmer_size > MAX_KMER_SIZE || self.kmer_size % 2 == 0 {
            return Err(PipelineError::Config(format!(
                "k-mer size must be an odd number between 1 and {MAX_KMER_SIZE}, got {}",
                self.kmer_size
            )));
        }
        if self.threads == 0 {
            return Err(PipelineError::Config("thread count must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::Config("max attempts must be at least 1".into()));
        }
        if !self.reference.is_file() {
            return Err(PipelineError::Config(format!(
                "reference file {} does not exist",
                self.reference.display()
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> Layout {
        Layout::new(
            &self.workdir,
            &self.reference,
            &self.index_name,
            &self.quant_name,
            self.kmer_size,
        )
    }

    pub fn quant_settings(&self) -> QuantSettings {
        QuantSettings {
            kallisto: self.kallisto.clone(),
            threads: self.threads,
            bias_correction: self.bias_correction,
            bootstrap: self.bootstrap,
            retry: self.retry,
        }
    }
}

/// Results of a complete run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub clean_stats: CleanStats,
    pub index: IndexArtifact,
    pub outcomes: Vec<SampleOutcome>,
    pub succeeded: usize,
    pub report: QcReport,
    pub report_path: PathBuf,
}

/// Clean -> index -> quantify -> QC, strictly in that order.
pub struct Pipeline<R: CommandRunner> {
    config: PipelineConfig,
    layout: Layout,
    settings: QuantSettings,
    runner: R,
}

impl<R: CommandRunner> Pipeline<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        let layout = config.layout();
        let settings = config.quant_settings();
        Self {
            config,
            layout,
            settings,
            runner,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Validates the configuration and checks that kallisto runs. Runs before any stage.
    pub fn preflight(&self) -> Result<()> {
        self.config.validate()?;
        check_tool(&self.runner, &self.config.kallisto)
    }

    pub fn prepare_workdir(&self) -> Result<()> {
        fs::create_dir_all(&self.layout.workdir)?;
        fs::create_dir_all(&self.layout.quant_prefix)?;
        Ok(())
    }

    /// Step 1.
    pub fn clean_reference(&self) -> Result<CleanStats> {
        log::info!(
            "Step 1: cleaning {} -> {}",
            self.config.reference.display(),
            self.layout.cleaned_reference.display()
        );
        let stats = SequenceCleaner::new(self.config.min_length)
            .clean_file(&self.config.reference, &self.layout.cleaned_reference)?;
        Ok(stats)
    }

    /// Step 2.
    pub fn build_index(&self) -> Result<IndexArtifact> {
        log::info!("Step 2: building kallisto index");
        build_index(
            &self.runner,
            &self.config.kallisto,
            &self.layout.cleaned_reference,
            &self.layout.index,
            self.config.kmer_size,
            &self.layout.index_log,
        )
    }

    pub fn discover_samples(&self) -> Result<Vec<SampleUnit>> {
        Ok(discover_samples(&self.config.reads_dir)?)
    }

    /// Step 3. Individual sample failures are recorded, not returned.
    pub fn quantify_all_with<F>(&self, index: &IndexArtifact, units: &[SampleUnit], on_outcome: F) -> Vec<SampleOutcome>
    where
        F: FnMut(&SampleOutcome),
    {
        log::info!("Step 3: quantifying {} sample(s)", units.len());
        let quantifier = SampleQuantifier::new(&self.runner, &self.settings, &self.layout);
        let outcomes = quantifier.quantify_all_with(index, units, on_outcome);
        log_summary(&outcomes);
        outcomes
    }

    /// Fails with `NoSamplesProcessed` unless at least one sample succeeded.
    pub fn ensure_samples_processed(&self, outcomes: &[SampleOutcome]) -> Result<usize> {
        match count_succeeded(outcomes) {
            0 => Err(PipelineError::NoSamplesProcessed(self.layout.quant_prefix.clone())),
            n => Ok(n),
        }
    }

    /// Step 4.
    pub fn aggregate_qc(&self) -> Result<QcReport> {
        log::info!("Step 4: writing QC report to {}", self.layout.qc_report.display());
        Ok(aggregate(
            &self.layout.quant_prefix,
            &self.layout.qc_report,
            self.config.mean_denominator,
        )?)
    }

    pub fn run(&self) -> Result<PipelineSummary> {
        self.run_with(|_| {})
    }

    /// Full run; `on_outcome` is called after each sample's terminal state.
    pub fn run_with<F>(&self, on_outcome: F) -> Result<PipelineSummary>
    where
        F: FnMut(&SampleOutcome),
    {
        self.preflight()?;
        self.prepare_workdir()?;

        let clean_stats = self.clean_reference()?;
        let index = self.build_index()?;
        let units = self.discover_samples()?;
        let outcomes = self.quantify_all_with(&index, &units, on_outcome);
        let succeeded = self.ensure_samples_processed(&outcomes)?;
        let report = self.aggregate_qc()?;

        log::info!("Pipeline finished: {succeeded}/{} sample(s) quantified", units.len());
        Ok(PipelineSummary {
            clean_stats,
            index,
            outcomes,
            succeeded,
            report,
            report_path: self.layout.qc_report.clone(),
        })
    }
}
