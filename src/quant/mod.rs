pub mod retry;

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::command::{CommandRunner, Invocation};
use crate::index::IndexArtifact;
use crate::layout::Layout;
use crate::types::{QuantificationAttempt, SampleOutcome, SampleUnit};
use retry::{AttemptState, RetryPolicy};

pub const DEFAULT_BOOTSTRAP: u32 = 100;

/// Parameters forwarded to every `kallisto quant` call.
#[derive(Debug, Clone)]
pub struct QuantSettings {
    pub kallisto: OsString,
    pub threads: u32,
    pub bias_correction: bool,
    pub bootstrap: u32,
    pub retry: RetryPolicy,
}

impl Default for QuantSettings {
    fn default() -> Self {
        Self {
            kallisto: OsString::from("kallisto"),
            threads: 1,
            bias_correction: false,
            bootstrap: DEFAULT_BOOTSTRAP,
            retry: RetryPolicy::default(),
        }
    }
}

/// `kallisto quant -i <index> -o <out> -t <threads> [--bias] -b <n> <R1> <R2>`
pub fn quant_invocation(settings: &QuantSettings, index: &Path, out_dir: &Path, unit: &SampleUnit) -> Invocation {
    let mut inv = Invocation::new(&settings.kallisto)
        .arg("quant")
        .arg("-i")
        .arg(index)
        .arg("-o")
        .arg(out_dir)
        .arg("-t")
        .arg(settings.threads.to_string());
    if settings.bias_correction {
        inv = inv.arg("--bias");
    }
    inv.arg("-b")
        .arg(settings.bootstrap.to_string())
        .arg(&unit.read_file1)
        .arg(&unit.read_file2)
}

/// Runs kallisto over samples one at a time, each under the retry policy.
pub struct SampleQuantifier<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    settings: &'a QuantSettings,
    layout: &'a Layout,
}

impl<'a, R: CommandRunner + ?Sized> SampleQuantifier<'a, R> {
    pub fn new(runner: &'a R, settings: &'a QuantSettings, layout: &'a Layout) -> Self {
        Self { runner, settings, layout }
    }

    /// Quantifies one sample. Never fails the pipeline: problems end up in
    /// the returned outcome.
    pub fn quantify_sample(&self, index: &IndexArtifact, unit: &SampleUnit) -> SampleOutcome {
        let name = unit.sample_name.as_str();

        if let Some(missing) = unit.missing_file() {
            log::warn!(
                "Skipping sample {name}: paired read file {} not found",
                missing.display()
            );
            return SampleOutcome::Skipped {
                sample_name: name.to_string(),
                missing: missing.clone(),
            };
        }

        let out_dir = self.layout.sample_dir(name);
        let log_path = self.layout.sample_log(name);
        let invocation = quant_invocation(self.settings, &index.path, &out_dir, unit);
        log::info!("Quantifying sample {name}");

        let mut attempts = Vec::new();
        let state = self.settings.retry.run(name, |n| {
            log::debug!("{name}: attempt {n}: {invocation}");
            // The log file is truncated on each attempt.
            let exit_code = match self.runner.run(&invocation, Some(&log_path)) {
                Ok(status) => status.code,
                Err(e) => {
                    log::warn!("{name}: could not launch `{invocation}`: {e}");
                    None
                }
            };
            let attempt = QuantificationAttempt {
                attempt_number: n,
                exit_code,
                log_path: log_path.clone(),
            };
            let ok = attempt.succeeded();
            attempts.push(attempt);
            ok
        });

        match state {
            AttemptState::Succeeded(n) => {
                log::info!("Sample {name} quantified (attempt {n})");
                SampleOutcome::Succeeded {
                    sample_name: name.to_string(),
                    output_dir: out_dir,
                    attempts,
                }
            }
            _ => {
                log::error!(
                    "Sample {name} failed after {} attempt(s); see {}",
                    attempts.len(),
                    log_path.display()
                );
                // A failed sample leaves no result directory behind.
                if out_dir.exists() {
                    if let Err(e) = fs::remove_dir_all(&out_dir) {
                        log::warn!("Could not remove partial output {}: {e}", out_dir.display());
                    }
                }
                SampleOutcome::Failed {
                    sample_name: name.to_string(),
                    log_path,
                    attempts,
                }
            }
        }
    }

    /// Quantifies every unit in order, calling `on_outcome` after each one.
    pub fn quantify_all_with<F>(&self, index: &IndexArtifact, units: &[SampleUnit], mut on_outcome: F) -> Vec<SampleOutcome>
    where
        F: FnMut(&SampleOutcome),
    {
        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            let outcome = self.quantify_sample(index, unit);
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    pub fn quantify_all(&self, index: &IndexArtifact, units: &[SampleUnit]) -> Vec<SampleOutcome> {
        self.quantify_all_with(index, units, |_| {})
    }
}

pub fn count_succeeded(outcomes: &[SampleOutcome]) -> usize {
    outcomes.iter().filter(|o| o.is_success()).count()
}

/// Logs the end-of-loop tally, citing the log of every failed sample.
pub fn log_summary(outcomes: &[SampleOutcome]) {
    let succeeded = count_succeeded(outcomes);
    let mut failed = 0;
    let mut skipped = 0;
    for outcome in outcomes {
        match outcome {
            SampleOutcome::Failed { sample_name, log_path, .. } => {
                failed += 1;
                log::warn!("  failed:  {sample_name} (log: {})", log_path.display());
            }
            SampleOutcome::Skipped { sample_name, missing } => {
                skipped += 1;
                log::warn!("  skipped: {sample_name} (missing {})", missing.display());
            }
            SampleOutcome::Succeeded { .. } => {}
        }
    }
    log::info!(
        "Quantification finished: {succeeded} succeeded, {failed} failed, {skipped} skipped"
    );
}
