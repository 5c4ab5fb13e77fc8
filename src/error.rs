//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Conditions that halt the pipeline.
///
/// Per-sample problems (missing mate file, exhausted retries) and missing QC
/// artifacts are recovered locally and never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad or inconsistent configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A required external program could not be launched.
    #[error("required tool `{tool}` is not available: {reason}")]
    MissingTool { tool: String, reason: String },

    /// `kallisto index` failed or left no index behind.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// The quantification loop finished without a single successful sample.
    #[error("no samples were successfully quantified under {}", .0.display())]
    NoSamplesProcessed(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
