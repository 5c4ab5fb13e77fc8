// src/lib.rs
//! Batch paired-end RNA-Seq quantification around kallisto.
//!
//! Four strictly sequential stages:
//! 1. clean the coding-sequence reference ([`fasta`]),
//! 2. build the kallisto index ([`index`]),
//! 3. quantify every `<sample>_R1/_R2.fastq.gz` pair with bounded retries ([`quant`]),
//! 4. summarize every result directory into one QC report ([`qc_report`]).
//!
//! [`pipeline::Pipeline`] drives them; [`command::CommandRunner`] is the only
//! place that touches external processes.
pub mod cli;
pub mod command;
pub mod error;
pub mod fasta;
pub mod index;
pub mod layout;
pub mod pipeline;
pub mod qc_report;
pub mod quant;
pub mod samples;
pub mod types;

pub use command::{CommandRunner, SystemRunner};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineConfig, PipelineSummary};
