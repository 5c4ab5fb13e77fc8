use clap::Parser;
use env_logger::{Env, Target};
use indicatif::{ProgressBar, ProgressStyle};

use pseudoquant_rs::cli::Args;
use pseudoquant_rs::types::SampleOutcome;
use pseudoquant_rs::{Pipeline, PipelineError, SystemRunner};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(TICKS)
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner
}

fn run(args: Args) -> Result<(), PipelineError> {
    let pipeline = Pipeline::new(args.into_config(), SystemRunner);

    pipeline.preflight()?;
    pipeline.prepare_workdir()?;

    // 1. Clean reference
    let sp = spinner("blue", "Cleaning reference sequences...");
    let stats = pipeline.clean_reference()?;
    sp.finish_with_message(format!(
        "Reference cleaned: {} kept, {} discarded.",
        stats.records_kept, stats.records_discarded
    ));

    // 2. Index
    let sp = spinner("green", "Building kallisto index...");
    let index = pipeline.build_index()?;
    sp.finish_with_message(format!("Index built: {}", index.path.display()));

    // 3. Quantify
    let units = pipeline.discover_samples()?;
    let bar = ProgressBar::new(units.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{bar:40.yellow} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    let outcomes = pipeline.quantify_all_with(&index, &units, |outcome| {
        let status = match outcome {
            SampleOutcome::Succeeded { .. } => "ok",
            SampleOutcome::Failed { .. } => "failed",
            SampleOutcome::Skipped { .. } => "skipped",
        };
        bar.set_message(format!("{}: {status}", outcome.sample_name()));
        bar.inc(1);
    });
    bar.finish();
    let succeeded = pipeline.ensure_samples_processed(&outcomes)?;

    // 4. QC report
    let sp = spinner("cyan", "Writing QC report...");
    let report = pipeline.aggregate_qc()?;
    sp.finish_with_message(format!(
        "QC report for {} sample(s): {}",
        report.blocks.len(),
        pipeline.layout().qc_report.display()
    ));

    log::info!("All done: {succeeded}/{} sample(s) quantified", units.len());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();

    let args = Args::parse();
    if let Err(e) = args.check().and_then(|_| run(args)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
