//! CLI entry point for the citegraph tool.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use citegraph_core::batch::{DEFAULT_CONCURRENCY, DEFAULT_DOCUMENT_TIMEOUT};
use citegraph_core::constants::DEFAULT_MAX_RANGE_SPAN;
use citegraph_core::{BatchProcessor, PipelineOptions, ScanOptions, collect_xml_files};
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod progress;

use cli::Args;
use config::{FileConfig, VerbositySetting, load_config};
use progress::spawn_progress_ui;

/// Settings after merging CLI flags over file config over defaults.
#[derive(Debug)]
struct RunSettings {
    concurrency: usize,
    document_timeout: Duration,
    max_range_span: u32,
    output: Option<PathBuf>,
}

impl RunSettings {
    fn merge(args: &Args, file: &FileConfig) -> Self {
        Self {
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .map_or(DEFAULT_CONCURRENCY, usize::from),
            document_timeout: args
                .timeout
                .or(file.document_timeout_secs)
                .map_or(DEFAULT_DOCUMENT_TIMEOUT, Duration::from_secs),
            max_range_span: args
                .max_range_span
                .or(file.max_range_span)
                .unwrap_or(DEFAULT_MAX_RANGE_SPAN),
            output: args.output.clone().or_else(|| file.output.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > default (info)
    let config_verbosity = file_config.verbosity.unwrap_or(VerbositySetting::Default);
    let quiet = args.quiet || (args.verbose == 0 && config_verbosity == VerbositySetting::Quiet);
    let verbose = if args.verbose > 0 {
        args.verbose
    } else {
        config_verbosity.verbose_count()
    };
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the JSON Lines output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, ?file_config, "CLI arguments parsed");

    let settings = RunSettings::merge(&args, &file_config);
    debug!(?settings, "effective settings");

    let mut files = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            files.extend(collect_xml_files(input)?);
        } else {
            files.push(input.clone());
        }
    }

    if files.is_empty() {
        info!("No XML documents found in the given inputs");
        return Ok(());
    }
    info!(documents = files.len(), "Starting citegraph");

    let processor = BatchProcessor::new(settings.concurrency, settings.document_timeout)?
        .with_options(PipelineOptions {
            scan: ScanOptions {
                max_range_span: settings.max_range_span,
            },
        });

    let use_spinner = !quiet && io::stderr().is_terminal();
    let (spinner, stop) = spawn_progress_ui(use_spinner, processor.progress(), files.len());

    let outcome = processor.process_paths(&files).await;

    stop.store(true, std::sync::atomic::Ordering::SeqCst);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }
    let outcome = outcome?;

    let mut writer: Box<dyn Write> = match &settings.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file '{}'", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for graph in &outcome.graphs {
        let line = graph
            .to_json()
            .with_context(|| format!("Failed to serialize graph for '{}'", graph.document_id))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;

    for failure in &outcome.failures {
        warn!(path = %failure.path.display(), error = %failure.error, "Skipped unreadable document");
    }

    if args.report {
        eprint!("{}", outcome.report.format_summary());
    }

    info!(
        documents = outcome.graphs.len(),
        unreadable = outcome.failures.len(),
        coverage = outcome.report.coverage(),
        "citegraph complete"
    );

    Ok(())
}
