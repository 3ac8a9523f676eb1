pub mod catalog;
pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod duplicates;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod schema;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
    io_utils::OutputSink,
    report::ReportEngine,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("healthcare_csv", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Duplicates(args) => handle_duplicates(&args),
        Commands::Report(args) => handle_report(&args),
        Commands::Run(args) => handle_run(&args),
        Commands::Queries(args) => handle_queries(&args),
    }
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let pipeline::LoadedInput {
        mut store,
        config,
        delimiter,
    } = pipeline::load(&args.input)?;
    clean::clean(&mut store, &config);
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.output.as_deref(),
        args.output_delimiter,
        delimiter,
    );
    let encoding = io_utils::resolve_encoding(args.output.output_encoding.as_deref())?;
    ingest::write_records(
        store.records(),
        args.output.output.as_deref(),
        output_delimiter,
        encoding,
    )
}

fn handle_duplicates(args: &cli::DuplicatesArgs) -> Result<()> {
    let loaded = pipeline::load(&args.input)?;
    let groups = duplicates::find_duplicates(loaded.store.records()).collect::<Vec<_>>();
    let encoding = io_utils::resolve_encoding(args.output.output_encoding.as_deref())?;
    let mut sink = OutputSink::open(args.output.output.as_deref(), encoding)?;
    output::write_duplicates(&mut sink, &groups, args.format)?;
    sink.finish()?;
    let repeated: usize = groups.iter().map(|group| group.count).sum();
    info!(
        "Found {} duplicate group(s) covering {} of {} record(s)",
        groups.len(),
        repeated,
        loaded.store.len()
    );
    Ok(())
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let pipeline::LoadedInput {
        mut store, config, ..
    } = pipeline::load(&args.input)?;
    let queries = catalog::select(
        catalog::catalog(&config.reports),
        &args.queries,
        &args.sections,
    )?;
    if args.skip_clean {
        debug!("Skipping cleaning stage; reporting on records as loaded");
    } else {
        clean::clean(&mut store, &config);
    }
    let engine = ReportEngine::new(&store, &config.reports);
    let encoding = io_utils::resolve_encoding(args.output.output_encoding.as_deref())?;
    let mut sink = OutputSink::open(args.output.output.as_deref(), encoding)?;
    let written = output::write_reports(&mut sink, engine.run_all(&queries), args.format)
        .context("Writing reports")?;
    sink.finish()?;
    info!("Ran {} report(s) over {} record(s)", written, store.len());
    Ok(())
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let pipeline::LoadedInput {
        mut store,
        config,
        delimiter,
    } = pipeline::load(&args.input)?;
    let encoding = io_utils::resolve_encoding(args.output.output_encoding.as_deref())?;
    let mut sink = OutputSink::open(args.output.output.as_deref(), encoding)?;
    pipeline::run_pipeline(&mut store, &config, args.format, &mut sink)?;
    sink.finish()?;
    if let Some(path) = &args.cleaned {
        let cleaned_delimiter = io_utils::resolve_output_delimiter(Some(path), None, delimiter);
        ingest::write_records(store.records(), Some(path), cleaned_delimiter, encoding)
            .with_context(|| format!("Writing cleaned records to {path:?}"))?;
    }
    Ok(())
}

fn handle_queries(args: &cli::QueriesArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let queries = catalog::catalog(&config.reports);
    print!("{}", output::render_catalog(&queries));
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
