//! Orchestration shared by the command handlers: loading input with its
//! configuration, and the full duplicates → clean → report run.

use std::io::Write;

use anyhow::{Context, Result};
use log::info;
use serde_json::json;

use crate::{
    catalog,
    clean::{self, CleaningSummary},
    cli::{InputArgs, OutputFormat},
    config::PipelineConfig,
    duplicates::find_duplicates,
    ingest::{self, InputOptions},
    io_utils,
    output,
    record::RecordStore,
    report::ReportEngine,
};

pub struct LoadedInput {
    pub store: RecordStore,
    pub config: PipelineConfig,
    pub delimiter: u8,
}

pub fn load(args: &InputArgs) -> Result<LoadedInput> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Loading '{}' with delimiter '{}'",
        args.input.display(),
        crate::printable_delimiter(delimiter)
    );
    let options = InputOptions {
        delimiter,
        encoding,
        null_tokens: &config.null_tokens,
    };
    let store = ingest::load_records(&args.input, &options)
        .with_context(|| format!("Loading records from {:?}", args.input))?;
    Ok(LoadedInput {
        store,
        config,
        delimiter,
    })
}

/// Runs duplicate detection on the raw store, cleans it in place, then runs
/// every catalog report against the cleaned records.
pub fn run_pipeline<W: Write>(
    store: &mut RecordStore,
    config: &PipelineConfig,
    format: OutputFormat,
    out: &mut W,
) -> Result<CleaningSummary> {
    let groups = find_duplicates(store.records()).collect::<Vec<_>>();
    info!("Found {} duplicate admission group(s)", groups.len());
    let duplicates_json = match format {
        OutputFormat::Json => Some(output::duplicates_to_json(&groups)),
        other => {
            output::write_duplicates(out, &groups, other)?;
            None
        }
    };
    drop(groups);

    let summary = clean::clean(store, config);
    let queries = catalog::catalog(&config.reports);
    let engine = ReportEngine::new(store, &config.reports);

    match format {
        OutputFormat::Json => {
            let reports = engine
                .run_all(&queries)
                .map(|report| report.to_json())
                .collect::<Vec<_>>();
            let document = json!({
                "duplicates": duplicates_json,
                "cleaning": summary,
                "reports": reports,
            });
            serde_json::to_writer_pretty(&mut *out, &document)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            writeln!(out)?;
            writeln!(out, "{}", output::render_summary_table(&summary))?;
            output::write_reports(out, engine.run_all(&queries), format)?;
        }
        OutputFormat::Csv => {
            output::write_reports(out, engine.run_all(&queries), format)?;
        }
    }
    info!("Ran {} report(s)", queries.len());
    Ok(summary)
}
