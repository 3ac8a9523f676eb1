//! Rendering of reports, duplicate groups, and cleaning summaries as text
//! tables, CSV, or JSON.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue, json};

use crate::{
    clean::CleaningSummary,
    cli::OutputFormat,
    duplicates::{DuplicateGroup, duplicate_headers},
    report::{QuerySpec, Report},
    table::{self, Align},
};

fn report_alignments(report: &Report) -> Vec<Align> {
    (0..report.columns.len())
        .map(|idx| {
            if idx < report.key_columns {
                Align::Left
            } else {
                Align::Right
            }
        })
        .collect()
}

pub fn render_report_table(report: &Report) -> String {
    let mut rendered = format!("== {} ({}) ==\n", report.title, report.name);
    rendered.push_str(&table::render_aligned(
        &report.columns,
        &report.string_rows(),
        &report_alignments(report),
    ));
    rendered
}

/// Writes reports as they are pulled from `reports`; returns how many were written.
pub fn write_reports<W, I>(out: &mut W, reports: I, format: OutputFormat) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Report>,
{
    let mut written = 0usize;
    match format {
        OutputFormat::Table => {
            for report in reports {
                if written > 0 {
                    writeln!(out)?;
                }
                write!(out, "{}", render_report_table(&report))?;
                written += 1;
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(&mut *out);
            for report in reports {
                writer.write_record(
                    std::iter::once("report".to_string()).chain(report.columns.iter().cloned()),
                )?;
                for row in report.string_rows() {
                    writer.write_record(std::iter::once(report.name.to_string()).chain(row))?;
                }
                written += 1;
            }
            writer.flush().context("Flushing CSV report output")?;
        }
        OutputFormat::Json => {
            let documents = reports
                .into_iter()
                .map(|report| report.to_json())
                .collect::<Vec<_>>();
            written = documents.len();
            serde_json::to_writer_pretty(&mut *out, &documents)?;
            writeln!(out)?;
        }
    }
    Ok(written)
}

pub fn duplicates_to_json(groups: &[DuplicateGroup<'_>]) -> JsonValue {
    let headers = duplicate_headers();
    let rows = groups
        .iter()
        .map(|group| {
            let mut object = Map::new();
            for (header, cell) in headers.iter().zip(group.to_row()) {
                object.insert(header.clone(), json!(cell));
            }
            object.insert("Occurrences".to_string(), json!(group.count));
            JsonValue::Object(object)
        })
        .collect::<Vec<_>>();
    JsonValue::Array(rows)
}

pub fn write_duplicates<W: Write>(
    out: &mut W,
    groups: &[DuplicateGroup<'_>],
    format: OutputFormat,
) -> Result<()> {
    let headers = duplicate_headers();
    let rows = groups.iter().map(DuplicateGroup::to_row).collect::<Vec<_>>();
    match format {
        OutputFormat::Table => {
            writeln!(out, "== Duplicate admissions ({} group(s)) ==", groups.len())?;
            let mut alignments = vec![Align::Left; headers.len()];
            if let Some(last) = alignments.last_mut() {
                *last = Align::Right;
            }
            write!(out, "{}", table::render_aligned(&headers, &rows, &alignments))?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            writer.write_record(&headers)?;
            for row in &rows {
                writer.write_record(row)?;
            }
            writer.flush().context("Flushing CSV duplicate output")?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &duplicates_to_json(groups))?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn render_summary_table(summary: &CleaningSummary) -> String {
    let headers = vec!["step".to_string(), "records changed".to_string()];
    let mut rows = summary
        .steps
        .iter()
        .map(|outcome| vec![outcome.step.to_string(), outcome.changed.to_string()])
        .collect::<Vec<_>>();
    rows.push(vec![
        "inverted-stays (not modified)".to_string(),
        summary.inverted_stays.to_string(),
    ]);
    format!(
        "== Cleaning summary ({} record(s), store version {}) ==\n{}",
        summary.records,
        summary.version,
        table::render_aligned(&headers, &rows, &[Align::Left, Align::Right])
    )
}

pub fn render_catalog(queries: &[QuerySpec]) -> String {
    let headers = ["name", "section", "title", "columns", "limit"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = queries
        .iter()
        .map(|query| {
            vec![
                query.name.to_string(),
                query.section.to_string(),
                query.title.to_string(),
                query.columns().join(", "),
                query.limit.map(|l| l.to_string()).unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    table::render_table(&headers, &rows)
}
