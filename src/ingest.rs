use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    io_utils::{self, OutputSink},
    record::{HealthcareRecord, RecordStore},
    schema::{Field, Layout},
};

#[derive(Debug, Clone, Copy)]
pub struct InputOptions<'a> {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub null_tokens: &'a [String],
}

/// Loads every row of `path` into a fresh [`RecordStore`].
pub fn load_records(path: &Path, options: &InputOptions<'_>) -> Result<RecordStore> {
    let mut reader = io_utils::open_csv_reader_from_path(path, options.delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let layout =
        Layout::resolve(&headers).with_context(|| format!("Resolving columns of {path:?}"))?;
    debug!(
        "Resolved {} column(s); Data_Issue column present: {}",
        layout.width(),
        layout.has(Field::DataIssue)
    );

    let mut records = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let row_number = idx + 2;
        let record = record.with_context(|| format!("Reading row {row_number} of {path:?}"))?;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {row_number} of {path:?}"))?;
        if decoded.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let parsed = HealthcareRecord::from_row(&layout, &decoded, options.null_tokens, row_number)
            .with_context(|| format!("Parsing {path:?}"))?;
        records.push(parsed);
    }
    info!("Loaded {} record(s) from {:?}", records.len(), path);
    Ok(RecordStore::new(records))
}

/// Writes all sixteen columns of every record, header first.
pub fn write_records(
    records: &[HealthcareRecord],
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    let sink = OutputSink::open(path, encoding)?;
    let mut writer = io_utils::csv_writer(sink, delimiter);
    writer
        .write_record(Field::headers())
        .context("Writing output headers")?;
    for (idx, record) in records.iter().enumerate() {
        writer
            .write_record(record.to_row())
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    io_utils::finish_csv(writer)?;
    let destination = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    info!("Wrote {} record(s) -> {}", records.len(), destination);
    Ok(())
}
