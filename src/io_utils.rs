//! I/O helpers shared by every command.
//!
//! - Delimiter resolution: `.tsv` inputs default to tab, everything else to
//!   comma, with an explicit `--delimiter` taking precedence.
//! - Encoding: input fields are decoded and output is transcoded through
//!   `encoding_rs`, defaulting to UTF-8.
//! - The `-` path routes through stdin/stdout.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

fn delimiter_for_extension(path: &Path) -> Option<u8> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => Some(DEFAULT_TSV_DELIMITER),
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Some(DEFAULT_CSV_DELIMITER),
        _ => None,
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided
        .or_else(|| delimiter_for_extension(path))
        .unwrap_or(DEFAULT_CSV_DELIMITER)
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    provided
        .or_else(|| path.and_then(delimiter_for_extension))
        .unwrap_or(fallback)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>> {
    let headers = reader.byte_headers().context("Reading header row")?.clone();
    let mut decoded = decode_record(&headers, encoding)?;
    if let Some(first) = decoded.first_mut()
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        *first = stripped.to_string();
    }
    Ok(decoded)
}

/// Destination for rendered output. UTF-8 output streams straight through;
/// any other encoding is buffered and transcoded once in [`OutputSink::finish`].
pub struct OutputSink {
    inner: Box<dyn Write>,
    encoding: &'static Encoding,
    pending: Vec<u8>,
}

impl OutputSink {
    pub fn open(path: Option<&Path>, encoding: &'static Encoding) -> Result<Self> {
        let inner: Box<dyn Write> = match path {
            Some(p) if !is_dash(p) => Box::new(BufWriter::new(
                File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
            )),
            _ => Box::new(io::stdout()),
        };
        Ok(Self {
            inner,
            encoding,
            pending: Vec::new(),
        })
    }

    fn passthrough(&self) -> bool {
        self.encoding == UTF_8
    }

    pub fn finish(mut self) -> Result<()> {
        if !self.pending.is_empty() {
            let text = std::str::from_utf8(&self.pending)
                .context("Rendered output is not valid UTF-8")?;
            let (encoded, _, had_errors) = self.encoding.encode(text);
            if had_errors {
                return Err(anyhow!(
                    "Output contains characters not representable in {}",
                    self.encoding.name()
                ));
            }
            self.inner.write_all(&encoded)?;
            self.pending.clear();
        }
        self.inner.flush().context("Flushing output")
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.passthrough() {
            self.inner.write(buf)
        } else {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.passthrough() {
            self.inner.flush()
        } else {
            Ok(())
        }
    }
}

pub fn csv_writer(sink: OutputSink, delimiter: u8) -> csv::Writer<OutputSink> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .flexible(true)
        .from_writer(sink)
}

/// Flushes a CSV writer and finalizes its underlying sink.
pub fn finish_csv(writer: csv::Writer<OutputSink>) -> Result<()> {
    let sink = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing CSV output: {}", err.error()))?;
    sink.finish()
}
