//! Typed errors raised while resolving headers, parsing cells, and validating
//! pipeline configuration. Command handlers wrap these in `anyhow` context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Columns '{first}' and '{second}' both map to field '{field}'")]
    DuplicateColumn {
        field: &'static str,
        first: String,
        second: String,
    },

    #[error("Row {row}: cannot parse {field} value '{value}': {reason}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{0}' is not a text field and cannot be normalized")]
    NotTextField(&'static str),

    #[error("Unknown query '{0}' (run `healthcare-csv queries` to list the catalog)")]
    UnknownQuery(String),

    #[error("Unknown report section '{0}'")]
    UnknownSection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
