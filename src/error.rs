//! Error types for garmin-sleep-tables

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while flattening sleep payloads
#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("Input file not found or unreadable: {}: {}", .path.display(), .source)]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input has no `{0}` column")]
    MissingColumn(String),

    #[error("Failed to parse row {row}: {detail}")]
    ParseError { row: usize, detail: String },

    #[error("Row {row}: `{stage_type}` segment {segment} is missing required field `{field}`")]
    MissingField {
        row: usize,
        stage_type: String,
        segment: usize,
        field: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlattenError {
    /// Row number the error refers to, for row-level failures
    pub fn row(&self) -> Option<usize> {
        match self {
            FlattenError::ParseError { row, .. } | FlattenError::MissingField { row, .. } => {
                Some(*row)
            }
            _ => None,
        }
    }

    /// Whether the error concerns a single input row rather than the whole run
    pub fn is_row_level(&self) -> bool {
        self.row().is_some()
    }
}
