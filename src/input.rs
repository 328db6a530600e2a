//! Input reader for Garmin push-log exports
//!
//! The export is a headed CSV file with one JSON payload per row in the
//! `data` column. Other columns are ignored.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::FlattenError;

/// Name of the column holding the JSON payload
pub const DATA_COLUMN: &str = "data";

/// One payload from the input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRow {
    /// 1-based record number, header excluded
    pub row: usize,
    /// Raw JSON text of the `data` column
    pub data: String,
}

impl PayloadRow {
    pub fn new(row: usize, data: impl Into<String>) -> Self {
        Self {
            row,
            data: data.into(),
        }
    }
}

/// Read every payload row from a CSV file on disk.
///
/// The file is read whole before parsing; any failure to read it is
/// reported as [`FlattenError::InputNotFound`].
pub fn read_payload_rows<P: AsRef<Path>>(path: P) -> Result<Vec<PayloadRow>, FlattenError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| FlattenError::InputNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    read_payload_rows_from(&bytes[..])
}

/// Read every payload row from any CSV source
pub fn read_payload_rows_from<R: Read>(reader: R) -> Result<Vec<PayloadRow>, FlattenError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let data_index = csv_reader
        .headers()?
        .iter()
        .position(|h| h.trim() == DATA_COLUMN)
        .ok_or_else(|| FlattenError::MissingColumn(DATA_COLUMN.to_string()))?;

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let data = record.get(data_index).unwrap_or_default();
        rows.push(PayloadRow::new(index + 1, data));
    }

    Ok(rows)
}
