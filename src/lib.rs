//! garmin-sleep-tables - Flatten Garmin sleep push payloads into relational CSV tables
//!
//! A Garmin push-log export holds one sleep summary JSON payload per CSV row.
//! This crate turns it into three tables through a single-pass pipeline:
//! input reader → Garmin adapter → flattener → CSV writer.
//!
//! ## Tables
//!
//! - **sleep_summary**: one row per night (durations, overall score)
//! - **sleep_stage_segments**: one row per segment in `sleepLevelsMap`
//! - **sleep_respiration**: one row per offset in `timeOffsetSleepRespiration`
//!
//! All three share `summary_id` as the join key.

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod input;
pub mod pipeline;
pub mod types;
pub mod writer;

pub use config::{DateFilter, ExportConfig, RowPolicy};
pub use error::FlattenError;
pub use export::{export, ExportReport};
pub use input::{read_payload_rows, read_payload_rows_from, PayloadRow};
pub use pipeline::{process, Flattener, RowIssue};
pub use types::{
    RespirationRow, Scalar, SleepSummaryRow, SleepTables, StageSegmentRow, Table, TableRow,
};
pub use writer::{write_csv, write_csv_to};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
