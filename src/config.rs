//! Export configuration
//!
//! File locations, row failure policy and the optional calendar-date filter.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FlattenError;
use crate::types::Table;

/// Default input file name
pub const DEFAULT_INPUT: &str = "garmin_push_log_sleeps.csv";
/// Default summary table file name
pub const DEFAULT_SUMMARY_FILE: &str = "sleep_summary.csv";
/// Default stage segment table file name
pub const DEFAULT_STAGES_FILE: &str = "sleep_stage_segments.csv";
/// Default respiration table file name
pub const DEFAULT_RESPIRATION_FILE: &str = "sleep_respiration.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What to do when a single input row cannot be flattened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// The first failing row aborts the whole run
    #[default]
    Abort,
    /// Failing rows are dropped with a warning
    Skip,
}

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, FlattenError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(FlattenError::InvalidConfig(format!(
                    "start date {} is after end date {}",
                    s, e
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Build a filter from `YYYY-MM-DD` strings
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, FlattenError> {
        let start = start.map(parse_bound).transpose()?;
        let end = end.map(parse_bound).transpose()?;
        Self::new(start, end)
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

fn parse_bound(value: &str) -> Result<NaiveDate, FlattenError> {
    parse_calendar_date(value)
        .ok_or_else(|| FlattenError::InvalidConfig(format!("invalid date bound: {:?}", value)))
}

/// Parse a Garmin `calendarDate` (`YYYY-MM-DD`)
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Settings for one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub summary_file: String,
    pub stages_file: String,
    pub respiration_file: String,
    pub row_policy: RowPolicy,
    pub date_filter: DateFilter,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from("."),
            summary_file: DEFAULT_SUMMARY_FILE.to_string(),
            stages_file: DEFAULT_STAGES_FILE.to_string(),
            respiration_file: DEFAULT_RESPIRATION_FILE.to_string(),
            row_policy: RowPolicy::Abort,
            date_filter: DateFilter::default(),
        }
    }
}

impl ExportConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_file_name(mut self, table: Table, name: impl Into<String>) -> Self {
        let name = name.into();
        match table {
            Table::Summary => self.summary_file = name,
            Table::Stages => self.stages_file = name,
            Table::Respiration => self.respiration_file = name,
        }
        self
    }

    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.row_policy = policy;
        self
    }

    pub fn with_date_filter(mut self, filter: DateFilter) -> Self {
        self.date_filter = filter;
        self
    }

    /// Full path of a table's output file
    pub fn output_path(&self, table: Table) -> PathBuf {
        let name = match table {
            Table::Summary => &self.summary_file,
            Table::Stages => &self.stages_file,
            Table::Respiration => &self.respiration_file,
        };
        self.output_dir.join(Path::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    #[test]
    fn test_default_paths() {
        let config = ExportConfig::default();
        assert_eq!(config.input, PathBuf::from("garmin_push_log_sleeps.csv"));
        assert_eq!(
            config.output_path(Table::Stages),
            PathBuf::from("./sleep_stage_segments.csv")
        );
        assert_eq!(config.row_policy, RowPolicy::Abort);
        assert!(!config.date_filter.is_active());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ExportConfig::new("in.csv")
            .with_output_dir("/tmp/out")
            .with_file_name(Table::Respiration, "resp.csv")
            .with_row_policy(RowPolicy::Skip);

        assert_eq!(config.output_path(Table::Respiration), PathBuf::from("/tmp/out/resp.csv"));
        assert_eq!(config.output_path(Table::Summary), PathBuf::from("/tmp/out/sleep_summary.csv"));
        assert_eq!(config.row_policy, RowPolicy::Skip);
    }

    #[test]
    fn test_date_filter_is_inclusive() {
        let filter = DateFilter::parse(Some("2024-01-02"), Some("2024-01-04")).unwrap();

        assert!(filter.is_active());
        assert!(!filter.contains(date("2024-01-01")));
        assert!(filter.contains(date("2024-01-02")));
        assert!(filter.contains(date("2024-01-04")));
        assert!(!filter.contains(date("2024-01-05")));
    }

    #[test]
    fn test_open_ended_filter() {
        let filter = DateFilter::parse(None, Some("2024-01-04")).unwrap();
        assert!(filter.contains(date("1999-12-31")));
        assert!(!filter.contains(date("2024-02-01")));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(matches!(
            DateFilter::parse(Some("01/02/2024"), None),
            Err(FlattenError::InvalidConfig(_))
        ));
        assert!(matches!(
            DateFilter::parse(Some("2024-03-01"), Some("2024-02-01")),
            Err(FlattenError::InvalidConfig(_))
        ));
    }
}
