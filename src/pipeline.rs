//! Pipeline orchestration
//!
//! Drives every input row through the Garmin adapter and accumulates the
//! resulting rows into the three output tables.

use serde::Serialize;
use tracing::{debug, warn};

use crate::adapters::{GarminSleepAdapter, GarminSleepPayload};
use crate::config::{parse_calendar_date, DateFilter, RowPolicy};
use crate::error::FlattenError;
use crate::input::PayloadRow;
use crate::types::{RecordProjection, SleepTables};

/// Flatten rows with the default settings: abort on the first bad row, no
/// date filter.
///
/// # Example
/// ```
/// use garmin_sleep_tables::{process, PayloadRow};
///
/// let rows = vec![PayloadRow::new(1, r#"{"summaryId":"S1","timeOffsetSleepRespiration":{"60":14.5}}"#)];
/// let tables = process(&rows).unwrap();
/// assert_eq!(tables.summaries.len(), 1);
/// assert_eq!(tables.respiration[0].offset_seconds, 60);
/// ```
pub fn process(rows: &[PayloadRow]) -> Result<SleepTables, FlattenError> {
    Ok(Flattener::new().process(rows)?.tables)
}

/// Tables plus bookkeeping from one flattening pass
#[derive(Debug, Clone, Default)]
pub struct FlattenOutcome {
    pub tables: SleepTables,
    /// Rows dropped under [`RowPolicy::Skip`]
    pub skipped_rows: usize,
    /// Rows left out by the date filter
    pub filtered_rows: usize,
}

/// A row that could not be flattened
#[derive(Debug, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub summary_id: Option<String>,
    pub error: String,
}

/// Configurable flattener for a batch of payload rows
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    row_policy: RowPolicy,
    date_filter: DateFilter,
}

impl Flattener {
    /// Create a flattener that aborts on the first bad row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.row_policy = policy;
        self
    }

    pub fn with_date_filter(mut self, filter: DateFilter) -> Self {
        self.date_filter = filter;
        self
    }

    /// Flatten all rows in order.
    ///
    /// A record either contributes all of its rows or none of them.
    pub fn process(&self, rows: &[PayloadRow]) -> Result<FlattenOutcome, FlattenError> {
        let mut outcome = FlattenOutcome::default();

        for row in rows {
            match self.flatten_row(row) {
                Ok(Some(projection)) => outcome.tables.append(projection),
                Ok(None) => outcome.filtered_rows += 1,
                Err(e) if self.row_policy == RowPolicy::Skip && e.is_row_level() => {
                    warn!(row = row.row, error = %e, "skipping row");
                    outcome.skipped_rows += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    /// Check every row without building tables
    pub fn validate(&self, rows: &[PayloadRow]) -> Vec<RowIssue> {
        rows.iter()
            .filter_map(|row| {
                self.flatten_row(row).err().map(|e| RowIssue {
                    row: row.row,
                    summary_id: recover_summary_id(&row.data),
                    error: e.to_string(),
                })
            })
            .collect()
    }

    /// Project one row; `None` when the date filter excludes it
    fn flatten_row(&self, row: &PayloadRow) -> Result<Option<RecordProjection>, FlattenError> {
        let payload = GarminSleepAdapter::parse(row.row, &row.data)?;

        if !self.accepts(row.row, &payload)? {
            debug!(
                row = row.row,
                summary_id = payload.summary_id.as_deref().unwrap_or(""),
                "row outside date filter"
            );
            return Ok(None);
        }

        payload.project(row.row).map(Some)
    }

    fn accepts(&self, row: usize, payload: &GarminSleepPayload) -> Result<bool, FlattenError> {
        if !self.date_filter.is_active() {
            return Ok(true);
        }
        let Some(raw) = payload.calendar_date.as_deref() else {
            return Ok(false);
        };
        let date = parse_calendar_date(raw).ok_or_else(|| FlattenError::ParseError {
            row,
            detail: format!("calendarDate {:?} is not a YYYY-MM-DD date", raw),
        })?;
        Ok(self.date_filter.contains(date))
    }
}

/// Best-effort `summaryId` lookup for diagnostics on rows that fail to flatten
fn recover_summary_id(raw_json: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(raw_json)
        .ok()?
        .get("summaryId")?
        .as_str()
        .map(str::to_string)
}
