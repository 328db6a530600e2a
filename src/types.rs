//! Core types for the flattening pipeline
//!
//! This module defines the three fixed-shape output rows and the tables that
//! accumulate them while input rows are processed.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A row type that can be written as one line of an output table
pub trait TableRow: Serialize {
    /// Table name used in logs and reports
    const TABLE: &'static str;
    /// Column names, in output order
    const HEADERS: &'static [&'static str];
}

/// Output table identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Summary,
    Stages,
    Respiration,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Summary, Table::Stages, Table::Respiration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Summary => SleepSummaryRow::TABLE,
            Table::Stages => StageSegmentRow::TABLE,
            Table::Respiration => RespirationRow::TABLE,
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Table::Summary => SleepSummaryRow::HEADERS,
            Table::Stages => StageSegmentRow::HEADERS,
            Table::Respiration => RespirationRow::HEADERS,
        }
    }
}

/// A payload value written to a table as it appears in the JSON.
///
/// Numbers keep their own form (`85` stays `85`, `14.5` stays `14.5`);
/// anything else is written as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value; `null` has no scalar form
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            other => Some(Scalar::Text(other.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<Number> for Scalar {
    fn from(n: Number) -> Self {
        Scalar::Number(n)
    }
}

/// One row per sleep session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSummaryRow {
    pub summary_id: Option<String>,
    pub date: Option<String>,
    /// Total sleep duration (seconds)
    pub total_duration: Option<i64>,
    /// Deep sleep duration (seconds)
    pub deep_sleep: Option<i64>,
    /// Light sleep duration (seconds)
    pub light_sleep: Option<i64>,
    /// REM sleep duration (seconds)
    pub rem_sleep: Option<i64>,
    /// Time awake during the sleep period (seconds)
    pub awake_sleep: Option<i64>,
    /// Overall sleep score, as given in the payload
    pub overall_score: Option<Scalar>,
    /// Vendor qualifier for the score (e.g. "GOOD")
    pub score_qualifier: Option<String>,
}

impl TableRow for SleepSummaryRow {
    const TABLE: &'static str = "sleep_summary";
    const HEADERS: &'static [&'static str] = &[
        "summary_id",
        "date",
        "total_duration",
        "deep_sleep",
        "light_sleep",
        "rem_sleep",
        "awake_sleep",
        "overall_score",
        "score_qualifier",
    ];
}

/// One row per stage segment in `sleepLevelsMap`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSegmentRow {
    pub summary_id: Option<String>,
    pub stage_type: String,
    pub start_time: i64,
    pub end_time: i64,
    /// `end_time - start_time`, unclamped
    pub duration: i64,
}

impl TableRow for StageSegmentRow {
    const TABLE: &'static str = "sleep_stage_segments";
    const HEADERS: &'static [&'static str] =
        &["summary_id", "stage_type", "start_time", "end_time", "duration"];
}

/// One row per offset in `timeOffsetSleepRespiration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespirationRow {
    pub summary_id: Option<String>,
    pub offset_seconds: i64,
    /// Breaths per minute, as given in the payload
    pub respiration_rate: Option<Scalar>,
}

impl TableRow for RespirationRow {
    const TABLE: &'static str = "sleep_respiration";
    const HEADERS: &'static [&'static str] =
        &["summary_id", "offset_seconds", "respiration_rate"];
}

/// Everything one input record contributes to the output tables
#[derive(Debug, Clone, PartialEq)]
pub struct RecordProjection {
    pub summary: SleepSummaryRow,
    pub stages: Vec<StageSegmentRow>,
    pub respiration: Vec<RespirationRow>,
}

/// The three output tables, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepTables {
    pub summaries: Vec<SleepSummaryRow>,
    pub stages: Vec<StageSegmentRow>,
    pub respiration: Vec<RespirationRow>,
}

impl SleepTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record's rows to all three tables
    pub fn append(&mut self, projection: RecordProjection) {
        self.summaries.push(projection.summary);
        self.stages.extend(projection.stages);
        self.respiration.extend(projection.respiration);
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.stages.is_empty() && self.respiration.is_empty()
    }

    /// Number of rows held for a given table
    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Summary => self.summaries.len(),
            Table::Stages => self.stages.len(),
            Table::Respiration => self.respiration.len(),
        }
    }
}
