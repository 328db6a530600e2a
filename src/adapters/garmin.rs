//! Garmin sleep payload adapter
//!
//! Parses one Garmin sleep push-notification payload and projects it onto the
//! summary, stage segment and respiration tables.

use crate::error::FlattenError;
use crate::types::{RecordProjection, RespirationRow, Scalar, SleepSummaryRow, StageSegmentRow};
use serde::Deserialize;
use serde_json::Value;

/// Garmin payload adapter
pub struct GarminSleepAdapter;

impl GarminSleepAdapter {
    /// Parse the JSON text held in one input row
    pub fn parse(row: usize, raw_json: &str) -> Result<GarminSleepPayload, FlattenError> {
        let value: Value = serde_json::from_str(raw_json).map_err(|e| FlattenError::ParseError {
            row,
            detail: format!("invalid sleep payload JSON: {}", e),
        })?;
        if !value.is_object() {
            return Err(FlattenError::ParseError {
                row,
                detail: "sleep payload is not a JSON object".to_string(),
            });
        }

        GarminSleepPayload::deserialize(value).map_err(|e| FlattenError::ParseError {
            row,
            detail: format!("unreadable sleep payload: {}", e),
        })
    }

    /// Parse and project one input row in a single step
    pub fn flatten(row: usize, raw_json: &str) -> Result<RecordProjection, FlattenError> {
        Self::parse(row, raw_json)?.project(row)
    }
}

/// Garmin sleep summary as pushed by the Health API.
///
/// Summary fields are read leniently: absent, `null` or unusable values map
/// to `None`, integral floats count as whole seconds, and ids or dates sent as
/// numbers are kept as their text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminSleepPayload {
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub calendar_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub duration_in_seconds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub deep_sleep_duration_in_seconds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub light_sleep_duration_in_seconds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub rem_sleep_in_seconds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub awake_duration_in_seconds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::score")]
    pub overall_sleep_score: Option<GarminSleepScore>,
    /// Stage label -> segments, in payload order
    #[serde(default)]
    pub sleep_levels_map: Option<Value>,
    /// Offset seconds (as string) -> breaths per minute, in payload order
    #[serde(default)]
    pub time_offset_sleep_respiration: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminSleepScore {
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub value: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub qualifier_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminSleepSegment {
    #[serde(default)]
    start_time_in_seconds: Option<Value>,
    #[serde(default)]
    end_time_in_seconds: Option<Value>,
}

impl GarminSleepPayload {
    /// Build the summary row, falling back to null for every missing field
    pub fn summary_row(&self) -> SleepSummaryRow {
        let score = self.overall_sleep_score.as_ref();

        SleepSummaryRow {
            summary_id: self.summary_id.clone(),
            date: self.calendar_date.clone(),
            total_duration: self.duration_in_seconds,
            deep_sleep: self.deep_sleep_duration_in_seconds,
            light_sleep: self.light_sleep_duration_in_seconds,
            rem_sleep: self.rem_sleep_in_seconds,
            awake_sleep: self.awake_duration_in_seconds,
            overall_score: score.and_then(|s| s.value.clone()),
            score_qualifier: score.and_then(|s| s.qualifier_key.clone()),
        }
    }

    /// One row per segment, stage by stage, in payload order
    pub fn stage_rows(&self, row: usize) -> Result<Vec<StageSegmentRow>, FlattenError> {
        let levels = match &self.sleep_levels_map {
            None => return Ok(Vec::new()),
            Some(Value::Object(levels)) => levels,
            Some(other) => {
                return Err(FlattenError::ParseError {
                    row,
                    detail: format!("sleepLevelsMap is not an object: {}", other),
                })
            }
        };

        let mut rows = Vec::new();
        for (stage_type, segments) in levels {
            let segments: Vec<GarminSleepSegment> = serde_json::from_value(segments.clone())
                .map_err(|e| FlattenError::ParseError {
                    row,
                    detail: format!("invalid `{}` segments: {}", stage_type, e),
                })?;

            for (index, segment) in segments.into_iter().enumerate() {
                let time = |value: Option<Value>, field: &'static str| match value {
                    None => Err(FlattenError::MissingField {
                        row,
                        stage_type: stage_type.clone(),
                        segment: index,
                        field,
                    }),
                    Some(v) => whole_seconds(&v).ok_or_else(|| FlattenError::ParseError {
                        row,
                        detail: format!(
                            "`{}` segment {} {} is not a whole number of seconds: {}",
                            stage_type, index, field, v
                        ),
                    }),
                };
                let start_time = time(segment.start_time_in_seconds, "startTimeInSeconds")?;
                let end_time = time(segment.end_time_in_seconds, "endTimeInSeconds")?;

                rows.push(StageSegmentRow {
                    summary_id: self.summary_id.clone(),
                    stage_type: stage_type.clone(),
                    start_time,
                    end_time,
                    duration: end_time.saturating_sub(start_time),
                });
            }
        }

        Ok(rows)
    }

    /// One row per respiration offset, in payload order
    pub fn respiration_rows(&self, row: usize) -> Result<Vec<RespirationRow>, FlattenError> {
        let samples = match &self.time_offset_sleep_respiration {
            None => return Ok(Vec::new()),
            Some(Value::Object(samples)) => samples,
            Some(other) => {
                return Err(FlattenError::ParseError {
                    row,
                    detail: format!("timeOffsetSleepRespiration is not an object: {}", other),
                })
            }
        };

        samples
            .iter()
            .map(|(offset, rate)| {
                let offset_seconds =
                    parse_offset(offset).ok_or_else(|| FlattenError::ParseError {
                        row,
                        detail: format!("respiration offset {:?} is not an integer", offset),
                    })?;

                Ok(RespirationRow {
                    summary_id: self.summary_id.clone(),
                    offset_seconds,
                    respiration_rate: Scalar::from_json(rate),
                })
            })
            .collect()
    }

    /// Project the payload onto all three tables.
    ///
    /// Nothing is returned unless the whole record projects cleanly.
    pub fn project(&self, row: usize) -> Result<RecordProjection, FlattenError> {
        Ok(RecordProjection {
            summary: self.summary_row(),
            stages: self.stage_rows(row)?,
            respiration: self.respiration_rows(row)?,
        })
    }
}

/// Base-10 integer parse of an offset key; surrounding whitespace is allowed
fn parse_offset(key: &str) -> Option<i64> {
    key.trim().parse().ok()
}

/// Integer seconds from an integer, an integral float or a numeric string
fn whole_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `deserialize_with` helpers for payload fields that accept loose types
mod lenient {
    use super::{whole_seconds, GarminSleepScore};
    use crate::types::Scalar;
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }))
    }

    pub fn seconds<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?
            .as_ref()
            .and_then(whole_seconds))
    }

    pub fn scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Scalar>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?
            .as_ref()
            .and_then(Scalar::from_json))
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<GarminSleepScore>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            Some(v @ Value::Object(_)) => serde_json::from_value(v)
                .map(Some)
                .map_err(de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Number;

    const FULL_PAYLOAD: &str = r#"{
        "summaryId": "S1",
        "calendarDate": "2024-01-01",
        "durationInSeconds": 28800,
        "deepSleepDurationInSeconds": 7200,
        "overallSleepScore": {"value": 85, "qualifierKey": "GOOD"},
        "sleepLevelsMap": {
            "deep": [{"startTimeInSeconds": 100, "endTimeInSeconds": 200}]
        },
        "timeOffsetSleepRespiration": {"60": 14.5}
    }"#;

    fn number(n: i64) -> Option<Scalar> {
        Some(Scalar::Number(Number::from(n)))
    }

    #[test]
    fn test_project_full_payload() {
        let projection = GarminSleepAdapter::flatten(1, FULL_PAYLOAD).unwrap();

        assert_eq!(
            projection.summary,
            SleepSummaryRow {
                summary_id: Some("S1".to_string()),
                date: Some("2024-01-01".to_string()),
                total_duration: Some(28800),
                deep_sleep: Some(7200),
                light_sleep: None,
                rem_sleep: None,
                awake_sleep: None,
                overall_score: number(85),
                score_qualifier: Some("GOOD".to_string()),
            }
        );
        assert_eq!(
            projection.stages,
            vec![StageSegmentRow {
                summary_id: Some("S1".to_string()),
                stage_type: "deep".to_string(),
                start_time: 100,
                end_time: 200,
                duration: 100,
            }]
        );
        assert_eq!(projection.respiration.len(), 1);
        assert_eq!(projection.respiration[0].offset_seconds, 60);
        assert_eq!(
            projection.respiration[0].respiration_rate,
            Number::from_f64(14.5).map(Scalar::from)
        );
    }

    #[test]
    fn test_missing_optionals_are_null() {
        let projection = GarminSleepAdapter::flatten(1, r#"{"summaryId": "S2"}"#).unwrap();

        assert_eq!(projection.summary.summary_id.as_deref(), Some("S2"));
        assert_eq!(projection.summary.date, None);
        assert_eq!(projection.summary.overall_score, None);
        assert_eq!(projection.summary.score_qualifier, None);
        assert!(projection.stages.is_empty());
        assert!(projection.respiration.is_empty());
    }

    #[test]
    fn test_score_without_qualifier() {
        let projection =
            GarminSleepAdapter::flatten(1, r#"{"overallSleepScore": {"value": 71}}"#).unwrap();

        assert_eq!(projection.summary.overall_score, number(71));
        assert_eq!(projection.summary.score_qualifier, None);
        assert_eq!(projection.summary.summary_id, None);
    }

    #[test]
    fn test_integral_float_durations_are_seconds() {
        let json = r#"{
            "summaryId": "S1",
            "durationInSeconds": 28800.0,
            "remSleepInSeconds": "5400",
            "awakeDurationInSeconds": 120.5,
            "sleepLevelsMap": {"light": [{"startTimeInSeconds": 100.0, "endTimeInSeconds": 250}]}
        }"#;
        let projection = GarminSleepAdapter::flatten(1, json).unwrap();

        assert_eq!(projection.summary.total_duration, Some(28800));
        assert_eq!(projection.summary.rem_sleep, Some(5400));
        assert_eq!(projection.summary.awake_sleep, None);
        assert_eq!(projection.stages[0].start_time, 100);
        assert_eq!(projection.stages[0].duration, 150);
    }

    #[test]
    fn test_numeric_summary_id_is_kept_as_text() {
        let json = r#"{"summaryId": 12345, "calendarDate": "2024-01-01",
            "timeOffsetSleepRespiration": {"0": 12.0}}"#;
        let projection = GarminSleepAdapter::flatten(1, json).unwrap();

        assert_eq!(projection.summary.summary_id.as_deref(), Some("12345"));
        assert_eq!(projection.respiration[0].summary_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_string_score_and_rate_pass_through() {
        let json = r#"{"summaryId": "S6",
            "overallSleepScore": {"value": "85", "qualifierKey": "GOOD"},
            "timeOffsetSleepRespiration": {"60": "14.5", "120": null}}"#;
        let projection = GarminSleepAdapter::flatten(1, json).unwrap();

        assert_eq!(
            projection.summary.overall_score,
            Some(Scalar::Text("85".to_string()))
        );
        assert_eq!(
            projection.respiration[0].respiration_rate,
            Some(Scalar::Text("14.5".to_string()))
        );
        assert_eq!(projection.respiration[1].respiration_rate, None);
    }

    #[test]
    fn test_non_object_score_is_null() {
        let projection =
            GarminSleepAdapter::flatten(1, r#"{"summaryId": "S7", "overallSleepScore": 80}"#)
                .unwrap();

        assert_eq!(projection.summary.overall_score, None);
        assert_eq!(projection.summary.score_qualifier, None);
    }

    #[test]
    fn test_nested_order_follows_payload() {
        let json = r#"{
            "summaryId": "S3",
            "sleepLevelsMap": {
                "light": [
                    {"startTimeInSeconds": 0, "endTimeInSeconds": 600},
                    {"startTimeInSeconds": 1200, "endTimeInSeconds": 1500}
                ],
                "deep": [{"startTimeInSeconds": 600, "endTimeInSeconds": 1200}],
                "awake": []
            },
            "timeOffsetSleepRespiration": {"120": 13.0, "0": 12.5, "60": 14}
        }"#;
        let projection = GarminSleepAdapter::flatten(4, json).unwrap();

        let stages: Vec<(&str, i64)> = projection
            .stages
            .iter()
            .map(|s| (s.stage_type.as_str(), s.start_time))
            .collect();
        assert_eq!(stages, vec![("light", 0), ("light", 1200), ("deep", 600)]);

        let offsets: Vec<i64> = projection.respiration.iter().map(|r| r.offset_seconds).collect();
        assert_eq!(offsets, vec![120, 0, 60]);
        assert_eq!(projection.respiration[2].respiration_rate, number(14));
    }

    #[test]
    fn test_negative_duration_is_not_clamped() {
        let json = r#"{"sleepLevelsMap": {"rem": [{"startTimeInSeconds": 500, "endTimeInSeconds": 400}]}}"#;
        let projection = GarminSleepAdapter::flatten(1, json).unwrap();
        assert_eq!(projection.stages[0].duration, -100);
    }

    #[test]
    fn test_segment_missing_end_time() {
        let json = r#"{"summaryId": "S4", "sleepLevelsMap": {"deep": [
            {"startTimeInSeconds": 1, "endTimeInSeconds": 2},
            {"startTimeInSeconds": 3}
        ]}}"#;

        match GarminSleepAdapter::flatten(7, json) {
            Err(FlattenError::MissingField { row, stage_type, segment, field }) => {
                assert_eq!(row, 7);
                assert_eq!(stage_type, "deep");
                assert_eq!(segment, 1);
                assert_eq!(field, "endTimeInSeconds");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_fractional_segment_time_is_parse_error() {
        let json = r#"{"sleepLevelsMap": {"deep": [{"startTimeInSeconds": 1.5, "endTimeInSeconds": 2}]}}"#;
        let err = GarminSleepAdapter::flatten(5, json).unwrap_err();

        assert!(matches!(err, FlattenError::ParseError { row: 5, .. }));
        assert!(err.to_string().contains("startTimeInSeconds"));
    }

    #[test]
    fn test_non_numeric_offset_is_parse_error() {
        let json = r#"{"summaryId": "S5", "timeOffsetSleepRespiration": {"abc": 14.0}}"#;
        let err = GarminSleepAdapter::flatten(2, json).unwrap_err();

        assert!(matches!(err, FlattenError::ParseError { row: 2, .. }));
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = GarminSleepAdapter::flatten(3, "{not json").unwrap_err();
        assert!(matches!(err, FlattenError::ParseError { row: 3, .. }));

        let err = GarminSleepAdapter::flatten(3, "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_offset_parse() {
        assert_eq!(parse_offset("60"), Some(60));
        assert_eq!(parse_offset(" 90 "), Some(90));
        assert_eq!(parse_offset("-30"), Some(-30));
        assert_eq!(parse_offset("1.5"), None);
        assert_eq!(parse_offset(""), None);
    }

    #[test]
    fn test_whole_seconds() {
        assert_eq!(whole_seconds(&serde_json::json!(60)), Some(60));
        assert_eq!(whole_seconds(&serde_json::json!(60.0)), Some(60));
        assert_eq!(whole_seconds(&serde_json::json!(60.25)), None);
        assert_eq!(whole_seconds(&serde_json::json!(" 75 ")), Some(75));
        assert_eq!(whole_seconds(&serde_json::json!(true)), None);
    }
}
