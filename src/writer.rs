//! CSV table writer
//!
//! Serializes a table of fixed-shape rows to comma-separated UTF-8 text. The
//! header row is always written, even for an empty table.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::FlattenError;
use crate::types::TableRow;

/// Write a table to `path`, replacing any existing file
pub fn write_csv<T: TableRow, P: AsRef<Path>>(rows: &[T], path: P) -> Result<(), FlattenError> {
    let file = File::create(path.as_ref())?;
    write_csv_to(rows, file)
}

/// Write a table to any writer
pub fn write_csv_to<T: TableRow, W: Write>(rows: &[T], writer: W) -> Result<(), FlattenError> {
    // Headers come from the row type so empty tables still get them
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(T::HEADERS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RespirationRow, Scalar, SleepSummaryRow, StageSegmentRow};
    use pretty_assertions::assert_eq;
    use serde_json::Number;

    fn render<T: TableRow>(rows: &[T]) -> String {
        let mut buffer = Vec::new();
        write_csv_to(rows, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn summary() -> SleepSummaryRow {
        SleepSummaryRow {
            summary_id: Some("S1".to_string()),
            date: Some("2024-01-01".to_string()),
            total_duration: Some(28800),
            deep_sleep: Some(7200),
            light_sleep: None,
            rem_sleep: None,
            awake_sleep: None,
            overall_score: Some(Scalar::Number(Number::from(85))),
            score_qualifier: Some("GOOD".to_string()),
        }
    }

    #[test]
    fn test_nulls_render_empty() {
        assert_eq!(
            render(&[summary()]),
            "summary_id,date,total_duration,deep_sleep,light_sleep,rem_sleep,awake_sleep,overall_score,score_qualifier\n\
             S1,2024-01-01,28800,7200,,,,85,GOOD\n"
        );
    }

    #[test]
    fn test_empty_table_has_header() {
        assert_eq!(
            render::<StageSegmentRow>(&[]),
            "summary_id,stage_type,start_time,end_time,duration\n"
        );
    }

    #[test]
    fn test_float_rate_keeps_fraction() {
        let rows = vec![
            RespirationRow {
                summary_id: Some("S1".to_string()),
                offset_seconds: 60,
                respiration_rate: Number::from_f64(14.5).map(Scalar::from),
            },
            RespirationRow {
                summary_id: Some("S1".to_string()),
                offset_seconds: 120,
                respiration_rate: None,
            },
        ];
        assert_eq!(
            render(&rows),
            "summary_id,offset_seconds,respiration_rate\nS1,60,14.5\nS1,120,\n"
        );
    }

    #[test]
    fn test_round_trip_recovers_typed_values() {
        let written = render(&[summary()]);
        let mut reader = csv::Reader::from_reader(written.as_bytes());
        let rows: Vec<SleepSummaryRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows, vec![summary()]);
    }

    #[test]
    fn test_text_score_round_trips() {
        let row = SleepSummaryRow {
            overall_score: Some(Scalar::Text("n/a".to_string())),
            ..summary()
        };
        let written = render(&[row.clone()]);
        assert!(written.ends_with(",n/a,GOOD\n"));

        let mut reader = csv::Reader::from_reader(written.as_bytes());
        let rows: Vec<SleepSummaryRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[test]
    fn test_stage_labels_with_commas_are_quoted() {
        let rows = vec![StageSegmentRow {
            summary_id: Some("S9".to_string()),
            stage_type: "light, restless".to_string(),
            start_time: 0,
            end_time: 30,
            duration: 30,
        }];
        assert_eq!(
            render(&rows),
            "summary_id,stage_type,start_time,end_time,duration\nS9,\"light, restless\",0,30,30\n"
        );
    }
}
