use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    wire::{self, ForecastUploadBody, MeasurementUpload},
    ForecastPoint, ForecastUpload, ObservationPoint, RebaseError, SiteForecast, TrainingEvent,
    TrainingStatus, WeatherRow,
};

const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const REF_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const MEASUREMENT_TYPE: &str = "ProductionPower";

const REF_COLUMN: &str = "ref_datetime";
const VALID_COLUMN: &str = "valid_datetime";

/// Parses the timestamp shapes the platform is known to return.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RebaseError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(RebaseError::Decode(format!("invalid timestamp '{value}'")))
}

pub(crate) fn decode_observations(
    response: wire::ObservationResponse,
) -> Result<Vec<ObservationPoint>, RebaseError> {
    if response.valid_time.len() != response.power_kw.len() {
        return Err(RebaseError::Decode(format!(
            "observation length mismatch: {} timestamps, {} values",
            response.valid_time.len(),
            response.power_kw.len()
        )));
    }

    response
        .valid_time
        .iter()
        .zip(response.power_kw)
        .map(|(time, value)| {
            Ok(ObservationPoint {
                valid_time: parse_timestamp(time)?,
                value: value.unwrap_or(f64::NAN),
            })
        })
        .collect()
}

pub(crate) fn decode_forecast(
    response: wire::ForecastResponse,
) -> Result<SiteForecast, RebaseError> {
    if response.valid_time.len() != response.forecast.len() {
        return Err(RebaseError::Decode(format!(
            "forecast length mismatch: {} timestamps, {} values",
            response.valid_time.len(),
            response.forecast.len()
        )));
    }

    let points = response
        .valid_time
        .iter()
        .zip(response.forecast)
        .map(|(time, value)| {
            Ok(ForecastPoint {
                valid_time: parse_timestamp(time)?,
                forecast: value.unwrap_or(f64::NAN),
            })
        })
        .collect::<Result<Vec<_>, RebaseError>>()?;

    Ok(SiteForecast {
        kind: response.kind,
        ref_time: response.ref_time.map(scalar_to_string).unwrap_or_default(),
        points,
    })
}

pub(crate) fn decode_training_status(history: Vec<TrainingEvent>) -> TrainingStatus {
    TrainingStatus {
        status: history.last().map(|event| event.state.clone()),
        history,
    }
}

/// Drops points whose value is not finite.
pub(crate) fn build_measurement_upload(points: &[ObservationPoint]) -> MeasurementUpload {
    let (valid_time, measurement) = points
        .iter()
        .filter(|point| point.value.is_finite())
        .map(|point| {
            (
                point.valid_time.format(UPLOAD_TIME_FORMAT).to_string(),
                point.value,
            )
        })
        .unzip();

    MeasurementUpload {
        valid_time,
        measurement,
        kind: MEASUREMENT_TYPE,
    }
}

pub(crate) fn build_forecast_upload(
    upload: &ForecastUpload,
) -> Result<ForecastUploadBody, RebaseError> {
    let mut valid_time = Vec::with_capacity(upload.points.len());
    let mut forecast = Vec::with_capacity(upload.points.len());
    for point in &upload.points {
        if !point.forecast.is_finite() {
            return Err(RebaseError::Decode(format!(
                "non-finite forecast value at {}",
                point.valid_time.format(UPLOAD_TIME_FORMAT)
            )));
        }
        valid_time.push(point.valid_time.format(UPLOAD_TIME_FORMAT).to_string());
        forecast.push(point.forecast);
    }

    Ok(ForecastUploadBody {
        ref_time: upload.ref_time.format(REF_TIME_FORMAT).to_string(),
        valid_time,
        forecast,
    })
}

/// Decodes weather data in either record (`[{..}, ..]`) or column
/// (`{"col": [..]}` / `{"col": {"0": ..}}`) orientation.
pub(crate) fn decode_weather_rows(value: Value) -> Result<Vec<WeatherRow>, RebaseError> {
    match value {
        Value::Array(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| match record {
                Value::Object(fields) => weather_row_from_fields(fields, index),
                other => Err(RebaseError::Decode(format!(
                    "weather record {index} is not an object: {other}"
                ))),
            })
            .collect(),
        Value::Object(columns) => decode_weather_columns(columns),
        other => Err(RebaseError::Decode(format!(
            "unexpected weather payload: {other}"
        ))),
    }
}

fn decode_weather_columns(columns: Map<String, Value>) -> Result<Vec<WeatherRow>, RebaseError> {
    let mut expanded: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (name, column) in columns {
        let cells = match column {
            Value::Array(cells) => cells,
            Value::Object(cells) => {
                let mut labelled: Vec<(String, Value)> = cells.into_iter().collect();
                labelled.sort_by(|a, b| match (a.0.parse::<u64>(), b.0.parse::<u64>()) {
                    (Ok(left), Ok(right)) => left.cmp(&right),
                    _ => a.0.cmp(&b.0),
                });
                labelled.into_iter().map(|(_, cell)| cell).collect()
            }
            other => {
                return Err(RebaseError::Decode(format!(
                    "weather column '{name}' is not a list: {other}"
                )))
            }
        };
        expanded.insert(name, cells);
    }

    let row_count = expanded
        .get(REF_COLUMN)
        .map(Vec::len)
        .ok_or_else(|| RebaseError::Decode(format!("missing '{REF_COLUMN}' column")))?;
    if let Some((name, cells)) = expanded.iter().find(|(_, cells)| cells.len() != row_count) {
        return Err(RebaseError::Decode(format!(
            "weather column '{name}' has {} rows, expected {row_count}",
            cells.len()
        )));
    }

    let mut rows: Vec<Map<String, Value>> = vec![Map::new(); row_count];
    for (name, cells) in expanded {
        for (row, cell) in rows.iter_mut().zip(cells) {
            row.insert(name.clone(), cell);
        }
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, fields)| weather_row_from_fields(fields, index))
        .collect()
}

fn weather_row_from_fields(
    mut fields: Map<String, Value>,
    index: usize,
) -> Result<WeatherRow, RebaseError> {
    let mut take = |column: &str| {
        fields
            .remove(column)
            .filter(|value| !value.is_null())
            .map(scalar_to_string)
            .ok_or_else(|| {
                RebaseError::Decode(format!("weather row {index} is missing '{column}'"))
            })
    };
    let ref_datetime = take(REF_COLUMN)?;
    let valid_datetime = take(VALID_COLUMN)?;

    Ok(WeatherRow {
        ref_datetime,
        valid_datetime,
        values: fields.into_iter().collect(),
    })
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::{
        decode, wire, ForecastPoint, ForecastUpload, ObservationPoint, RebaseError, TrainingEvent,
    };

    #[test]
    fn parse_timestamp_accepts_platform_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 10, 14, 0, 15, 0).unwrap();
        for input in [
            "2020-10-14T00:15:00Z",
            "2020-10-14T00:15:00+00:00",
            "2020-10-14 00:15:00+00:00",
            "2020-10-14T00:15:00",
            "2020-10-14 00:15:00",
            "2020-10-14 00:15",
        ] {
            assert_eq!(decode::parse_timestamp(input).expect(input), expected);
        }
        assert!(matches!(
            decode::parse_timestamp("yesterday"),
            Err(RebaseError::Decode(_))
        ));
    }

    #[test]
    fn decode_observations_keeps_nulls_as_nan() {
        let points = decode::decode_observations(wire::ObservationResponse {
            valid_time: vec!["2020-01-22T00:00:00Z".to_owned(), "2020-01-22T00:15:00Z".to_owned()],
            power_kw: vec![Some(126.3), None],
        })
        .expect("must decode");

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 126.3);
        assert!(points[1].value.is_nan());
    }

    #[test]
    fn decode_observations_rejects_length_mismatch() {
        let err = decode::decode_observations(wire::ObservationResponse {
            valid_time: vec!["2020-01-22T00:00:00Z".to_owned()],
            power_kw: vec![],
        })
        .expect_err("must fail");
        assert!(matches!(err, RebaseError::Decode(_)));
    }

    #[test]
    fn training_status_uses_last_state() {
        let status = decode::decode_training_status(vec![
            TrainingEvent {
                state: "queued".to_owned(),
                timestamp_utc: "2020-10-12 13:04:17".to_owned(),
            },
            TrainingEvent {
                state: "complete".to_owned(),
                timestamp_utc: "2020-10-12 13:05:23".to_owned(),
            },
        ]);
        assert_eq!(status.status.as_deref(), Some("complete"));
        assert_eq!(status.history.len(), 2);

        let empty = decode::decode_training_status(vec![]);
        assert_eq!(empty.status, None);
    }

    #[test]
    fn measurement_upload_drops_missing_values() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 22, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2020, 1, 22, 0, 15, 0).unwrap();
        let body = decode::build_measurement_upload(&[
            ObservationPoint::new(t0, 126.3),
            ObservationPoint::new(t1, f64::NAN),
        ]);

        let encoded = serde_json::to_value(&body).expect("must encode");
        assert_eq!(
            encoded,
            json!({
                "valid_time": ["2020-01-22T00:00:00Z"],
                "measurement": [126.3],
                "type": "ProductionPower"
            })
        );
    }

    #[test]
    fn forecast_upload_formats_ref_time_to_minutes() {
        let ref_time = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let body = decode::build_forecast_upload(&ForecastUpload {
            ref_time,
            points: vec![ForecastPoint::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap(),
                0.42,
            )],
        })
        .expect("must build");

        assert_eq!(body.ref_time, "2024-03-01 06:00");
        assert_eq!(body.valid_time, vec!["2024-03-01T07:00:00Z".to_owned()]);
        assert_eq!(body.forecast, vec![0.42]);
    }

    #[test]
    fn forecast_upload_rejects_non_finite_values() {
        let ref_time = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let err = decode::build_forecast_upload(&ForecastUpload {
            ref_time,
            points: vec![ForecastPoint::new(ref_time, f64::INFINITY)],
        })
        .expect_err("must fail");
        assert!(matches!(err, RebaseError::Decode(_)));
    }

    #[test]
    fn weather_rows_from_records() {
        let rows = decode::decode_weather_rows(json!([
            {"ref_datetime": "2024-01-01 00:00", "valid_datetime": "2024-01-01 01:00", "temperature": 3.5},
            {"ref_datetime": "2024-01-01 00:00", "valid_datetime": "2024-01-01 02:00", "temperature": 3.1}
        ]))
        .expect("must decode");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].valid_datetime, "2024-01-01 02:00");
        assert_eq!(rows[0].values["temperature"], json!(3.5));
        assert!(!rows[0].values.contains_key("ref_datetime"));
    }

    #[test]
    fn weather_rows_from_columns() {
        let rows = decode::decode_weather_rows(json!({
            "ref_datetime": {"0": 1704067200000u64, "1": 1704067200000u64, "10": 1704067200000u64},
            "valid_datetime": {"10": "c", "0": "a", "1": "b"},
            "wind": [1.0, 2.0, 3.0]
        }))
        .expect("must decode");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].ref_datetime, "1704067200000");
        let valid: Vec<&str> = rows.iter().map(|row| row.valid_datetime.as_str()).collect();
        assert_eq!(valid, vec!["a", "b", "c"]);
        assert_eq!(rows[2].values["wind"], json!(3.0));
    }

    #[test]
    fn weather_rows_require_datetime_columns() {
        let err = decode::decode_weather_rows(json!([{"temperature": 1.0}])).expect_err("must fail");
        assert!(matches!(err, RebaseError::Decode(_)));

        let err = decode::decode_weather_rows(json!({"wind": [1.0]})).expect_err("must fail");
        assert!(matches!(err, RebaseError::Decode(_)));
    }
}
