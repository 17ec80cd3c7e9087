use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a numerical weather prediction result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    pub ref_datetime: String,
    pub valid_datetime: String,
    /// Weather variables keyed by column name.
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

/// A measured value for a site at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationPoint {
    pub valid_time: DateTime<Utc>,
    pub value: f64,
}

impl ObservationPoint {
    pub fn new(valid_time: DateTime<Utc>, value: f64) -> Self {
        Self { valid_time, value }
    }
}

/// A forecast value at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastPoint {
    pub valid_time: DateTime<Utc>,
    pub forecast: f64,
}

impl ForecastPoint {
    pub fn new(valid_time: DateTime<Utc>, forecast: f64) -> Self {
        Self {
            valid_time,
            forecast,
        }
    }
}

/// Which forecast source the latest site forecast should come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForecastKind {
    /// Best available forecast at the time.
    #[default]
    Prioritized,
    /// AI forecasts only.
    Ai,
    /// Physical forecasts only.
    Physical,
}

impl ForecastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prioritized => "prioritized",
            Self::Ai => "ai",
            Self::Physical => "physical",
        }
    }
}

/// Latest forecast of a site.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteForecast {
    /// Forecast type reported by the platform.
    pub kind: String,
    /// When the forecast data was last updated.
    pub ref_time: String,
    pub points: Vec<ForecastPoint>,
}

/// One entry in a site's training history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEvent {
    /// `queued`, `training`, `complete`, `retry` or `failed`.
    pub state: String,
    pub timestamp_utc: String,
}

/// Training state of a site: the latest state plus the full history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrainingStatus {
    pub status: Option<String>,
    pub history: Vec<TrainingEvent>,
}

/// A forecast for one reference time, ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastUpload {
    pub ref_time: DateTime<Utc>,
    pub points: Vec<ForecastPoint>,
}

/// Serialized artifact stored for a custom model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The model code.
    Code,
    /// The trained model state.
    Trained,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Trained => "trained",
        }
    }
}
