use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ObservationResponse {
    #[serde(default)]
    pub valid_time: Vec<String>,
    #[serde(default)]
    pub power_kw: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ref_time: Option<serde_json::Value>,
    #[serde(default)]
    pub valid_time: Vec<String>,
    #[serde(default)]
    pub forecast: Vec<Option<f64>>,
}

#[derive(Debug, Serialize)]
pub struct MeasurementUpload {
    pub valid_time: Vec<String>,
    pub measurement: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ForecastUploadBody {
    pub ref_time: String,
    pub valid_time: Vec<String>,
    pub forecast: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct LayerCreate<'a> {
    pub packages: &'a [String],
}
