use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Hourly forecast rows ───────────────────────────────────────────────────

/// One hour of weather at the selected coordinate.
/// `time` is the local wall-clock time of the forecast location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HourlyForecastRecord {
    pub time: NaiveDateTime,
    /// Air temperature at 2 m (°C)
    pub temperature: Option<f64>,
    /// Relative humidity at 2 m (%)
    pub relative_humidity: Option<f64>,
    /// Rain (mm)
    pub rain: Option<f64>,
    /// Total cloud cover (%)
    pub cloud_cover: Option<f64>,
    /// Wind speed at 10 m (m/s)
    pub wind_speed_10m: Option<f64>,
    /// Wind speed at 100 m (m/s)
    pub wind_speed_100m: Option<f64>,
    /// Direct solar radiation (W/m²)
    pub direct_radiation: Option<f64>,
}

/// A forecast row with the model estimate attached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub forecast: HourlyForecastRecord,
    /// Estimated wind generation for the hour (MWh)
    pub predicted_generation: f64,
}

// ─── Model input ────────────────────────────────────────────────────────────

pub const FEATURE_COUNT: usize = 10;

/// Column contract of the regression model. Order matters: it is the order
/// the artifact was trained on and is checked against the artifact metadata.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temperature_2m",
    "relative_humidity_2m",
    "rain",
    "cloud_cover",
    "wind_speed_10m",
    "wind_speed_100m",
    "direct_radiation",
    "hour",
    "lat",
    "lon",
];

/// Index of each feature inside a [`FeatureVector`].
pub mod feature_index {
    pub const TEMPERATURE: usize = 0;
    pub const HUMIDITY: usize = 1;
    pub const RAIN: usize = 2;
    pub const CLOUD_COVER: usize = 3;
    pub const WIND_10M: usize = 4;
    pub const WIND_100M: usize = 5;
    pub const RADIATION: usize = 6;
    pub const HOUR: usize = 7;
    pub const LAT: usize = 8;
    pub const LON: usize = 9;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }
}

// ─── Open-Meteo wire types ──────────────────────────────────────────────────

/// Hourly variables requested from Open-Meteo, in request order.
pub const HOURLY_VARIABLES: [&str; 7] = [
    "temperature_2m",
    "relative_humidity_2m",
    "rain",
    "cloud_cover",
    "wind_speed_10m",
    "wind_speed_100m",
    "direct_radiation",
];

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub hourly: Option<HourlyBlock>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub utc_offset_seconds: Option<i32>,
}

/// Column-oriented hourly payload. Individual values may be `null`.
#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub rain: Vec<Option<f64>>,
    pub cloud_cover: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
    pub wind_speed_100m: Vec<Option<f64>>,
    pub direct_radiation: Vec<Option<f64>>,
}
