use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::selection::SelectionState;

// ─── Dashboard projection ───────────────────────────────────────────────────

/// Everything the frontend needs to draw one dashboard frame.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardView {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub selection: SelectionState,
    pub map: MapView,
    pub notices: Vec<StatusMessage>,
    /// `None` when the run failed; the error is then the last notice.
    pub body: Option<DashboardBody>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardBody {
    pub summary: Summary,
    pub table: Vec<TableRow>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Single-marker map, re-centred on every selection change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct MapView {
    pub center: LatLng,
    pub marker: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }
}

// ─── Summary cards ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Summary {
    /// Sum of hourly predictions (MWh)
    pub total_generation: f64,
    /// Largest hourly prediction (MWh); `None` for an empty forecast
    pub max_generation: Option<f64>,
    /// Mean 10 m wind speed (m/s); `None` for an empty forecast
    pub mean_wind_speed_10m: Option<f64>,
    pub cards: Vec<SummaryCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SummaryCard {
    pub title: String,
    pub display: String,
    /// CSS background colour of the card
    pub accent: String,
}

// ─── Table and chart ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TableRow {
    pub time: NaiveDateTime,
    pub predicted_generation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GradientStop {
    pub color: String,
    pub offset: f64,
}

/// Area chart of predicted generation over time.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartSpec {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub line_color: String,
    pub gradient: Vec<GradientStop>,
    pub opacity: f64,
    pub points: Vec<TableRow>,
}

// ─── Request bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, serde::Deserialize, ToSchema)]
pub struct MapClickRequest {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, ToSchema)]
pub struct DateRangeRequest {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub model_id: String,
}
