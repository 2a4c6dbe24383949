//! Pure projection of pipeline output into a [`DashboardView`].
//! Nothing here talks to the network or the model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::dashboard::{
    ChartSpec, DashboardBody, DashboardView, GradientStop, LatLng, MapView, StatusMessage,
    Summary, SummaryCard, TableRow,
};
use crate::models::forecast::PredictionRecord;
use crate::models::selection::SelectionState;

const LINE_COLOR: &str = "#0d3b66";
const GRADIENT_END: &str = "#a9cfe7";
const AREA_OPACITY: f64 = 0.5;

/// Identity of the pipeline run being rendered.
#[derive(Debug, Clone, Copy)]
pub struct RunStamp {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

impl RunStamp {
    pub fn now() -> Self {
        Self { run_id: Uuid::new_v4(), generated_at: Utc::now() }
    }
}

pub fn map_view(selection: &SelectionState) -> MapView {
    let point = LatLng { lat: selection.latitude, lng: selection.longitude };
    MapView { center: point, marker: point, zoom: selection.zoom }
}

/// `1234567.4` -> `"1,234,567"`
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

pub fn summarize(records: &[PredictionRecord]) -> Summary {
    let total_generation: f64 = records.iter().map(|r| r.predicted_generation).sum();
    let max_generation = records.iter().map(|r| r.predicted_generation).reduce(f64::max);

    let winds: Vec<f64> = records.iter().filter_map(|r| r.forecast.wind_speed_10m).collect();
    let mean_wind_speed_10m =
        (!winds.is_empty()).then(|| winds.iter().sum::<f64>() / winds.len() as f64);

    let cards = vec![
        SummaryCard {
            title: "Total generation".into(),
            display: format!("{} MWh", format_thousands(total_generation)),
            accent: "#e0f3f8".into(),
        },
        SummaryCard {
            title: "Peak hourly generation".into(),
            display: max_generation
                .map(|v| format!("{:.0} MWh", v))
                .unwrap_or_else(|| "n/a".into()),
            accent: "#fce8e6".into(),
        },
        SummaryCard {
            title: "Average wind speed".into(),
            display: mean_wind_speed_10m
                .map(|v| format!("{:.1} m/s", v))
                .unwrap_or_else(|| "n/a".into()),
            accent: "#e8f7e4".into(),
        },
    ];

    Summary { total_generation, max_generation, mean_wind_speed_10m, cards }
}

pub fn table(records: &[PredictionRecord]) -> Vec<TableRow> {
    records
        .iter()
        .map(|r| TableRow { time: r.forecast.time, predicted_generation: r.predicted_generation })
        .collect()
}

pub fn chart(records: &[PredictionRecord], selection: &SelectionState) -> ChartSpec {
    ChartSpec {
        title: format!(
            "Wind generation forecast ({} → {})",
            selection.start_date, selection.end_date
        ),
        x_title: "Time".into(),
        y_title: "Wind generation (MWh)".into(),
        line_color: LINE_COLOR.into(),
        gradient: vec![
            GradientStop { color: LINE_COLOR.into(), offset: 0.0 },
            GradientStop { color: GRADIENT_END.into(), offset: 1.0 },
        ],
        opacity: AREA_OPACITY,
        points: table(records),
    }
}

/// Render one run. A failed run keeps the map but drops summary, table and chart.
pub fn render(
    selection: &SelectionState,
    outcome: &Result<Vec<PredictionRecord>, AppError>,
    mut notices: Vec<StatusMessage>,
    stamp: RunStamp,
) -> DashboardView {
    let body = match outcome {
        Ok(records) => Some(DashboardBody {
            summary: summarize(records),
            table: table(records),
            chart: chart(records, selection),
        }),
        Err(err) => {
            notices.push(StatusMessage::error(err.to_string()));
            None
        }
    };

    DashboardView {
        run_id: stamp.run_id,
        generated_at: stamp.generated_at,
        selection: *selection,
        map: map_view(selection),
        notices,
        body,
    }
}
