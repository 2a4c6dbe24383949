use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::SelectionConfig;

/// The user's current map coordinate, zoom and date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectionState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    MapClick { lat: f64, lng: f64, zoom: u8 },
    DateChange { start: NaiveDate, end: NaiveDate },
}

/// Non-fatal corrections applied while reducing a date change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionWarning {
    /// The requested range was longer than allowed; the end date was pulled in.
    RangeClamped { requested_days: i64, max_days: u32 },
    /// The end date was before the start date; the range collapsed to one day.
    EndBeforeStart,
}

impl SelectionWarning {
    pub fn message(&self) -> String {
        match self {
            SelectionWarning::RangeClamped { requested_days, max_days } => format!(
                "The maximum allowed range is {} days ({} requested); the end date was adjusted.",
                max_days, requested_days
            ),
            SelectionWarning::EndBeforeStart => {
                "The end date was before the start date; the end date was set to the start date."
                    .to_string()
            }
        }
    }
}

/// Result of applying one event to a selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: SelectionState,
    pub changed: bool,
    /// A new forecast must be fetched for `state`.
    pub refetch: bool,
    /// Show the one-shot loading notice on the next render.
    pub loading: bool,
    pub warning: Option<SelectionWarning>,
}

impl SelectionState {
    /// Default coordinate and a `[today, today + span]` range.
    pub fn initial(cfg: &SelectionConfig, today: NaiveDate) -> Self {
        let end = today
            .checked_add_days(Days::new(u64::from(cfg.default_span_days.min(cfg.max_span_days))))
            .unwrap_or(today);
        Self {
            latitude: cfg.default_latitude,
            longitude: cfg.default_longitude,
            zoom: cfg.default_zoom,
            start_date: today,
            end_date: end,
        }
    }

    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Clamp `(start, end)` so that `0 <= end - start <= max_span_days`.
pub fn clamp_range(
    start: NaiveDate,
    end: NaiveDate,
    max_span_days: u32,
) -> (NaiveDate, NaiveDate, Option<SelectionWarning>) {
    let requested = (end - start).num_days();
    if requested < 0 {
        return (start, start, Some(SelectionWarning::EndBeforeStart));
    }
    if requested > i64::from(max_span_days) {
        let clamped = start
            .checked_add_days(Days::new(u64::from(max_span_days)))
            .unwrap_or(NaiveDate::MAX)
            .min(end);
        let warning = SelectionWarning::RangeClamped {
            requested_days: requested,
            max_days: max_span_days,
        };
        return (start, clamped, Some(warning));
    }
    (start, end, None)
}

/// Pure reducer: `(state, event) -> state`. Never fails; invalid date ranges are clamped.
pub fn reduce(state: &SelectionState, event: SelectionEvent, max_span_days: u32) -> Transition {
    match event {
        SelectionEvent::MapClick { lat, lng, zoom } => {
            if lat == state.latitude && lng == state.longitude {
                return Transition {
                    state: *state,
                    changed: false,
                    refetch: false,
                    loading: false,
                    warning: None,
                };
            }
            let next = SelectionState { latitude: lat, longitude: lng, zoom, ..*state };
            Transition { state: next, changed: true, refetch: true, loading: true, warning: None }
        }
        SelectionEvent::DateChange { start, end } => {
            let (start_date, end_date, warning) = clamp_range(start, end, max_span_days);
            let next = SelectionState { start_date, end_date, ..*state };
            let changed = next != *state;
            Transition { state: next, changed, refetch: changed, loading: false, warning }
        }
    }
}
