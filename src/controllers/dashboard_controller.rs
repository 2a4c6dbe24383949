use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::models::dashboard::{DashboardView, DateRangeRequest, HealthStatus, MapClickRequest, StatusMessage};
use crate::models::selection::{SelectionEvent, SelectionState};
use crate::services::dashboard_service::run_dashboard;
use crate::services::model_loader::ModelMetadata;
use crate::shared_state::AppState;

fn validate_coordinate(lat: f64, lng: f64) -> Result<(), ApiError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(ApiError::BadRequest("coordinates must be finite numbers".into()));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::BadRequest(format!("latitude {} is outside [-90, 90]", lat)));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::BadRequest(format!("longitude {} is outside [-180, 180]", lng)));
    }
    Ok(())
}

/// Latest published view, or a fresh run if nothing has been rendered yet.
async fn current_view(state: &AppState) -> DashboardView {
    match state.latest_view() {
        Some(view) => view,
        None => run_dashboard(state, Vec::new()).await,
    }
}

/// GET /api/selection
/// Current map coordinate, zoom and date range
#[utoipa::path(
    get,
    path = "/api/selection",
    responses(
        (status = 200, description = "Current selection", body = SelectionState)
    )
)]
pub async fn get_selection(State(state): State<AppState>) -> Json<SelectionState> {
    Json(state.selection())
}

/// POST /api/selection/map-click
/// Move the marker to the clicked coordinate
///
/// Clicking the coordinate that is already selected does not re-fetch the forecast.
#[utoipa::path(
    post,
    path = "/api/selection/map-click",
    request_body = MapClickRequest,
    responses(
        (status = 200, description = "Dashboard for the selected point", body = DashboardView),
        (status = 400, description = "Coordinate out of range")
    )
)]
pub async fn map_click(
    State(state): State<AppState>,
    Json(req): Json<MapClickRequest>,
) -> Result<Json<DashboardView>, ApiError> {
    validate_coordinate(req.lat, req.lng)?;
    let transition = state.apply(SelectionEvent::MapClick { lat: req.lat, lng: req.lng, zoom: req.zoom });
    if !transition.refetch {
        return Ok(Json(current_view(&state).await));
    }
    tracing::info!(lat = req.lat, lng = req.lng, zoom = req.zoom, "location selected");
    Ok(Json(run_dashboard(&state, Vec::new()).await))
}

/// POST /api/selection/dates
/// Change the forecast date range
///
/// Ranges longer than the configured maximum (16 days) are clamped, not rejected;
/// the view then carries a warning notice.
#[utoipa::path(
    post,
    path = "/api/selection/dates",
    request_body = DateRangeRequest,
    responses(
        (status = 200, description = "Dashboard for the new range", body = DashboardView)
    )
)]
pub async fn set_dates(
    State(state): State<AppState>,
    Json(req): Json<DateRangeRequest>,
) -> Json<DashboardView> {
    let transition = state.apply(SelectionEvent::DateChange { start: req.start_date, end: req.end_date });
    let notices: Vec<StatusMessage> = transition
        .warning
        .iter()
        .map(|w| StatusMessage::warning(w.message()))
        .collect();

    if let Some(w) = &transition.warning {
        tracing::warn!(warning = ?w, "date range adjusted");
    }

    if transition.refetch {
        return Json(run_dashboard(&state, notices).await);
    }
    let mut view = current_view(&state).await;
    view.notices.extend(notices);
    Json(view)
}

/// GET /api/dashboard
/// Latest dashboard view
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Latest dashboard view", body = DashboardView)
    )
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(current_view(&state).await)
}

/// POST /api/dashboard/refresh
/// Re-run the forecast and prediction for the current selection
#[utoipa::path(
    post,
    path = "/api/dashboard/refresh",
    responses(
        (status = 200, description = "Freshly computed dashboard view", body = DashboardView)
    )
)]
pub async fn refresh_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(run_dashboard(&state, Vec::new()).await)
}

/// GET /api/model
/// Metadata of the loaded regression model
#[utoipa::path(
    get,
    path = "/api/model",
    responses(
        (status = 200, description = "Model metadata", body = ModelMetadata)
    )
)]
pub async fn get_model(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.service.model().metadata().clone())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_id: state.service.model().metadata().model_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(validate_coordinate(-33.45, -70.66).is_ok());
        assert!(validate_coordinate(90.0, 180.0).is_ok());
        assert!(validate_coordinate(90.5, 0.0).is_err());
        assert!(validate_coordinate(0.0, -181.0).is_err());
        assert!(validate_coordinate(f64::NAN, 0.0).is_err());
    }
}
