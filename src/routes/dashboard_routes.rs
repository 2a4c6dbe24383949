use axum::{routing::{get, post}, Router};
use crate::controllers::dashboard_controller::{
    // Selection
    get_selection, map_click, set_dates,
    // Dashboard
    get_dashboard, refresh_dashboard,
    // Model & service
    get_model, health,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/selection",           get(get_selection))
        .route("/selection/map-click", post(map_click))
        .route("/selection/dates",     post(set_dates))
        .route("/dashboard",           get(get_dashboard))
        .route("/dashboard/refresh",   post(refresh_dashboard))
        .route("/model",               get(get_model))
        .with_state(state)
}

/// Liveness probe, mounted at the root.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}
