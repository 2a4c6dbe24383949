use utoipa::OpenApi;
use crate::controllers::dashboard_controller;
use crate::models::{dashboard, forecast, selection};
use crate::services::model_loader;

#[derive(OpenApi)]
#[openapi(
    paths(
        dashboard_controller::get_selection,
        dashboard_controller::map_click,
        dashboard_controller::set_dates,
        dashboard_controller::get_dashboard,
        dashboard_controller::refresh_dashboard,
        dashboard_controller::get_model,
        dashboard_controller::health
    ),
    components(
        schemas(
            selection::SelectionState,
            dashboard::DashboardView,
            dashboard::MapClickRequest,
            dashboard::DateRangeRequest,
            forecast::HourlyForecastRecord,
            model_loader::ModelMetadata
        )
    ),
    tags(
        (name = "wind-gen-dashboard", description = "Wind generation forecast dashboard API")
    )
)]
pub struct ApiDoc;
