use anyhow::Result;
use chrono::Local;
use tracing::{error, info};

use wind_gen_dashboard::build_app;
use wind_gen_dashboard::config::Config;
use wind_gen_dashboard::models::selection::SelectionState;
use wind_gen_dashboard::services::dashboard_service::DashboardService;
use wind_gen_dashboard::services::forecast_client::ForecastClient;
use wind_gen_dashboard::services::model_loader::ModelLoader;
use wind_gen_dashboard::shared_state::AppState;
use wind_gen_dashboard::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // 1. Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = Config::load_or_default(&config_path)?;
    info!(path = %config_path, forecast = %config.forecast.base_url, "configuration loaded");

    // 2. Load the model artifact; nothing can be served without it
    let loader = ModelLoader::new(&config.model.path);
    let model = match loader.load() {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "cannot start without a model");
            return Err(e.into());
        }
    };

    // 3. Shared state with the initial selection
    let client = ForecastClient::new(&config.forecast)?;
    let initial = SelectionState::initial(&config.selection, Local::now().date_naive());
    let addr = config.server.socket_addr()?;
    let state = AppState::new(config, DashboardService::new(client, model), initial);

    // 4. Start Axum HTTP server
    let app = build_app(state);
    info!("Dashboard listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
