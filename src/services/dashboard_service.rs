use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppError;
use crate::models::dashboard::{DashboardView, StatusMessage};
use crate::models::forecast::PredictionRecord;
use crate::models::selection::SelectionState;
use crate::services::forecast_client::ForecastClient;
use crate::services::model_loader::GenerationModel;
use crate::services::prediction_pipeline;
use crate::services::presentation::{self, RunStamp};
use crate::shared_state::AppState;

pub const LOADING_NOTICE: &str = "Loading data for the new location...";

/// Forecast client plus the loaded model: everything a run needs besides the selection.
pub struct DashboardService {
    client: ForecastClient,
    model: Arc<dyn GenerationModel>,
}

impl DashboardService {
    pub fn new(client: ForecastClient, model: Arc<dyn GenerationModel>) -> Self {
        Self { client, model }
    }

    pub fn model(&self) -> &dyn GenerationModel {
        self.model.as_ref()
    }

    /// Fetch and predict for one selection. Any failure aborts the whole run.
    pub async fn predict(&self, selection: &SelectionState) -> Result<Vec<PredictionRecord>, AppError> {
        let records = self
            .client
            .fetch(selection.latitude, selection.longitude, selection.start_date, selection.end_date)
            .await?;
        prediction_pipeline::enrich(records, selection.latitude, selection.longitude, self.model.as_ref())
    }
}

/// Run the pipeline for the current selection, render it and publish it as the
/// latest view unless a newer run finished first. A superseded run hands back
/// the newer view, so a slow response never paints over a fresher one.
pub async fn run_dashboard(state: &AppState, mut notices: Vec<StatusMessage>) -> DashboardView {
    let seq = state.begin_run();
    let selection = state.selection();
    if state.take_loading() {
        notices.insert(0, StatusMessage::info(LOADING_NOTICE));
    }

    let outcome = state.service.predict(&selection).await;
    match &outcome {
        Ok(records) => info!(
            seq,
            lat = selection.latitude,
            lon = selection.longitude,
            rows = records.len(),
            "dashboard run completed"
        ),
        Err(e) => warn!(seq, error = %e, "dashboard run failed"),
    }

    let view = presentation::render(&selection, &outcome, notices, RunStamp::now());
    if state.publish(seq, view.clone()) {
        return view;
    }
    state.latest_view().unwrap_or(view)
}
