use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::models::dashboard::DashboardView;
use crate::models::selection::{reduce, SelectionEvent, SelectionState, Transition};
use crate::services::dashboard_service::DashboardService;

/// Latest rendered view together with the sequence number of the run that produced it.
#[derive(Debug, Default)]
struct LatestView {
    seq: u64,
    view: Option<DashboardView>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<DashboardService>,
    /// The single session selection
    selection: Arc<RwLock<SelectionState>>,
    latest: Arc<RwLock<LatestView>>,
    next_seq: Arc<AtomicU64>,
    /// Set by a map click, cleared by the next render
    loading: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config, service: DashboardService, initial: SelectionState) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            selection: Arc::new(RwLock::new(initial)),
            latest: Arc::new(RwLock::new(LatestView::default())),
            next_seq: Arc::new(AtomicU64::new(1)),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn selection(&self) -> SelectionState {
        match self.selection.read() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Reduce `event` against the current selection under the write lock.
    pub fn apply(&self, event: SelectionEvent) -> Transition {
        let mut current = match self.selection.write() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let transition = reduce(&current, event, self.config.selection.max_span_days);
        if transition.changed {
            *current = transition.state;
        }
        if transition.loading {
            self.mark_loading();
        }
        transition
    }

    /// Ticket for a new pipeline run; later runs get larger numbers.
    pub fn begin_run(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish a finished run unless a newer one has already been published.
    /// Returns whether `view` became the latest.
    pub fn publish(&self, seq: u64, view: DashboardView) -> bool {
        let mut latest = match self.latest.write() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seq <= latest.seq {
            tracing::debug!(seq, current = latest.seq, "discarding stale dashboard run");
            return false;
        }
        latest.seq = seq;
        latest.view = Some(view);
        true
    }

    pub fn latest_view(&self) -> Option<DashboardView> {
        match self.latest.read() {
            Ok(l) => l.view.clone(),
            Err(poisoned) => poisoned.into_inner().view.clone(),
        }
    }

    pub fn mark_loading(&self) {
        self.loading.store(true, Ordering::Relaxed);
    }

    /// Consume the loading flag; `true` at most once per map click.
    pub fn take_loading(&self) -> bool {
        self.loading.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use chrono::NaiveDate;

    use crate::services::forecast_client::ForecastClient;
    use crate::services::model_loader::{tests::forest_json, WindModel};
    use crate::services::presentation::{render, RunStamp};

    fn state() -> AppState {
        let config = Config::default();
        let client = ForecastClient::new(&config.forecast).unwrap();
        let model = WindModel::from_json_str(Path::new("mem"), &forest_json()).unwrap();
        let initial = SelectionState::initial(
            &config.selection,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        AppState::new(config, DashboardService::new(client, Arc::new(model)), initial)
    }

    fn view_for(state: &AppState) -> DashboardView {
        render(&state.selection(), &Ok(Vec::new()), Vec::new(), RunStamp::now())
    }

    #[test]
    fn test_stale_run_does_not_replace_newer_view() {
        let state = state();
        let older = state.begin_run();
        let newer = state.begin_run();
        assert!(newer > older);

        let fresh = view_for(&state);
        assert!(state.publish(newer, fresh.clone()));
        assert!(!state.publish(older, view_for(&state)));
        assert_eq!(state.latest_view().unwrap().run_id, fresh.run_id);
    }

    #[test]
    fn test_map_click_sets_loading_once() {
        let state = state();
        let t = state.apply(SelectionEvent::MapClick { lat: -40.0, lng: -72.0, zoom: 7 });
        assert!(t.changed);
        assert_eq!(state.selection().latitude, -40.0);
        assert!(state.take_loading());
        assert!(!state.take_loading());
    }

    #[test]
    fn test_unchanged_click_leaves_state_alone() {
        let state = state();
        let before = state.selection();
        let t = state.apply(SelectionEvent::MapClick { lat: before.latitude, lng: before.longitude, zoom: 12 });
        assert!(!t.changed);
        assert_eq!(state.selection(), before);
        assert!(!state.take_loading());
    }
}
