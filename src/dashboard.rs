use crate::api::{HistoricalPoint, PredictionApi, PredictionResult};
use crate::config::{REFRESH_EPOCHS, REFRESH_PERIOD};
use crate::error::ApiError;
use crate::selection::{AssetClass, Selection, TimeRange};
use crate::state::{HistorySeries, Notice, PendingFlag, PendingGuard, PredictionSlot};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

pub const PREDICTION_FAILED: &str = "Error fetching prediction. Please try again.";
pub const REFRESH_SUCCEEDED: &str = "Model refresh completed successfully";
pub const REFRESH_FAILED: &str = "Error refreshing model. Please try again.";

/// Results sent back from background requests to the UI loop.
pub enum TaskEvent {
    History {
        request_id: u64,
        outcome: Result<Vec<HistoricalPoint>, ApiError>,
    },
    /// Carries the pending guard so the flag is released once the event has
    /// been applied or dropped, whichever happens first.
    Prediction {
        outcome: Result<PredictionResult, ApiError>,
        guard: PendingGuard,
    },
    ModelRefresh {
        symbol: String,
        outcome: Result<(), ApiError>,
    },
}

pub struct Dashboard {
    api: Arc<dyn PredictionApi>,
    selection: Selection,
    history: HistorySeries,
    prediction: PredictionSlot,
    pending: PendingFlag,
    /// Shown one at a time, oldest first.
    notices: VecDeque<Notice>,
    tx: mpsc::UnboundedSender<TaskEvent>,
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn PredictionApi>, selection: Selection) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            selection,
            history: HistorySeries::default(),
            prediction: PredictionSlot::default(),
            pending: PendingFlag::default(),
            notices: VecDeque::new(),
            tx,
            rx,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &HistorySeries {
        &self.history
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.get()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_set()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    /// Initial load for the default selection.
    pub fn start(&mut self) {
        self.load_history();
    }

    pub fn set_asset_class(&mut self, asset_class: AssetClass) {
        if self.selection.set_asset_class(asset_class) {
            self.load_history();
        }
    }

    pub fn toggle_asset_class(&mut self) {
        self.set_asset_class(self.selection.asset_class().toggled());
    }

    pub fn select_symbol(&mut self, symbol: &str) {
        if self.selection.select_symbol(symbol) {
            self.load_history();
        }
    }

    pub fn next_symbol(&mut self) {
        if self.selection.next_symbol() {
            self.load_history();
        }
    }

    pub fn prev_symbol(&mut self) {
        if self.selection.prev_symbol() {
            self.load_history();
        }
    }

    pub fn set_time_range(&mut self, time_range: TimeRange) {
        if self.selection.set_time_range(time_range) {
            self.load_history();
        }
    }

    pub fn next_range(&mut self) {
        self.set_time_range(self.selection.time_range().next());
    }

    pub fn prev_range(&mut self) {
        self.set_time_range(self.selection.time_range().prev());
    }

    /// Fetches the series for the current selection. One attempt; failures
    /// fall back to the built-in series when the response is applied.
    pub fn load_history(&mut self) {
        let request_id = self.history.begin_load();
        let symbol = self.selection.symbol().to_string();
        let range = self.selection.time_range();
        info!("Loading history #{} for {} ({})", request_id, symbol, range.label());

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = api.historical(&symbol, range).await;
            let _ = tx.send(TaskEvent::History { request_id, outcome });
        });
    }

    /// Returns false when a prediction is already in flight.
    pub fn request_prediction(&mut self) -> bool {
        let Some(guard) = self.pending.acquire() else {
            return false;
        };
        let symbol = self.selection.symbol().to_string();
        let asset_class = self.selection.asset_class();
        info!("Requesting prediction for {} ({})", symbol, asset_class.as_str());

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = api.predict(&symbol, asset_class).await;
            let _ = tx.send(TaskEvent::Prediction { outcome, guard });
        });
        true
    }

    pub fn refresh_model(&mut self) {
        let symbol = self.selection.symbol().to_string();
        info!(
            "Refreshing model for {} (period={}, epochs={})",
            symbol, REFRESH_PERIOD, REFRESH_EPOCHS
        );

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = api.update_model(&symbol, REFRESH_PERIOD, REFRESH_EPOCHS).await;
            let _ = tx.send(TaskEvent::ModelRefresh { symbol, outcome });
        });
    }

    /// Applies every result that has arrived since the last tick.
    pub fn poll(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
        }
    }

    /// Waits for the next background result and applies it.
    pub async fn next_event(&mut self) {
        if let Some(event) = self.rx.recv().await {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::History { request_id, outcome } => {
                self.history.apply(request_id, outcome);
            }
            TaskEvent::Prediction { outcome, guard } => {
                if let Err(e) = &outcome {
                    error!("Error fetching prediction: {}", e);
                    self.notices.push_back(Notice::error(PREDICTION_FAILED));
                }
                self.prediction.apply(&outcome);
                drop(guard);
            }
            TaskEvent::ModelRefresh { symbol, outcome } => match outcome {
                Ok(()) => {
                    info!("Model refresh for {} completed", symbol);
                    self.notices.push_back(Notice::success(REFRESH_SUCCEEDED));
                }
                Err(e) => {
                    error!("Error refreshing model for {}: {}", symbol, e);
                    self.notices.push_back(Notice::error(REFRESH_FAILED));
                }
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::state::{SeriesSource, fallback_series};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn dashboard(api: &Arc<FakeApi>) -> Dashboard {
        Dashboard::new(api.clone(), Selection::default())
    }

    fn point(day: u32, price: f64) -> HistoricalPoint {
        HistoricalPoint::new(NaiveDate::from_ymd_opt(2025, 9, day).unwrap(), price)
    }

    #[tokio::test]
    async fn test_initial_load_failure_shows_fallback() {
        let api = Arc::new(FakeApi::default());
        let mut dash = dashboard(&api);

        dash.start();
        dash.next_event().await;

        assert_eq!(api.calls.lock().unwrap().as_slice(), ["historical symbol=TSLA&range=1m"]);
        let series = dash.history().points();
        assert_eq!(series, fallback_series().as_slice());
        assert_eq!(series.first().map(|p| p.price), Some(245.20));
        assert_eq!(series.last().map(|p| p.price), Some(256.42));
        assert!(dash.notice().is_none());
    }

    #[tokio::test]
    async fn test_every_selection_falls_back_on_failure() {
        let api = Arc::new(FakeApi::default());

        for class in [AssetClass::Stock, AssetClass::Crypto] {
            for entry in crate::selection::catalog(class) {
                for range in TimeRange::ALL {
                    let mut dash = Dashboard::new(api.clone(), Selection::new(entry.value, class, range));
                    dash.start();
                    dash.next_event().await;
                    assert_eq!(dash.history().points(), fallback_series().as_slice());
                    assert_eq!(dash.history().source(), SeriesSource::Fallback);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_successful_load_replaces_series() {
        let api = Arc::new(FakeApi::default());
        let series = vec![point(1, 100.0), point(2, 101.0)];
        api.series.lock().unwrap().insert("TSLA".into(), series.clone());
        let mut dash = dashboard(&api);

        dash.start();
        dash.next_event().await;

        assert_eq!(dash.history().points(), series.as_slice());
        assert_eq!(dash.history().source(), SeriesSource::Backend);
    }

    #[tokio::test]
    async fn test_selection_changes_trigger_loads() {
        let api = Arc::new(FakeApi::default());
        let mut dash = dashboard(&api);

        dash.set_time_range(TimeRange::OneYear);
        dash.set_time_range(TimeRange::OneYear);
        dash.select_symbol("AAPL");
        dash.set_asset_class(AssetClass::Crypto);
        for _ in 0..3 {
            dash.next_event().await;
        }

        let mut calls = api.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "historical symbol=AAPL&range=1y",
                "historical symbol=BTC-USD&range=1y",
                "historical symbol=TSLA&range=1y",
            ]
        );
    }

    #[tokio::test]
    async fn test_slow_stale_response_does_not_win() {
        let api = Arc::new(FakeApi::default());
        api.series.lock().unwrap().insert("TSLA".into(), vec![point(1, 1.0)]);
        api.series.lock().unwrap().insert("AAPL".into(), vec![point(1, 2.0)]);
        api.delays.lock().unwrap().insert("TSLA".into(), Duration::from_millis(150));
        let mut dash = dashboard(&api);

        dash.start();
        dash.select_symbol("AAPL");
        dash.next_event().await;
        dash.next_event().await;

        assert_eq!(dash.history().points(), [point(1, 2.0)].as_slice());
    }

    #[tokio::test]
    async fn test_prediction_success_replaces_result() {
        let api = Arc::new(FakeApi::default());
        *api.prediction.lock().unwrap() = Some(sample_prediction("AAPL", -1.5));
        let mut dash = dashboard(&api);
        dash.select_symbol("AAPL");
        dash.next_event().await;

        assert!(dash.request_prediction());
        assert!(dash.is_pending());
        assert!(!dash.request_prediction());
        dash.next_event().await;

        assert!(!dash.is_pending());
        assert_eq!(dash.prediction(), Some(&sample_prediction("AAPL", -1.5)));
        assert!(dash.notice().is_none());
        assert!(
            api.calls
                .lock()
                .unwrap()
                .contains(&"predict symbol=AAPL&type=stock".to_string())
        );
    }

    #[tokio::test]
    async fn test_prediction_failure_keeps_null_result() {
        let api = Arc::new(FakeApi::default());
        let mut dash = dashboard(&api);

        dash.request_prediction();
        dash.next_event().await;

        assert!(!dash.is_pending());
        assert!(dash.prediction().is_none());
        assert_eq!(dash.notice(), Some(&Notice::error(PREDICTION_FAILED)));
    }

    #[tokio::test]
    async fn test_prediction_failure_keeps_previous_result() {
        let api = Arc::new(FakeApi::default());
        *api.prediction.lock().unwrap() = Some(sample_prediction("TSLA", 4.83));
        let mut dash = dashboard(&api);

        dash.request_prediction();
        dash.next_event().await;
        *api.prediction.lock().unwrap() = None;
        dash.request_prediction();
        dash.next_event().await;

        assert!(!dash.is_pending());
        assert_eq!(dash.prediction(), Some(&sample_prediction("TSLA", 4.83)));
        assert!(dash.notice().is_some());
    }

    #[tokio::test]
    async fn test_pending_released_when_event_is_dropped() {
        let api = Arc::new(FakeApi::default());
        let mut dash = dashboard(&api);

        dash.request_prediction();
        let event = dash.rx.recv().await;
        assert!(dash.is_pending());
        drop(event);
        assert!(!dash.is_pending());
    }

    #[tokio::test]
    async fn test_refresh_uses_fixed_parameters() {
        let api = Arc::new(FakeApi::default());
        let mut dash = Dashboard::new(
            api.clone(),
            Selection::new("BTC-USD", AssetClass::Crypto, TimeRange::All),
        );

        dash.refresh_model();
        dash.next_event().await;

        assert_eq!(
            api.calls.lock().unwrap().as_slice(),
            ["update_model symbol=BTC-USD&period=1y&epochs=30"]
        );
        assert_eq!(dash.notice(), Some(&Notice::success(REFRESH_SUCCEEDED)));
        assert!(dash.prediction().is_none());
        assert_eq!(dash.history().source(), SeriesSource::Empty);

        dash.dismiss_notice();
        *api.refresh_fails.lock().unwrap() = true;
        dash.refresh_model();
        dash.next_event().await;
        assert_eq!(dash.notice(), Some(&Notice::error(REFRESH_FAILED)));
    }

    #[tokio::test]
    async fn test_later_notice_waits_behind_earlier_one() {
        let api = Arc::new(FakeApi::default());
        *api.refresh_fails.lock().unwrap() = true;
        let mut dash = dashboard(&api);

        dash.request_prediction();
        dash.refresh_model();
        dash.next_event().await;
        dash.next_event().await;

        let mut shown = Vec::new();
        while let Some(notice) = dash.notice() {
            shown.push(notice.message.clone());
            dash.dismiss_notice();
        }
        shown.sort();
        assert_eq!(shown, vec![PREDICTION_FAILED.to_string(), REFRESH_FAILED.to_string()]);
    }
}
