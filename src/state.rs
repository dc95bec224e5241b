use crate::api::{HistoricalPoint, PredictionResult};
use crate::error::ApiError;
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

const FALLBACK_SERIES: [(u32, f64); 8] = [
    (18, 245.20),
    (19, 248.50),
    (20, 252.30),
    (21, 249.80),
    (22, 253.40),
    (23, 255.60),
    (24, 254.20),
    (25, 256.42),
];

/// Series shown whenever the historical endpoint cannot be used.
pub fn fallback_series() -> Vec<HistoricalPoint> {
    FALLBACK_SERIES
        .iter()
        .filter_map(|(day, price)| {
            NaiveDate::from_ymd_opt(2025, 10, *day).map(|date| HistoricalPoint::new(date, *price))
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesSource {
    Empty,
    Backend,
    Fallback,
}

/// Historical prices for the current selection.
///
/// Each load is tagged with a monotonically increasing id; only the most
/// recently issued id may replace the series, so a slow response for an old
/// selection cannot overwrite a newer one.
#[derive(Debug)]
pub struct HistorySeries {
    points: Vec<HistoricalPoint>,
    source: SeriesSource,
    latest_request: u64,
}

impl Default for HistorySeries {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            source: SeriesSource::Empty,
            latest_request: 0,
        }
    }
}

impl HistorySeries {
    pub fn points(&self) -> &[HistoricalPoint] {
        &self.points
    }

    pub fn source(&self) -> SeriesSource {
        self.source
    }

    pub fn begin_load(&mut self) -> u64 {
        self.latest_request += 1;
        self.latest_request
    }

    /// Returns false when the response was stale and dropped.
    pub fn apply(&mut self, request_id: u64, outcome: Result<Vec<HistoricalPoint>, ApiError>) -> bool {
        if request_id != self.latest_request {
            debug!(
                "Dropping stale history response #{} (latest #{})",
                request_id, self.latest_request
            );
            return false;
        }
        match outcome {
            Ok(points) => {
                self.points = points;
                self.source = SeriesSource::Backend;
            }
            Err(e) => {
                warn!("Error fetching historical data: {}. Using fallback series.", e);
                self.points = fallback_series();
                self.source = SeriesSource::Fallback;
            }
        }
        true
    }
}

/// Latest successful prediction.
#[derive(Debug, Default)]
pub struct PredictionSlot {
    current: Option<PredictionResult>,
}

impl PredictionSlot {
    pub fn get(&self) -> Option<&PredictionResult> {
        self.current.as_ref()
    }

    /// Failures leave the previous value in place.
    pub fn apply(&mut self, outcome: &Result<PredictionResult, ApiError>) {
        if let Ok(result) = outcome {
            self.current = Some(result.clone());
        }
    }
}

/// True while a prediction request is in flight.
#[derive(Clone, Debug, Default)]
pub struct PendingFlag(Arc<AtomicBool>);

impl PendingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag and returns a guard that clears it when dropped, or
    /// `None` if a request is already pending.
    pub fn acquire(&self) -> Option<PendingGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| PendingGuard(self.0.clone()))
    }
}

#[derive(Debug)]
pub struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Modal message; while shown it swallows all input except dismissal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: &str) -> Self {
        Self { kind: NoticeKind::Success, message: message.to_string() }
    }

    pub fn error(message: &str) -> Self {
        Self { kind: NoticeKind::Error, message: message.to_string() }
    }
}
