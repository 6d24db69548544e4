// ── API call accounting ──
//
// Every Dashboard call a hub makes goes through `ApiStats::track`, which
// counts it, remembers the last failure, and keeps a short window of call
// durations for the average shown in diagnostics.

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How many call durations feed the running average.
pub const DURATION_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct Window {
    last_error: Option<String>,
    durations: VecDeque<Duration>,
}

#[derive(Debug, Default)]
pub struct ApiStats {
    total: AtomicU64,
    failed: AtomicU64,
    window: Mutex<Window>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiStatsSnapshot {
    pub total_api_calls: u64,
    pub failed_api_calls: u64,
    pub last_api_call_error: Option<String>,
    pub average_call_duration_ms: f64,
}

impl ApiStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await `call`, recording its duration and outcome.
    pub async fn track<T, E, F>(&self, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let result = call.await;
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut window = self.window.lock().await;
        window.durations.push_back(started.elapsed());
        while window.durations.len() > DURATION_WINDOW {
            window.durations.pop_front();
        }
        if let Err(ref e) = result {
            self.failed.fetch_add(1, Ordering::Relaxed);
            window.last_error = Some(e.to_string());
        }
        result
    }

    /// Forget the last error, e.g. after a clean setup.
    pub async fn clear_error(&self) {
        self.window.lock().await.last_error = None;
    }

    pub fn total_calls(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn failed_calls(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> ApiStatsSnapshot {
        let window = self.window.lock().await;
        let average_call_duration_ms = if window.durations.is_empty() {
            0.0
        } else {
            let sum: Duration = window.durations.iter().sum();
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let avg = sum.as_secs_f64() * 1_000.0 / window.durations.len() as f64;
            (avg * 100.0).round() / 100.0
        };
        ApiStatsSnapshot {
            total_api_calls: self.total_calls(),
            failed_api_calls: self.failed_calls(),
            last_api_call_error: window.last_error.clone(),
            average_call_duration_ms,
        }
    }
}
