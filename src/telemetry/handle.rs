//! Shared tracker access and the recurring tick task.
//!
//! [`TrackerHandle`] is the cloneable view the dispatcher feeds samples into.
//! [`TelemetryService`] owns the tick task and produces the final report on
//! shutdown, exactly once.

use super::report::{ReportSink, SessionReport};
use super::tracker::{SpeedSnapshot, TelemetryTracker};
use super::TelemetryError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub wheel_diameter_mm: f64,
    pub tick_interval_ms: u64,
    /// Falls back to the platform data directory when unset
    pub report_dir: Option<PathBuf>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            wheel_diameter_mm: 700.0,
            tick_interval_ms: 1000,
            report_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackerHandle {
    tracker: Arc<Mutex<TelemetryTracker>>,
}

impl TrackerHandle {
    pub fn new(tracker: TelemetryTracker) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
        }
    }

    pub async fn add_sample(&self, rpm: f64, wheel_diameter_mm: f64) -> Result<(), TelemetryError> {
        self.tracker.lock().await.add_sample(rpm, wheel_diameter_mm)
    }

    pub async fn tick(&self) -> SpeedSnapshot {
        self.tracker.lock().await.tick()
    }

    pub async fn snapshot(&self) -> SpeedSnapshot {
        self.tracker.lock().await.snapshot()
    }

    pub async fn build_report(&self) -> SessionReport {
        self.tracker.lock().await.build_report()
    }

    pub async fn reset(&self) {
        self.tracker.lock().await.reset();
    }

    pub async fn window_len(&self) -> usize {
        self.tracker.lock().await.window_len()
    }
}

pub struct TelemetryService {
    tracker: TrackerHandle,
    sink: Arc<dyn ReportSink>,
    cancel: CancellationToken,
    ticker: Mutex<Option<JoinHandle<()>>>,
    finished: AtomicBool,
}

impl TelemetryService {
    /// Starts a fresh session and its tick task
    pub fn start(settings: &TelemetrySettings, sink: Arc<dyn ReportSink>) -> Self {
        Self::with_tracker(TrackerHandle::default(), settings, sink)
    }

    pub fn with_tracker(
        tracker: TrackerHandle,
        settings: &TelemetrySettings,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let period = Duration::from_millis(settings.tick_interval_ms.max(1));
        let cancel = CancellationToken::new();
        let ticker = tokio::spawn(run_tick_loop(tracker.clone(), period, cancel.clone()));

        info!("Telemetry session started ({}ms ticks)", period.as_millis());
        Self {
            tracker,
            sink,
            cancel,
            ticker: Mutex::new(Some(ticker)),
            finished: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.tracker.clone()
    }

    /// Stops ticking and writes the session report.
    ///
    /// Only the first call writes; later calls return `Ok(None)`.
    pub async fn shutdown(&self) -> Result<Option<SessionReport>, TelemetryError> {
        if self.finished.swap(true, Ordering::SeqCst) {
            debug!("Telemetry already shut down");
            return Ok(None);
        }

        self.cancel.cancel();
        if let Some(ticker) = self.ticker.lock().await.take() {
            if let Err(e) = ticker.await {
                error!("Tick task panicked: {}", e);
                return Err(TelemetryError::ThreadError(format!(
                    "Tick task panicked: {}",
                    e
                )));
            }
        }

        let report = self.tracker.build_report().await;
        self.sink.write(&report).await?;
        info!(
            "Session finished after {}: {}",
            report.session_info.duration, report.distance_metrics.total_distance
        );
        Ok(Some(report))
    }
}

async fn run_tick_loop(tracker: TrackerHandle, period: Duration, cancel: CancellationToken) {
    let mut interval_timer = interval_at(Instant::now() + period, period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Tick loop cancelled after {} ticks", ticks);
                break;
            }
            _ = interval_timer.tick() => {
                let snapshot = tracker.tick().await;
                ticks += 1;

                let now = Local::now();
                if now - last_stats_time > stats_interval {
                    info!(
                        "Telemetry: {:.2} km/h, {:.2} m total ({} ticks)",
                        snapshot.speed_kmh, snapshot.total_distance_m, ticks
                    );
                    last_stats_time = now;
                }
            }
        }
    }
}

impl Drop for TelemetryService {
    fn drop(&mut self) {
        if !self.finished.load(Ordering::SeqCst) {
            warn!("Telemetry service dropped without shutdown, no report written");
            self.cancel.cancel();
        }
    }
}
