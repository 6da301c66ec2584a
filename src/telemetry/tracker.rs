//! Sliding-window RPM to speed/distance estimator.
//!
//! Samples are collected as they arrive; once per tick the window is reduced to
//! the trailing second, averaged into a speed, and the previous tick's speed
//! bucket is credited with the wall-clock time since that tick.

use super::buckets::{bucket_index, SpeedBuckets};
use super::report::{SessionFigures, SessionReport};
use super::TelemetryError;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Samples older than this (relative to the newest tick or sample) are dropped
pub const WINDOW_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpmSample {
    pub rpm: f64,
    pub wheel_diameter_mm: f64,
    pub sampled_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedSnapshot {
    pub speed_mps: f64,
    pub speed_kmh: f64,
    pub total_distance_m: f64,
}

#[derive(Debug, Clone)]
pub struct TelemetryTracker {
    started_at: DateTime<Local>,
    rpm_window: VecDeque<RpmSample>,
    total_distance_m: f64,
    current_speed_mps: f64,
    max_speed_kmh: f64,
    speed_readings: Vec<f64>,
    buckets: SpeedBuckets,
    // bucket of the speed computed at the previous tick
    current_bucket: Option<usize>,
    last_tick_at: DateTime<Local>,
}

impl Default for TelemetryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTracker {
    pub fn new() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn starting_at(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            rpm_window: VecDeque::new(),
            total_distance_m: 0.0,
            current_speed_mps: 0.0,
            max_speed_kmh: 0.0,
            speed_readings: Vec::new(),
            buckets: SpeedBuckets::new(),
            current_bucket: bucket_index(0.0),
            last_tick_at: started_at,
        }
    }

    pub fn add_sample(&mut self, rpm: f64, wheel_diameter_mm: f64) -> Result<(), TelemetryError> {
        self.add_sample_at(rpm, wheel_diameter_mm, Local::now())
    }

    pub fn add_sample_at(
        &mut self,
        rpm: f64,
        wheel_diameter_mm: f64,
        at: DateTime<Local>,
    ) -> Result<(), TelemetryError> {
        if !rpm.is_finite()
            || rpm < 0.0
            || !wheel_diameter_mm.is_finite()
            || wheel_diameter_mm <= 0.0
        {
            warn!(
                "Rejecting sample: rpm {}, wheel diameter {}mm",
                rpm, wheel_diameter_mm
            );
            return Err(TelemetryError::InvalidSample {
                rpm,
                wheel_diameter_mm,
            });
        }

        self.rpm_window.push_back(RpmSample {
            rpm,
            wheel_diameter_mm,
            sampled_at: at,
        });
        self.evict_stale(at);
        Ok(())
    }

    pub fn tick(&mut self) -> SpeedSnapshot {
        self.tick_at(Local::now())
    }

    /// Recomputes speed from the window and accounts dwell time
    pub fn tick_at(&mut self, at: DateTime<Local>) -> SpeedSnapshot {
        self.evict_stale(at);

        let elapsed_ms = (at - self.last_tick_at).num_milliseconds().max(0);
        if let Some(index) = self.current_bucket {
            self.buckets.credit(index, elapsed_ms);
        }
        self.last_tick_at = at;

        let Some(last) = self.rpm_window.back() else {
            self.current_speed_mps = 0.0;
            self.current_bucket = bucket_index(0.0);
            return self.snapshot();
        };

        let avg_rpm =
            self.rpm_window.iter().map(|s| s.rpm).sum::<f64>() / self.rpm_window.len() as f64;
        let circumference_m = PI * (last.wheel_diameter_mm / 1000.0);
        self.current_speed_mps = avg_rpm * circumference_m / 60.0;

        let speed_kmh = self.current_speed_mps * 3.6;
        if speed_kmh > self.max_speed_kmh {
            self.max_speed_kmh = speed_kmh;
        }
        self.speed_readings.push(speed_kmh);
        self.current_bucket = bucket_index(speed_kmh);

        // one tick integrates one second of travel
        self.total_distance_m += self.current_speed_mps;

        debug!(
            "Tick: {:.2} km/h from {} samples, {:.2} m total",
            speed_kmh,
            self.rpm_window.len(),
            self.total_distance_m
        );
        self.snapshot()
    }

    pub fn snapshot(&self) -> SpeedSnapshot {
        SpeedSnapshot {
            speed_mps: self.current_speed_mps,
            speed_kmh: self.current_speed_mps * 3.6,
            total_distance_m: self.total_distance_m,
        }
    }

    pub fn build_report(&self) -> SessionReport {
        self.build_report_at(Local::now())
    }

    pub fn build_report_at(&self, at: DateTime<Local>) -> SessionReport {
        SessionReport::render(SessionFigures {
            started_at: self.started_at,
            ended_at: at,
            max_speed_kmh: self.max_speed_kmh,
            speed_readings: &self.speed_readings,
            total_distance_m: self.total_distance_m,
            buckets: &self.buckets,
        })
    }

    pub fn reset(&mut self) {
        self.reset_at(Local::now());
    }

    pub fn reset_at(&mut self, at: DateTime<Local>) {
        debug!("Resetting telemetry session");
        *self = Self::starting_at(at);
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn last_tick_at(&self) -> DateTime<Local> {
        self.last_tick_at
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    pub fn reading_count(&self) -> usize {
        self.speed_readings.len()
    }

    pub fn window_len(&self) -> usize {
        self.rpm_window.len()
    }

    pub fn buckets(&self) -> &SpeedBuckets {
        &self.buckets
    }

    fn evict_stale(&mut self, at: DateTime<Local>) {
        self.rpm_window
            .retain(|s| (at - s.sampled_at).num_milliseconds() <= WINDOW_MS);
    }
}
