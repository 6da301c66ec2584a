//! Session report rendering and persistence.

use super::buckets::SpeedBuckets;
use super::TelemetryError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_info: SessionInfo,
    pub speed_metrics: SpeedMetrics,
    pub distance_metrics: DistanceMetrics,
    pub additional_data: AdditionalData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration: String,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedMetrics {
    pub max_speed: String,
    pub avg_speed: String,
    pub speed_intervals_minutes: SpeedIntervals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceMetrics {
    pub total_distance: String,
    pub total_distance_km: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalData {
    pub total_speed_readings: usize,
    pub avg_distance_per_reading: String,
}

/// Minutes spent per speed bucket, serialized as an object in bucket order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeedIntervals(Vec<(String, f64)>);

impl SpeedIntervals {
    pub fn from_buckets(buckets: &SpeedBuckets) -> Self {
        Self(
            buckets
                .iter()
                .map(|(label, ms)| (label, round_to(ms as f64 / 60_000.0, 2)))
                .collect(),
        )
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, m)| *m)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, f64)> {
        self.0.iter()
    }
}

impl Serialize for SpeedIntervals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, minutes) in &self.0 {
            map.serialize_entry(label, minutes)?;
        }
        map.end()
    }
}

/// Raw session figures a report is rendered from
#[derive(Debug, Clone)]
pub struct SessionFigures<'a> {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub max_speed_kmh: f64,
    pub speed_readings: &'a [f64],
    pub total_distance_m: f64,
    pub buckets: &'a SpeedBuckets,
}

impl SessionReport {
    pub fn render(figures: SessionFigures<'_>) -> Self {
        let duration_seconds = (figures.ended_at - figures.started_at).num_seconds().max(0);
        let readings = figures.speed_readings.len();
        let avg_speed_kmh = if readings == 0 {
            0.0
        } else {
            figures.speed_readings.iter().sum::<f64>() / readings as f64
        };
        let avg_distance = if readings == 0 {
            0.0
        } else {
            figures.total_distance_m / readings as f64
        };

        Self {
            session_info: SessionInfo {
                start_time: figures.started_at,
                end_time: figures.ended_at,
                duration: format_duration(duration_seconds),
                duration_seconds,
            },
            speed_metrics: SpeedMetrics {
                max_speed: format!("{:.2} km/h", figures.max_speed_kmh),
                avg_speed: format!("{:.2} km/h", avg_speed_kmh),
                speed_intervals_minutes: SpeedIntervals::from_buckets(figures.buckets),
            },
            distance_metrics: DistanceMetrics {
                total_distance: format!("{:.2} m", figures.total_distance_m),
                total_distance_km: format!("{:.3} km", figures.total_distance_m / 1000.0),
            },
            additional_data: AdditionalData {
                total_speed_readings: readings,
                avg_distance_per_reading: format!("{:.2} m", avg_distance),
            },
        }
    }
}

/// `3725` seconds renders as `1h 2m 5s`
pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Destination for the final session report
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &SessionReport) -> Result<PathBuf, TelemetryError>;
}

/// Writes each report as pretty JSON into a directory
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    dir: PathBuf,
}

impl JsonReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(report: &SessionReport) -> String {
        format!(
            "session_report_{}.json",
            report.session_info.start_time.format("%Y%m%d_%H%M%S")
        )
    }
}

#[async_trait]
impl ReportSink for JsonReportWriter {
    async fn write(&self, report: &SessionReport) -> Result<PathBuf, TelemetryError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            debug!("Creating report directory {}", self.dir.display());
            tokio::fs::create_dir_all(&self.dir).await?;
        }

        let path = self.dir.join(Self::file_name(report));
        let content = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&path, content).await?;

        info!("Session report written to {}", path.display());
        Ok(path)
    }
}
