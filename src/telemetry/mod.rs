//! Wheel telemetry: RPM samples in, speed, distance and a session report out.

pub mod buckets;
pub mod error;
pub mod handle;
pub mod report;
pub mod tracker;

pub use error::TelemetryError;
pub use handle::{TelemetryService, TelemetrySettings, TrackerHandle};
pub use report::{JsonReportWriter, ReportSink, SessionReport};
pub use tracker::{SpeedSnapshot, TelemetryTracker};
