use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Sample with a non-finite or negative rpm, or a non-positive wheel diameter
    #[error("Invalid sample: rpm {rpm}, wheel diameter {wheel_diameter_mm}mm")]
    InvalidSample { rpm: f64, wheel_diameter_mm: f64 },

    #[error("Failed to write report: {0}")]
    ReportIo(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thread error: {0}")]
    ThreadError(String),
}
