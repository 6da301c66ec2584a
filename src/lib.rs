pub mod config;
pub mod dispatch;
pub mod keys;
pub mod telemetry;
pub mod transport;
