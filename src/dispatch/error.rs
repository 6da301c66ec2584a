//! Error definitions for the dispatch module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Requested game mode does not exist
    #[error("Unknown game mode: {0}")]
    UnknownMode(String),

    /// Mode index outside `0..=catalog size`
    #[error("Invalid mode index {index}, expected 0..={max}")]
    InvalidModeIndex { index: usize, max: usize },

    /// Communication with the dispatcher task failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The dispatcher task ended abnormally
    #[error("Thread error: {0}")]
    ThreadError(String),
}

/// A line with a recognised shape but an unusable payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed {kind} payload: {payload:?}")]
pub struct MalformedLine {
    pub kind: &'static str,
    pub payload: String,
}

impl MalformedLine {
    pub fn new(kind: &'static str, payload: &str) -> Self {
        Self {
            kind,
            payload: payload.to_string(),
        }
    }
}
