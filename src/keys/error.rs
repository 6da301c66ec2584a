//! Error definitions for the key output side

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokerError {
    /// Mouse clicks and key toggles are only honoured in direct-input mode
    #[error("Action requires direct-input mode: {0}")]
    RequiresDirectInput(String),

    /// The action lowered to nothing the backend can perform
    #[error("Unsupported action: {0}")]
    Unsupported(String),

    /// The key output sink is gone
    #[error("Channel error: {0}")]
    ChannelError(String),
}
