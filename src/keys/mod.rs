//! Host input side: the action vocabulary and the simulator that performs it.
//!
//! The dispatcher only knows the [`ActionInvoker`] trait. The shipped
//! [`KeySimulator`] lowers actions into [`KeyStroke`]s and pushes them into a
//! channel; whatever sits on the other end injects (or, by default, logs) them.
//!
//! ```text
//! Dispatcher ──► ActionInvoker::invoke(Action)
//!                      │
//!                 KeySimulator ──► mpsc<KeyStroke> ──► output sink
//! ```

pub mod action;
pub mod error;
pub mod simulator;

pub use action::{Action, Direction, KeyStroke, MouseButton};
pub use error::InvokerError;
pub use simulator::{log_key_strokes, KeySettings, KeySimulator};

use async_trait::async_trait;

/// Capability to perform host input actions
#[async_trait]
pub trait ActionInvoker: Send + Sync {
    /// Performs the action; failures are reported, never panicked
    async fn invoke(&self, action: &Action) -> Result<(), InvokerError>;

    /// Switches direct-input ("game") mode on or off
    fn set_game_mode(&self, _enabled: bool) {}
}
