//! Command classification, game-mode dispatch and pending-line buffering.
//!
//! ```text
//! transport ──► DispatchClient ──► mpsc ──► DispatchEngine<Active>
//!                                               │
//!                                          Dispatcher
//!                      ┌────────────────────┼────────────────────┐
//!                 GameModeCatalog     ScenarioTable        Pattern policies
//!                      └──────────► ActionInvoker ◄──────────────┘
//!                                                     RPM ──► TrackerHandle
//! ```

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod modes;
pub mod pending;
pub mod scenarios;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use command::{Pattern, RawLine, RpmReading, Trigger};
pub use dispatcher::{DispatchOutcome, DispatchSettings, DispatchStatus, Dispatcher};
pub use error::{DispatchError, MalformedLine};
pub use modes::{GameModeCatalog, GameModeId, ModeInfo, ModeSelection, RuleTarget};
pub use scenarios::{ScenarioStats, ScenarioTable};
pub use worker::{DispatchAction, DispatchClient, DispatcherHandle};
