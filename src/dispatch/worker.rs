//! Dispatcher task with statum lifecycle and its request channel.
//!
//! The [`Dispatcher`] is owned by exactly one tokio task. Every line and every
//! control request travels through the same mpsc channel, so handlers never
//! interleave and a line submitted during a replay waits until it is done.
//!
//! # State Machine
//!
//! ```text
//! Configured ──► Active ──► Stopped
//!                  │           ▲
//!                  └───────────┘
//!             (Shutdown request or all clients gone)
//! ```

use super::command::RawLine;
use super::dispatcher::{DispatchStatus, Dispatcher};
use super::error::DispatchError;
use super::modes::ModeInfo;
use super::scenarios::ScenarioStats;
use crate::keys::Action;
use statum::{machine, state};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

macro_rules! reply {
    ($response_tx:expr, $value:expr) => {
        if $response_tx.send($value).is_err() {
            error!("Failed to send response");
        }
    };
}

/// Requests served by the dispatcher task
#[derive(Debug)]
pub enum DispatchAction {
    Submit(RawLine),
    EnableProcessing {
        response_tx: oneshot::Sender<usize>,
    },
    DisableProcessing {
        response_tx: oneshot::Sender<()>,
    },
    ToggleProcessing {
        response_tx: oneshot::Sender<bool>,
    },
    SelectMode {
        mode: String,
        response_tx: oneshot::Sender<Result<ModeInfo, DispatchError>>,
    },
    SelectModeByIndex {
        index: usize,
        response_tx: oneshot::Sender<Result<ModeInfo, DispatchError>>,
    },
    ListModes {
        response_tx: oneshot::Sender<Vec<ModeInfo>>,
    },
    ClearPending {
        response_tx: oneshot::Sender<usize>,
    },
    Status {
        response_tx: oneshot::Sender<DispatchStatus>,
    },
    ScenarioStats {
        response_tx: oneshot::Sender<BTreeMap<String, ScenarioStats>>,
    },
    ClearStats,
    AddScenario {
        trigger: String,
        action: Action,
        description: String,
    },
    RemoveScenario {
        trigger: String,
        response_tx: oneshot::Sender<bool>,
    },
    Shutdown,
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatchEngineState {
    Configured,
    Active,
    Stopped,
}

#[machine]
pub struct DispatchEngine<S: DispatchEngineState> {
    action_rx: mpsc::Receiver<DispatchAction>,
    dispatcher: Dispatcher,
    handled: u64,
}

impl DispatchEngine<Configured> {
    pub fn create(action_rx: mpsc::Receiver<DispatchAction>, dispatcher: Dispatcher) -> Self {
        Self::new(action_rx, dispatcher, 0)
    }

    pub fn activate(self) -> DispatchEngine<Active> {
        info!("Dispatcher active in {} mode", self.dispatcher.current_mode().id);
        self.transition()
    }
}

impl DispatchEngine<Active> {
    /// Serves requests in arrival order until asked to stop
    pub async fn run_until_shutdown(mut self) -> DispatchEngine<Stopped> {
        while let Some(action) = self.action_rx.recv().await {
            if matches!(action, DispatchAction::Shutdown) {
                info!("Shutdown requested for dispatcher");
                break;
            }
            self.handle(action).await;
            self.handled += 1;
        }
        self.transition()
    }

    async fn handle(&mut self, action: DispatchAction) {
        let dispatcher = &mut self.dispatcher;
        match action {
            DispatchAction::Submit(line) => {
                let outcome = dispatcher.submit(line).await;
                debug!("Line handled: {:?}", outcome);
            }
            DispatchAction::EnableProcessing { response_tx } => {
                reply!(response_tx, dispatcher.enable_processing().await);
            }
            DispatchAction::DisableProcessing { response_tx } => {
                dispatcher.disable_processing();
                reply!(response_tx, ());
            }
            DispatchAction::ToggleProcessing { response_tx } => {
                reply!(response_tx, dispatcher.toggle_processing().await);
            }
            DispatchAction::SelectMode { mode, response_tx } => {
                reply!(response_tx, dispatcher.select_mode(&mode));
            }
            DispatchAction::SelectModeByIndex { index, response_tx } => {
                reply!(response_tx, dispatcher.select_mode_by_index(index));
            }
            DispatchAction::ListModes { response_tx } => {
                reply!(response_tx, dispatcher.list_modes());
            }
            DispatchAction::ClearPending { response_tx } => {
                reply!(response_tx, dispatcher.clear_pending());
            }
            DispatchAction::Status { response_tx } => {
                reply!(response_tx, dispatcher.status());
            }
            DispatchAction::ScenarioStats { response_tx } => {
                reply!(response_tx, dispatcher.scenario_stats());
            }
            DispatchAction::ClearStats => dispatcher.clear_stats(),
            DispatchAction::AddScenario {
                trigger,
                action,
                description,
            } => dispatcher.add_scenario(&trigger, action, &description),
            DispatchAction::RemoveScenario {
                trigger,
                response_tx,
            } => {
                reply!(response_tx, dispatcher.remove_scenario(&trigger));
            }
            DispatchAction::Shutdown => {}
        }
    }
}

impl DispatchEngine<Stopped> {
    pub fn finish(self) -> Dispatcher {
        let status = self.dispatcher.status();
        if status.pending_count > 0 {
            warn!(
                "Dispatcher stopped with {} unprocessed buffered lines",
                status.pending_count
            );
        }
        info!("Dispatcher stopped after {} requests", self.handled);
        self.dispatcher
    }
}

/// Cloneable request side of the dispatcher task
#[derive(Debug, Clone)]
pub struct DispatchClient {
    tx: mpsc::Sender<DispatchAction>,
}

impl DispatchClient {
    pub fn new(tx: mpsc::Sender<DispatchAction>) -> Self {
        Self { tx }
    }

    async fn send(&self, action: DispatchAction) -> Result<(), DispatchError> {
        self.tx
            .send(action)
            .await
            .map_err(|e| DispatchError::ChannelError(format!("Dispatcher is gone: {}", e)))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> DispatchAction,
    ) -> Result<T, DispatchError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(make(response_tx)).await?;
        response_rx
            .await
            .map_err(|e| DispatchError::ChannelError(format!("No response from dispatcher: {}", e)))
    }

    pub async fn submit(&self, line: RawLine) -> Result<(), DispatchError> {
        self.send(DispatchAction::Submit(line)).await
    }

    /// Returns the number of replayed lines
    pub async fn enable_processing(&self) -> Result<usize, DispatchError> {
        self.request(|response_tx| DispatchAction::EnableProcessing { response_tx })
            .await
    }

    pub async fn disable_processing(&self) -> Result<(), DispatchError> {
        self.request(|response_tx| DispatchAction::DisableProcessing { response_tx })
            .await
    }

    pub async fn toggle_processing(&self) -> Result<bool, DispatchError> {
        self.request(|response_tx| DispatchAction::ToggleProcessing { response_tx })
            .await
    }

    pub async fn select_mode(&self, mode: &str) -> Result<ModeInfo, DispatchError> {
        let mode = mode.to_string();
        self.request(|response_tx| DispatchAction::SelectMode { mode, response_tx })
            .await?
    }

    pub async fn select_mode_by_index(&self, index: usize) -> Result<ModeInfo, DispatchError> {
        self.request(|response_tx| DispatchAction::SelectModeByIndex { index, response_tx })
            .await?
    }

    pub async fn list_modes(&self) -> Result<Vec<ModeInfo>, DispatchError> {
        self.request(|response_tx| DispatchAction::ListModes { response_tx })
            .await
    }

    pub async fn clear_pending(&self) -> Result<usize, DispatchError> {
        self.request(|response_tx| DispatchAction::ClearPending { response_tx })
            .await
    }

    pub async fn status(&self) -> Result<DispatchStatus, DispatchError> {
        self.request(|response_tx| DispatchAction::Status { response_tx })
            .await
    }

    pub async fn current_mode(&self) -> Result<ModeInfo, DispatchError> {
        Ok(self.status().await?.current_mode)
    }

    pub async fn scenario_stats(&self) -> Result<BTreeMap<String, ScenarioStats>, DispatchError> {
        self.request(|response_tx| DispatchAction::ScenarioStats { response_tx })
            .await
    }

    pub async fn clear_stats(&self) -> Result<(), DispatchError> {
        self.send(DispatchAction::ClearStats).await
    }

    pub async fn add_scenario(
        &self,
        trigger: &str,
        action: Action,
        description: &str,
    ) -> Result<(), DispatchError> {
        self.send(DispatchAction::AddScenario {
            trigger: trigger.to_string(),
            action,
            description: description.to_string(),
        })
        .await
    }

    pub async fn remove_scenario(&self, trigger: &str) -> Result<bool, DispatchError> {
        let trigger = trigger.to_string();
        self.request(|response_tx| DispatchAction::RemoveScenario {
            trigger,
            response_tx,
        })
        .await
    }
}

/// Owns the dispatcher task
pub struct DispatcherHandle {
    client: DispatchClient,
    task_handle: Option<JoinHandle<Dispatcher>>,
}

impl DispatcherHandle {
    pub fn spawn(dispatcher: Dispatcher, channel_capacity: usize) -> Self {
        let (action_tx, action_rx) = mpsc::channel(channel_capacity.max(1));
        let engine = DispatchEngine::create(action_rx, dispatcher).activate();

        let task_handle = tokio::spawn(async move {
            let stopped = engine.run_until_shutdown().await;
            stopped.finish()
        });

        Self {
            client: DispatchClient::new(action_tx),
            task_handle: Some(task_handle),
        }
    }

    pub fn client(&self) -> DispatchClient {
        self.client.clone()
    }

    /// Lets queued requests finish, then stops the task.
    ///
    /// Returns the dispatcher on the first call, `None` afterwards.
    pub async fn shutdown(&mut self) -> Result<Option<Dispatcher>, DispatchError> {
        let Some(handle) = self.task_handle.take() else {
            debug!("Dispatcher already shut down");
            return Ok(None);
        };

        if self.client.send(DispatchAction::Shutdown).await.is_err() {
            warn!("Dispatcher task already terminated");
        }

        match handle.await {
            Ok(dispatcher) => Ok(Some(dispatcher)),
            Err(e) => {
                error!("Dispatcher task panicked: {}", e);
                Err(DispatchError::ThreadError(format!(
                    "Dispatcher task panicked: {}",
                    e
                )))
            }
        }
    }
}
