use crate::keys::{Action, ActionInvoker, InvokerError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// Invoker double that records every action and when it arrived
#[derive(Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<(Action, Instant)>>,
    game_mode: AtomicBool,
    fail: AtomicBool,
}

impl RecordingInvoker {
    pub fn failing() -> Self {
        let invoker = Self::default();
        invoker.fail.store(true, Ordering::SeqCst);
        invoker
    }

    pub fn actions(&self) -> Vec<Action> {
        self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn game_mode(&self) -> bool {
        self.game_mode.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionInvoker for RecordingInvoker {
    async fn invoke(&self, action: &Action) -> Result<(), InvokerError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.clone(), Instant::now()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(InvokerError::Unsupported(action.to_string()));
        }
        Ok(())
    }

    fn set_game_mode(&self, enabled: bool) {
        self.game_mode.store(enabled, Ordering::SeqCst);
    }
}
