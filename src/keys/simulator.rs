use super::{Action, ActionInvoker, InvokerError, KeyStroke};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    pub enabled: bool,
    pub game_mode: bool,
    pub delay_between_keys_ms: u64,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            game_mode: false,
            delay_between_keys_ms: 10,
        }
    }
}

/// Lowers actions into key strokes and forwards them to the output sink
pub struct KeySimulator {
    output: mpsc::Sender<KeyStroke>,
    enabled: AtomicBool,
    game_mode: AtomicBool,
    key_delay: Duration,
}

impl KeySimulator {
    pub fn new(settings: KeySettings, output: mpsc::Sender<KeyStroke>) -> Self {
        info!(
            "Key simulator ready (enabled: {}, game mode: {}, {}ms between keys)",
            settings.enabled, settings.game_mode, settings.delay_between_keys_ms
        );
        Self {
            output,
            enabled: AtomicBool::new(settings.enabled),
            game_mode: AtomicBool::new(settings.game_mode),
            key_delay: Duration::from_millis(settings.delay_between_keys_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_game_mode(&self) -> bool {
        self.game_mode.load(Ordering::SeqCst)
    }

    async fn emit(&self, stroke: KeyStroke) -> Result<(), InvokerError> {
        debug!("Emitting {}", stroke);
        self.output
            .send(stroke)
            .await
            .map_err(|e| InvokerError::ChannelError(format!("Key output closed: {}", e)))
    }
}

#[async_trait]
impl ActionInvoker for KeySimulator {
    async fn invoke(&self, action: &Action) -> Result<(), InvokerError> {
        if !self.is_enabled() {
            info!("Key simulation is disabled, skipping {}", action);
            return Ok(());
        }

        if action.requires_direct_input() && !self.is_game_mode() {
            warn!("{} is only available in game mode", action);
            return Err(InvokerError::RequiresDirectInput(action.to_string()));
        }

        let strokes = action.strokes();
        if strokes.is_empty() {
            warn!("Nothing to send for {}", action);
            return Err(InvokerError::Unsupported(action.to_string()));
        }

        for (i, stroke) in strokes.into_iter().enumerate() {
            if i > 0 && !self.key_delay.is_zero() {
                tokio::time::sleep(self.key_delay).await;
            }
            self.emit(stroke).await?;
        }

        debug!("Performed {}", action);
        Ok(())
    }

    fn set_game_mode(&self, enabled: bool) {
        self.game_mode.store(enabled, Ordering::SeqCst);
        info!(
            "Game mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// Default output sink: logs every stroke it receives until the simulator is dropped
pub async fn log_key_strokes(mut strokes: mpsc::Receiver<KeyStroke>) {
    while let Some(stroke) = strokes.recv().await {
        info!("Key output: {}", stroke);
    }
    debug!("Key output channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MouseButton;

    fn simulator(settings: KeySettings) -> (KeySimulator, mpsc::Receiver<KeyStroke>) {
        let (tx, rx) = mpsc::channel(64);
        (KeySimulator::new(settings, tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<KeyStroke>) -> Vec<KeyStroke> {
        let mut out = Vec::new();
        while let Ok(stroke) = rx.try_recv() {
            out.push(stroke);
        }
        out
    }

    #[tokio::test]
    async fn forwards_lowered_strokes() -> Result<(), InvokerError> {
        let (sim, mut rx) = simulator(KeySettings::default());

        sim.invoke(&Action::TypeText("Bright".to_string())).await?;
        sim.invoke(&Action::CtrlC).await?;

        assert_eq!(
            drain(&mut rx),
            vec![
                KeyStroke::Text("Bright".to_string()),
                KeyStroke::Tap {
                    key: "c".to_string(),
                    modifiers: vec!["control".to_string()],
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn disabled_simulator_is_a_silent_no_op() -> Result<(), InvokerError> {
        let (sim, mut rx) = simulator(KeySettings {
            enabled: false,
            ..KeySettings::default()
        });

        sim.invoke(&Action::Space).await?;
        sim.invoke(&Action::MouseClick {
            x: 10,
            y: 20,
            button: MouseButton::Left,
        })
        .await?;
        assert!(drain(&mut rx).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn clicks_need_game_mode() {
        let (sim, mut rx) = simulator(KeySettings::default());
        let click = Action::MouseClick {
            x: 10,
            y: 20,
            button: MouseButton::Left,
        };

        let result = sim.invoke(&click).await;
        assert!(matches!(result, Err(InvokerError::RequiresDirectInput(_))));
        assert!(drain(&mut rx).is_empty());

        sim.set_game_mode(true);
        assert!(sim.invoke(&click).await.is_ok());
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequences_wait_between_keys() -> Result<(), InvokerError> {
        let (sim, mut rx) = simulator(KeySettings::default());
        let started = tokio::time::Instant::now();

        sim.invoke(&Action::Sequence(vec!["w".to_string(); 3])).await?;

        assert_eq!(drain(&mut rx).len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(20));
        Ok(())
    }

    #[tokio::test]
    async fn closed_output_is_reported() {
        let (sim, rx) = simulator(KeySettings::default());
        drop(rx);

        let result = sim.invoke(&Action::Enter).await;
        assert!(matches!(result, Err(InvokerError::ChannelError(_))));
    }
}
