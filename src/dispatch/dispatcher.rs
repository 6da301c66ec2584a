//! Line classification and dispatch.
//!
//! Precedence for a line once processing is enabled:
//!
//! ```text
//! game mode selected?
//!   ├─ exact rule for the trigger          ──► rule target
//!   └─ RPM line and an `RPM:` rule         ──► rpm handler
//! scenario table hit                       ──► scenario action (+ stats)
//! structural pattern                       ──► numeric policy / tracker
//! nothing matched                          ──► logged and dropped
//! ```
//!
//! While processing is disabled every line goes into the pending buffer and is
//! replayed in order when processing is switched back on.

use super::command::{Pattern, RawLine, RpmReading, Trigger};
use super::error::{DispatchError, MalformedLine};
use super::handlers;
use super::modes::{GameModeCatalog, GameModeId, ModeInfo, ModeSelection, RuleTarget};
use super::pending::{PendingBuffer, DEFAULT_PENDING_CAPACITY};
use super::scenarios::{ScenarioStats, ScenarioTable};
use crate::keys::{Action, ActionInvoker};
use crate::telemetry::TrackerHandle;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub processing_enabled: bool,
    pub game_mode: String,
    pub pending_capacity: usize,
    pub replay_delay_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            processing_enabled: false,
            game_mode: "default".to_string(),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            replay_delay_ms: 100,
        }
    }
}

/// What happened to a submitted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Buffered,
    GameModeRule,
    Scenario,
    Pattern(&'static str),
    Telemetry,
    Unclassified,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStatus {
    pub enabled: bool,
    pub pending_count: usize,
    pub current_mode: ModeInfo,
}

pub struct Dispatcher {
    invoker: Arc<dyn ActionInvoker>,
    tracker: TrackerHandle,
    catalog: GameModeCatalog,
    scenarios: ScenarioTable,
    mode: ModeSelection,
    processing_enabled: bool,
    pending: PendingBuffer,
    replay_delay: Duration,
    wheel_diameter_mm: f64,
}

impl Dispatcher {
    /// Starts disabled in default mode
    pub fn new(
        invoker: Arc<dyn ActionInvoker>,
        tracker: TrackerHandle,
        settings: &DispatchSettings,
        wheel_diameter_mm: f64,
    ) -> Self {
        Self {
            invoker,
            tracker,
            catalog: GameModeCatalog::builtin(),
            scenarios: ScenarioTable::with_defaults(),
            mode: ModeSelection::Default,
            processing_enabled: false,
            pending: PendingBuffer::with_capacity(settings.pending_capacity),
            replay_delay: Duration::from_millis(settings.replay_delay_ms),
            wheel_diameter_mm,
        }
    }

    pub async fn submit(&mut self, line: RawLine) -> DispatchOutcome {
        if !self.processing_enabled {
            debug!("Processing disabled, buffering: {}", line.text);
            self.pending.push(line);
            return DispatchOutcome::Buffered;
        }
        self.process(&line).await
    }

    async fn process(&mut self, line: &RawLine) -> DispatchOutcome {
        let trigger = line.trigger();
        let pattern = Pattern::classify(trigger.as_str());

        if let ModeSelection::Game(id) = self.mode {
            if let Some(target) = self.game_mode_target(id, &trigger, &pattern) {
                info!("[{}] {} -> {}", id, trigger, target);
                self.run_target(&target, &pattern).await;
                return DispatchOutcome::GameModeRule;
            }
        }

        if let Some(action) = self.scenarios.fire(&trigger, Local::now()) {
            info!("Scenario {} -> {}", trigger, action);
            self.perform(&action).await;
            return DispatchOutcome::Scenario;
        }

        match pattern {
            Ok(Some(Pattern::Rpm(reading))) => {
                self.record_rpm(&reading).await;
                DispatchOutcome::Telemetry
            }
            Ok(Some(pattern)) => {
                match handlers::pattern_action(&pattern, !self.mode.is_default()) {
                    Some(action) => {
                        debug!("{} reading {} -> {}", pattern.kind(), trigger, action);
                        self.perform(&action).await;
                    }
                    None => debug!("{} reading {} needs no action", pattern.kind(), trigger),
                }
                DispatchOutcome::Pattern(pattern.kind())
            }
            Ok(None) => {
                warn!("No scenario found for: {}", trigger);
                DispatchOutcome::Unclassified
            }
            Err(e) => {
                warn!("Dropping {}: {}", trigger, e);
                DispatchOutcome::Malformed
            }
        }
    }

    fn game_mode_target(
        &self,
        id: GameModeId,
        trigger: &Trigger,
        pattern: &Result<Option<Pattern>, MalformedLine>,
    ) -> Option<RuleTarget> {
        let mode = self.catalog.get(id)?;
        if let Some(target) = mode.rule(trigger.as_str()) {
            return Some(target.clone());
        }
        match pattern {
            Ok(Some(Pattern::Rpm(_))) => mode.rpm_rule().cloned(),
            _ => None,
        }
    }

    async fn run_target(
        &self,
        target: &RuleTarget,
        pattern: &Result<Option<Pattern>, MalformedLine>,
    ) {
        match target {
            RuleTarget::Action(action) => self.perform(action).await,
            RuleTarget::Handler(handler) => match pattern {
                Ok(Some(Pattern::Rpm(reading))) => match handler.action(reading) {
                    Some(action) => self.perform(&action).await,
                    None => debug!("{} produced no action for {}", handler, reading),
                },
                _ => warn!("{} needs an RPM reading", handler),
            },
        }
    }

    async fn perform(&self, action: &Action) {
        if let Err(e) = self.invoker.invoke(action).await {
            warn!("Action {} failed: {}", action, e);
        }
    }

    async fn record_rpm(&self, reading: &RpmReading) {
        info!("RPM value is ({})", reading);
        let Some(rpm) = reading.effective() else {
            return;
        };
        if let Err(e) = self.tracker.add_sample(rpm, self.wheel_diameter_mm).await {
            warn!("RPM sample not recorded: {}", e);
        }
    }

    /// Enables processing and replays buffered lines in arrival order
    pub async fn enable_processing(&mut self) -> usize {
        self.processing_enabled = true;
        let snapshot = self.pending.take_all();
        let count = snapshot.len();
        info!("Data processing ENABLED, replaying {} buffered lines", count);

        for (i, line) in snapshot.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.replay_delay).await;
            }
            debug!("Replaying buffered line: {}", line.text);
            self.process(&line).await;
        }
        count
    }

    pub fn disable_processing(&mut self) {
        self.processing_enabled = false;
        info!("Data processing DISABLED, incoming lines will be buffered");
    }

    /// Returns the new state
    pub async fn toggle_processing(&mut self) -> bool {
        if self.processing_enabled {
            self.disable_processing();
        } else {
            self.enable_processing().await;
        }
        self.processing_enabled
    }

    pub fn select_mode(&mut self, mode_id: &str) -> Result<ModeInfo, DispatchError> {
        let selection = ModeSelection::parse(mode_id).map_err(|e| {
            warn!("Mode not changed: {}", e);
            e
        })?;
        if let ModeSelection::Game(id) = selection {
            if self.catalog.get(id).is_none() {
                return Err(DispatchError::UnknownMode(mode_id.to_string()));
            }
        }
        Ok(self.apply_mode(selection))
    }

    /// `0` selects default, `1..` the catalog in order
    pub fn select_mode_by_index(&mut self, index: usize) -> Result<ModeInfo, DispatchError> {
        if index == 0 {
            return Ok(self.apply_mode(ModeSelection::Default));
        }
        let id = self
            .catalog
            .by_index(index)
            .map(|mode| mode.id)
            .ok_or_else(|| DispatchError::InvalidModeIndex {
                index,
                max: self.catalog.len(),
            })?;
        Ok(self.apply_mode(ModeSelection::Game(id)))
    }

    fn apply_mode(&mut self, selection: ModeSelection) -> ModeInfo {
        self.mode = selection;
        self.invoker.set_game_mode(!selection.is_default());
        let info = self.catalog.info(selection);
        info!("Switched to {} mode ({})", info.name, info.id);
        info
    }

    pub fn current_mode(&self) -> ModeInfo {
        self.catalog.info(self.mode)
    }

    pub fn list_modes(&self) -> Vec<ModeInfo> {
        self.catalog.list()
    }

    pub fn clear_pending(&mut self) -> usize {
        let count = self.pending.clear();
        info!("Cleared {} pending lines", count);
        count
    }

    pub fn is_processing_enabled(&self) -> bool {
        self.processing_enabled
    }

    pub fn status(&self) -> DispatchStatus {
        DispatchStatus {
            enabled: self.processing_enabled,
            pending_count: self.pending.len(),
            current_mode: self.current_mode(),
        }
    }

    pub fn scenario_stats(&self) -> BTreeMap<String, ScenarioStats> {
        self.scenarios.stats()
    }

    pub fn clear_stats(&mut self) {
        self.scenarios.clear_stats();
    }

    pub fn add_scenario(&mut self, trigger: &str, action: Action, description: &str) {
        self.scenarios.add(trigger, action, description);
    }

    pub fn remove_scenario(&mut self, trigger: &str) -> bool {
        self.scenarios.remove(trigger)
    }
}
