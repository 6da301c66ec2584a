//! Default, mode-independent trigger table with firing statistics.

use super::command::Trigger;
use crate::keys::Action;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioEntry {
    pub action: Action,
    pub description: String,
    pub trigger_count: u64,
    pub last_triggered: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStats {
    pub description: String,
    pub trigger_count: u64,
    pub last_triggered: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioTable {
    entries: HashMap<Trigger, ScenarioEntry>,
}

impl ScenarioTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let defaults: [(&str, Action, &str); 27] = [
            ("PLAY", Action::MediaPlayPause, "Play/pause media"),
            ("PAUSE", Action::MediaPlayPause, "Play/pause media"),
            ("NEXT", Action::MediaNext, "Next track"),
            ("PREV", Action::MediaPrev, "Previous track"),
            ("VOL_UP", Action::VolumeUp, "Volume up"),
            ("VOL_DOWN", Action::VolumeDown, "Volume down"),
            ("MUTE", Action::VolumeMute, "Toggle mute"),
            ("UP", Action::from_name("arrow_up"), "Arrow up"),
            ("DOWN", Action::from_name("arrow_down"), "Arrow down"),
            ("LEFT", Action::from_name("arrow_left"), "Arrow left"),
            ("RIGHT", Action::from_name("arrow_right"), "Arrow right"),
            ("SPACE", Action::Space, "Space"),
            ("ENTER", Action::Enter, "Enter"),
            ("TAB", Action::Tab, "Tab"),
            ("ALT_TAB", Action::AltTab, "Switch window"),
            ("F1", Action::FunctionKey(1), "F1"),
            ("F2", Action::FunctionKey(2), "F2"),
            ("F3", Action::FunctionKey(3), "F3"),
            ("F4", Action::FunctionKey(4), "F4"),
            ("F5", Action::FunctionKey(5), "F5"),
            ("BUTTON_1", Action::Space, "Button 1"),
            ("BUTTON_2", Action::Enter, "Button 2"),
            ("SENSOR_HIGH", Action::VolumeUp, "Sensor high"),
            ("SENSOR_LOW", Action::VolumeDown, "Sensor low"),
            (
                "SHUTDOWN",
                Action::from_name("ctrl+alt+delete"),
                "Ctrl+Alt+Delete",
            ),
            ("SCREENSHOT", Action::from_name("win+shift+s"), "Screenshot"),
            (
                "HELLO",
                Action::TypeText("Hello from Arduino!".to_string()),
                "Type greeting",
            ),
        ];
        for (trigger, action, description) in defaults {
            table.add(trigger, action, description);
        }
        info!("Loaded {} default scenarios", table.len());
        table
    }

    /// Adds or replaces a scenario; statistics start fresh
    pub fn add(&mut self, trigger: &str, action: Action, description: &str) {
        let trigger = Trigger::new(trigger);
        debug!("Adding scenario {} -> {}", trigger, action);
        self.entries.insert(
            trigger,
            ScenarioEntry {
                action,
                description: description.to_string(),
                trigger_count: 0,
                last_triggered: None,
            },
        );
    }

    pub fn remove(&mut self, trigger: &str) -> bool {
        let removed = self.entries.remove(&Trigger::new(trigger)).is_some();
        if removed {
            debug!("Removed scenario {}", trigger);
        }
        removed
    }

    pub fn contains(&self, trigger: &Trigger) -> bool {
        self.entries.contains_key(trigger)
    }

    pub fn get(&self, trigger: &Trigger) -> Option<&ScenarioEntry> {
        self.entries.get(trigger)
    }

    /// Records a firing and returns the action to perform
    pub fn fire(&mut self, trigger: &Trigger, at: DateTime<Local>) -> Option<Action> {
        let entry = self.entries.get_mut(trigger)?;
        entry.trigger_count += 1;
        entry.last_triggered = Some(at);
        Some(entry.action.clone())
    }

    pub fn stats(&self) -> BTreeMap<String, ScenarioStats> {
        self.entries
            .iter()
            .map(|(trigger, entry)| {
                (
                    trigger.to_string(),
                    ScenarioStats {
                        description: entry.description.clone(),
                        trigger_count: entry.trigger_count,
                        last_triggered: entry.last_triggered,
                    },
                )
            })
            .collect()
    }

    pub fn clear_stats(&mut self) {
        for entry in self.entries.values_mut() {
            entry.trigger_count = 0;
            entry.last_triggered = None;
        }
        info!("Scenario statistics cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_catalog() {
        let table = ScenarioTable::with_defaults();
        assert_eq!(table.len(), 27);
        assert_eq!(
            table.get(&Trigger::new("shutdown")).map(|e| e.action.clone()),
            Some(Action::Combination(vec![
                "ctrl".to_string(),
                "alt".to_string(),
                "delete".to_string()
            ]))
        );
        assert_eq!(
            table.get(&Trigger::new("F3")).map(|e| e.action.clone()),
            Some(Action::FunctionKey(3))
        );
    }

    #[test]
    fn firing_updates_statistics() {
        let mut table = ScenarioTable::with_defaults();
        let now = Local::now();

        let action = table.fire(&Trigger::new("play"), now);

        assert_eq!(action, Some(Action::MediaPlayPause));
        let stats = table.stats();
        assert_eq!(stats["PLAY"].trigger_count, 1);
        assert_eq!(stats["PLAY"].last_triggered, Some(now));
        assert_eq!(stats["PAUSE"].trigger_count, 0);

        table.clear_stats();
        assert_eq!(table.stats()["PLAY"].trigger_count, 0);
        assert!(table.stats()["PLAY"].last_triggered.is_none());
    }

    #[test]
    fn add_and_remove_normalize_triggers() {
        let mut table = ScenarioTable::new();
        table.add(" lights ", Action::from_name("l"), "Toggle lights");
        assert!(table.contains(&Trigger::new("LIGHTS")));

        assert!(table.remove("Lights"));
        assert!(!table.remove("lights"));
        assert!(table.fire(&Trigger::new("LIGHTS"), Local::now()).is_none());
    }
}
