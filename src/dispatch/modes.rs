//! Built-in game-mode catalog.
//!
//! A game mode overrides how triggers are interpreted. Rules either name an
//! action directly or point at an RPM handler. The catalog is built once and
//! never mutated; `default` is not part of it and stands for "use the scenario
//! table".

use super::command::RPM_RULE;
use super::error::DispatchError;
use super::handlers::RpmHandler;
use crate::keys::Action;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

macro_rules! rule {
    ($rules:expr, $trigger:expr, handler $handler:expr) => {
        $rules.insert($trigger.to_string(), RuleTarget::Handler($handler));
    };
    ($rules:expr, $trigger:expr, $action:expr) => {
        $rules.insert(
            $trigger.to_string(),
            RuleTarget::Action(Action::from_name($action)),
        );
    };
}

pub const DEFAULT_MODE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameModeId {
    Racing,
    Fps,
    Media,
    Flight,
    Presentation,
    Cycling,
}

impl GameModeId {
    /// Catalog order, also used for index based selection
    pub const ALL: [GameModeId; 6] = [
        GameModeId::Racing,
        GameModeId::Fps,
        GameModeId::Media,
        GameModeId::Flight,
        GameModeId::Presentation,
        GameModeId::Cycling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameModeId::Racing => "racing",
            GameModeId::Fps => "fps",
            GameModeId::Media => "media",
            GameModeId::Flight => "flight",
            GameModeId::Presentation => "presentation",
            GameModeId::Cycling => "cycling",
        }
    }
}

impl fmt::Display for GameModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameModeId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        GameModeId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| DispatchError::UnknownMode(s.to_string()))
    }
}

/// Which table the dispatcher consults first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelection {
    #[default]
    Default,
    Game(GameModeId),
}

impl ModeSelection {
    pub fn parse(s: &str) -> Result<Self, DispatchError> {
        if s.trim().eq_ignore_ascii_case(DEFAULT_MODE) {
            return Ok(ModeSelection::Default);
        }
        s.parse().map(ModeSelection::Game)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ModeSelection::Default)
    }
}

impl fmt::Display for ModeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSelection::Default => f.write_str(DEFAULT_MODE),
            ModeSelection::Game(id) => f.write_str(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleTarget {
    Action(Action),
    Handler(RpmHandler),
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Action(action) => write!(f, "{}", action),
            RuleTarget::Handler(handler) => write!(f, "{}", handler),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameMode {
    pub id: GameModeId,
    pub name: &'static str,
    pub description: &'static str,
    rules: HashMap<String, RuleTarget>,
}

impl GameMode {
    pub fn rule(&self, trigger: &str) -> Option<&RuleTarget> {
        self.rules.get(trigger)
    }

    pub fn rpm_rule(&self) -> Option<&RuleTarget> {
        self.rules.get(RPM_RULE)
    }
}

/// Public description of a mode, `default` included
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ModeInfo {
    pub fn default_mode() -> Self {
        Self {
            id: DEFAULT_MODE.to_string(),
            name: "Default".to_string(),
            description: "Standard mode".to_string(),
        }
    }
}

impl From<&GameMode> for ModeInfo {
    fn from(mode: &GameMode) -> Self {
        Self {
            id: mode.id.to_string(),
            name: mode.name.to_string(),
            description: mode.description.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameModeCatalog {
    modes: Vec<GameMode>,
}

impl Default for GameModeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GameModeCatalog {
    pub fn builtin() -> Self {
        let modes = GameModeId::ALL.into_iter().map(build_mode).collect();
        Self { modes }
    }

    pub fn get(&self, id: GameModeId) -> Option<&GameMode> {
        self.modes.iter().find(|m| m.id == id)
    }

    /// 1-based position in catalog order
    pub fn by_index(&self, index: usize) -> Option<&GameMode> {
        index.checked_sub(1).and_then(|i| self.modes.get(i))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameMode> {
        self.modes.iter()
    }

    /// `default` first, then every catalog entry
    pub fn list(&self) -> Vec<ModeInfo> {
        std::iter::once(ModeInfo::default_mode())
            .chain(self.modes.iter().map(ModeInfo::from))
            .collect()
    }

    pub fn info(&self, selection: ModeSelection) -> ModeInfo {
        match selection {
            ModeSelection::Default => ModeInfo::default_mode(),
            ModeSelection::Game(id) => self
                .get(id)
                .map(ModeInfo::from)
                .unwrap_or_else(ModeInfo::default_mode),
        }
    }
}

fn build_mode(id: GameModeId) -> GameMode {
    let mut rules = HashMap::new();
    let (name, description) = match id {
        GameModeId::Racing => {
            rule!(rules, "BTN1:ON", "space");
            rule!(rules, "BTN2:ON", "shift");
            rule!(rules, "BTN3:ON", "ctrl");
            rule!(rules, "LEFT", "left");
            rule!(rules, "RIGHT", "right");
            rule!(rules, "UP", "w");
            rule!(rules, "DOWN", "s");
            rule!(rules, "SPACE", "r");
            rule!(rules, RPM_RULE, handler RpmHandler::Racing);
            (
                "Racing Game",
                "Optimized for racing games like Need for Speed, Forza, etc.",
            )
        }
        GameModeId::Fps => {
            rule!(rules, "BTN1:ON", "space");
            rule!(rules, "BTN2:ON", "click");
            rule!(rules, "BTN3:ON", "r");
            rule!(rules, "LEFT", "a");
            rule!(rules, "RIGHT", "d");
            rule!(rules, "UP", "w");
            rule!(rules, "DOWN", "s");
            rule!(rules, "SPACE", "shift");
            rule!(rules, "ENTER", "ctrl");
            (
                "FPS Shooter",
                "For first-person shooters like Counter-Strike, Valorant, etc.",
            )
        }
        GameModeId::Media => {
            rule!(rules, "BTN1:ON", "media_play_pause");
            rule!(rules, "BTN2:ON", "media_next");
            rule!(rules, "BTN3:ON", "media_prev");
            rule!(rules, "UP", "volume_up");
            rule!(rules, "DOWN", "volume_down");
            rule!(rules, "LEFT", "media_prev");
            rule!(rules, "RIGHT", "media_next");
            rule!(rules, "SPACE", "media_play_pause");
            rule!(rules, "ENTER", "volume_mute");
            (
                "Media Control",
                "Control music, videos, and media applications",
            )
        }
        GameModeId::Flight => {
            rule!(rules, "BTN1:ON", "space");
            rule!(rules, "BTN2:ON", "f");
            rule!(rules, "BTN3:ON", "b");
            rule!(rules, "LEFT", "a");
            rule!(rules, "RIGHT", "d");
            rule!(rules, "UP", "s");
            rule!(rules, "DOWN", "w");
            rule!(rules, "SPACE", "enter");
            rule!(rules, RPM_RULE, handler RpmHandler::Flight);
            ("Flight Simulator", "For flight simulation games")
        }
        GameModeId::Presentation => {
            rule!(rules, "BTN1:ON", "right");
            rule!(rules, "BTN2:ON", "left");
            rule!(rules, "BTN3:ON", "escape");
            rule!(rules, "LEFT", "left");
            rule!(rules, "RIGHT", "right");
            rule!(rules, "UP", "home");
            rule!(rules, "DOWN", "end");
            rule!(rules, "SPACE", "right");
            rule!(rules, "ENTER", "f5");
            (
                "Presentation Control",
                "Control PowerPoint or other presentation software",
            )
        }
        GameModeId::Cycling => {
            rule!(rules, RPM_RULE, handler RpmHandler::Cadence);
            rule!(rules, "BTN1:ON", "space");
            rule!(rules, "BTN2:ON", "escape");
            (
                "Cycling Trainer",
                "Pedal cadence drives the accelerate key",
            )
        }
    };

    GameMode {
        id,
        name,
        description,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keeps_fixed_order() {
        let catalog = GameModeCatalog::builtin();
        let ids: Vec<GameModeId> = catalog.iter().map(|m| m.id).collect();
        assert_eq!(ids, GameModeId::ALL.to_vec());
        assert_eq!(catalog.by_index(1).map(|m| m.id), Some(GameModeId::Racing));
        assert_eq!(catalog.by_index(6).map(|m| m.id), Some(GameModeId::Cycling));
        assert!(catalog.by_index(0).is_none());
        assert!(catalog.by_index(7).is_none());
    }

    #[test]
    fn mode_ids_parse_case_insensitively() {
        assert_eq!("RACING".parse::<GameModeId>().ok(), Some(GameModeId::Racing));
        assert!("nonexistent".parse::<GameModeId>().is_err());
        assert_eq!(ModeSelection::parse("Default").ok(), Some(ModeSelection::Default));
        assert_eq!(
            ModeSelection::parse("fps").ok(),
            Some(ModeSelection::Game(GameModeId::Fps))
        );
    }

    #[test]
    fn rules_resolve_actions_and_handlers() {
        let catalog = GameModeCatalog::builtin();
        let racing = catalog.get(GameModeId::Racing);
        assert_eq!(
            racing.and_then(|m| m.rule("SPACE")),
            Some(&RuleTarget::Action(Action::Key("r".to_string())))
        );
        assert_eq!(
            racing.and_then(|m| m.rpm_rule()),
            Some(&RuleTarget::Handler(RpmHandler::Racing))
        );

        let fps = catalog.get(GameModeId::Fps);
        assert!(matches!(
            fps.and_then(|m| m.rule("BTN2:ON")),
            Some(RuleTarget::Action(Action::MouseClick { .. }))
        ));
        assert!(fps.and_then(|m| m.rpm_rule()).is_none());

        let presentation = catalog.get(GameModeId::Presentation);
        assert_eq!(
            presentation.and_then(|m| m.rule("ENTER")),
            Some(&RuleTarget::Action(Action::FunctionKey(5)))
        );
    }

    #[test]
    fn listing_starts_with_default() {
        let list = GameModeCatalog::builtin().list();
        assert_eq!(list.len(), 7);
        assert_eq!(list[0].id, "default");
        assert_eq!(list[1].name, "Racing Game");
    }
}
