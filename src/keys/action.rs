//! Action vocabulary understood by the key simulator.
//!
//! Every trigger table in the dispatcher resolves to an [`Action`]. Actions are
//! lowered into primitive [`KeyStroke`]s before they leave the process, so the
//! output side only ever sees taps, presses, releases, text and clicks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys that are treated as modifiers when an action is a key combination
pub const MODIFIER_KEYS: [&str; 4] = ["control", "alt", "shift", "cmd"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn key_name(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// A single invocable host-input action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Space,
    Enter,
    Tab,
    Escape,
    Arrow(Direction),
    VolumeUp,
    VolumeDown,
    VolumeMute,
    MediaPlayPause,
    MediaNext,
    MediaPrev,
    CtrlC,
    CtrlV,
    AltTab,
    /// Function key `F<n>`
    FunctionKey(u8),
    /// Types the text verbatim
    TypeText(String),
    /// Holds a key down until a matching [`Action::KeyUp`]
    KeyDown(String),
    KeyUp(String),
    MouseClick {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    /// Modifiers first, main key last (`["ctrl", "alt", "delete"]`)
    Combination(Vec<String>),
    /// Taps the keys one after another
    Sequence(Vec<String>),
    /// Literal key tap for anything outside the named vocabulary
    Key(String),
}

impl Action {
    /// Resolves a symbolic action name or a literal key name.
    ///
    /// Names containing `+` become combinations (`"shift+f1"`), `f<n>` becomes a
    /// function key, and everything not in the named vocabulary is a literal key
    /// tap. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        match lower.as_str() {
            "space" => Action::Space,
            "enter" => Action::Enter,
            "tab" => Action::Tab,
            "escape" | "esc" => Action::Escape,
            "arrow_up" => Action::Arrow(Direction::Up),
            "arrow_down" => Action::Arrow(Direction::Down),
            "arrow_left" => Action::Arrow(Direction::Left),
            "arrow_right" => Action::Arrow(Direction::Right),
            "volume_up" => Action::VolumeUp,
            "volume_down" => Action::VolumeDown,
            "volume_mute" => Action::VolumeMute,
            "media_play_pause" => Action::MediaPlayPause,
            "media_next" => Action::MediaNext,
            "media_prev" => Action::MediaPrev,
            "ctrl_c" => Action::CtrlC,
            "ctrl_v" => Action::CtrlV,
            "alt_tab" => Action::AltTab,
            "click" | "mouse_click" => Action::MouseClick {
                x: 0,
                y: 0,
                button: MouseButton::Left,
            },
            combo if combo.contains('+') => Action::Combination(
                combo
                    .split('+')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            other => match function_key_number(other) {
                Some(n) => Action::FunctionKey(n),
                None => Action::Key(other.to_string()),
            },
        }
    }

    /// Mouse clicks and raw key toggles need direct (game) input
    pub fn requires_direct_input(&self) -> bool {
        matches!(
            self,
            Action::MouseClick { .. } | Action::KeyDown(_) | Action::KeyUp(_)
        )
    }

    /// Lowers the action into the strokes the output backend has to perform
    pub fn strokes(&self) -> Vec<KeyStroke> {
        match self {
            Action::Space => vec![KeyStroke::tap("space")],
            Action::Enter => vec![KeyStroke::tap("enter")],
            Action::Tab => vec![KeyStroke::tap("tab")],
            Action::Escape => vec![KeyStroke::tap("escape")],
            Action::Arrow(direction) => vec![KeyStroke::tap(direction.key_name())],
            Action::VolumeUp => vec![KeyStroke::tap("audio_vol_up")],
            Action::VolumeDown => vec![KeyStroke::tap("audio_vol_down")],
            Action::VolumeMute => vec![KeyStroke::tap("audio_mute")],
            Action::MediaPlayPause => vec![KeyStroke::tap("audio_play")],
            Action::MediaNext => vec![KeyStroke::tap("audio_next")],
            Action::MediaPrev => vec![KeyStroke::tap("audio_prev")],
            Action::CtrlC => vec![KeyStroke::chord("c", &["control"])],
            Action::CtrlV => vec![KeyStroke::chord("v", &["control"])],
            Action::AltTab => vec![KeyStroke::chord("tab", &["alt"])],
            Action::FunctionKey(n) => vec![KeyStroke::tap(&format!("f{}", n))],
            Action::TypeText(text) => vec![KeyStroke::Text(text.clone())],
            Action::KeyDown(key) => vec![KeyStroke::Press(normalize_key(key))],
            Action::KeyUp(key) => vec![KeyStroke::Release(normalize_key(key))],
            Action::MouseClick { x, y, button } => vec![KeyStroke::Click {
                x: *x,
                y: *y,
                button: *button,
            }],
            Action::Combination(keys) => {
                let Some((main_key, modifiers)) = keys.split_last() else {
                    return Vec::new();
                };
                let modifiers: Vec<String> = modifiers
                    .iter()
                    .map(|k| normalize_key(k))
                    .filter(|k| MODIFIER_KEYS.contains(&k.as_str()))
                    .collect();
                vec![KeyStroke::Tap {
                    key: normalize_key(main_key),
                    modifiers,
                }]
            }
            Action::Sequence(keys) => keys.iter().map(|k| KeyStroke::tap(k)).collect(),
            Action::Key(key) => vec![KeyStroke::tap(key)],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Space => write!(f, "space"),
            Action::Enter => write!(f, "enter"),
            Action::Tab => write!(f, "tab"),
            Action::Escape => write!(f, "escape"),
            Action::Arrow(direction) => write!(f, "arrow_{}", direction.key_name()),
            Action::VolumeUp => write!(f, "volume_up"),
            Action::VolumeDown => write!(f, "volume_down"),
            Action::VolumeMute => write!(f, "volume_mute"),
            Action::MediaPlayPause => write!(f, "media_play_pause"),
            Action::MediaNext => write!(f, "media_next"),
            Action::MediaPrev => write!(f, "media_prev"),
            Action::CtrlC => write!(f, "ctrl_c"),
            Action::CtrlV => write!(f, "ctrl_v"),
            Action::AltTab => write!(f, "alt_tab"),
            Action::FunctionKey(n) => write!(f, "f_key({})", n),
            Action::TypeText(text) => write!(f, "type_text({:?})", text),
            Action::KeyDown(key) => write!(f, "key_down({})", key),
            Action::KeyUp(key) => write!(f, "key_up({})", key),
            Action::MouseClick { x, y, button } => {
                write!(f, "mouse_click({}, {}, {})", x, y, button)
            }
            Action::Combination(keys) => write!(f, "combination({})", keys.join("+")),
            Action::Sequence(keys) => write!(f, "send_keys({})", keys.join(", ")),
            Action::Key(key) => write!(f, "key({})", key),
        }
    }
}

/// Primitive output step produced by lowering an [`Action`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyStroke {
    Tap { key: String, modifiers: Vec<String> },
    Press(String),
    Release(String),
    Text(String),
    Click { x: i32, y: i32, button: MouseButton },
}

impl KeyStroke {
    fn tap(key: &str) -> Self {
        KeyStroke::Tap {
            key: normalize_key(key),
            modifiers: Vec::new(),
        }
    }

    fn chord(key: &str, modifiers: &[&str]) -> Self {
        KeyStroke::Tap {
            key: normalize_key(key),
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStroke::Tap { key, modifiers } if modifiers.is_empty() => write!(f, "tap {}", key),
            KeyStroke::Tap { key, modifiers } => {
                write!(f, "tap {}+{}", modifiers.join("+"), key)
            }
            KeyStroke::Press(key) => write!(f, "press {}", key),
            KeyStroke::Release(key) => write!(f, "release {}", key),
            KeyStroke::Text(text) => write!(f, "text {:?}", text),
            KeyStroke::Click { x, y, button } => write!(f, "click {} at ({}, {})", button, x, y),
        }
    }
}

/// Maps user-facing key aliases onto the backend's key names
pub fn normalize_key(key: &str) -> String {
    let lower = key.trim().to_lowercase();
    match lower.as_str() {
        "ctrl" => "control".to_string(),
        "win" | "super" | "meta" | "command" => "cmd".to_string(),
        "esc" => "escape".to_string(),
        "return" => "enter".to_string(),
        _ => lower,
    }
}

fn function_key_number(name: &str) -> Option<u8> {
    let digits = name.strip_prefix('f')?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
