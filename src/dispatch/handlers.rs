//! Numeric policies: which action (if any) a structural reading or an RPM
//! handler produces. Pure functions, the dispatcher performs the result.

use super::command::{KeyForward, Pattern, RpmReading};
use crate::keys::Action;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub const ACCELERATE_KEY: &str = "w";
pub const CADENCE_RPM_PER_TAP: f64 = 25.0;
pub const MAX_CADENCE_TAPS: usize = 20;

/// Action for a structural pattern no rule or scenario claimed.
///
/// RPM lines never produce an action here; they feed the tracker instead.
/// `PRESS:`/`RELEASE:` only hold or release a key with direct input, otherwise
/// they tap it like `INPUT:`.
pub fn pattern_action(pattern: &Pattern, direct_input: bool) -> Option<Action> {
    match pattern {
        Pattern::Numeric(n) => numeric_action(*n),
        Pattern::Temperature(t) => temperature_action(*t),
        Pattern::Button { index, pressed } => button_action(*index, *pressed),
        Pattern::Analog { pin, value } => analog_action(*pin, *value),
        Pattern::Rpm(_) => None,
        Pattern::KeyForward { kind, key } => Some(match kind {
            KeyForward::Press if direct_input => Action::KeyDown(key.clone()),
            KeyForward::Release if direct_input => Action::KeyUp(key.clone()),
            _ => Action::Key(key.clone()),
        }),
    }
}

pub fn numeric_action(n: u64) -> Option<Action> {
    match n {
        0..=99 => Some(Action::VolumeDown),
        400..=600 => Some(Action::Space),
        n if n > 900 => Some(Action::VolumeUp),
        _ => None,
    }
}

pub fn temperature_action(celsius: u64) -> Option<Action> {
    if celsius > 30 {
        Some(Action::TypeText(format!("Hot! {}°C", celsius)))
    } else if celsius < 10 {
        Some(Action::TypeText(format!("Cold! {}°C", celsius)))
    } else {
        None
    }
}

pub fn button_action(index: u32, pressed: bool) -> Option<Action> {
    if !pressed {
        return None;
    }
    Some(match index {
        1 => Action::Space,
        2 => Action::Enter,
        3 => Action::MediaPlayPause,
        k => Action::FunctionKey(u8::try_from(k).unwrap_or(u8::MAX)),
    })
}

pub fn analog_action(pin: u32, value: u64) -> Option<Action> {
    match pin {
        // potentiometer
        0 if value < 200 => Some(Action::VolumeDown),
        0 if value > 800 => Some(Action::VolumeUp),
        // light sensor
        1 if value < 100 => Some(Action::TypeText("Dark".to_string())),
        1 if value > 900 => Some(Action::TypeText("Bright".to_string())),
        _ => None,
    }
}

/// Game-mode RPM handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpmHandler {
    Racing,
    Flight,
    Cadence,
}

impl RpmHandler {
    pub fn action(&self, reading: &RpmReading) -> Option<Action> {
        match self {
            RpmHandler::Racing => racing_rpm(reading),
            RpmHandler::Flight => flight_rpm(reading),
            RpmHandler::Cadence => cadence_rpm(reading),
        }
    }
}

impl fmt::Display for RpmHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpmHandler::Racing => write!(f, "racing-rpm"),
            RpmHandler::Flight => write!(f, "flight-rpm"),
            RpmHandler::Cadence => write!(f, "cadence-rpm"),
        }
    }
}

fn racing_rpm(reading: &RpmReading) -> Option<Action> {
    let rpm = reading.filtered?;
    info!("Racing RPM: {}", rpm);
    (rpm > 0.0).then(|| Action::Key(ACCELERATE_KEY.to_string()))
}

fn flight_rpm(reading: &RpmReading) -> Option<Action> {
    let rpm = reading.sent()?.trunc();
    info!("Flight RPM: {}", rpm);
    if rpm > 7000.0 {
        debug!("Full throttle");
        Some(Action::from_name("shift+f1"))
    } else if rpm < 3000.0 {
        debug!("Throttle down");
        Some(Action::FunctionKey(1))
    } else {
        None
    }
}

fn cadence_rpm(reading: &RpmReading) -> Option<Action> {
    let rpm = reading.legacy()?;
    if rpm <= CADENCE_RPM_PER_TAP {
        return None;
    }
    let taps = ((rpm / CADENCE_RPM_PER_TAP).round() as usize).min(MAX_CADENCE_TAPS);
    info!("Cadence RPM {} -> {} taps", rpm, taps);
    Some(Action::Sequence(vec![ACCELERATE_KEY.to_string(); taps]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MalformedLine;

    fn reading(raw: f64, filtered: f64) -> RpmReading {
        RpmReading {
            raw: Some(raw),
            filtered: Some(filtered),
            filtered_sent: true,
        }
    }

    #[test]
    fn numeric_thresholds() {
        assert_eq!(numeric_action(50), Some(Action::VolumeDown));
        assert_eq!(numeric_action(100), None);
        assert_eq!(numeric_action(400), Some(Action::Space));
        assert_eq!(numeric_action(600), Some(Action::Space));
        assert_eq!(numeric_action(900), None);
        assert_eq!(numeric_action(901), Some(Action::VolumeUp));
    }

    #[test]
    fn temperature_thresholds() {
        assert_eq!(
            temperature_action(34),
            Some(Action::TypeText("Hot! 34°C".to_string()))
        );
        assert_eq!(
            temperature_action(5),
            Some(Action::TypeText("Cold! 5°C".to_string()))
        );
        assert_eq!(temperature_action(20), None);
        assert_eq!(temperature_action(30), None);
    }

    #[test]
    fn buttons_act_only_when_pressed() {
        assert_eq!(button_action(1, true), Some(Action::Space));
        assert_eq!(button_action(2, true), Some(Action::Enter));
        assert_eq!(button_action(3, true), Some(Action::MediaPlayPause));
        assert_eq!(button_action(7, true), Some(Action::FunctionKey(7)));
        assert_eq!(button_action(1, false), None);
    }

    #[test]
    fn analog_pins() {
        assert_eq!(analog_action(0, 150), Some(Action::VolumeDown));
        assert_eq!(analog_action(0, 500), None);
        assert_eq!(analog_action(0, 801), Some(Action::VolumeUp));
        assert_eq!(
            analog_action(1, 950),
            Some(Action::TypeText("Bright".to_string()))
        );
        assert_eq!(
            analog_action(1, 50),
            Some(Action::TypeText("Dark".to_string()))
        );
        assert_eq!(analog_action(2, 10), None);
    }

    #[test]
    fn rpm_lines_never_act_by_default() {
        assert_eq!(
            pattern_action(&Pattern::Rpm(reading(500.0, 500.0)), false),
            None
        );
    }

    #[test]
    fn key_toggles_need_direct_input() {
        let press = Pattern::KeyForward {
            kind: KeyForward::Press,
            key: "a".to_string(),
        };
        assert_eq!(
            pattern_action(&press, false),
            Some(Action::Key("a".to_string()))
        );
        assert_eq!(
            pattern_action(&press, true),
            Some(Action::KeyDown("a".to_string()))
        );
    }

    #[test]
    fn racing_accelerates_on_positive_filtered_rpm() {
        let accelerate = Some(Action::Key("w".to_string()));
        assert_eq!(RpmHandler::Racing.action(&reading(40.0, 40.0)), accelerate);
        assert_eq!(RpmHandler::Racing.action(&reading(0.0, 0.0)), None);
        let raw_only = RpmReading {
            raw: Some(40.0),
            filtered: None,
            filtered_sent: false,
        };
        assert_eq!(RpmHandler::Racing.action(&raw_only), None);
    }

    #[test]
    fn flight_throttle_bands() {
        assert_eq!(
            RpmHandler::Flight.action(&reading(0.0, 7500.0)),
            Some(Action::Combination(vec![
                "shift".to_string(),
                "f1".to_string()
            ]))
        );
        assert_eq!(
            RpmHandler::Flight.action(&reading(0.0, 2000.0)),
            Some(Action::FunctionKey(1))
        );
        assert_eq!(RpmHandler::Flight.action(&reading(0.0, 5000.0)), None);
    }

    #[test]
    fn flight_uses_raw_only_when_filtered_is_blank() -> Result<(), MalformedLine> {
        let blank = RpmReading::parse("7500,")?;
        assert_eq!(
            RpmHandler::Flight.action(&blank),
            Some(Action::from_name("shift+f1"))
        );

        let garbled = RpmReading::parse("7500,abc")?;
        assert_eq!(RpmHandler::Flight.action(&garbled), None);
        Ok(())
    }

    #[test]
    fn cadence_taps_scale_with_rpm() {
        assert_eq!(RpmHandler::Cadence.action(&reading(20.0, 90.0)), None);
        assert_eq!(
            RpmHandler::Cadence.action(&reading(100.0, 90.0)),
            Some(Action::Sequence(vec!["w".to_string(); 4]))
        );
        assert_eq!(
            RpmHandler::Cadence.action(&reading(5000.0, 5000.0)),
            Some(Action::Sequence(vec!["w".to_string(); MAX_CADENCE_TAPS]))
        );
    }
}
