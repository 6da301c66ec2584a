//! Incoming lines, trigger normalization and structural pattern recognition.
//!
//! Recognised shapes, checked in this order:
//!
//! ```text
//! 512                    bare numeric reading
//! TEMP:34                temperature in °C
//! BTN1:ON / BTN1:OFF     button state
//! A0:512                 analog pin value
//! RPM:5120.0,4980.5      raw and filtered wheel rpm
//! INPUT:W / PRESS:W / RELEASE:W   literal key forwarding
//! ```

use super::error::MalformedLine;
use chrono::{DateTime, Local};
use std::fmt;

/// Rule key game modes use for RPM handlers
pub const RPM_RULE: &str = "RPM:";

/// A line as produced by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub text: String,
    pub received_at: DateTime<Local>,
}

impl RawLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Local::now(),
        }
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::new(&self.text)
    }
}

/// Trimmed, uppercased line text used as lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trigger(String);

impl Trigger {
    pub fn new(text: &str) -> Self {
        Self(text.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Trigger {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw and filtered wheel rpm; unparseable halves are `None`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpmReading {
    pub raw: Option<f64>,
    pub filtered: Option<f64>,
    /// The filtered half was present and non-blank, parseable or not
    pub filtered_sent: bool,
}

impl RpmReading {
    pub fn parse(payload: &str) -> Result<Self, MalformedLine> {
        let (raw, filtered, filtered_sent) = match payload.split_once(',') {
            Some((raw, filtered)) => (
                parse_float(raw),
                parse_float(filtered),
                !filtered.trim().is_empty(),
            ),
            None => (parse_float(payload), None, false),
        };
        if raw.is_none() && filtered.is_none() {
            return Err(MalformedLine::new("rpm", payload));
        }
        Ok(Self {
            raw,
            filtered,
            filtered_sent,
        })
    }

    /// Filtered value, falling back to raw
    pub fn effective(&self) -> Option<f64> {
        self.filtered.or(self.raw)
    }

    /// Filtered value when one was sent; raw only stands in for a blank filtered half
    pub fn sent(&self) -> Option<f64> {
        if self.filtered_sent {
            self.filtered
        } else {
            self.raw
        }
    }

    /// Pedal logic uses the smaller of both values and needs both
    pub fn legacy(&self) -> Option<f64> {
        Some(self.raw?.min(self.filtered?))
    }
}

impl fmt::Display for RpmReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(f, "raw: {}, filtered: {}", show(self.raw), show(self.filtered))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyForward {
    Tap,
    Press,
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Numeric(u64),
    Temperature(u64),
    Button { index: u32, pressed: bool },
    Analog { pin: u32, value: u64 },
    Rpm(RpmReading),
    KeyForward { kind: KeyForward, key: String },
}

impl Pattern {
    /// Matches a trigger against the structural shapes.
    ///
    /// `Ok(None)` means no shape matched; `Err` means a shape matched but its
    /// payload could not be used.
    pub fn classify(trigger: &str) -> Result<Option<Pattern>, MalformedLine> {
        if is_digits(trigger) {
            return Ok(Some(Pattern::Numeric(saturating_int(trigger, u64::MAX))));
        }

        if let Some(value) = trigger.strip_prefix("TEMP:").filter(|v| is_digits(v)) {
            return Ok(Some(Pattern::Temperature(saturating_int(value, u64::MAX))));
        }

        if let Some((index, pressed)) = button_parts(trigger) {
            let index = saturating_int(index, u32::MAX);
            return Ok(Some(Pattern::Button { index, pressed }));
        }

        if let Some((pin, value)) = analog_parts(trigger) {
            return Ok(Some(Pattern::Analog {
                pin: saturating_int(pin, u32::MAX),
                value: saturating_int(value, u64::MAX),
            }));
        }

        if let Some(payload) = trigger.strip_prefix(RPM_RULE) {
            return RpmReading::parse(payload).map(|r| Some(Pattern::Rpm(r)));
        }

        let forwards = [
            ("INPUT:", KeyForward::Tap),
            ("PRESS:", KeyForward::Press),
            ("RELEASE:", KeyForward::Release),
        ];
        for (prefix, kind) in forwards {
            if let Some(key) = trigger.strip_prefix(prefix) {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    return Err(MalformedLine::new("key", trigger));
                }
                return Ok(Some(Pattern::KeyForward { kind, key }));
            }
        }

        Ok(None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Pattern::Numeric(_) => "numeric",
            Pattern::Temperature(_) => "temperature",
            Pattern::Button { .. } => "button",
            Pattern::Analog { .. } => "analog",
            Pattern::Rpm(_) => "rpm",
            Pattern::KeyForward { .. } => "key",
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Digit strings only fail to parse on overflow, which clamps to `max`
fn saturating_int<T: std::str::FromStr>(digits: &str, max: T) -> T {
    digits.parse().unwrap_or(max)
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn button_parts(trigger: &str) -> Option<(&str, bool)> {
    let (index, state) = trigger.strip_prefix("BTN")?.split_once(':')?;
    if !is_digits(index) {
        return None;
    }
    match state {
        "ON" => Some((index, true)),
        "OFF" => Some((index, false)),
        _ => None,
    }
}

fn analog_parts(trigger: &str) -> Option<(&str, &str)> {
    let (pin, value) = trigger.strip_prefix('A')?.split_once(':')?;
    (is_digits(pin) && is_digits(value)).then_some((pin, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Result<Option<Pattern>, MalformedLine> {
        Pattern::classify(Trigger::new(text).as_str())
    }

    #[test]
    fn trigger_is_trimmed_and_uppercased() {
        assert_eq!(Trigger::new("  play \r").as_str(), "PLAY");
        assert_eq!(RawLine::new("btn1:on").trigger(), Trigger::from("BTN1:ON"));
    }

    #[test]
    fn recognises_each_shape() -> Result<(), MalformedLine> {
        assert_eq!(classify("512")?, Some(Pattern::Numeric(512)));
        assert_eq!(classify("temp:34")?, Some(Pattern::Temperature(34)));
        assert_eq!(
            classify("BTN2:OFF")?,
            Some(Pattern::Button {
                index: 2,
                pressed: false
            })
        );
        assert_eq!(classify("A0:150")?, Some(Pattern::Analog { pin: 0, value: 150 }));
        assert_eq!(
            classify("RPM:5120.0,4980.5")?,
            Some(Pattern::Rpm(RpmReading {
                raw: Some(5120.0),
                filtered: Some(4980.5),
                filtered_sent: true,
            }))
        );
        assert_eq!(
            classify("press:w")?,
            Some(Pattern::KeyForward {
                kind: KeyForward::Press,
                key: "w".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn scenario_words_do_not_match_shapes() -> Result<(), MalformedLine> {
        assert_eq!(classify("ALT_TAB")?, None);
        assert_eq!(classify("PLAY")?, None);
        assert_eq!(classify("BTN1:MAYBE")?, None);
        assert_eq!(classify("TEMP:-5")?, None);
        assert_eq!(classify("A0:high")?, None);
        Ok(())
    }

    #[test]
    fn unusable_payloads_are_malformed() {
        assert!(classify("RPM:abc,def").is_err());
        assert!(classify("RPM:").is_err());
        assert!(classify("INPUT:").is_err());
    }

    #[test]
    fn oversized_digit_runs_saturate() -> Result<(), MalformedLine> {
        assert_eq!(
            classify("99999999999999999999999")?,
            Some(Pattern::Numeric(u64::MAX))
        );
        assert_eq!(
            classify("TEMP:123456789012345678901")?,
            Some(Pattern::Temperature(u64::MAX))
        );
        assert_eq!(
            classify("A99999999999:5")?,
            Some(Pattern::Analog {
                pin: u32::MAX,
                value: 5
            })
        );
        assert_eq!(classify("18446744073709551615")?, Some(Pattern::Numeric(u64::MAX)));
        Ok(())
    }

    #[test]
    fn rpm_fallbacks() -> Result<(), MalformedLine> {
        let both = RpmReading::parse("40.0,30.0")?;
        assert_eq!(both.effective(), Some(30.0));
        assert_eq!(both.legacy(), Some(30.0));

        let raw_only = RpmReading::parse("120")?;
        assert_eq!(raw_only.effective(), Some(120.0));
        assert_eq!(raw_only.legacy(), None);

        let bad_filtered = RpmReading::parse("80,nan")?;
        assert_eq!(bad_filtered.filtered, None);
        assert_eq!(bad_filtered.effective(), Some(80.0));
        assert_eq!(bad_filtered.sent(), None);

        let blank_filtered = RpmReading::parse("80, ")?;
        assert_eq!(blank_filtered.sent(), Some(80.0));
        Ok(())
    }
}
