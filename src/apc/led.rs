//! LED colours and LED commands for the APC mini

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::str::FromStr;

use super::layout;
use crate::midi::MidiMessage;

/// LED state of a button
///
/// Round buttons only have a single colour, driven with `On`/`Blink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Off,
    Green,
    GreenBlink,
    Red,
    RedBlink,
    Yellow,
    YellowBlink,
    On,
    Blink,
}

impl LedColor {
    /// Note-on velocity selecting this colour, `None` for off
    pub fn velocity(self) -> Option<u8> {
        match self {
            LedColor::Off => None,
            LedColor::Green | LedColor::On => Some(1),
            LedColor::GreenBlink | LedColor::Blink => Some(2),
            LedColor::Red => Some(3),
            LedColor::RedBlink => Some(4),
            LedColor::Yellow => Some(5),
            LedColor::YellowBlink => Some(6),
        }
    }
}

impl FromStr for LedColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LedColor::Off),
            "green" => Ok(LedColor::Green),
            "greenblink" => Ok(LedColor::GreenBlink),
            "red" => Ok(LedColor::Red),
            "redblink" => Ok(LedColor::RedBlink),
            "yellow" => Ok(LedColor::Yellow),
            "yellowblink" => Ok(LedColor::YellowBlink),
            "on" => Ok(LedColor::On),
            "blink" => Ok(LedColor::Blink),
            other => Err(anyhow!("Unknown LED color '{}'", other)),
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedColor::Off => "off",
            LedColor::Green => "green",
            LedColor::GreenBlink => "greenBlink",
            LedColor::Red => "red",
            LedColor::RedBlink => "redBlink",
            LedColor::Yellow => "yellow",
            LedColor::YellowBlink => "yellowBlink",
            LedColor::On => "on",
            LedColor::Blink => "blink",
        };
        f.write_str(name)
    }
}

/// A colour applied to a set of logical buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedCommand {
    pub color: LedColor,
    pub buttons: Vec<u8>,
}

impl LedCommand {
    pub fn new(color: LedColor, buttons: Vec<u8>) -> Self {
        Self { color, buttons }
    }

    /// Single-button command
    pub fn single(color: LedColor, button: u8) -> Self {
        Self::new(color, vec![button])
    }

    /// Every grid and round button set to one colour
    pub fn all(color: LedColor) -> Self {
        Self::new(color, (1..layout::MAX_LOGICAL_BUTTON).collect())
    }

    /// Parse an activator action of the form `red: 1,2,3`
    pub fn parse_rule(action: &str) -> Result<Self> {
        let (color, buttons) = action
            .split_once(':')
            .ok_or_else(|| anyhow!("LED action '{}' is missing ':'", action))?;
        Ok(Self::new(color.parse()?, parse_button_list(buttons)?))
    }

    /// MIDI messages that render this command on the surface
    ///
    /// Buttons with no native note are skipped.
    pub fn to_midi(&self) -> Vec<MidiMessage> {
        self.buttons
            .iter()
            .filter_map(|&button| layout::native_note(button))
            .map(|note| match self.color.velocity() {
                Some(velocity) => MidiMessage::NoteOn {
                    channel: 0,
                    note,
                    velocity,
                },
                None => MidiMessage::NoteOff {
                    channel: 0,
                    note,
                    velocity: 0,
                },
            })
            .collect()
    }
}

/// Parse a comma separated list of logical button ids
pub fn parse_button_list(list: &str) -> Result<Vec<u8>> {
    let buttons = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| anyhow!("Invalid button id '{}'", s))
        })
        .collect::<Result<Vec<_>>>()?;

    if buttons.is_empty() {
        bail!("Empty button list");
    }
    Ok(buttons)
}
