//! Runtime binding tables
//!
//! `Bindings::resolve` turns the YAML configuration into the lookup tables
//! used by the dispatch loop and the activator consumer: input references
//! are resolved against the mirrored mixer state and every action string is
//! parsed once.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{AppConfig, PagedConfig, TimingConfig};
use crate::activator::{ActivatorRule, ActivatorTable};
use crate::apc::led::{parse_button_list, LedColor, LedCommand};
use crate::camera::CameraRegistry;
use crate::state::MirroredState;

/// Name of the microphone toggled by responses and prayers
pub const CROWD_MIC: &str = "Crowd";

/// One parsed shortcut action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutAction {
    /// `leds <color> <ids>`
    Leds(LedCommand),
    /// `preset <camera> <preset>`
    CameraPreset { camera: String, preset: String },
    /// `Next`
    NextVerse,
    /// `Prev`
    PrevVerse,
    /// `OvOff`
    OverlayOff,
    /// `dumpVars`
    DumpState,
    /// Anything else, sent as `FUNCTION <text>`
    Function(String),
}

impl ShortcutAction {
    pub fn parse(action: &str) -> Result<Self> {
        let action = action.trim();
        if action.is_empty() {
            bail!("Empty shortcut action");
        }

        let mut words = action.split_whitespace();
        let keyword = words.next().unwrap_or_default();

        match keyword {
            "leds" => {
                let color = words
                    .next()
                    .ok_or_else(|| anyhow!("'{}' is missing a color", action))?;
                let buttons = words
                    .next()
                    .ok_or_else(|| anyhow!("'{}' is missing buttons", action))?;
                Ok(ShortcutAction::Leds(LedCommand::new(
                    color.parse()?,
                    parse_button_list(buttons)?,
                )))
            }
            "preset" => {
                let camera = words
                    .next()
                    .ok_or_else(|| anyhow!("'{}' is missing a camera", action))?;
                let preset = words
                    .next()
                    .ok_or_else(|| anyhow!("'{}' is missing a preset", action))?;
                Ok(ShortcutAction::CameraPreset {
                    camera: camera.to_lowercase(),
                    preset: preset.to_string(),
                })
            }
            "Next" => Ok(ShortcutAction::NextVerse),
            "Prev" => Ok(ShortcutAction::PrevVerse),
            "OvOff" => Ok(ShortcutAction::OverlayOff),
            "dumpVars" => Ok(ShortcutAction::DumpState),
            _ => Ok(ShortcutAction::Function(action.to_string())),
        }
    }
}

/// What a fader controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaderTarget {
    Input(u32),
    Master,
    /// Bus by name, e.g. `BusA`
    Bus(String),
    /// Input by title
    Named(String),
}

impl FaderTarget {
    pub fn parse(target: &str) -> Self {
        let target = target.trim();
        if let Ok(id) = target.parse() {
            FaderTarget::Input(id)
        } else if target == "Master" {
            FaderTarget::Master
        } else if target.contains("Bus") {
            FaderTarget::Bus(target.to_string())
        } else {
            FaderTarget::Named(target.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseBinding {
    pub input: String,
    pub text_box: String,
    pub text: String,
    pub release_color: LedColor,
}

#[derive(Debug, Clone)]
pub struct PagedBinding {
    pub input: String,
    pub text_box: String,
    pub verses: Arc<[String]>,
}

#[derive(Debug, Clone)]
pub struct SpeakerBinding {
    pub input: String,
    pub text_box: String,
    pub name: String,
    pub script: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ShortcutBinding {
    pub pressed: Vec<ShortcutAction>,
    pub released: Vec<ShortcutAction>,
}

/// Settle delays as durations
#[derive(Debug, Clone, Copy, Default)]
pub struct Timing {
    pub response_settle: Duration,
    pub script_settle: Duration,
    pub speaker_settle: Duration,
    pub pager_settle: Duration,
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Self {
            response_settle: Duration::from_millis(config.response_settle_ms),
            script_settle: Duration::from_millis(config.script_settle_ms),
            speaker_settle: Duration::from_millis(config.speaker_settle_ms),
            pager_settle: Duration::from_millis(config.pager_settle_ms),
        }
    }
}

/// Resolved tables shared by the dispatch loop and the activator consumer
#[derive(Debug, Default)]
pub struct Bindings {
    pub responses: HashMap<u8, ResponseBinding>,
    pub prayers: HashMap<u8, PagedBinding>,
    pub hymns: HashMap<u8, PagedBinding>,
    pub people: HashMap<u8, PagedBinding>,
    pub speakers: HashMap<u8, SpeakerBinding>,
    pub shortcuts: HashMap<u8, ShortcutBinding>,
    pub faders: HashMap<u8, FaderTarget>,
    pub activators: ActivatorTable,
    pub cameras: CameraRegistry,
    /// LED commands applied before every replay
    pub initial_leds: Vec<LedCommand>,
    /// Input of the crowd microphone, if configured
    pub crowd_mic: Option<String>,
    pub overlay_slot: u8,
    pub timing: Timing,
}

impl Bindings {
    /// Build runtime tables from the configuration and the mixer's inputs
    pub fn resolve(config: &AppConfig, state: &MirroredState) -> Result<Self> {
        let text_box_for = |title: &str| {
            state
                .text_box(title)
                .unwrap_or(config.overlay.default_text_box.as_str())
                .to_string()
        };
        let paged = |entries: &[PagedConfig]| -> HashMap<u8, PagedBinding> {
            entries
                .iter()
                .map(|entry| {
                    let input = state.input_title(&entry.input);
                    let binding = PagedBinding {
                        text_box: text_box_for(&input),
                        input,
                        verses: entry.verses.clone().into(),
                    };
                    (entry.button, binding)
                })
                .collect()
        };

        let mut responses = HashMap::new();
        for entry in &config.responses {
            let input = state.input_title(&entry.input);
            responses.insert(
                entry.button,
                ResponseBinding {
                    text_box: text_box_for(&input),
                    input,
                    text: entry.text.clone(),
                    release_color: entry.release_color.parse()?,
                },
            );
        }

        let speakers = config
            .speakers
            .iter()
            .map(|entry| {
                let input = state.input_title(&entry.input);
                let binding = SpeakerBinding {
                    text_box: text_box_for(&input),
                    input,
                    name: entry.name.clone(),
                    script: entry
                        .script
                        .as_deref()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                };
                (entry.button, binding)
            })
            .collect();

        let mut shortcuts = HashMap::new();
        for entry in &config.shortcuts {
            let parse_all = |actions: &[String]| -> Result<Vec<ShortcutAction>> {
                actions
                    .iter()
                    .filter(|a| !a.trim().is_empty())
                    .map(|a| ShortcutAction::parse(a))
                    .collect()
            };
            shortcuts.insert(
                entry.button,
                ShortcutBinding {
                    pressed: parse_all(&entry.pressed)
                        .with_context(|| format!("Shortcut on button {}", entry.button))?,
                    released: parse_all(&entry.released)
                        .with_context(|| format!("Shortcut on button {}", entry.button))?,
                },
            );
        }

        let mut activators = ActivatorTable::default();
        for activator in &config.activators {
            for rule in &activator.rules {
                let key = match &rule.input {
                    Some(input) => state.input_key(input),
                    None => crate::mixer::event::NO_INPUT.to_string(),
                };
                let parse_all = |actions: &[String]| -> Result<Vec<LedCommand>> {
                    actions.iter().map(|a| LedCommand::parse_rule(a)).collect()
                };
                activators.insert(
                    &activator.trigger,
                    key,
                    ActivatorRule {
                        on: parse_all(&rule.on)?,
                        off: parse_all(&rule.off)?,
                    },
                );
            }
        }

        let faders = config
            .faders
            .iter()
            .map(|f| (f.fader, FaderTarget::parse(&f.target)))
            .collect();

        let mut initial_leds = Vec::new();
        for (button, color) in &config.initial_state {
            initial_leds.push(LedCommand::single(color.parse()?, *button));
        }

        Ok(Self {
            responses,
            prayers: paged(&config.prayers),
            hymns: paged(&config.hymns),
            people: paged(&config.people),
            speakers,
            shortcuts,
            faders,
            activators,
            cameras: CameraRegistry::from_config(&config.cameras)?,
            initial_leds,
            crowd_mic: config.microphones.get(CROWD_MIC).cloned(),
            overlay_slot: config.overlay.slot,
            timing: Timing::from(&config.timing),
        })
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} shortcuts, {} responses, {} prayers, {} hymns, {} people, {} speakers, {} faders, {} activator rules, {} cameras",
            self.shortcuts.len(),
            self.responses.len(),
            self.prayers.len(),
            self.hymns.len(),
            self.people.len(),
            self.speakers.len(),
            self.faders.len(),
            self.activators.len(),
            self.cameras.len(),
        )
    }
}
