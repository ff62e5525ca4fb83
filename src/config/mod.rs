//! Configuration management for the vMix APC gateway
//!
//! Handles loading, parsing, validation and hot-reloading of the YAML
//! configuration file. Button ids are the logical ids (1 = top-left pad,
//! 65-80 round buttons, 81 shift); faders are numbered 1-9.

pub mod bindings;
pub mod watcher;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::fs;

use crate::apc::layout::{FADER_COUNT, MAX_LOGICAL_BUTTON};
use crate::apc::led::{LedColor, LedCommand};
use crate::mixer::RetryPolicy;
use crate::state::OVERLAY_SLOTS;
pub use bindings::{Bindings, FaderTarget, ShortcutAction};
pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub virtual_surface: VirtualSurfaceConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub timing: TimingConfig,

    /// Microphone name -> mixer input; `Crowd` is toggled by responses
    #[serde(default)]
    pub microphones: HashMap<String, String>,

    /// LED colour per button applied before every replay
    #[serde(default)]
    pub initial_state: BTreeMap<u8, String>,

    #[serde(default)]
    pub shortcuts: Vec<ShortcutConfig>,
    #[serde(default)]
    pub responses: Vec<ResponseConfig>,
    #[serde(default)]
    pub prayers: Vec<PagedConfig>,
    #[serde(default)]
    pub hymns: Vec<PagedConfig>,
    /// Paged content advanced one entry per press (prayers of the people)
    #[serde(default)]
    pub people: Vec<PagedConfig>,
    #[serde(default)]
    pub speakers: Vec<SpeakerConfig>,
    #[serde(default)]
    pub activators: Vec<ActivatorConfig>,
    #[serde(default)]
    pub faders: Vec<FaderConfig>,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

/// Mixer TCP API endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixerConfig {
    #[serde(default = "default_mixer_address")]
    pub address: String,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl MixerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.retry_interval_ms),
            dial_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            address: default_mixer_address(),
            retry_interval_ms: default_retry_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Hardware surface ports and watchdog timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Case-insensitive substring of the input port name
    #[serde(default = "default_port_pattern")]
    pub input_port: String,
    #[serde(default = "default_port_pattern")]
    pub output_port: String,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            input_port: default_port_pattern(),
            output_port: default_port_pattern(),
            probe_interval_ms: default_probe_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

/// TCP harness standing in for the hardware
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualSurfaceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_virtual_bind")]
    pub bind: String,
}

impl Default for VirtualSurfaceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_virtual_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverlayConfig {
    /// Overlay channel (1-6) used for every text overlay
    #[serde(default = "default_overlay_slot")]
    pub slot: u8,
    /// Text field used when a title input has no known text box
    #[serde(default = "default_text_box")]
    pub default_text_box: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            slot: default_overlay_slot(),
            default_text_box: default_text_box(),
        }
    }
}

/// Settle delays between dependent mixer commands
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Between a response's text update and its overlay
    #[serde(default = "default_response_settle_ms")]
    pub response_settle_ms: u64,
    /// After a speaker's script start
    #[serde(default = "default_script_settle_ms")]
    pub script_settle_ms: u64,
    /// Between a speaker's name update and its overlay
    #[serde(default = "default_speaker_settle_ms")]
    pub speaker_settle_ms: u64,
    /// Between a paged text update and its overlay
    #[serde(default = "default_pager_settle_ms")]
    pub pager_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            response_settle_ms: default_response_settle_ms(),
            script_settle_ms: default_script_settle_ms(),
            speaker_settle_ms: default_speaker_settle_ms(),
            pager_settle_ms: default_pager_settle_ms(),
        }
    }
}

/// Button running mixer functions and LED changes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShortcutConfig {
    pub button: u8,
    #[serde(default)]
    pub pressed: Vec<String>,
    #[serde(default)]
    pub released: Vec<String>,
}

/// Button showing a fixed text on a title input while held
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseConfig {
    pub button: u8,
    /// Input title or number
    pub input: String,
    pub text: String,
    /// LED colour after release
    #[serde(default = "default_off")]
    pub release_color: String,
}

/// Button starting a paged text session
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PagedConfig {
    pub button: u8,
    pub input: String,
    pub verses: Vec<String>,
}

/// Button introducing a speaker with a name caption
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeakerConfig {
    pub button: u8,
    pub input: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// LED rules for one activator trigger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivatorConfig {
    pub trigger: String,
    pub rules: Vec<ActivatorRuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivatorRuleConfig {
    /// Input title or number; omitted for triggers without an input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Actions of the form `color: 1,2,3`
    #[serde(default)]
    pub on: Vec<String>,
    #[serde(default)]
    pub off: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FaderConfig {
    pub fader: u8,
    /// Input number, `Master`, a bus name (`BusA`) or an input title
    pub target: String,
}

/// PTZ camera driven by `preset` shortcuts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    pub name: String,
    /// Host (or host:port) of the camera
    pub address: String,
    #[serde(default)]
    pub mode: CameraMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// ONVIF media profile token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    Onvif,
    Cgi,
    Visca,
    #[default]
    Null,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.mixer.address.trim().is_empty() {
            bail!("mixer.address cannot be empty");
        }
        if self.surface.input_port.is_empty() || self.surface.output_port.is_empty() {
            bail!("surface port patterns cannot be empty");
        }
        if !(1..=OVERLAY_SLOTS as u8).contains(&self.overlay.slot) {
            bail!(
                "overlay.slot {} is invalid (must be 1-{})",
                self.overlay.slot,
                OVERLAY_SLOTS
            );
        }

        for (button, color) in &self.initial_state {
            validate_button(*button).context("initial_state")?;
            color
                .parse::<LedColor>()
                .with_context(|| format!("initial_state button {}", button))?;
        }

        for shortcut in &self.shortcuts {
            validate_button(shortcut.button).context("shortcuts")?;
            let actions = shortcut.pressed.iter().chain(&shortcut.released);
            for action in actions.filter(|a| !a.trim().is_empty()) {
                ShortcutAction::parse(action)
                    .with_context(|| format!("Shortcut on button {}", shortcut.button))?;
            }
        }

        for response in &self.responses {
            validate_button(response.button).context("responses")?;
            response
                .release_color
                .parse::<LedColor>()
                .with_context(|| format!("Response on button {}", response.button))?;
        }

        for (section, entries) in [
            ("prayers", &self.prayers),
            ("hymns", &self.hymns),
            ("people", &self.people),
        ] {
            for entry in entries {
                validate_button(entry.button).context(section)?;
                if entry.verses.is_empty() {
                    bail!("{} on button {} has no verses", section, entry.button);
                }
            }
        }

        for speaker in &self.speakers {
            validate_button(speaker.button).context("speakers")?;
        }

        for activator in &self.activators {
            if activator.trigger.trim().is_empty() {
                bail!("Activator trigger cannot be empty");
            }
            for rule in &activator.rules {
                for action in rule.on.iter().chain(&rule.off) {
                    LedCommand::parse_rule(action)
                        .with_context(|| format!("Activator '{}'", activator.trigger))?;
                }
            }
        }

        let mut faders = HashSet::new();
        for fader in &self.faders {
            if !(1..=FADER_COUNT).contains(&fader.fader) {
                bail!("Fader {} is invalid (must be 1-{})", fader.fader, FADER_COUNT);
            }
            if !faders.insert(fader.fader) {
                bail!("Fader {} is bound twice", fader.fader);
            }
        }

        let mut cameras = HashSet::new();
        for camera in &self.cameras {
            if camera.name.trim().is_empty() {
                bail!("Camera name cannot be empty");
            }
            if !cameras.insert(camera.name.to_lowercase()) {
                bail!("Camera '{}' is defined twice", camera.name);
            }
            if camera.mode != CameraMode::Null && camera.address.trim().is_empty() {
                bail!("Camera '{}' needs an address", camera.name);
            }
        }

        Ok(())
    }
}

fn validate_button(button: u8) -> Result<()> {
    if !(1..=MAX_LOGICAL_BUTTON).contains(&button) {
        bail!("Button {} is invalid (must be 1-{})", button, MAX_LOGICAL_BUTTON);
    }
    Ok(())
}

// Default value functions
fn default_mixer_address() -> String { "127.0.0.1:8099".to_string() }
fn default_retry_interval_ms() -> u64 { 5000 }
fn default_connect_timeout_ms() -> u64 { 20_000 }
fn default_port_pattern() -> String { "APC MINI".to_string() }
fn default_probe_interval_ms() -> u64 { 2000 }
fn default_reconnect_interval_ms() -> u64 { 2000 }
fn default_virtual_bind() -> String { "127.0.0.1:2000".to_string() }
fn default_overlay_slot() -> u8 { 1 }
fn default_text_box() -> String { "TextBlock1.Text".to_string() }
fn default_response_settle_ms() -> u64 { 100 }
fn default_script_settle_ms() -> u64 { 500 }
fn default_speaker_settle_ms() -> u64 { 1200 }
fn default_pager_settle_ms() -> u64 { 300 }
fn default_off() -> String { "off".to_string() }
