//! Akai APC mini driver
//!
//! Handles MIDI communication with the APC mini control surface: button and
//! fader input, LED output and the liveness probe used by the watchdog.

pub mod layout;
pub mod led;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::SurfaceConfig;
use crate::midi::{format_hex, MidiMessage};
use crate::watchdog::SurfaceLink;
use led::LedCommand;

/// Capacity of the hardware event queue
pub const EVENT_QUEUE_CAPACITY: usize = 10;

/// Capacity of the LED command queue
pub const LED_QUEUE_CAPACITY: usize = 40;

/// Reserved native note used to probe the output port
pub const PROBE_NOTE: u8 = 100;

/// MIDI event from the surface (or the virtual surface)
#[derive(Debug, Clone)]
pub struct SurfaceEvent {
    pub message: MidiMessage,
    pub raw_data: Vec<u8>,
}

impl SurfaceEvent {
    pub fn new(message: MidiMessage) -> Self {
        Self {
            raw_data: message.encode().to_vec(),
            message,
        }
    }
}

/// APC mini driver for hardware communication
///
/// All methods take `&self` so the driver can be shared between the LED
/// writer and the watchdog behind an `Arc`.
pub struct ApcDriver {
    input_conn: Mutex<Option<MidiInputConnection<()>>>,
    output_conn: Mutex<Option<MidiOutputConnection>>,

    /// Sender feeding the dispatch loop; survives reconnects
    event_tx: mpsc::Sender<SurfaceEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<SurfaceEvent>>>,

    input_port_name: String,
    output_port_name: String,
}

impl ApcDriver {
    pub fn new(config: &SurfaceConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        Self {
            input_conn: Mutex::new(None),
            output_conn: Mutex::new(None),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            input_port_name: config.input_port.clone(),
            output_port_name: config.output_port.clone(),
        }
    }

    /// Find an input port by case-insensitive substring match
    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(midir::MidiInputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_in.ports().into_iter().find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            if name.to_lowercase().contains(&pattern) {
                debug!("Found input port '{}' matching '{}'", name, pattern);
                Some((port, name))
            } else {
                None
            }
        })
    }

    /// Find an output port by case-insensitive substring match
    fn find_output_port(
        midi_out: &MidiOutput,
        pattern: &str,
    ) -> Option<(midir::MidiOutputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_out.ports().into_iter().find_map(|port| {
            let name = midi_out.port_name(&port).ok()?;
            if name.to_lowercase().contains(&pattern) {
                debug!("Found output port '{}' matching '{}'", name, pattern);
                Some((port, name))
            } else {
                None
            }
        })
    }

    /// Open both MIDI ports, replacing any existing connection
    pub fn connect(&self) -> Result<()> {
        self.disconnect();

        info!(
            "Connecting to APC mini - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in = MidiInput::new("vMix-APC-Input").context("Failed to create MIDI input")?;
        let (in_port, in_name) = Self::find_input_port(&midi_in, &self.input_port_name)
            .ok_or_else(|| anyhow!("Input port '{}' not found", self.input_port_name))?;

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                "vMix-APC",
                move |_timestamp, data, _| match MidiMessage::parse(data) {
                    Some(message) => {
                        let event = SurfaceEvent {
                            message,
                            raw_data: data.to_vec(),
                        };
                        // Runs on the MIDI backend thread, outside the runtime
                        if event_tx.blocking_send(event).is_err() {
                            debug!("Dispatch queue closed, dropping {}", format_hex(data));
                        }
                    }
                    None => debug!("Failed to parse MIDI: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", in_name, e))?;

        let midi_out = MidiOutput::new("vMix-APC-Output").context("Failed to create MIDI output")?;
        let (out_port, out_name) = Self::find_output_port(&midi_out, &self.output_port_name)
            .ok_or_else(|| anyhow!("Output port '{}' not found", self.output_port_name))?;

        let output_conn = midi_out
            .connect(&out_port, "vMix-APC")
            .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", out_name, e))?;

        *self.input_conn.lock() = Some(input_conn);
        *self.output_conn.lock() = Some(output_conn);

        info!("✅ APC mini connected ({} / {})", in_name, out_name);
        Ok(())
    }

    /// Drop both port connections
    pub fn disconnect(&self) {
        let had_input = self.input_conn.lock().take().is_some();
        let had_output = self.output_conn.lock().take().is_some();
        if had_input || had_output {
            info!("APC mini disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.lock().is_some() && self.output_conn.lock().is_some()
    }

    /// Send a MIDI message to the surface
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        let mut guard = self.output_conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Not connected to output port"))?;

        let data = message.encode();
        conn.send(&data).context("Failed to send MIDI message")?;

        trace!("Sent: {} | {}", format_hex(&data), message);
        Ok(())
    }

    /// Render an LED command on the surface
    pub fn send_led(&self, command: &LedCommand) -> Result<()> {
        for message in command.to_midi() {
            self.send(&message)?;
        }
        debug!("LED {} -> {:?}", command.color, command.buttons);
        Ok(())
    }

    /// Sender into the hardware event queue, shared with the virtual surface
    pub fn event_sender(&self) -> mpsc::Sender<SurfaceEvent> {
        self.event_tx.clone()
    }

    /// Take the event receiver (for the dispatch loop to consume)
    pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        self.event_rx.lock().take()
    }

    /// Spawn the task draining the LED queue onto the surface
    ///
    /// Failed writes are logged; the watchdog owns recovery.
    pub fn spawn_led_writer(self: &Arc<Self>, mut rx: mpsc::Receiver<LedCommand>) -> JoinHandle<()> {
        let driver = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                if let Err(e) = driver.send_led(&command) {
                    warn!("Failed to write LEDs {:?}: {}", command.buttons, e);
                }
            }
            debug!("LED queue closed, writer exiting");
        })
    }
}

#[async_trait]
impl SurfaceLink for ApcDriver {
    async fn probe(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow!("APC mini ports are not open"));
        }
        self.send(&MidiMessage::NoteOff {
            channel: 0,
            note: PROBE_NOTE,
            velocity: 0,
        })
    }

    async fn reopen(&self) -> Result<()> {
        self.connect()
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new("vMix-APC-Discovery")?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_in
                    .port_name(port)
                    .ok()
                    .map(|name| PortInfo { index, name })
            })
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
        let midi_out = MidiOutput::new("vMix-APC-Discovery")?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out
                    .port_name(port)
                    .ok()
                    .map(|name| PortInfo { index, name })
            })
            .collect())
    }

    fn print_section(title: &str, ports: Result<Vec<PortInfo>>, pattern: &str) {
        println!("\n{}", title.bold());
        match ports {
            Ok(ports) if ports.is_empty() => println!("  {}", "No ports found".dimmed()),
            Ok(ports) => {
                for port in ports {
                    let marker = if port.name.to_lowercase().contains(&pattern.to_lowercase()) {
                        "[MATCH]".green()
                    } else {
                        "       ".normal()
                    };
                    println!("  {} {}: {}", marker, port.index, port.name);
                }
            }
            Err(e) => println!("  {} {}", "Error:".red(), e),
        }
    }

    /// Print all ports, marking those the configured patterns would pick
    pub fn print_ports(config: &SurfaceConfig) {
        println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
        print_section("Input Ports:", discover_input_ports(), &config.input_port);
        print_section("Output Ports:", discover_output_ports(), &config.output_port);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use led::LedColor;

    fn test_config() -> SurfaceConfig {
        SurfaceConfig {
            input_port: "no-such-port-for-tests".to_string(),
            output_port: "no-such-port-for-tests".to_string(),
            ..SurfaceConfig::default()
        }
    }

    #[test]
    fn test_port_discovery() {
        // Only checks that discovery does not panic without hardware
        let _ = discovery::discover_input_ports();
        let _ = discovery::discover_output_ports();
    }

    #[test]
    fn test_send_without_connection_fails() {
        let driver = ApcDriver::new(&test_config());
        assert!(!driver.is_connected());
        assert!(driver
            .send_led(&LedCommand::single(LedColor::Red, 1))
            .is_err());
    }

    #[tokio::test]
    async fn test_probe_fails_when_disconnected() {
        let driver = ApcDriver::new(&test_config());
        assert!(driver.probe().await.is_err());
    }

    #[tokio::test]
    async fn test_event_sender_feeds_receiver() {
        let driver = ApcDriver::new(&test_config());
        let mut rx = driver.take_event_receiver().unwrap();
        assert!(driver.take_event_receiver().is_none());

        let msg = MidiMessage::NoteOn {
            channel: 0,
            note: 56,
            velocity: 127,
        };
        driver.event_sender().send(SurfaceEvent::new(msg)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.message, msg);
        assert_eq!(event.raw_data, vec![0x90, 56, 127]);
    }
}
