//! TCP stand-in for the control surface
//!
//! Accepts one client at a time. Each line is a command:
//! `p N` presses logical button N, `r N` releases it, `f N V` moves fader
//! N to V and `STOP` shuts the listener down. Commands become the same
//! native MIDI triples the hardware sends and join the hardware event queue.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::apc::layout::{cc_from_fader, native_note};
use crate::apc::SurfaceEvent;
use crate::midi::{MidiMessage, VELOCITY_PRESSED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualCommand {
    Press(u8),
    Release(u8),
    Fader { fader: u8, value: u8 },
    Stop,
}

impl VirtualCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line == "STOP" {
            return Some(VirtualCommand::Stop);
        }

        let mut words = line.split_whitespace();
        let verb = words.next()?;
        let number: u8 = words.next()?.parse().ok()?;

        match verb {
            "p" => Some(VirtualCommand::Press(number)),
            "r" => Some(VirtualCommand::Release(number)),
            "f" => {
                let value: u8 = words.next()?.parse().ok()?;
                (value <= 127).then_some(VirtualCommand::Fader {
                    fader: number,
                    value,
                })
            }
            _ => None,
        }
    }

    /// Native surface message; `None` for `Stop` and unmapped controls
    pub fn to_message(self) -> Option<MidiMessage> {
        match self {
            VirtualCommand::Press(button) => native_note(button).map(|note| MidiMessage::NoteOn {
                channel: 0,
                note,
                velocity: VELOCITY_PRESSED,
            }),
            VirtualCommand::Release(button) => native_note(button).map(|note| MidiMessage::NoteOn {
                channel: 0,
                note,
                velocity: 0,
            }),
            VirtualCommand::Fader { fader, value } => {
                cc_from_fader(fader).map(|cc| MidiMessage::ControlChange { channel: 0, cc, value })
            }
            VirtualCommand::Stop => None,
        }
    }
}

/// Bind the listener and serve it in the background
pub async fn spawn(bind: &str, events: mpsc::Sender<SurfaceEvent>) -> Result<JoinHandle<()>> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind virtual surface on {}", bind))?;
    info!("🎹 Virtual surface listening on {}", bind);

    Ok(tokio::spawn(async move {
        if let Err(e) = serve(listener, events).await {
            warn!("Virtual surface stopped: {}", e);
        }
    }))
}

/// Serve clients until one sends `STOP`
pub async fn serve(listener: TcpListener, events: mpsc::Sender<SurfaceEvent>) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Virtual surface client connected: {}", peer);

        if handle_client(stream, &events).await? {
            info!("Virtual surface stopped by client");
            return Ok(());
        }
        debug!("Virtual surface client disconnected: {}", peer);
    }
}

/// Returns true when the client asked the listener to stop
async fn handle_client(stream: TcpStream, events: &mpsc::Sender<SurfaceEvent>) -> Result<bool> {
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = VirtualCommand::parse(&line) else {
            debug!("Ignoring virtual surface line: {:?}", line);
            continue;
        };
        if command == VirtualCommand::Stop {
            return Ok(true);
        }
        if let Some(message) = command.to_message() {
            events
                .send(SurfaceEvent::new(message))
                .await
                .context("Hardware event queue closed")?;
        }
    }

    Ok(false)
}
