//! Hardware dispatch loop
//!
//! Turns button presses, releases and fader moves from the surface into
//! mixer commands, LED updates and pager requests according to the current
//! bindings. The dispatcher owns the verse cursor and the set of people
//! bindings that already started their session.

mod actions;
mod hardware_input;

pub use hardware_input::{decode, SurfaceInput};

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::apc::led::{LedColor, LedCommand};
use crate::apc::SurfaceEvent;
use crate::config::Bindings;
use crate::mixer::{CommandSink, MixerCommand};
use crate::pager::VerseCursor;
use crate::state::StateActorHandle;

/// Binding families consulted on a button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Response,
    Verses,
    People,
    Speaker,
    Shortcut,
}

/// Evaluation order on button-down; every matching family runs
pub const PRESS_ORDER: [BindingKind; 5] = [
    BindingKind::Response,
    BindingKind::Verses,
    BindingKind::People,
    BindingKind::Speaker,
    BindingKind::Shortcut,
];

pub struct Dispatcher {
    sink: Arc<dyn CommandSink>,
    bindings: watch::Receiver<Arc<Bindings>>,
    state: StateActorHandle,
    leds: mpsc::Sender<LedCommand>,
    pager: mpsc::Sender<VerseCursor>,
    /// Cursor of the title currently paged
    cursor: Option<VerseCursor>,
    /// People buttons whose session already started
    people_started: HashSet<u8>,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        bindings: watch::Receiver<Arc<Bindings>>,
        state: StateActorHandle,
        leds: mpsc::Sender<LedCommand>,
        pager: mpsc::Sender<VerseCursor>,
    ) -> Self {
        Self {
            sink,
            bindings,
            state,
            leds,
            pager,
            cursor: None,
            people_started: HashSet::new(),
        }
    }

    pub fn cursor(&self) -> Option<&VerseCursor> {
        self.cursor.as_ref()
    }

    /// Process surface events until the queue closes
    pub async fn run(mut self, mut events: mpsc::Receiver<SurfaceEvent>) {
        info!("Dispatch loop started");
        let mut watching = true;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.on_surface_event(&event).await;
                }
                changed = self.bindings.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    debug!("Bindings reloaded, people sessions reset");
                    self.people_started.clear();
                }
            }
        }

        info!("Dispatch loop stopped");
    }

    fn current_bindings(&self) -> Arc<Bindings> {
        self.bindings.borrow().clone()
    }

    async fn send(&self, command: MixerCommand) {
        debug!("Sending message: {}", command);
        if let Err(e) = self.sink.send(&command).await {
            warn!("Failed to send '{}': {}", command, e);
        }
    }

    async fn led(&self, command: LedCommand) {
        if self.leds.send(command).await.is_err() {
            debug!("LED queue closed");
        }
    }

    async fn led_single(&self, color: LedColor, button: u8) {
        self.led(LedCommand::single(color, button)).await;
    }

    /// Hand the current cursor to the pager
    async fn show_cursor(&self) {
        if let Some(cursor) = &self.cursor {
            if self.pager.send(cursor.clone()).await.is_err() {
                debug!("Pager queue closed");
            }
        }
    }

    async fn crowd_mic(&self, bindings: &Bindings, on: bool) {
        let Some(mic) = bindings.crowd_mic.as_deref() else {
            return;
        };
        let command = if on {
            MixerCommand::audio_bus_on(mic)
        } else {
            MixerCommand::audio_bus_off(mic)
        };
        self.send(command).await;
    }
}
