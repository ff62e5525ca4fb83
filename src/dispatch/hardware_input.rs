//! Surface input decoding and press/release/fader handling

use tracing::{debug, trace};

use super::{BindingKind, Dispatcher, PRESS_ORDER};
use crate::apc::layout;
use crate::apc::led::LedColor;
use crate::apc::SurfaceEvent;
use crate::config::{Bindings, FaderTarget};
use crate::midi::{format_hex, to_percent_7bit, MidiMessage, VELOCITY_PRESSED};
use crate::mixer::MixerCommand;
use crate::pager::VerseCursor;

/// Surface input in logical numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    Press(u8),
    Release(u8),
    Fader { fader: u8, value: u8 },
}

/// Translate a raw surface message; unmapped controls yield `None`
pub fn decode(message: &MidiMessage) -> Option<SurfaceInput> {
    match *message {
        MidiMessage::NoteOn { note, velocity, .. } if velocity == VELOCITY_PRESSED => {
            layout::logical_button(note).map(SurfaceInput::Press)
        }
        MidiMessage::NoteOn { note, velocity: 0, .. } | MidiMessage::NoteOff { note, .. } => {
            layout::logical_button(note).map(SurfaceInput::Release)
        }
        MidiMessage::ControlChange { cc, value, .. } => {
            layout::fader_from_cc(cc).map(|fader| SurfaceInput::Fader { fader, value })
        }
        MidiMessage::NoteOn { .. } => None,
    }
}

/// Volume command for one fader move
pub fn fader_command(target: &FaderTarget, value: u8) -> MixerCommand {
    let volume = to_percent_7bit(value).to_string();
    match target {
        FaderTarget::Input(id) => MixerCommand::function("SetVolume")
            .param("Input", id.to_string())
            .param("Value", volume),
        FaderTarget::Master => MixerCommand::function("SetMasterVolume").param("Value", volume),
        FaderTarget::Bus(bus) => {
            MixerCommand::function(format!("Set{}Volume", bus)).param("Value", volume)
        }
        FaderTarget::Named(name) => MixerCommand::function("SetVolume")
            .param("Input", name.as_str())
            .param("Value", volume),
    }
}

impl Dispatcher {
    pub async fn on_surface_event(&mut self, event: &SurfaceEvent) {
        let Some(input) = decode(&event.message) else {
            trace!("Unmapped surface message: {}", format_hex(&event.raw_data));
            return;
        };

        let bindings = self.current_bindings();
        match input {
            SurfaceInput::Press(button) => {
                debug!("Button Down: {}", button);
                self.on_press(button, &bindings).await;
            }
            SurfaceInput::Release(button) => {
                debug!("Button Up: {}", button);
                self.on_release(button, &bindings).await;
            }
            SurfaceInput::Fader { fader, value } => {
                if let Some(target) = bindings.faders.get(&fader) {
                    self.send(fader_command(target, value)).await;
                }
            }
        }
    }

    async fn on_press(&mut self, button: u8, bindings: &Bindings) {
        for kind in PRESS_ORDER {
            match kind {
                BindingKind::Response => self.press_response(button, bindings).await,
                BindingKind::Verses => self.press_verses(button, bindings).await,
                BindingKind::People => self.press_people(button, bindings).await,
                BindingKind::Speaker => self.press_speaker(button, bindings).await,
                BindingKind::Shortcut => {
                    if let Some(shortcut) = bindings.shortcuts.get(&button) {
                        self.run_actions(button, &shortcut.pressed, bindings).await;
                    }
                }
            }
        }
    }

    async fn on_release(&mut self, button: u8, bindings: &Bindings) {
        let slot = bindings.overlay_slot;

        if bindings.people.contains_key(&button) {
            self.send(MixerCommand::overlay_out(slot, None)).await;
            self.crowd_mic(bindings, false).await;
        }

        if let Some(response) = bindings.responses.get(&button) {
            self.send(MixerCommand::overlay_out(slot, None)).await;
            self.crowd_mic(bindings, false).await;
            self.led_single(response.release_color, button).await;
        }

        if let Some(shortcut) = bindings.shortcuts.get(&button) {
            self.run_actions(button, &shortcut.released, bindings).await;
        }
    }

    async fn press_response(&mut self, button: u8, bindings: &Bindings) {
        let Some(response) = bindings.responses.get(&button) else {
            return;
        };

        self.send(MixerCommand::set_text(&response.input, &response.text_box, &response.text))
            .await;
        self.crowd_mic(bindings, true).await;
        tokio::time::sleep(bindings.timing.response_settle).await;
        self.send(MixerCommand::overlay_in(bindings.overlay_slot, &response.input))
            .await;

        self.led_single(LedColor::Red, button).await;
    }

    async fn press_verses(&mut self, button: u8, bindings: &Bindings) {
        if let Some(prayer) = bindings.prayers.get(&button) {
            self.cursor = Some(VerseCursor::new(
                &prayer.input,
                &prayer.text_box,
                prayer.verses.clone(),
                bindings.overlay_slot,
            ));
            self.show_cursor().await;
            self.crowd_mic(bindings, true).await;
        }

        if let Some(hymn) = bindings.hymns.get(&button) {
            self.cursor = Some(VerseCursor::new(
                &hymn.input,
                &hymn.text_box,
                hymn.verses.clone(),
                bindings.overlay_slot,
            ));
            self.show_cursor().await;
        }
    }

    async fn press_people(&mut self, button: u8, bindings: &Bindings) {
        let Some(people) = bindings.people.get(&button) else {
            return;
        };

        if self.people_started.insert(button) {
            self.cursor = Some(VerseCursor::new(
                &people.input,
                &people.text_box,
                people.verses.clone(),
                bindings.overlay_slot,
            ));
            self.show_cursor().await;
        } else if let Some(cursor) = self.cursor.as_mut() {
            if cursor.advance(1).is_some() {
                self.show_cursor().await;
                self.led_single(LedColor::Red, button).await;
            } else {
                self.led_single(LedColor::Off, button).await;
            }
        }

        self.crowd_mic(bindings, true).await;
    }

    async fn press_speaker(&mut self, button: u8, bindings: &Bindings) {
        let Some(speaker) = bindings.speakers.get(&button) else {
            return;
        };

        if let Some(script) = &speaker.script {
            self.send(MixerCommand::script_start(script)).await;
            tokio::time::sleep(bindings.timing.script_settle).await;
        }

        self.send(MixerCommand::set_text(&speaker.input, &speaker.text_box, &speaker.name))
            .await;
        tokio::time::sleep(bindings.timing.speaker_settle).await;
        self.send(MixerCommand::overlay_in(bindings.overlay_slot, &speaker.input))
            .await;
    }
}
