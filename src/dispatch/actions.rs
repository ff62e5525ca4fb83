//! Shortcut action execution

use tracing::{debug, info, warn};

use super::Dispatcher;
use crate::apc::led::LedColor;
use crate::config::{Bindings, ShortcutAction};
use crate::mixer::MixerCommand;

impl Dispatcher {
    pub(super) async fn run_actions(&mut self, button: u8, actions: &[ShortcutAction], bindings: &Bindings) {
        for action in actions {
            debug!("Performing action: {:?}", action);
            self.run_action(button, action, bindings).await;
        }
    }

    async fn run_action(&mut self, button: u8, action: &ShortcutAction, bindings: &Bindings) {
        match action {
            ShortcutAction::Leds(command) => self.led(command.clone()).await,

            ShortcutAction::CameraPreset { camera, preset } => {
                let Some(cam) = bindings.cameras.get(camera) else {
                    debug!("No camera named '{}'", camera);
                    return;
                };
                let preset = preset.clone();
                info!("🎬 Moving camera '{}' to preset {}", cam.name(), preset);
                tokio::spawn(async move {
                    if let Err(e) = cam.goto_preset(&preset).await {
                        warn!("Camera '{}' preset {} failed: {}", cam.name(), preset, e);
                    }
                });
            }

            ShortcutAction::NextVerse => {
                let Some(cursor) = self.cursor.as_mut() else {
                    return;
                };
                if cursor.advance(1).is_some() {
                    self.show_cursor().await;
                    self.led_single(LedColor::Yellow, button).await;
                } else {
                    self.led_single(LedColor::Off, button).await;
                }
            }

            ShortcutAction::PrevVerse => {
                let Some(cursor) = self.cursor.as_mut() else {
                    return;
                };
                if cursor.advance(-1).is_some() {
                    self.show_cursor().await;
                }
            }

            ShortcutAction::OverlayOff => {
                let input = self.cursor.take().map(|cursor| cursor.input);
                self.send(MixerCommand::overlay_out(bindings.overlay_slot, input.as_deref()))
                    .await;
                self.send(MixerCommand::script_start("OverlayOff")).await;
            }

            ShortcutAction::DumpState => {
                let state = self.state.snapshot().await;
                info!("Mirrored mixer state:\n{:#?}", state);
                info!("Notifications mirrored: {}", self.state.update_count().await);
                info!("Bindings: {}", bindings.summary());
                info!("Verse cursor: {:?}", self.cursor);
            }

            ShortcutAction::Function(text) => {
                self.send(MixerCommand::user_function(text)).await;
            }
        }
    }
}
