//! Incremental state updates from activator notifications

use super::types::{InputFlags, MirroredState, OVERLAY_SLOTS};
use crate::mixer::ActsEvent;

impl MirroredState {
    /// Apply one notification, updating exactly one field
    ///
    /// Set-valued parameters are replaced by a map holding only the reported
    /// input. Returns `false` for parameters that are not mirrored.
    pub fn apply(&mut self, event: &ActsEvent) -> bool {
        let input = event.input_id();
        let on = event.is_on();

        match event.trigger.as_str() {
            "Input" => self.active = input,
            "InputPreview" => self.preview = input,
            "Streaming" => self.streaming = on,
            "Recording" => self.recording = on,
            "InputPlaying" => self.playing = singleton(input, on),
            "InputMasterAudio" => self.master_audio = singleton(input, on),
            "InputBusAAudio" => self.bus_a_audio = singleton(input, on),
            "InputBusBAudio" => self.bus_b_audio = singleton(input, on),
            trigger => match overlay_index(trigger) {
                Some(index) => self.overlays[index] = if on { input } else { 0 },
                None => return false,
            },
        }
        true
    }
}

fn singleton(input: u32, on: bool) -> InputFlags {
    InputFlags::from([(input, on)])
}

/// Zero-based slot for `Overlay1`..`Overlay6`
fn overlay_index(trigger: &str) -> Option<usize> {
    let n: usize = trigger.strip_prefix("Overlay")?.parse().ok()?;
    (1..=OVERLAY_SLOTS).contains(&n).then(|| n - 1)
}
