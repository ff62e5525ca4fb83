//! Verse/text pager
//!
//! Owns no state of its own: each `VerseCursor` it receives is a snapshot of
//! the dispatcher's cursor, shown as `SetText` followed by an overlay-in once
//! the title had time to update.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::mixer::{CommandSink, MixerCommand};

/// Capacity of the pager queue
pub const PAGER_QUEUE_CAPACITY: usize = 8;

/// Text box used when a cursor carries none
pub const FALLBACK_TEXT_BOX: &str = "TextBlock1.Text";

/// Position in a list of verses bound to one title input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseCursor {
    pub input: String,
    pub text_box: String,
    pub verses: Arc<[String]>,
    pub position: usize,
    /// Overlay channel the title is shown on
    pub slot: u8,
}

impl VerseCursor {
    pub fn new(input: impl Into<String>, text_box: impl Into<String>, verses: Arc<[String]>, slot: u8) -> Self {
        Self {
            input: input.into(),
            text_box: text_box.into(),
            verses,
            position: 0,
            slot,
        }
    }

    /// Move by `delta`; `None` (position unchanged) when that would leave the verses
    pub fn advance(&mut self, delta: isize) -> Option<usize> {
        let next = self.position.checked_add_signed(delta)?;
        if next >= self.verses.len() {
            return None;
        }
        self.position = next;
        Some(next)
    }

    pub fn current(&self) -> Option<&str> {
        self.verses.get(self.position).map(String::as_str)
    }
}

pub struct Pager {
    sink: Arc<dyn CommandSink>,
    settle: Duration,
}

impl Pager {
    pub fn new(sink: Arc<dyn CommandSink>, settle: Duration) -> Self {
        Self { sink, settle }
    }

    /// Show cursors until the queue closes
    pub async fn run(self, mut rx: mpsc::Receiver<VerseCursor>) {
        info!("Verse pager started");
        while let Some(cursor) = rx.recv().await {
            self.show(&cursor).await;
        }
        info!("Verse pager stopped");
    }

    async fn show(&self, cursor: &VerseCursor) {
        let Some(verse) = cursor.current() else {
            warn!(
                "Verse {} out of range for input '{}' ({} verses)",
                cursor.position,
                cursor.input,
                cursor.verses.len()
            );
            return;
        };
        debug!("Showing verse {} on '{}'", cursor.position, cursor.input);

        let text_box = if cursor.text_box.is_empty() {
            FALLBACK_TEXT_BOX
        } else {
            cursor.text_box.as_str()
        };

        let set_text = MixerCommand::set_text(&cursor.input, text_box, verse);
        if let Err(e) = self.sink.send(&set_text).await {
            warn!("Failed to set verse text: {}", e);
        }

        tokio::time::sleep(self.settle).await;

        let overlay = MixerCommand::overlay_in(cursor.slot, &cursor.input);
        if let Err(e) = self.sink.send(&overlay).await {
            warn!("Failed to show verse overlay: {}", e);
        }
    }
}
