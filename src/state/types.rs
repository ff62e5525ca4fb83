//! Mirrored mixer state

use std::collections::{BTreeMap, HashMap};

/// Number of overlay channels on the mixer
pub const OVERLAY_SLOTS: usize = 6;

/// Per-input flag map, ordered by input id for deterministic replay
pub type InputFlags = BTreeMap<u32, bool>;

/// Last known condition of the mixer
///
/// Built from an XML snapshot, then kept current by applying activator
/// notifications. Input id 0 means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirroredState {
    /// Program input
    pub active: u32,
    /// Preview input
    pub preview: u32,
    /// Input shown on each overlay channel, 0 when empty
    pub overlays: [u32; OVERLAY_SLOTS],
    pub streaming: bool,
    pub recording: bool,

    pub playing: InputFlags,
    pub master_audio: InputFlags,
    pub bus_a_audio: InputFlags,
    pub bus_b_audio: InputFlags,

    /// Input title -> input id
    pub name_to_id: HashMap<String, u32>,
    /// Input id -> input title
    pub id_to_name: HashMap<u32, String>,
    /// First text field of every title (GT) input, keyed by input title
    pub text_boxes: HashMap<String, String>,
}

impl MirroredState {
    /// Record an input's id and title in both lookup maps
    pub fn register_input(&mut self, id: u32, title: impl Into<String>) {
        let title = title.into();
        self.name_to_id.insert(title.clone(), id);
        self.id_to_name.insert(id, title);
    }

    pub fn has_input(&self, id: u32) -> bool {
        self.id_to_name.contains_key(&id)
    }

    /// Resolve a configured input reference to the mixer's input title
    ///
    /// Numeric references naming a known input are translated to its title;
    /// anything else is returned unchanged.
    pub fn input_title(&self, reference: &str) -> String {
        reference
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|id| self.id_to_name.get(&id))
            .cloned()
            .unwrap_or_else(|| reference.trim().to_string())
    }

    /// Resolve a configured input reference to an input id string
    ///
    /// Titles of known inputs become their id; anything else is unchanged.
    pub fn input_key(&self, reference: &str) -> String {
        let reference = reference.trim();
        self.name_to_id
            .get(reference)
            .map(|id| id.to_string())
            .unwrap_or_else(|| reference.to_string())
    }

    /// First text field name of a title input
    pub fn text_box(&self, title: &str) -> Option<&str> {
        self.text_boxes.get(title).map(String::as_str)
    }
}
