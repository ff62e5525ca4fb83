//! Activator rules: mixer notifications to LED commands
//!
//! A rule table keyed by trigger and input maps `ACTS` notifications to LED
//! commands. The same table replays the mirrored state after startup and
//! every reconnect so the surface shows what a live subscriber would see.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::apc::led::{LedColor, LedCommand};
use crate::config::Bindings;
use crate::mixer::ActsEvent;
use crate::state::{InputFlags, MirroredState, StateActorHandle};

/// LED commands for one (trigger, input) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivatorRule {
    pub on: Vec<LedCommand>,
    pub off: Vec<LedCommand>,
}

/// trigger -> input key -> rule
#[derive(Debug, Clone, Default)]
pub struct ActivatorTable {
    rules: HashMap<String, HashMap<String, ActivatorRule>>,
}

impl ActivatorTable {
    pub fn insert(&mut self, trigger: &str, input_key: impl Into<String>, rule: ActivatorRule) {
        self.rules
            .entry(trigger.to_string())
            .or_default()
            .insert(input_key.into(), rule);
    }

    /// Number of (trigger, input) rules
    pub fn len(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// LED commands for one notification
    ///
    /// Value `0` selects the off actions, `1` the on actions; anything else
    /// or a missing rule yields nothing.
    pub fn evaluate(&self, event: &ActsEvent) -> Vec<LedCommand> {
        let Some(rule) = self
            .rules
            .get(&event.trigger)
            .and_then(|inputs| inputs.get(event.input_key()))
        else {
            return Vec::new();
        };

        match event.value.as_str() {
            "1" => rule.on.clone(),
            "0" => rule.off.clone(),
            _ => Vec::new(),
        }
    }

    /// LED commands reproducing `state` on a freshly cleared surface
    pub fn replay(&self, state: &MirroredState) -> Vec<LedCommand> {
        bootstrap_events(state)
            .iter()
            .flat_map(|event| self.evaluate(event))
            .collect()
    }
}

/// Notifications a live subscriber would have received to reach `state`
pub fn bootstrap_events(state: &MirroredState) -> Vec<ActsEvent> {
    let mut events = Vec::new();

    if state.active != 0 {
        events.push(ActsEvent::new("Input", Some(state.active), true));
    }
    if state.preview != 0 {
        events.push(ActsEvent::new("InputPreview", Some(state.preview), true));
    }
    for (index, &input) in state.overlays.iter().enumerate() {
        if input != 0 {
            events.push(ActsEvent::new(format!("Overlay{}", index + 1), Some(input), true));
        }
    }
    events.push(ActsEvent::new("Streaming", None, state.streaming));
    events.push(ActsEvent::new("Recording", None, state.recording));

    let sets: [(&str, &InputFlags); 4] = [
        ("InputPlaying", &state.playing),
        ("InputMasterAudio", &state.master_audio),
        ("InputBusAAudio", &state.bus_a_audio),
        ("InputBusBAudio", &state.bus_b_audio),
    ];
    for (trigger, flags) in sets {
        for (&input, &on) in flags {
            events.push(ActsEvent::new(trigger, Some(input), on));
        }
    }

    events
}

/// Full LED picture for a surface in unknown state
///
/// Everything off, then the configured initial state, then the replay.
pub fn surface_restore(bindings: &Bindings, state: &MirroredState) -> Vec<LedCommand> {
    let mut commands = vec![LedCommand::all(LedColor::Off)];
    commands.extend(bindings.initial_leds.iter().cloned());
    commands.extend(bindings.activators.replay(state));
    commands
}

/// Consume mixer lines: activator rules first, then the state update
///
/// Runs until the line queue closes. Bindings are re-read from the watch
/// channel for every line so a reload takes effect immediately.
pub async fn run_consumer(
    mut lines: mpsc::Receiver<String>,
    bindings: watch::Receiver<Arc<Bindings>>,
    state: StateActorHandle,
    leds: mpsc::Sender<LedCommand>,
) {
    info!("Mixer event consumer started");

    while let Some(line) = lines.recv().await {
        let Some(event) = ActsEvent::parse(&line) else {
            debug!("Ignoring mixer line: {}", line);
            continue;
        };

        let commands = bindings.borrow().activators.evaluate(&event);
        for command in commands {
            if leds.send(command).await.is_err() {
                debug!("LED queue closed");
            }
        }

        state.apply(event);
    }

    info!("Mixer event consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ActivatorTable {
        let mut table = ActivatorTable::default();
        table.insert(
            "Input",
            "3",
            ActivatorRule {
                on: vec![LedCommand::single(LedColor::Red, 1)],
                off: vec![LedCommand::single(LedColor::Off, 1)],
            },
        );
        table.insert(
            "Streaming",
            "none",
            ActivatorRule {
                on: vec![LedCommand::single(LedColor::RedBlink, 80)],
                off: vec![LedCommand::single(LedColor::Off, 80)],
            },
        );
        table.insert(
            "InputBusBAudio",
            "4",
            ActivatorRule {
                on: vec![LedCommand::single(LedColor::Green, 9)],
                off: vec![LedCommand::single(LedColor::Yellow, 9)],
            },
        );
        table.insert(
            "Overlay1",
            "5",
            ActivatorRule {
                on: vec![LedCommand::new(LedColor::Yellow, vec![2, 3])],
                off: vec![],
            },
        );
        table
    }

    fn event(line: &str) -> ActsEvent {
        ActsEvent::parse(line).unwrap()
    }

    #[test]
    fn test_evaluate_on_off_and_misses() {
        let table = table();
        assert_eq!(
            table.evaluate(&event("ACTS OK Input 3 1")),
            vec![LedCommand::single(LedColor::Red, 1)]
        );
        assert_eq!(
            table.evaluate(&event("ACTS OK Input 3 0")),
            vec![LedCommand::single(LedColor::Off, 1)]
        );
        assert!(table.evaluate(&event("ACTS OK Input 3 2")).is_empty());
        assert!(table.evaluate(&event("ACTS OK Input 4 1")).is_empty());
        assert!(table.evaluate(&event("ACTS OK Recording 1")).is_empty());
        assert_eq!(
            table.evaluate(&event("ACTS OK Streaming 1")),
            vec![LedCommand::single(LedColor::RedBlink, 80)]
        );
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_bootstrap_events_cover_state() {
        let mut state = MirroredState::default();
        state.active = 3;
        state.overlays[0] = 5;
        state.recording = true;
        state.bus_b_audio = InputFlags::from([(6, false), (4, true)]);

        let lines: Vec<String> = bootstrap_events(&state)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec![
                "ACTS OK Input 3 1",
                "ACTS OK Overlay1 5 1",
                "ACTS OK Streaming 0",
                "ACTS OK Recording 1",
                "ACTS OK InputBusBAudio 4 1",
                "ACTS OK InputBusBAudio 6 0",
            ]
        );
    }

    #[test]
    fn test_replay_matches_live_sequence() {
        let table = table();
        let live = [
            "ACTS OK Input 3 1",
            "ACTS OK Overlay1 5 1",
            "ACTS OK Streaming 1",
            "ACTS OK InputBusBAudio 4 1",
        ];

        let mut state = MirroredState::default();
        let mut live_commands = Vec::new();
        for line in live {
            let parsed = event(line);
            live_commands.extend(table.evaluate(&parsed));
            state.apply(&parsed);
        }

        assert_eq!(table.replay(&state), live_commands);
    }

    #[test]
    fn test_surface_restore_order() {
        let mut bindings = Bindings::default();
        bindings.activators = table();
        bindings.initial_leds = vec![LedCommand::single(LedColor::On, 65)];

        let mut state = MirroredState::default();
        state.active = 3;

        let commands = surface_restore(&bindings, &state);
        assert_eq!(
            commands,
            vec![
                LedCommand::all(LedColor::Off),
                LedCommand::single(LedColor::On, 65),
                LedCommand::single(LedColor::Red, 1),
                LedCommand::single(LedColor::Off, 80),
            ]
        );
    }

    #[tokio::test]
    async fn test_consumer_evaluates_then_applies() {
        let mut bindings = Bindings::default();
        bindings.activators = table();
        let (_bindings_tx, bindings_rx) = watch::channel(Arc::new(bindings));

        let state = StateActorHandle::spawn(MirroredState::default());
        let (line_tx, line_rx) = mpsc::channel(8);
        let (led_tx, mut led_rx) = mpsc::channel(8);

        let consumer = tokio::spawn(run_consumer(line_rx, bindings_rx, state.clone(), led_tx));

        line_tx.send("SUBSCRIBE OK ACTS".to_string()).await.unwrap();
        line_tx.send("ACTS OK Input 3 1".to_string()).await.unwrap();
        drop(line_tx);
        consumer.await.unwrap();

        assert_eq!(led_rx.recv().await, Some(LedCommand::single(LedColor::Red, 1)));
        assert_eq!(state.snapshot().await.active, 3);
    }
}
