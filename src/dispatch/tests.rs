//! Tests for the dispatch loop

use super::*;
use crate::apc::layout::{cc_from_fader, native_note};
use crate::camera::{CameraError, PtzCamera};
use crate::config::AppConfig;
use crate::midi::MidiMessage;
use crate::mixer::Result as MixerResult;
use crate::state::MirroredState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, command: &MixerCommand) -> MixerResult<()> {
        self.lines.lock().push(command.to_string());
        Ok(())
    }
}

struct FakeCamera {
    presets: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl PtzCamera for FakeCamera {
    fn name(&self) -> &str {
        "Pulpit"
    }

    async fn goto_preset(&self, preset: &str) -> Result<(), CameraError> {
        let _ = self.presets.send(preset.to_string());
        Ok(())
    }
}

const CONFIG: &str = r#"
timing:
  response_settle_ms: 0
  script_settle_ms: 0
  speaker_settle_ms: 0
  pager_settle_ms: 0
microphones:
  Crowd: "12"
responses:
  - button: 7
    input: "3"
    text: "Amen"
  - button: 14
    input: "3"
    text: "Thanks be to God"
    release_color: yellow
shortcuts:
  - button: 7
    pressed: ["Foo"]
  - button: 70
    pressed: ["Next"]
  - button: 69
    pressed: ["Prev"]
  - button: 71
    pressed: ["OvOff"]
  - button: 72
    pressed: ["leds green 1,2", "preset pulpit 4"]
    released: ["leds off 1,2"]
prayers:
  - button: 20
    input: "Prayer"
    verses: ["Our Father", "Amen"]
hymns:
  - button: 21
    input: "Hymn"
    verses: ["Verse 1", "Verse 2", "Verse 3"]
people:
  - button: 22
    input: "Prayer"
    verses: ["For the church", "For the world"]
speakers:
  - button: 30
    input: "Lower Third"
    name: "Jane Doe"
    script: "SpeakerIn"
faders:
  - fader: 1
    target: "3"
  - fader: 9
    target: Master
  - fader: 2
    target: BusA
  - fader: 3
    target: Dynamic1
"#;

struct Harness {
    dispatcher: Dispatcher,
    sink: Arc<RecordingSink>,
    leds: mpsc::Receiver<LedCommand>,
    pager: mpsc::Receiver<VerseCursor>,
    _bindings_tx: watch::Sender<Arc<Bindings>>,
    presets: mpsc::UnboundedReceiver<String>,
}

fn mixer_state() -> MirroredState {
    let mut state = MirroredState::default();
    state.register_input(3, "Response Title");
    state.register_input(4, "Prayer");
    state.register_input(5, "Hymn");
    state.register_input(6, "Lower Third");
    state
        .text_boxes
        .insert("Lower Third".to_string(), "Name.Text".to_string());
    state
}

fn harness() -> Harness {
    let config = AppConfig::from_yaml(CONFIG).unwrap();
    let state = mixer_state();
    let mut bindings = Bindings::resolve(&config, &state).unwrap();

    let (preset_tx, presets) = mpsc::unbounded_channel();
    bindings.cameras.insert(Arc::new(FakeCamera { presets: preset_tx }));

    let (bindings_tx, bindings_rx) = watch::channel(Arc::new(bindings));
    let sink = Arc::new(RecordingSink::default());
    let (led_tx, leds) = mpsc::channel(64);
    let (pager_tx, pager) = mpsc::channel(64);

    let dispatcher = Dispatcher::new(
        sink.clone(),
        bindings_rx,
        StateActorHandle::spawn(state),
        led_tx,
        pager_tx,
    );

    Harness {
        dispatcher,
        sink,
        leds,
        pager,
        _bindings_tx: bindings_tx,
        presets,
    }
}

fn press(button: u8) -> SurfaceEvent {
    SurfaceEvent::new(MidiMessage::NoteOn {
        channel: 0,
        note: native_note(button).unwrap(),
        velocity: 127,
    })
}

fn release(button: u8) -> SurfaceEvent {
    SurfaceEvent::new(MidiMessage::NoteOn {
        channel: 0,
        note: native_note(button).unwrap(),
        velocity: 0,
    })
}

fn fader(fader: u8, value: u8) -> SurfaceEvent {
    SurfaceEvent::new(MidiMessage::ControlChange {
        channel: 0,
        cc: cc_from_fader(fader).unwrap(),
        value,
    })
}

fn drain<T>(rx: &mut mpsc::Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

#[test]
fn test_decode_surface_messages() {
    let top_left = native_note(1).unwrap();
    assert_eq!(
        decode(&MidiMessage::NoteOn { channel: 0, note: top_left, velocity: 127 }),
        Some(SurfaceInput::Press(1))
    );
    assert_eq!(
        decode(&MidiMessage::NoteOn { channel: 0, note: top_left, velocity: 0 }),
        Some(SurfaceInput::Release(1))
    );
    assert_eq!(
        decode(&MidiMessage::NoteOff { channel: 0, note: top_left, velocity: 64 }),
        Some(SurfaceInput::Release(1))
    );
    assert_eq!(
        decode(&MidiMessage::NoteOn { channel: 0, note: top_left, velocity: 5 }),
        None
    );
    assert_eq!(
        decode(&MidiMessage::ControlChange { channel: 0, cc: 56, value: 90 }),
        Some(SurfaceInput::Fader { fader: 9, value: 90 })
    );
    assert_eq!(
        decode(&MidiMessage::ControlChange { channel: 0, cc: 7, value: 90 }),
        None
    );
    assert_eq!(
        decode(&MidiMessage::NoteOn { channel: 0, note: 120, velocity: 127 }),
        None
    );
}

#[tokio::test]
async fn test_response_and_shortcut_on_one_button() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(7)).await;

    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION SetText Input=Response+Title&SelectedName=TextBlock1.Text&Value=Amen",
            "FUNCTION AudioBusOn Value=M&Input=12",
            "FUNCTION OverlayInput1In Input=Response+Title",
            "FUNCTION Foo",
        ]
    );
    assert_eq!(drain(&mut h.leds), vec![LedCommand::single(LedColor::Red, 7)]);
}

#[tokio::test]
async fn test_response_release_uses_release_color() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&release(14)).await;

    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION OverlayInput1Out",
            "FUNCTION AudioBusOff Value=M&Input=12",
        ]
    );
    assert_eq!(drain(&mut h.leds), vec![LedCommand::single(LedColor::Yellow, 14)]);

    h.dispatcher.on_surface_event(&release(7)).await;
    assert_eq!(drain(&mut h.leds), vec![LedCommand::single(LedColor::Off, 7)]);
}

#[tokio::test]
async fn test_fader_scaling_per_target() {
    let mut h = harness();
    for event in [fader(9, 127), fader(9, 0), fader(9, 64)] {
        h.dispatcher.on_surface_event(&event).await;
    }
    h.dispatcher.on_surface_event(&fader(1, 127)).await;
    h.dispatcher.on_surface_event(&fader(2, 100)).await;
    h.dispatcher.on_surface_event(&fader(3, 1)).await;
    h.dispatcher.on_surface_event(&fader(4, 127)).await;

    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION SetMasterVolume Value=100",
            "FUNCTION SetMasterVolume Value=0",
            "FUNCTION SetMasterVolume Value=50",
            "FUNCTION SetVolume Input=3&Value=100",
            "FUNCTION SetBusAVolume Value=78",
            "FUNCTION SetVolume Input=Dynamic1&Value=0",
        ]
    );
}

#[tokio::test]
async fn test_hymn_and_verse_navigation() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(21)).await;

    let shown = drain(&mut h.pager);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].input, "Hymn");
    assert_eq!(shown[0].position, 0);
    assert!(h.sink.take().is_empty());

    h.dispatcher.on_surface_event(&press(70)).await;
    h.dispatcher.on_surface_event(&press(70)).await;
    assert_eq!(
        drain(&mut h.pager).iter().map(|c| c.position).collect::<Vec<_>>(),
        vec![1, 2]
    );

    // At the last verse the position holds and the LED turns off
    h.dispatcher.on_surface_event(&press(70)).await;
    assert!(drain(&mut h.pager).is_empty());
    assert_eq!(h.dispatcher.cursor().unwrap().position, 2);
    assert_eq!(
        drain(&mut h.leds),
        vec![
            LedCommand::single(LedColor::Yellow, 70),
            LedCommand::single(LedColor::Yellow, 70),
            LedCommand::single(LedColor::Off, 70),
        ]
    );

    h.dispatcher.on_surface_event(&press(69)).await;
    assert_eq!(drain(&mut h.pager)[0].position, 1);
}

#[tokio::test]
async fn test_prayer_turns_crowd_mic_on() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(20)).await;

    assert_eq!(drain(&mut h.pager)[0].verses[0], "Our Father");
    assert_eq!(h.sink.take(), vec!["FUNCTION AudioBusOn Value=M&Input=12"]);
}

#[tokio::test]
async fn test_people_session_advances_then_ends() {
    let mut h = harness();

    h.dispatcher.on_surface_event(&press(22)).await;
    assert_eq!(drain(&mut h.pager)[0].position, 0);
    assert!(drain(&mut h.leds).is_empty());

    h.dispatcher.on_surface_event(&press(22)).await;
    assert_eq!(drain(&mut h.pager)[0].position, 1);
    assert_eq!(drain(&mut h.leds), vec![LedCommand::single(LedColor::Red, 22)]);

    h.dispatcher.on_surface_event(&press(22)).await;
    assert!(drain(&mut h.pager).is_empty());
    assert_eq!(drain(&mut h.leds), vec![LedCommand::single(LedColor::Off, 22)]);

    assert_eq!(
        h.sink.take(),
        vec!["FUNCTION AudioBusOn Value=M&Input=12"; 3]
    );

    h.dispatcher.on_surface_event(&release(22)).await;
    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION OverlayInput1Out",
            "FUNCTION AudioBusOff Value=M&Input=12",
        ]
    );
}

#[tokio::test]
async fn test_overlay_off_clears_cursor() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(21)).await;
    h.dispatcher.on_surface_event(&press(71)).await;

    assert!(h.dispatcher.cursor().is_none());
    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION OverlayInput1Out Input=Hymn",
            "FUNCTION ScriptStart Value=OverlayOff",
        ]
    );

    // Navigation without a cursor does nothing
    drain(&mut h.pager);
    h.dispatcher.on_surface_event(&press(70)).await;
    assert!(drain(&mut h.pager).is_empty());
    assert!(drain(&mut h.leds).is_empty());
}

#[tokio::test]
async fn test_speaker_sequence() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(30)).await;

    assert_eq!(
        h.sink.take(),
        vec![
            "FUNCTION ScriptStart Value=SpeakerIn",
            "FUNCTION SetText Input=Lower+Third&SelectedName=Name.Text&Value=Jane+Doe",
            "FUNCTION OverlayInput1In Input=Lower+Third",
        ]
    );
}

#[tokio::test]
async fn test_shortcut_leds_and_camera_preset() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(72)).await;
    h.dispatcher.on_surface_event(&release(72)).await;

    assert_eq!(
        drain(&mut h.leds),
        vec![
            LedCommand::new(LedColor::Green, vec![1, 2]),
            LedCommand::new(LedColor::Off, vec![1, 2]),
        ]
    );

    let preset = tokio::time::timeout(Duration::from_secs(1), h.presets.recv())
        .await
        .unwrap();
    assert_eq!(preset.as_deref(), Some("4"));
    assert!(h.sink.take().is_empty());
}

#[tokio::test]
async fn test_unbound_button_is_ignored() {
    let mut h = harness();
    h.dispatcher.on_surface_event(&press(40)).await;
    h.dispatcher.on_surface_event(&release(40)).await;

    assert!(h.sink.take().is_empty());
    assert!(drain(&mut h.leds).is_empty());
    assert!(drain(&mut h.pager).is_empty());
}

#[tokio::test]
async fn test_reload_resets_people_sessions() {
    let h = harness();
    let Harness {
        dispatcher,
        sink,
        mut pager,
        _bindings_tx: bindings_tx,
        ..
    } = h;

    let (event_tx, event_rx) = mpsc::channel(8);
    let task = tokio::spawn(dispatcher.run(event_rx));

    event_tx.send(press(22)).await.unwrap();
    event_tx.send(press(22)).await.unwrap();
    assert_eq!(pager.recv().await.unwrap().position, 0);
    assert_eq!(pager.recv().await.unwrap().position, 1);

    let reloaded = Bindings::resolve(&AppConfig::from_yaml(CONFIG).unwrap(), &mixer_state()).unwrap();
    bindings_tx.send(Arc::new(reloaded)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A fresh session starts from the first verse again
    event_tx.send(press(22)).await.unwrap();
    assert_eq!(pager.recv().await.unwrap().position, 0);

    drop(event_tx);
    task.await.unwrap();
    assert_eq!(sink.take().len(), 3);
}
