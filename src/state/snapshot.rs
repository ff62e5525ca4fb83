//! Full state snapshot from the mixer's XML status document

use roxmltree::{Document, Node};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::types::{MirroredState, OVERLAY_SLOTS};
use crate::mixer::client::{dial, RetryPolicy};
use crate::mixer::{MixerCommand, MixerError, Result};

const OPEN_TAG: &str = "<vmix>";
const CLOSE_TAG: &str = "</vmix>";

/// Fetch and parse a snapshot over a dedicated connection
pub async fn fetch_snapshot(addr: &str, policy: RetryPolicy) -> Result<MirroredState> {
    let stream = dial(addr, policy).await?;
    let (read_half, mut write_half) = stream.into_split();

    let request = format!("{}\r\n", MixerCommand::xml());
    write_half
        .write_all(request.as_bytes())
        .await
        .map_err(MixerError::Write)?;
    write_half.flush().await.map_err(MixerError::Write)?;

    let mut reader = BufReader::new(read_half);
    let mut document = String::new();
    let mut raw = Vec::new();
    let mut started = false;

    loop {
        raw.clear();
        let n = reader
            .read_until(b'\n', &mut raw)
            .await
            .map_err(MixerError::Read)?;
        if n == 0 {
            warn!("Mixer closed the connection before the snapshot was complete");
            break;
        }
        // Titles are not guaranteed to be UTF-8
        let mut line = String::from_utf8_lossy(&raw).into_owned();

        if !started {
            match line.find(OPEN_TAG) {
                Some(start) => {
                    started = true;
                    line.drain(..start);
                }
                None => continue,
            }
        }

        document.push_str(&line);
        if line.contains(CLOSE_TAG) {
            break;
        }
    }

    debug!("Snapshot document: {} bytes", document.len());
    let state = parse_snapshot(&document);
    info!(
        "📸 Snapshot: {} inputs, active {}, preview {}",
        state.id_to_name.len(),
        state.active,
        state.preview
    );
    Ok(state)
}

/// Build a state from the XML status document
///
/// Never fails: anything that cannot be parsed is left at its default.
pub fn parse_snapshot(xml: &str) -> MirroredState {
    let mut state = MirroredState::default();

    let xml = match xml.find(CLOSE_TAG) {
        Some(end) => &xml[..end + CLOSE_TAG.len()],
        None => xml,
    };

    let doc = match Document::parse(xml.trim()) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Unparseable snapshot document: {}", e);
            return state;
        }
    };
    let root = doc.root_element();

    if let Some(inputs) = child(root, "inputs") {
        for input in inputs.children().filter(|n| n.has_tag_name("input")) {
            read_input(&mut state, input);
        }
    }

    // Inputs first so overlay references can be checked against them
    if let Some(overlays) = child(root, "overlays") {
        for overlay in overlays.children().filter(|n| n.has_tag_name("overlay")) {
            let slot = overlay
                .attribute("number")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=OVERLAY_SLOTS).contains(n));
            let id = number_text(overlay);

            match slot {
                Some(slot) if id > 0 && state.has_input(id) => state.overlays[slot - 1] = id,
                Some(_) if id > 0 => debug!("Overlay references unknown input {}", id),
                Some(_) => {}
                None => debug!("Ignoring overlay with bad number {:?}", overlay.attribute("number")),
            }
        }
    }

    state.streaming = child(root, "streaming").map(flag_text).unwrap_or(false);
    state.recording = child(root, "recording").map(flag_text).unwrap_or(false);
    state.active = child(root, "active").map(number_text).unwrap_or(0);
    state.preview = child(root, "preview").map(number_text).unwrap_or(0);

    state
}

fn read_input(state: &mut MirroredState, input: Node) {
    let Some(id) = input.attribute("number").and_then(|n| n.parse::<u32>().ok()) else {
        debug!("Skipping input without a number");
        return;
    };
    let title = input.attribute("title").unwrap_or_default().to_string();
    let kind = input.attribute("type").unwrap_or_default();

    if let Some(busses) = input.attribute("audiobusses") {
        if busses.contains('M') {
            state.master_audio.insert(id, true);
        }
        if busses.contains('A') {
            state.bus_a_audio.insert(id, true);
        }
        if busses.contains('B') {
            state.bus_b_audio.insert(id, true);
        }
    }

    if kind == "Video" && input.attribute("state") == Some("Running") {
        state.playing.insert(id, true);
    }

    if kind == "GT" {
        let first_text = input
            .children()
            .find(|n| n.has_tag_name("text"))
            .and_then(|n| n.attribute("name"));
        if let Some(name) = first_text {
            state.text_boxes.insert(title.clone(), name.to_string());
        }
    }

    state.register_input(id, title);
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn number_text(node: Node) -> u32 {
    node.text()
        .and_then(|t| t.trim().parse().ok())
        .unwrap_or(0)
}

fn flag_text(node: Node) -> bool {
    node.text().map(str::trim) == Some("True")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::InputFlags;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const SAMPLE: &str = r#"<vmix>
<version>26.0.0.45</version>
<inputs>
<input key="a" number="1" type="Capture" title="Camera 1" state="Running" audiobusses="M">Camera 1</input>
<input key="b" number="2" type="Video" title="Walk-in" state="Running" audiobusses="AM">Walk-in</input>
<input key="c" number="3" type="GT" title="Lower Third" state="Paused">
<text index="0" name="Headline.Text">Hello</text>
<text index="1" name="Sub.Text">World</text>
</input>
<input key="d" number="4" type="Video" title="Outro" state="Paused" audiobusses="B">Outro</input>
</inputs>
<overlays>
<overlay number="1">3</overlay>
<overlay number="2"/>
<overlay number="3">99</overlay>
<overlay number="4"/>
<overlay number="5"/>
<overlay number="6">2</overlay>
</overlays>
<preview>2</preview>
<active>1</active>
<recording>False</recording>
<streaming>True</streaming>
</vmix>"#;

    #[test]
    fn test_parse_sample() {
        let state = parse_snapshot(SAMPLE);

        assert_eq!(state.active, 1);
        assert_eq!(state.preview, 2);
        assert!(state.streaming);
        assert!(!state.recording);
        assert_eq!(state.overlays, [3, 0, 0, 0, 0, 2]);
        assert_eq!(state.playing, InputFlags::from([(2, true)]));
        assert_eq!(state.bus_b_audio, InputFlags::from([(4, true)]));
        assert_eq!(state.name_to_id.get("Outro"), Some(&4));
        assert_eq!(state.id_to_name.get(&3).map(String::as_str), Some("Lower Third"));
        assert_eq!(state.text_box("Lower Third"), Some("Headline.Text"));
    }

    #[test]
    fn test_audiobusses_substring_match() {
        let state = parse_snapshot(SAMPLE);
        assert_eq!(state.master_audio, InputFlags::from([(1, true), (2, true)]));
        assert_eq!(state.bus_a_audio, InputFlags::from([(2, true)]));
    }

    #[test]
    fn test_garbage_yields_default_state() {
        assert_eq!(parse_snapshot("not xml at all"), MirroredState::default());
        assert_eq!(parse_snapshot(""), MirroredState::default());
    }

    #[test]
    fn test_bad_fields_fall_back_to_zero() {
        let xml = "<vmix><active>abc</active><preview/><streaming>yes</streaming></vmix>";
        let state = parse_snapshot(xml);
        assert_eq!(state.active, 0);
        assert_eq!(state.preview, 0);
        assert!(!state.streaming);
    }

    #[tokio::test]
    async fn test_fetch_snapshot_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut reader = BufReader::new(read_half);
            let mut request = String::new();
            reader.read_line(&mut request).await.unwrap();
            assert_eq!(request, "XML\r\n");

            let body = SAMPLE.replace('\n', "\r\n");
            let reply = format!("XML {}\r\n{}\r\n", body.len(), body);
            write_half.write_all(reply.as_bytes()).await.unwrap();
            // Keep the socket open until the client has read everything
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let policy = RetryPolicy {
            interval: Duration::from_millis(20),
            dial_timeout: Duration::from_secs(1),
        };
        let state = fetch_snapshot(&addr, policy).await.unwrap();
        assert_eq!(state.active, 1);
        assert_eq!(state.overlays[0], 3);
        assert_eq!(state.text_box("Lower Third"), Some("Headline.Text"));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_tolerates_latin1_title() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut reader = BufReader::new(read_half);
            let mut request = String::new();
            reader.read_line(&mut request).await.unwrap();

            let mut reply = b"XML 120\r\n<vmix><active>1</active><preview>2</preview><inputs>".to_vec();
            reply.extend_from_slice(b"<input key=\"a\" number=\"1\" title=\"Caf\xE9\">x</input>");
            reply.extend_from_slice(b"<input key=\"b\" number=\"2\" title=\"Camera\">y</input>");
            reply.extend_from_slice(b"</inputs></vmix>\r\n");
            write_half.write_all(&reply).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let policy = RetryPolicy {
            interval: Duration::from_millis(20),
            dial_timeout: Duration::from_secs(1),
        };
        let state = fetch_snapshot(&addr, policy).await.unwrap();
        assert_eq!(state.active, 1);
        assert_eq!(state.preview, 2);
        assert_eq!(state.id_to_name.len(), 2);
        assert_eq!(state.name_to_id.get("Camera"), Some(&2));
        assert_eq!(state.id_to_name[&1], "Caf\u{FFFD}");
    }
}
