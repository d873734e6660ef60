use std::sync::{Arc, Mutex};
use std::time::Duration;
use talkdeck::controller::{Controller, Playback};
use talkdeck::engine::{EngineEvent, NullEngine};
use talkdeck::panel::{apply_command, parse_command, Command};

fn panel_state() -> (
    Arc<Mutex<Controller>>,
    tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = Arc::new(NullEngine::new(tx));
    let ctl = Controller::new(engine, vec!["Hello there.".to_string()]);
    let state = Arc::new(Mutex::new(ctl));
    state.lock().unwrap().refresh_voices();
    (state, rx)
}

async fn wait_for(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
    wanted: EngineEvent,
) -> bool {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = rx.recv().await {
            if event == wanted {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

#[tokio::test]
async fn speak_stop_round_trip_through_the_panel() {
    let (state, mut rx) = panel_state();

    let reply = apply_command(&state, Command::Text("hello panel".to_string()));
    assert_eq!(reply, ["200 11 / 1000"]);

    let reply = apply_command(&state, Command::Speak);
    assert_eq!(reply, ["200 OK SPEAKING"]);

    assert!(wait_for(&mut rx, EngineEvent::Started).await);
    {
        let mut ctl = state.lock().unwrap();
        ctl.handle_engine_event(EngineEvent::Started);
        assert_eq!(ctl.playback(), Playback::Speaking);
    }

    let reply = apply_command(&state, Command::Stop);
    assert_eq!(reply, ["200 OK STOPPED"]);
    assert_eq!(state.lock().unwrap().playback(), Playback::Idle);

    // The null engine still reports the end of the cancelled utterance.
    assert!(wait_for(&mut rx, EngineEvent::Ended).await);
}

#[tokio::test]
async fn voices_and_status_render_multiline_replies() {
    let (state, _rx) = panel_state();

    let reply = apply_command(&state, Command::Voices);
    assert_eq!(reply.last().unwrap(), "211 OK 4 VOICES");
    assert!(reply.contains(&"211 Hoda (ar-EG)".to_string()));

    let reply = apply_command(&state, Command::Status);
    assert_eq!(reply[0], "210 STATE idle");
    // Arabic wins the default-selection policy.
    assert!(reply.contains(&"210 VOICE Hoda".to_string()));
}

#[tokio::test]
async fn controls_gate_commands_while_catalog_is_empty() {
    // No refresh: the catalog has not been populated yet.
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = Arc::new(NullEngine::new(tx));
    let state = Arc::new(Mutex::new(Controller::new(engine, Vec::new())));

    let reply = apply_command(&state, Command::Rate(1.5));
    assert_eq!(reply, ["403 RATE CONTROL DISABLED"]);
    let reply = apply_command(&state, Command::Random);
    assert_eq!(reply, ["403 RANDOMIZE DISABLED"]);

    // Text entry stays usable while waiting for voices.
    let reply = apply_command(&state, Command::Text("early".to_string()));
    assert_eq!(reply, ["200 5 / 1000"]);
}

#[tokio::test]
async fn phrase_shortcut_loads_text_verbatim() {
    let (state, _rx) = panel_state();

    let reply = apply_command(&state, Command::Phrase(0));
    assert_eq!(reply, ["200 12 / 1000"]);
    assert_eq!(state.lock().unwrap().text(), "Hello there.");

    let reply = apply_command(&state, Command::Phrase(7));
    assert_eq!(reply, ["404 NO SUCH PHRASE 7"]);
}

#[test]
fn quit_is_handled_by_the_connection_not_the_dispatcher() {
    assert_eq!(parse_command("QUIT"), Ok(Command::Quit));
}
