//! The control surface: a line protocol over TCP through which a user or
//! script drives the panel. One verb per line, numeric-prefixed replies;
//! multi-line replies use "NNN-" continuations and end with "NNN ".

use crate::controller::{Controller, Playback, SpeakOutcome, CANCEL_GRACE};
use crate::surface::{format_pitch, format_rate};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

pub type SharedController = Arc<Mutex<Controller>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text(String),
    Phrase(usize),
    Phrases,
    Voice(String),
    Voices,
    Rate(f32),
    Pitch(f32),
    Speak,
    Stop,
    Random,
    Status,
    Quit,
}

/// Parses one command line. Rate and pitch fall back to 1.0 on a malformed
/// number, matching what the original panel sliders did.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (verb, rest) = match line.split_once(' ') {
        Some((v, r)) => (v, r),
        None => (line, ""),
    };

    match verb.to_uppercase().as_str() {
        "TEXT" => Ok(Command::Text(rest.to_string())),
        "PHRASE" => rest
            .trim()
            .parse::<usize>()
            .map(Command::Phrase)
            .map_err(|_| format!("bad phrase index: {}", rest.trim())),
        "PHRASES" => Ok(Command::Phrases),
        "VOICE" => {
            let name = rest.trim();
            if name.is_empty() {
                Err("missing voice name".to_string())
            } else {
                Ok(Command::Voice(name.to_string()))
            }
        }
        "VOICES" => Ok(Command::Voices),
        "RATE" => Ok(Command::Rate(rest.trim().parse().unwrap_or(1.0))),
        "PITCH" => Ok(Command::Pitch(rest.trim().parse().unwrap_or(1.0))),
        "SPEAK" => Ok(Command::Speak),
        "STOP" => Ok(Command::Stop),
        "RANDOM" => Ok(Command::Random),
        "STATUS" => Ok(Command::Status),
        "QUIT" => Ok(Command::Quit),
        other => Err(format!("unknown command: {}", other)),
    }
}

pub async fn start_server(addr: &str, state: SharedController) {
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("could not bind {} (occupied?): {}", addr, e);
            return;
        }
    };

    info!("control panel listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(socket, state).await {
                        warn!("connection {} ended with error: {}", peer, e);
                    }
                });
            }
            Err(e) => error!("accept error: {}", e),
        }
    }
}

async fn handle_connection(mut socket: TcpStream, state: SharedController) -> std::io::Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    writer
        .write_all(format!("299-talkdeck {}\r\n299 OK READY\r\n", env!("CARGO_PKG_VERSION")).as_bytes())
        .await?;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let reply = match parse_command(&line) {
            Ok(Command::Quit) => {
                writer.write_all(b"231 HAPPY TALKING\r\n").await?;
                return Ok(());
            }
            Ok(command) => apply_command(&state, command),
            Err(msg) => vec![format!("500 ERR {}", msg)],
        };

        for chunk in render_reply(&reply) {
            writer.write_all(chunk.as_bytes()).await?;
        }
    }
    Ok(())
}

/// Joins reply lines in wire form: all but the last line get the "NNN-"
/// continuation marker, the last keeps its "NNN " form.
fn render_reply(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let text = if i + 1 < lines.len() {
                l.replacen(' ', "-", 1)
            } else {
                l.clone()
            };
            format!("{}\r\n", text)
        })
        .collect()
}

/// Applies one command under the controller lock and formats the reply.
pub fn apply_command(state: &SharedController, command: Command) -> Vec<String> {
    let Ok(mut ctl) = state.lock() else {
        return vec!["500 ERR internal state poisoned".to_string()];
    };
    let controls = ctl.controls();

    match command {
        Command::Text(text) => {
            if !controls.text_entry {
                return vec!["403 TEXT ENTRY DISABLED".to_string()];
            }
            ctl.set_text(text);
            vec![format!("200 {}", ctl.char_counter())]
        }
        Command::Phrase(index) => {
            if !controls.phrases {
                return vec!["403 PHRASES DISABLED".to_string()];
            }
            if ctl.apply_phrase(index) {
                vec![format!("200 {}", ctl.char_counter())]
            } else {
                vec![format!("404 NO SUCH PHRASE {}", index)]
            }
        }
        Command::Phrases => {
            let mut reply: Vec<String> = ctl
                .phrases()
                .iter()
                .enumerate()
                .map(|(i, p)| format!("210 {} {}", i, p))
                .collect();
            reply.push(format!("210 OK {} PHRASES", ctl.phrases().len()));
            reply
        }
        Command::Voice(name) => {
            if !controls.voice {
                return vec!["403 VOICE CONTROL DISABLED".to_string()];
            }
            if ctl.select_voice(&name) {
                vec![format!("200 VOICE {}", name)]
            } else {
                vec![format!("404 NO SUCH VOICE {}", name)]
            }
        }
        Command::Voices => {
            let mut reply: Vec<String> = ctl
                .catalog()
                .iter()
                .map(|v| format!("211 {} ({})", v.name, v.lang))
                .collect();
            reply.push(format!("211 OK {} VOICES", ctl.catalog().len()));
            reply
        }
        Command::Rate(rate) => {
            if !controls.rate {
                return vec!["403 RATE CONTROL DISABLED".to_string()];
            }
            ctl.set_rate(rate);
            vec![format!("200 RATE {}", format_rate(ctl.rate()))]
        }
        Command::Pitch(pitch) => {
            if !controls.pitch {
                return vec!["403 PITCH CONTROL DISABLED".to_string()];
            }
            ctl.set_pitch(pitch);
            vec![format!("200 PITCH {}", format_pitch(ctl.pitch()))]
        }
        Command::Speak => match ctl.speak() {
            SpeakOutcome::Issued => vec!["200 OK SPEAKING".to_string()],
            SpeakOutcome::Deferred => {
                schedule_pending(state.clone());
                vec!["200 OK RESTARTING".to_string()]
            }
            SpeakOutcome::Rejected(e) => vec![format!("400 {}", e)],
        },
        Command::Stop => {
            ctl.stop();
            vec!["200 OK STOPPED".to_string()]
        }
        Command::Random => {
            if ctl.randomize() {
                vec![format!(
                    "200 {} {} {}",
                    ctl.selected_voice().unwrap_or("-"),
                    format_rate(ctl.rate()),
                    format_pitch(ctl.pitch())
                )]
            } else {
                vec!["403 RANDOMIZE DISABLED".to_string()]
            }
        }
        Command::Status => {
            let controls = ctl.controls();
            vec![
                format!(
                    "210 STATE {}",
                    match ctl.playback() {
                        Playback::Idle => "idle",
                        Playback::Speaking => "speaking",
                    }
                ),
                format!("210 STATUS {}", ctl.status()),
                format!("210 TEXT {}", ctl.char_counter()),
                format!("210 VOICE {}", ctl.selected_voice().unwrap_or("-")),
                format!("210 RATE {}", format_rate(ctl.rate())),
                format!("210 PITCH {}", format_pitch(ctl.pitch())),
                format!(
                    "210 OK CONTROLS speak={} stop={} random={}",
                    controls.speak, controls.stop, controls.randomize
                ),
            ]
        }
        Command::Quit => unreachable!("handled by the connection loop"),
    }
}

/// Cancel-then-speak grace: the deferred utterance goes out only after the
/// engine has had a moment to observe the cancel.
fn schedule_pending(state: SharedController) {
    tokio::spawn(async move {
        tokio::time::sleep(CANCEL_GRACE).await;
        if let Ok(mut ctl) = state.lock() {
            let _ = ctl.speak_pending();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_verbs() {
        assert_eq!(parse_command("SPEAK\r\n"), Ok(Command::Speak));
        assert_eq!(parse_command("stop"), Ok(Command::Stop));
        assert_eq!(
            parse_command("TEXT hello world"),
            Ok(Command::Text("hello world".to_string()))
        );
        assert_eq!(parse_command("PHRASE 2"), Ok(Command::Phrase(2)));
        assert_eq!(parse_command("RATE 1.5"), Ok(Command::Rate(1.5)));
    }

    #[test]
    fn text_preserves_verbatim_payload() {
        // Inner whitespace must survive; only the line ending is stripped.
        assert_eq!(
            parse_command("TEXT   spaced   out  \r\n"),
            Ok(Command::Text("  spaced   out  ".to_string()))
        );
    }

    #[test]
    fn malformed_rate_falls_back_to_one() {
        assert_eq!(parse_command("RATE abc"), Ok(Command::Rate(1.0)));
        assert_eq!(parse_command("PITCH"), Ok(Command::Pitch(1.0)));
    }

    #[test]
    fn unknown_and_malformed_commands_error() {
        assert!(parse_command("FROBNICATE").is_err());
        assert!(parse_command("PHRASE x").is_err());
        assert!(parse_command("VOICE").is_err());
    }

    #[test]
    fn reply_rendering_marks_continuations() {
        let lines = vec!["211 a (x)".to_string(), "211 OK 1 VOICES".to_string()];
        let rendered = render_reply(&lines);
        assert_eq!(rendered[0], "211-a (x)\r\n");
        assert_eq!(rendered[1], "211 OK 1 VOICES\r\n");
    }
}
