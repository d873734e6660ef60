//! talkdeck-control - CLI client for the talkdeck control panel daemon.
//!
//! Speaks the panel's line protocol over TCP and prints the replies.

use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

/// CLI client for the talkdeck speech panel
#[derive(Parser)]
#[command(name = "talkdeck-control")]
#[command(version)]
#[command(about = "Control client for the talkdeck speech panel", long_about = None)]
struct Cli {
    /// Address of the running panel
    #[arg(short, long, default_value = "127.0.0.1:6571")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the text entry and speak it
    Speak {
        /// Text to speak
        text: String,
    },

    /// Set the text entry without speaking
    Text {
        /// Text for the entry
        text: String,
    },

    /// Load a preset phrase into the text entry
    Phrase {
        /// Phrase index (see `phrases`)
        index: usize,
    },

    /// List preset phrases
    Phrases,

    /// Select a voice by name
    Voice {
        /// Voice name as shown by `voices`
        name: String,
    },

    /// List available voices
    Voices,

    /// Set the speech rate
    Rate {
        /// Rate multiplier, e.g. 1.5
        value: f32,
    },

    /// Set the speech pitch
    Pitch {
        /// Pitch value, e.g. 1.2
        value: f32,
    },

    /// Stop the current utterance
    Stop,

    /// Randomize voice, rate and pitch
    Random,

    /// Show panel status
    Status,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let stream = TcpStream::connect(&cli.addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    // Greeting ends with a "299 " line.
    read_reply(&mut reader)?;

    match cli.command {
        Commands::Speak { text } => {
            send(&mut writer, &mut reader, &format!("TEXT {}", text))?;
            for line in send(&mut writer, &mut reader, "SPEAK")? {
                println!("{}", line);
            }
        }
        Commands::Text { text } => print_reply(send(&mut writer, &mut reader, &format!("TEXT {}", text))?),
        Commands::Phrase { index } => {
            print_reply(send(&mut writer, &mut reader, &format!("PHRASE {}", index))?)
        }
        Commands::Phrases => print_reply(send(&mut writer, &mut reader, "PHRASES")?),
        Commands::Voice { name } => {
            print_reply(send(&mut writer, &mut reader, &format!("VOICE {}", name))?)
        }
        Commands::Voices => print_reply(send(&mut writer, &mut reader, "VOICES")?),
        Commands::Rate { value } => {
            print_reply(send(&mut writer, &mut reader, &format!("RATE {}", value))?)
        }
        Commands::Pitch { value } => {
            print_reply(send(&mut writer, &mut reader, &format!("PITCH {}", value))?)
        }
        Commands::Stop => print_reply(send(&mut writer, &mut reader, "STOP")?),
        Commands::Random => print_reply(send(&mut writer, &mut reader, "RANDOM")?),
        Commands::Status => print_reply(send(&mut writer, &mut reader, "STATUS")?),
    }

    let _ = writer.write_all(b"QUIT\r\n");
    Ok(())
}

fn send(
    writer: &mut TcpStream,
    reader: &mut BufReader<TcpStream>,
    command: &str,
) -> std::io::Result<Vec<String>> {
    writer.write_all(command.as_bytes())?;
    writer.write_all(b"\r\n")?;
    read_reply(reader)
}

/// Reads reply lines up to and including the final one, which carries a
/// space after the numeric code instead of the "-" continuation marker.
fn read_reply(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<String>> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end().to_string();
        let done = trimmed.len() >= 4 && trimmed.as_bytes()[3] == b' ';
        lines.push(trimmed);
        if done {
            break;
        }
    }
    Ok(lines)
}

fn print_reply(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}
