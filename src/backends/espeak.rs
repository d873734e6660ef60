use super::{SynthBackend, Voice};
use crate::config_loader::Settings;
use crate::engine::UtteranceRequest;
use std::io::{Error, ErrorKind, Result};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

// espeak-ng defaults: 175 words per minute, pitch 50 on a 0-99 scale.
// The panel's rate/pitch multipliers are mapped onto those.
const BASE_WPM: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;

pub struct EspeakBackend {
    binary: String,
    timeout: Duration,
}

impl EspeakBackend {
    pub fn new() -> Self {
        Self {
            binary: "espeak-ng".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            binary: settings.espeak_binary.clone(),
            timeout: Duration::from_secs(settings.synth_timeout_secs),
        }
    }

    fn scaled_wpm(rate: f32) -> i32 {
        (BASE_WPM * rate).round().clamp(80.0, 450.0) as i32
    }

    fn scaled_pitch(pitch: f32) -> i32 {
        (BASE_PITCH * pitch).round().clamp(0.0, 99.0) as i32
    }
}

impl Default for EspeakBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthBackend for EspeakBackend {
    fn id(&self) -> &'static str {
        "espeak-ng"
    }

    fn synthesize(&self, request: &UtteranceRequest) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.binary)
            .arg("--stdout")
            .arg("-v")
            .arg(&request.voice.lang)
            .arg("-s")
            .arg(Self::scaled_wpm(request.rate).to_string())
            .arg("-p")
            .arg(Self::scaled_pitch(request.pitch).to_string())
            .arg(&request.text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let output = child.wait_with_output()?;
                if status.success() {
                    Ok(output.stdout)
                } else {
                    let err_msg = String::from_utf8_lossy(&output.stderr);
                    Err(Error::new(
                        ErrorKind::Other,
                        format!("espeak error: {}", err_msg),
                    ))
                }
            }
            None => {
                // Timeout occurred, kill the process
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::new(
                    ErrorKind::TimedOut,
                    format!("backend timed out after {:?}", self.timeout),
                ))
            }
        }
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new(&self.binary).arg("--voices").output()?;
        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            return Err(Error::new(
                ErrorKind::Other,
                format!("espeak --voices failed: {}", err_msg),
            ));
        }
        Ok(parse_voice_table(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses the tabular output of `espeak-ng --voices`:
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
fn parse_voice_table(table: &str) -> Vec<Voice> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            Some(Voice::new(fields[3], fields[1]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  ar              --/M      Arabic             sem/ar
 2  en-gb           --/M      English_(Great_Britain) gmw/en
 5  en-us           --/M      English_(America)  gmw/en-US
";

    #[test]
    fn parses_voice_table() {
        let voices = parse_voice_table(SAMPLE);
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[0], Voice::new("Afrikaans", "af"));
        assert_eq!(voices[1], Voice::new("Arabic", "ar"));
        assert_eq!(voices[3].lang, "en-us");
    }

    #[test]
    fn skips_malformed_lines() {
        let voices = parse_voice_table("header\ngarbage line\n 5  ar  --/M  Arabic  sem/ar\n");
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "Arabic");
    }

    #[test]
    fn rate_and_pitch_scaling() {
        assert_eq!(EspeakBackend::scaled_wpm(1.0), 175);
        assert_eq!(EspeakBackend::scaled_wpm(2.0), 350);
        assert_eq!(EspeakBackend::scaled_wpm(0.1), 80); // clamped floor
        assert_eq!(EspeakBackend::scaled_pitch(1.0), 50);
        assert_eq!(EspeakBackend::scaled_pitch(1.8), 90);
        assert_eq!(EspeakBackend::scaled_pitch(3.0), 99); // clamped ceiling
    }
}
