use config::{Config, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// "espeak" or "null"; anything else disables the whole surface.
    pub tts_backend: String,
    pub enable_audio: bool,
    /// Address the control panel listens on.
    pub listen_addr: String,
    pub espeak_binary: String,
    pub synth_timeout_secs: u64,
    /// Preset phrases offered as shortcuts; each overwrites the text entry
    /// verbatim.
    pub phrases: Vec<String>,
}

fn default_phrases() -> Vec<String> {
    [
        "Hello! How are you today?",
        "The quick brown fox jumps over the lazy dog.",
        "This is a test of the speech panel.",
        "Goodbye, and thanks for listening.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tts_backend: "espeak".to_string(),
            enable_audio: true,
            listen_addr: "127.0.0.1:6571".to_string(),
            espeak_binary: "espeak-ng".to_string(),
            synth_timeout_secs: 10,
            phrases: default_phrases(),
        }
    }
}

lazy_static! {
    pub static ref SETTINGS: RwLock<Settings> =
        RwLock::new(Settings::new().unwrap_or_default());
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            .set_default("tts_backend", "espeak")?
            .set_default("enable_audio", true)?
            .set_default("listen_addr", "127.0.0.1:6571")?
            .set_default("espeak_binary", "espeak-ng")?
            .set_default("synth_timeout_secs", 10)?
            .set_default("phrases", default_phrases())?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Talkdeck").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.config/talkdeck/Talkdeck",
                    std::env::var("HOME").unwrap_or_default()
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. TALKDECK_TTS_BACKEND)
            .add_source(config::Environment::with_prefix("TALKDECK"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.synth_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "synth_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(config::ConfigError::Message(format!(
                "Invalid listen_addr: {}",
                self.listen_addr
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let settings = Settings::new().expect("Failed to load settings");
        assert!(settings.synth_timeout_secs > 0);
        assert!(!settings.phrases.is_empty());
    }

    #[test]
    fn bad_listen_addr_is_rejected() {
        let settings = Settings {
            listen_addr: "not-an-addr".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
