pub mod espeak;

/// A synthesis voice as reported by the platform engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Trait for synthesis backends that render text into audio bytes.
/// Playback and start/end/error reporting live in the engine layer on top.
pub trait SynthBackend: Send + Sync {
    /// Returns the unique ID of the backend (e.g. "espeak-ng")
    fn id(&self) -> &'static str;

    /// Renders one utterance to a WAV byte stream.
    fn synthesize(&self, request: &crate::engine::UtteranceRequest) -> std::io::Result<Vec<u8>>;

    /// Enumerates the voices the backend currently offers. May be empty.
    fn list_voices(&self) -> std::io::Result<Vec<Voice>>;
}
