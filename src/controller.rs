//! The playback controller: owns the cached voice catalog, the playback
//! state and the user-selected parameters, and delegates actual synthesis
//! to a [`SpeechEngine`].
//!
//! Everything here is synchronous; engine progress arrives as
//! [`EngineEvent`]s that the event pump feeds into `handle_engine_event`.

use crate::catalog::Catalog;
use crate::engine::{EngineEvent, SpeechEngine, UtteranceRequest};
use crate::surface::{CharCounter, Controls, StatusLine, MAX_CHARS};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Grace period between cancelling an in-flight utterance and issuing the
/// next one. Engines may silently drop a request issued immediately after a
/// cancel; there is no confirmed-cancelled acknowledgment to await instead.
pub const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// How long to wait before the one-shot catalog reload on platforms that
/// never announce catalog readiness.
pub const CATALOG_FALLBACK_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Idle,
    Speaking,
}

/// Why a speak action was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakError {
    EmptyInput,
    TextTooLong,
    VoiceListUnavailable,
    NoVoiceSelected,
    EngineError(String),
}

impl fmt::Display for SpeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakError::EmptyInput => write!(f, "Please enter text to speak."),
            SpeakError::TextTooLong => write!(
                f,
                "Text exceeds maximum length of {} characters.",
                MAX_CHARS
            ),
            SpeakError::VoiceListUnavailable => write!(f, "No voices available."),
            SpeakError::NoVoiceSelected => write!(f, "No voice selected."),
            SpeakError::EngineError(code) => write!(f, "Speech error: {}", code),
        }
    }
}

impl std::error::Error for SpeakError {}

/// What a speak action did. `Deferred` means an in-flight utterance was
/// cancelled first and the caller must invoke [`Controller::speak_pending`]
/// after [`CANCEL_GRACE`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SpeakOutcome {
    Issued,
    Deferred,
    Rejected(SpeakError),
}

pub struct Controller {
    /// `None` when the host offers no speech support; the whole surface
    /// stays disabled in that case.
    engine: Option<Arc<dyn SpeechEngine>>,
    catalog: Catalog,
    selected_voice: Option<String>,
    text: String,
    rate: f32,
    pitch: f32,
    playback: Playback,
    status: StatusLine,
    pending: Option<String>,
    phrases: Vec<String>,
}

impl Controller {
    pub fn new(engine: Arc<dyn SpeechEngine>, phrases: Vec<String>) -> Self {
        Self {
            engine: Some(engine),
            catalog: Catalog::default(),
            selected_voice: None,
            text: String::new(),
            rate: 1.0,
            pitch: 1.0,
            playback: Playback::Idle,
            status: StatusLine::loading("Initializing..."),
            pending: None,
            phrases,
        }
    }

    /// Controller for hosts without any speech support: every control is
    /// disabled and every action reports the same error.
    pub fn unsupported() -> Self {
        Self {
            engine: None,
            catalog: Catalog::default(),
            selected_voice: None,
            text: String::new(),
            rate: 1.0,
            pitch: 1.0,
            playback: Playback::Idle,
            status: StatusLine::error("Speech synthesis not supported."),
            pending: None,
            phrases: Vec::new(),
        }
    }

    // --- catalog -----------------------------------------------------------

    /// Re-derives the sorted catalog and the voice selection from the
    /// engine's current voice set. Safe to call any number of times.
    pub fn refresh_voices(&mut self) {
        let Some(engine) = &self.engine else { return };

        match engine.list_voices() {
            Ok(list) => {
                debug!("catalog refresh: {} voices", list.len());
                self.catalog = Catalog::from_unsorted(list);
                if self.catalog.is_empty() {
                    self.status = StatusLine::loading("Waiting for voices...");
                    return;
                }
                let keep = self
                    .selected_voice
                    .as_deref()
                    .map_or(false, |name| self.catalog.contains(name));
                if !keep {
                    self.selected_voice =
                        self.catalog.default_selection().map(|v| v.name.clone());
                }
                // A successful load wipes any earlier loading or
                // could-not-load status.
                self.status = StatusLine::clear();
            }
            Err(e) => {
                warn!("voice enumeration failed: {}", e);
                self.catalog = Catalog::default();
                self.status = StatusLine::error("Could not load voice list.");
            }
        }
    }

    /// One-shot reload scheduled [`CATALOG_FALLBACK_DELAY`] after startup,
    /// for platforms that never announce their catalog.
    pub fn catalog_fallback(&mut self) {
        if self.engine.is_none() || !self.catalog.is_empty() {
            return;
        }
        self.refresh_voices();
        if self.catalog.is_empty() && !self.status.is_error() {
            self.status = StatusLine::error("Failed to load voices.");
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // --- parameters --------------------------------------------------------

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Overwrites the text entry verbatim with a preset phrase.
    pub fn apply_phrase(&mut self, index: usize) -> bool {
        match self.phrases.get(index) {
            Some(phrase) => {
                self.text = phrase.clone();
                true
            }
            None => false,
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn select_voice(&mut self, name: &str) -> bool {
        if self.catalog.contains(name) {
            self.selected_voice = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected_voice(&self) -> Option<&str> {
        self.selected_voice.as_deref()
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(0.5, 2.0);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(0.0, 2.0);
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    // --- actions -----------------------------------------------------------

    /// The speak action. Validates, then either issues the utterance or,
    /// when the engine is still busy, cancels and defers the new one.
    pub fn speak(&mut self) -> SpeakOutcome {
        let Some(engine) = self.engine.clone() else {
            return self.reject(SpeakError::VoiceListUnavailable);
        };

        let text = self.text.trim().to_string();
        if text.is_empty() {
            return self.reject(SpeakError::EmptyInput);
        }
        if text.chars().count() > MAX_CHARS {
            return self.reject(SpeakError::TextTooLong);
        }

        if self.playback == Playback::Speaking || engine.is_busy() {
            debug!("speak while busy: cancelling and deferring");
            engine.cancel();
            self.pending = Some(text);
            SpeakOutcome::Deferred
        } else {
            self.start_utterance(text)
        }
    }

    /// Issues the utterance deferred by a cancel-then-speak. Invoked by the
    /// event loop after [`CANCEL_GRACE`] has elapsed.
    pub fn speak_pending(&mut self) -> SpeakOutcome {
        match self.pending.take() {
            Some(text) => self.start_utterance(text),
            None => SpeakOutcome::Rejected(SpeakError::EmptyInput),
        }
    }

    fn start_utterance(&mut self, text: String) -> SpeakOutcome {
        let Some(engine) = self.engine.clone() else {
            return self.reject(SpeakError::VoiceListUnavailable);
        };

        let voice = match self.resolve_voice() {
            Ok(voice) => voice,
            Err(e) => return self.reject(e),
        };

        info!(voice = %voice.name, rate = self.rate, pitch = self.pitch, "issuing utterance");
        // Clear any previous error before handing off.
        self.status = StatusLine::clear();
        engine.speak(UtteranceRequest {
            text,
            voice,
            rate: self.rate,
            pitch: self.pitch,
        });
        SpeakOutcome::Issued
    }

    /// Selected name looked up in the catalog; a stale selection silently
    /// falls back to the first catalog entry.
    fn resolve_voice(&self) -> Result<crate::backends::Voice, SpeakError> {
        if self.catalog.is_empty() {
            return Err(SpeakError::VoiceListUnavailable);
        }
        let Some(name) = self.selected_voice.as_deref() else {
            return Err(SpeakError::NoVoiceSelected);
        };
        match self.catalog.find(name) {
            Some(voice) => Ok(voice.clone()),
            None => {
                warn!("selected voice '{}' not in catalog, using first", name);
                Ok(self
                    .catalog
                    .first()
                    .expect("catalog checked non-empty")
                    .clone())
            }
        }
    }

    fn reject(&mut self, error: SpeakError) -> SpeakOutcome {
        self.status = StatusLine::error(error.to_string());
        SpeakOutcome::Rejected(error)
    }

    /// The stop action: cancels at the engine, then unconditionally forces
    /// Idle without waiting for the engine's own callback. Idempotent.
    pub fn stop(&mut self) {
        if let Some(engine) = &self.engine {
            if engine.is_busy() {
                engine.cancel();
            }
        }
        self.pending = None;
        self.playback = Playback::Idle;
        self.status = StatusLine::plain("Speech stopped.");
    }

    /// Draws a random voice, rate and pitch and applies all three.
    /// Not reachable while speaking (the control is disabled).
    pub fn randomize(&mut self) -> bool {
        if self.playback == Playback::Speaking || self.catalog.is_empty() {
            return false;
        }
        let mut rng = rand::thread_rng();

        let index = rng.gen_range(0..self.catalog.len());
        if let Some(voice) = self.catalog.get(index) {
            self.selected_voice = Some(voice.name.clone());
        }
        self.rate = round1(rng.gen_range(0.5..2.0));
        self.pitch = round1(rng.gen_range(0.5..1.8));

        self.status = StatusLine::plain("Settings randomized!");
        true
    }

    // --- engine callbacks --------------------------------------------------

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Started => self.on_started(),
            EngineEvent::Ended => self.on_ended(),
            EngineEvent::Error(code) => self.on_error(code),
            EngineEvent::CatalogChanged => self.refresh_voices(),
        }
    }

    fn on_started(&mut self) {
        self.playback = Playback::Speaking;
        self.status = StatusLine::loading("Speaking...");
    }

    fn on_ended(&mut self) {
        // A forced stop may already have reset the state; the late callback
        // must not clobber its status line.
        if self.playback == Playback::Idle {
            return;
        }
        self.playback = Playback::Idle;
        self.status = StatusLine::clear();
    }

    fn on_error(&mut self, code: String) {
        self.playback = Playback::Idle;
        self.status = StatusLine::error(SpeakError::EngineError(code).to_string());
    }

    // --- surface -----------------------------------------------------------

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn char_counter(&self) -> CharCounter {
        CharCounter::new(&self.text)
    }

    fn text_valid(&self) -> bool {
        let len = self.text.trim().chars().count();
        len > 0 && len <= MAX_CHARS
    }

    pub fn controls(&self) -> Controls {
        if self.engine.is_none() {
            return Controls::all_disabled();
        }
        let have_voices = !self.catalog.is_empty();
        let speaking = self.playback == Playback::Speaking;
        Controls {
            text_entry: true,
            voice: have_voices,
            rate: have_voices,
            pitch: have_voices,
            speak: have_voices && !speaking && self.text_valid(),
            stop: speaking,
            randomize: have_voices && !speaking,
            phrases: true,
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_quantizes_to_one_decimal() {
        assert_eq!(round1(1.2499), 1.2);
        assert_eq!(round1(1.25), 1.3);
        assert_eq!(round1(0.5), 0.5);
    }

    #[test]
    fn unsupported_controller_rejects_everything() {
        let mut ctl = Controller::unsupported();
        assert_eq!(ctl.controls(), Controls::all_disabled());
        ctl.set_text("hello");
        assert_eq!(
            ctl.speak(),
            SpeakOutcome::Rejected(SpeakError::VoiceListUnavailable)
        );
        assert!(!ctl.randomize());
        ctl.stop(); // must not panic
        assert_eq!(ctl.playback(), Playback::Idle);
    }
}
