//! User-facing surface state: the status line, the character counter and the
//! per-control enabled flags that the panel renders.

use std::fmt;

pub const MAX_CHARS: usize = 1000;

/// The status line carries a kind so the surface can render errors and
/// loading states differently from plain confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Plain,
    Loading,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    pub fn clear() -> Self {
        Self {
            text: String::new(),
            kind: StatusKind::Plain,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Plain,
        }
    }

    pub fn loading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Loading,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }

    pub fn is_loading(&self) -> bool {
        self.kind == StatusKind::Loading
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Enabled flags for each control on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub text_entry: bool,
    pub voice: bool,
    pub rate: bool,
    pub pitch: bool,
    pub speak: bool,
    pub stop: bool,
    pub randomize: bool,
    pub phrases: bool,
}

impl Controls {
    /// Everything off: the startup state, and the permanent state when the
    /// host has no speech support at all.
    pub fn all_disabled() -> Self {
        Self {
            text_entry: false,
            voice: false,
            rate: false,
            pitch: false,
            speak: false,
            stop: false,
            randomize: false,
            phrases: false,
        }
    }
}

/// Live character counter for the text entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCounter {
    pub len: usize,
}

impl CharCounter {
    pub fn new(text: &str) -> Self {
        Self {
            len: text.chars().count(),
        }
    }

    pub fn over_limit(&self) -> bool {
        self.len > MAX_CHARS
    }
}

impl fmt::Display for CharCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.len, MAX_CHARS)
    }
}

/// Rate is displayed with one decimal and an "x" suffix.
pub fn format_rate(rate: f32) -> String {
    format!("{:.1}x", rate)
}

/// Pitch is displayed with one decimal and no suffix.
pub fn format_pitch(pitch: f32) -> String {
    format!("{:.1}", pitch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_formats_against_limit() {
        let counter = CharCounter::new("hello");
        assert_eq!(counter.to_string(), "5 / 1000");
        assert!(!counter.over_limit());

        let counter = CharCounter::new(&"x".repeat(1001));
        assert_eq!(counter.to_string(), "1001 / 1000");
        assert!(counter.over_limit());
    }

    #[test]
    fn counter_counts_chars_not_bytes() {
        assert_eq!(CharCounter::new("héllo").len, 5);
    }

    #[test]
    fn rate_and_pitch_formatting() {
        assert_eq!(format_rate(1.0), "1.0x");
        assert_eq!(format_rate(1.56), "1.6x");
        assert_eq!(format_pitch(0.5), "0.5");
        assert_eq!(format_pitch(2.0), "2.0");
    }

    #[test]
    fn status_line_kinds() {
        assert!(StatusLine::clear().is_empty());
        assert!(StatusLine::error("boom").is_error());
        assert!(StatusLine::loading("Waiting for voices...").is_loading());
        assert!(!StatusLine::plain("Settings randomized!").is_error());
    }
}
