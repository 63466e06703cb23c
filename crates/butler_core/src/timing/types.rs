//! Core event types.
//!
//! All timing values are stored as `f64` milliseconds for sub-millisecond precision.

use serde::{Deserialize, Serialize};

/// Identifier of an event within its host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single subtitle event (dialogue line or comment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEvent {
    /// Identifier within the document.
    pub id: EventId,
    /// Start time in milliseconds (f64 for precision).
    pub start_ms: f64,
    /// End time in milliseconds (f64 for precision).
    pub end_ms: f64,
    /// Text content (may contain override blocks).
    #[serde(default)]
    pub text: String,
    /// Whether this is a comment line.
    #[serde(default)]
    pub is_comment: bool,
    /// Characters per second, when already known by the host.
    ///
    /// When `None`, the rate is estimated from `text` (see [`estimate_cps`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cps: Option<f64>,
}

impl SubtitleEvent {
    /// Create a new dialogue event.
    pub fn new(id: u64, start_ms: f64, end_ms: f64, text: impl Into<String>) -> Self {
        Self {
            id: EventId(id),
            start_ms,
            end_ms,
            text: text.into(),
            is_comment: false,
            cps: None,
        }
    }

    /// Create a new comment event.
    pub fn comment(id: u64, start_ms: f64, end_ms: f64, text: impl Into<String>) -> Self {
        Self {
            is_comment: true,
            ..Self::new(id, start_ms, end_ms, text)
        }
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// Characters per second of this event.
    pub fn cps(&self) -> f64 {
        self.cps
            .unwrap_or_else(|| estimate_cps(&self.text, self.duration_ms()))
    }
}

/// Estimate the reading rate of a line in characters per second.
///
/// Override blocks (`{...}`) and the `\N`, `\n` and `\h` escapes are
/// dropped, whitespace is not counted. A non-positive duration yields 0.
pub fn estimate_cps(text: &str, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 0.0;
    }

    let mut visible = 0usize;
    let mut in_block = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => in_block = true,
            '}' if in_block => in_block = false,
            _ if in_block => {}
            '\\' if matches!(chars.peek(), Some('N' | 'n' | 'h')) => {
                chars.next();
            }
            c if c.is_whitespace() => {}
            _ => visible += 1,
        }
    }

    visible as f64 / (duration_ms / 1000.0)
}

/// Format a millisecond timestamp for logging (H:MM:SS.mmm).
pub fn format_ms_for_log(ms: f64) -> String {
    let sign = if ms < 0.0 { "-" } else { "" };
    let total_ms = ms.abs().round() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{}{}:{:02}:{:02}.{:03}", sign, hours, mins, secs, millis)
}
