//! In-memory workspace.
//!
//! A [`Session`] holds an event list in document order, the selection and
//! the loaded video. It is what the command-line host reads from and
//! writes back to a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Workspace;
use crate::config::atomic_write;
use crate::timing::{ConstantFpsVideo, EventId, SubtitleEvent};

/// Errors that can occur loading or saving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to read the session file.
    #[error("Failed to read session '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the session file.
    #[error("Failed to write session '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Session JSON is malformed.
    #[error("Invalid session data: {0}")]
    Json(#[from] serde_json::Error),

    /// Two events share an id.
    #[error("Duplicate event id {0}")]
    DuplicateId(EventId),
}

/// Document, selection and video kept in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Events in document order.
    events: Vec<SubtitleEvent>,
    /// Selected event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<EventId>,
    /// Loaded video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video: Option<ConstantFpsVideo>,
    /// Events committed since the session was created or loaded.
    #[serde(skip)]
    committed: Vec<EventId>,
}

impl Session {
    /// Create a session with no selection and no video.
    pub fn new(events: Vec<SubtitleEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Parse a session from JSON.
    pub fn from_json(content: &str) -> Result<Self, SessionError> {
        let session: Session = serde_json::from_str(content)?;
        session.check_ids()?;
        Ok(session)
    }

    /// Serialize the session to pretty JSON.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SessionError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let session = Self::from_json(&content)?;
        tracing::debug!(
            "Loaded session {} ({} events)",
            path.display(),
            session.events.len()
        );
        Ok(session)
    }

    /// Write the session to a file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let content = self.to_json()?;
        atomic_write(path, &content).map_err(|source| SessionError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Events in document order.
    pub fn events(&self) -> &[SubtitleEvent] {
        &self.events
    }

    /// Select an event by id.
    pub fn select(&mut self, id: u64) {
        self.active = Some(EventId(id));
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.active = None;
    }

    /// Load (or replace) the video.
    pub fn load_video(&mut self, video: ConstantFpsVideo) {
        self.video = Some(video);
    }

    /// Ids of committed events, in commit order.
    pub fn committed(&self) -> &[EventId] {
        &self.committed
    }

    fn position(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }

    fn check_ids(&self) -> Result<(), SessionError> {
        let mut seen = std::collections::HashSet::new();
        for event in &self.events {
            if !seen.insert(event.id) {
                return Err(SessionError::DuplicateId(event.id));
            }
        }
        Ok(())
    }
}

impl Workspace for Session {
    type Video = ConstantFpsVideo;

    fn video(&self) -> Option<&ConstantFpsVideo> {
        self.video.as_ref()
    }

    fn active_event(&self) -> Option<EventId> {
        self.active
    }

    fn event(&self, id: EventId) -> Option<&SubtitleEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    fn event_before(&self, id: EventId) -> Option<&SubtitleEvent> {
        let idx = self.position(id)?;
        idx.checked_sub(1).map(|prev| &self.events[prev])
    }

    fn commit(&mut self, event: &SubtitleEvent) {
        match self.position(event.id) {
            Some(idx) => {
                self.events[idx] = event.clone();
                self.committed.push(event.id);
            }
            None => tracing::warn!("Commit for unknown event {} ignored", event.id),
        }
    }
}
