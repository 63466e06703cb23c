//! The Timing Butler: aligns the active event of a document.
//!
//! # Architecture
//!
//! The host implements [`Workspace`] (document, selection, loaded video
//! and persistence). [`Butler::call`] checks the preconditions, resolves
//! the thresholds fresh from its [`ButlerConfigService`], runs the start
//! and end decisions on a copy of the active event and commits the copy
//! once if anything changed.
//!
//! # Usage
//!
//! ```
//! use butler_core::butler::{Butler, ButlerOutcome, Session};
//! use butler_core::config::{ButlerConfigService, MemoryConfigStore};
//! use butler_core::timing::{ConstantFpsVideo, SubtitleEvent};
//!
//! let mut session = Session::new(vec![SubtitleEvent::new(1, 5000.0, 6000.0, "Hello")]);
//! session.select(1);
//! session.load_video(ConstantFpsVideo::new(25.0, vec![0, 128]).unwrap());
//!
//! let mut butler = Butler::new(ButlerConfigService::new(MemoryConfigStore::new()));
//! let outcome = butler.call(Some(&mut session)).unwrap();
//!
//! assert!(matches!(outcome, ButlerOutcome::Committed(_)));
//! assert_eq!(session.events()[0].start_ms, 4880.0);
//! ```

mod session;

pub use session::{Session, SessionError};

use std::fmt;

use crate::config::{ButlerConfig, ButlerConfigService, ConfigResult, ConfigStore};
use crate::logging::NoticeCallback;
use crate::timing::{adjust_end, adjust_start, EventId, SubtitleEvent, VideoInfo};

/// Host document, selection and media as seen by the Butler.
pub trait Workspace {
    /// Video type provided by the host.
    type Video: VideoInfo;

    /// Loaded video, or `None` when no video is open.
    fn video(&self) -> Option<&Self::Video>;

    /// Currently selected event.
    fn active_event(&self) -> Option<EventId>;

    /// Look up an event.
    fn event(&self, id: EventId) -> Option<&SubtitleEvent>;

    /// Event immediately before `id` in document order (may be a comment).
    fn event_before(&self, id: EventId) -> Option<&SubtitleEvent>;

    /// Persist a modified event.
    fn commit(&mut self, event: &SubtitleEvent);
}

/// First non-comment event before `id` in document order.
///
/// Document order is not guaranteed to be chronological; the walk does
/// not look at times.
pub fn previous_dialogue<W: Workspace + ?Sized>(
    workspace: &W,
    id: EventId,
) -> Option<&SubtitleEvent> {
    let mut current = id;
    loop {
        let before = workspace.event_before(current)?;
        if !before.is_comment {
            return Some(before);
        }
        current = before.id;
    }
}

/// Unmet condition that stops the Butler before doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    NoWorkspace,
    NoVideo,
    NoKeyframes,
    NoActiveEvent,
}

impl Precondition {
    /// Notice shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoWorkspace => "No workspace loaded!",
            Self::NoVideo => "No video loaded!",
            Self::NoKeyframes => "No keyframes loaded!",
            Self::NoActiveEvent => "No event selected!",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Which boundaries of an event were modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alignment {
    pub start_changed: bool,
    pub end_changed: bool,
}

impl Alignment {
    /// Whether anything was modified.
    pub fn changed(&self) -> bool {
        self.start_changed || self.end_changed
    }
}

/// Result of a Butler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButlerOutcome {
    /// A precondition was not met; nothing was touched.
    Skipped(Precondition),
    /// Both boundaries were left as they were.
    Unchanged,
    /// The event was modified and committed.
    Committed(Alignment),
}

/// Run both boundary decisions on `event`.
///
/// The reading rate is taken before the start moves, so the end decision
/// does not depend on what happened to the start.
///
/// # Panics
/// Panics if the video has no keyframes.
pub fn align_event<V: VideoInfo + ?Sized>(
    event: &mut SubtitleEvent,
    previous: Option<&SubtitleEvent>,
    video: &V,
    config: &ButlerConfig,
) -> Alignment {
    let cps = event.cps();
    let start_changed = adjust_start(event, previous, video, config);
    let end_changed = adjust_end(event, cps, video, config);
    Alignment {
        start_changed,
        end_changed,
    }
}

/// Aligns the active event of a workspace to keyframes and its neighbour.
pub struct Butler<S> {
    config: ButlerConfigService<S>,
    notice: Option<NoticeCallback>,
}

impl<S: ConfigStore> Butler<S> {
    /// Create a Butler reading its thresholds from `config`.
    pub fn new(config: ButlerConfigService<S>) -> Self {
        Self {
            config,
            notice: None,
        }
    }

    /// Show precondition notices through `callback`.
    pub fn with_notice(mut self, callback: NoticeCallback) -> Self {
        self.notice = Some(callback);
        self
    }

    /// The configuration service.
    pub fn config(&mut self) -> &mut ButlerConfigService<S> {
        &mut self.config
    }

    /// Align the active event of `workspace`.
    ///
    /// Unmet preconditions are reported as a notice and return
    /// [`ButlerOutcome::Skipped`]. Errors only come from reading or
    /// writing the configuration.
    pub fn call<W: Workspace>(&mut self, workspace: Option<&mut W>) -> ConfigResult<ButlerOutcome> {
        let Some(workspace) = workspace else {
            return Ok(self.skip(Precondition::NoWorkspace));
        };
        let Some(video) = workspace.video() else {
            return Ok(self.skip(Precondition::NoVideo));
        };
        if video.keyframes().is_empty() {
            return Ok(self.skip(Precondition::NoKeyframes));
        }
        let Some(active) = workspace.active_event().and_then(|id| workspace.event(id)) else {
            return Ok(self.skip(Precondition::NoActiveEvent));
        };

        let config = self.config.effective_config()?;

        let mut edited = active.clone();
        let previous = previous_dialogue(&*workspace, edited.id);
        let alignment = align_event(&mut edited, previous, video, &config);

        if !alignment.changed() {
            tracing::info!("Event {} left unchanged", edited.id);
            return Ok(ButlerOutcome::Unchanged);
        }

        tracing::info!(
            "Event {} aligned (start: {}, end: {})",
            edited.id,
            alignment.start_changed,
            alignment.end_changed
        );
        workspace.commit(&edited);
        Ok(ButlerOutcome::Committed(alignment))
    }

    fn skip(&self, reason: Precondition) -> ButlerOutcome {
        tracing::info!("Butler skipped: {}", reason);
        if let Some(notice) = &self.notice {
            notice(reason.message());
        }
        ButlerOutcome::Skipped(reason)
    }
}
