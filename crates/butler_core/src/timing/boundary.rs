//! Start and end boundary decisions.
//!
//! Each function inspects one boundary of an event against its nearest
//! keyframe and either snaps it to the keyframe, chains it to the
//! previous line, pads it, or leaves it alone. The return value tells
//! whether the boundary was modified.

use crate::config::ButlerConfig;

use super::keyframes::nearest_keyframe;
use super::types::{format_ms_for_log, SubtitleEvent};
use super::video::VideoInfo;

/// Keyframe distance (ms) from which the end boundary consults the
/// reading rate instead of snapping outright.
pub const CPS_DECISION_DISTANCE_MS: f64 = 850.0;

/// Reading rate (characters per second) at or below which a far end
/// keyframe is approached with lead-out padding rather than a snap.
pub const CPS_LEAD_OUT_LIMIT: f64 = 15.0;

/// Distance (ms) kept clear of a later keyframe when padding the end.
pub const LEAD_OUT_KEYFRAME_MARGIN_MS: f64 = 500.0;

/// Nearest keyframe to a boundary.
struct BoundaryKeyframe {
    frame: i32,
    keyframe: i32,
    time_ms: f64,
}

impl BoundaryKeyframe {
    fn locate<V: VideoInfo + ?Sized>(time_ms: f64, video: &V) -> Self {
        let frame = video.frame_from_time(time_ms);
        let keyframe = nearest_keyframe(frame, video.keyframes());
        Self {
            frame,
            keyframe,
            time_ms: video.time_from_frame(keyframe),
        }
    }

    fn is_aligned(&self) -> bool {
        self.frame == self.keyframe
    }
}

/// Act on the start time of `event`.
///
/// In order: snap to the nearest keyframe when it is within the
/// earlier/later threshold, then chain to `previous` (the preceding
/// non-comment line) when its end is within the chain threshold. A chain
/// overrides a snap. When neither applies the lead-in is subtracted,
/// which always counts as a modification, even for a zero lead-in.
///
/// Returns `false` without touching the event when the start already
/// sits on a keyframe.
///
/// # Panics
/// Panics if the video has no keyframes.
pub fn adjust_start<V: VideoInfo + ?Sized>(
    event: &mut SubtitleEvent,
    previous: Option<&SubtitleEvent>,
    video: &V,
    config: &ButlerConfig,
) -> bool {
    let kf = BoundaryKeyframe::locate(event.start_ms, video);

    if kf.is_aligned() {
        tracing::debug!(
            "Start {} already on keyframe {}",
            format_ms_for_log(event.start_ms),
            kf.keyframe
        );
        return false;
    }

    let delta = event.start_ms - kf.time_ms;
    let (threshold, side) = if delta > 0.0 {
        (config.snap_start_earlier, "earlier")
    } else {
        (config.snap_start_later, "later")
    };
    if delta.abs() < f64::from(threshold) {
        tracing::debug!(
            "Start {} -> keyframe {} ({:+.1}ms, {} threshold {}ms)",
            format_ms_for_log(event.start_ms),
            format_ms_for_log(kf.time_ms),
            -delta,
            side,
            threshold
        );
        event.start_ms = kf.time_ms;
    }
    let snapped = event.start_ms == kf.time_ms;

    let mut chained = false;
    if let Some(prev) = previous {
        let gap = event.start_ms - prev.end_ms;
        if gap.abs() < f64::from(config.chain_threshold) {
            chained = true;
            let chained_start = if config.chain_gap == 0 {
                prev.end_ms
            } else {
                let prev_end_frame = video.frame_from_time(prev.end_ms);
                let gap_frames = i32::try_from(config.chain_gap).unwrap_or(i32::MAX);
                video.time_from_frame(prev_end_frame.saturating_add(gap_frames))
            };
            tracing::debug!(
                "Start {} chained to {} end {} (gap {} frames)",
                format_ms_for_log(event.start_ms),
                prev.id,
                format_ms_for_log(prev.end_ms),
                config.chain_gap
            );
            event.start_ms = chained_start;
        }
    }

    if snapped || chained {
        return true;
    }

    tracing::debug!(
        "Start {} padded by lead-in of {}ms",
        format_ms_for_log(event.start_ms),
        config.lead_in
    );
    event.start_ms -= f64::from(config.lead_in);
    true
}

/// Act on the end time of `event`.
///
/// An earlier keyframe is snapped to when within the earlier threshold.
/// A later keyframe at least 850ms away but within the later threshold
/// is handled by reading rate: slow lines (15 CPS or less) get
/// `min(lead_out, distance - 500)` of padding, fast lines snap. Closer
/// later keyframes snap, farther ones are left alone.
///
/// `cps` is the reading rate of the line as it was before its start was
/// touched; the end decision never looks at `event.start_ms`.
///
/// # Panics
/// Panics if the video has no keyframes.
pub fn adjust_end<V: VideoInfo + ?Sized>(
    event: &mut SubtitleEvent,
    cps: f64,
    video: &V,
    config: &ButlerConfig,
) -> bool {
    let kf = BoundaryKeyframe::locate(event.end_ms, video);

    if kf.is_aligned() {
        tracing::debug!(
            "End {} already on keyframe {}",
            format_ms_for_log(event.end_ms),
            kf.keyframe
        );
        return false;
    }

    let delta = event.end_ms - kf.time_ms;

    // Keyframe before the end
    if delta > 0.0 {
        if delta >= f64::from(config.snap_end_earlier) {
            tracing::debug!(
                "End {}: earlier keyframe {}ms away, beyond {}ms",
                format_ms_for_log(event.end_ms),
                delta,
                config.snap_end_earlier
            );
            return false;
        }
        tracing::debug!(
            "End {} -> earlier keyframe {}",
            format_ms_for_log(event.end_ms),
            format_ms_for_log(kf.time_ms)
        );
        event.end_ms = kf.time_ms;
        return true;
    }

    // Keyframe after the end
    let distance = delta.abs();
    let snap_later = f64::from(config.snap_end_later);

    if distance >= CPS_DECISION_DISTANCE_MS && distance <= snap_later {
        if cps <= CPS_LEAD_OUT_LIMIT {
            let lead_out = f64::from(config.lead_out).min(distance - LEAD_OUT_KEYFRAME_MARGIN_MS);
            tracing::debug!(
                "End {} padded by {}ms ({:.1} CPS, keyframe {}ms later)",
                format_ms_for_log(event.end_ms),
                lead_out,
                cps,
                distance
            );
            event.end_ms += lead_out;
        } else {
            tracing::debug!(
                "End {} -> later keyframe {} ({:.1} CPS)",
                format_ms_for_log(event.end_ms),
                format_ms_for_log(kf.time_ms),
                cps
            );
            event.end_ms = kf.time_ms;
        }
        return true;
    }

    if distance >= snap_later {
        tracing::debug!(
            "End {}: later keyframe {}ms away, beyond {}ms",
            format_ms_for_log(event.end_ms),
            distance,
            config.snap_end_later
        );
        return false;
    }

    tracing::debug!(
        "End {} -> later keyframe {}",
        format_ms_for_log(event.end_ms),
        format_ms_for_log(kf.time_ms)
    );
    event.end_ms = kf.time_ms;
    true
}
