//! Keyframe-aware timing of subtitle event boundaries.
//!
//! # Components
//!
//! - **keyframes**: nearest-keyframe lookup over a sorted frame list
//! - **boundary**: start/end decisions (snap, chain, lead-in, lead-out)
//! - **video**: frame/time conversion and keyframe file parsing
//! - **types**: event data
//!
//! # Usage
//!
//! ```
//! use butler_core::config::ButlerConfig;
//! use butler_core::timing::{adjust_end, adjust_start, ConstantFpsVideo, SubtitleEvent};
//!
//! let video = ConstantFpsVideo::new(25.0, vec![0, 128]).unwrap();
//! let mut event = SubtitleEvent::new(1, 5000.0, 6000.0, "Hello");
//!
//! let config = ButlerConfig::default();
//! let cps = event.cps();
//! let start_changed = adjust_start(&mut event, None, &video, &config);
//! let end_changed = adjust_end(&mut event, cps, &video, &config);
//!
//! assert!(start_changed);
//! assert_eq!(event.start_ms, 4880.0);
//! assert!(!end_changed);
//! ```

mod boundary;
mod keyframes;
mod types;
mod video;

pub use boundary::{
    adjust_end, adjust_start, CPS_DECISION_DISTANCE_MS, CPS_LEAD_OUT_LIMIT,
    LEAD_OUT_KEYFRAME_MARGIN_MS,
};
pub use keyframes::nearest_keyframe;
pub use types::{estimate_cps, format_ms_for_log, EventId, SubtitleEvent};
pub use video::{
    frame_to_time_floor, parse_keyframes, time_to_frame_floor, ConstantFpsVideo, KeyframeFile,
    VideoError, VideoInfo,
};
