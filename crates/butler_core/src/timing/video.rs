//! Video information consumed by the timing engine.
//!
//! The engine only needs frame/time conversion and the keyframe list.
//! [`ConstantFpsVideo`] covers the common constant frame rate case.

use serde::{Deserialize, Serialize};

/// Small epsilon for floating-point comparisons.
const EPSILON: f64 = 1e-6;

/// Header line of an Aegisub keyframe file.
const AEGISUB_KEYFRAME_HEADER: &str = "# keyframe format v1";

/// Frame/time conversion and keyframe access for a loaded video.
///
/// Implementations must be monotonic and round-trip stable:
/// `frame_from_time(time_from_frame(n)) == n` for every integral `n`.
pub trait VideoInfo {
    /// Frame displayed at the given time.
    fn frame_from_time(&self, time_ms: f64) -> i32;

    /// Start time of the given frame.
    fn time_from_frame(&self, frame: i32) -> f64;

    /// Keyframe indices, sorted ascending without duplicates.
    fn keyframes(&self) -> &[i32];
}

/// Errors from building video information.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// Frame rate is zero, negative or not finite.
    #[error("Invalid frame rate: {0}")]
    InvalidFps(f64),

    /// A keyframe line could not be parsed.
    #[error("Invalid keyframe at line {line}: '{value}'")]
    InvalidKeyframe { line: usize, value: String },

    /// Keyframes are negative, unsorted or duplicated.
    #[error("Keyframes must be non-negative and strictly increasing (at index {index})")]
    UnsortedKeyframes { index: usize },
}

/// Convert timestamp to frame number using FLOOR with epsilon protection.
///
/// This gives the frame that is currently displaying at the given time.
///
/// ```
/// use butler_core::timing::time_to_frame_floor;
///
/// assert_eq!(time_to_frame_floor(0.0, 25.0), 0);
/// assert_eq!(time_to_frame_floor(39.9, 25.0), 0);
/// assert_eq!(time_to_frame_floor(40.0, 25.0), 1);
/// ```
pub fn time_to_frame_floor(time_ms: f64, fps: f64) -> i32 {
    let frame_duration_ms = 1000.0 / fps;
    ((time_ms + EPSILON) / frame_duration_ms).floor() as i32
}

/// Convert frame number to its START timestamp (exact, no rounding).
pub fn frame_to_time_floor(frame_num: i32, fps: f64) -> f64 {
    let frame_duration_ms = 1000.0 / fps;
    frame_num as f64 * frame_duration_ms
}

/// Constant frame rate video with a keyframe list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVideo", into = "RawVideo")]
pub struct ConstantFpsVideo {
    fps: f64,
    keyframes: Vec<i32>,
}

/// Unvalidated serde shape of [`ConstantFpsVideo`].
#[derive(Serialize, Deserialize)]
struct RawVideo {
    fps: f64,
    #[serde(default)]
    keyframes: Vec<i32>,
}

impl TryFrom<RawVideo> for ConstantFpsVideo {
    type Error = VideoError;

    fn try_from(raw: RawVideo) -> Result<Self, Self::Error> {
        Self::new(raw.fps, raw.keyframes)
    }
}

impl From<ConstantFpsVideo> for RawVideo {
    fn from(video: ConstantFpsVideo) -> Self {
        Self {
            fps: video.fps,
            keyframes: video.keyframes,
        }
    }
}

impl ConstantFpsVideo {
    /// Create video info, validating the frame rate and keyframe order.
    ///
    /// An empty keyframe list is allowed here; the Butler reports it as
    /// an unmet precondition.
    pub fn new(fps: f64, keyframes: Vec<i32>) -> Result<Self, VideoError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VideoError::InvalidFps(fps));
        }
        if keyframes.first().is_some_and(|&kf| kf < 0) {
            return Err(VideoError::UnsortedKeyframes { index: 0 });
        }
        if let Some(pos) = keyframes.windows(2).position(|w| w[0] >= w[1]) {
            return Err(VideoError::UnsortedKeyframes { index: pos + 1 });
        }
        Ok(Self { fps, keyframes })
    }

    /// Create video info from the contents of a keyframe file.
    ///
    /// An `fps` line in the file takes precedence over `fallback_fps`
    /// unless it is zero (Aegisub writes `fps 0` when unknown).
    pub fn from_keyframe_file(content: &str, fallback_fps: f64) -> Result<Self, VideoError> {
        let parsed = parse_keyframes(content)?;
        let fps = parsed.fps.filter(|&fps| fps > 0.0).unwrap_or(fallback_fps);
        Self::new(fps, parsed.keyframes)
    }

    /// Frame rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl VideoInfo for ConstantFpsVideo {
    fn frame_from_time(&self, time_ms: f64) -> i32 {
        time_to_frame_floor(time_ms, self.fps)
    }

    fn time_from_frame(&self, frame: i32) -> f64 {
        frame_to_time_floor(frame, self.fps)
    }

    fn keyframes(&self) -> &[i32] {
        &self.keyframes
    }
}

/// Result of parsing a keyframe file.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeFile {
    /// Frame rate declared in the file, if any.
    pub fps: Option<f64>,
    /// Keyframe indices in file order.
    pub keyframes: Vec<i32>,
}

/// Parse a keyframe list.
///
/// Accepts the Aegisub `# keyframe format v1` layout (an `fps <n>` line
/// followed by one frame per line) and plain lists of frame numbers.
/// Blank lines and `#` comments are skipped.
pub fn parse_keyframes(content: &str) -> Result<KeyframeFile, VideoError> {
    let mut fps = None;
    let mut keyframes = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            if idx == 0 && line.eq_ignore_ascii_case(AEGISUB_KEYFRAME_HEADER) {
                tracing::trace!("Detected Aegisub keyframe file");
            }
            continue;
        }

        if let Some(value) = line.strip_prefix("fps") {
            let value = value.trim();
            fps = Some(value.parse::<f64>().map_err(|_| VideoError::InvalidKeyframe {
                line: idx + 1,
                value: line.to_string(),
            })?);
            continue;
        }

        let frame = line
            .parse::<i32>()
            .map_err(|_| VideoError::InvalidKeyframe {
                line: idx + 1,
                value: line.to_string(),
            })?;
        keyframes.push(frame);
    }

    tracing::debug!("Parsed {} keyframes (fps: {:?})", keyframes.len(), fps);

    Ok(KeyframeFile { fps, keyframes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_time_roundtrip_is_stable() {
        for fps in [23.976, 24.0, 25.0, 29.97, 59.94] {
            let video = ConstantFpsVideo::new(fps, vec![0]).unwrap();
            for frame in [0, 1, 2, 24, 1001, 34_567] {
                let time = video.time_from_frame(frame);
                assert_eq!(video.frame_from_time(time), frame, "fps {fps} frame {frame}");
            }
        }
    }

    #[test]
    fn frame_from_time_is_floor() {
        let video = ConstantFpsVideo::new(25.0, vec![0]).unwrap();
        assert_eq!(video.frame_from_time(0.0), 0);
        assert_eq!(video.frame_from_time(39.999), 0);
        assert_eq!(video.frame_from_time(40.0), 1);
        assert_eq!(video.frame_from_time(5000.0), 125);
        assert!((video.time_from_frame(128) - 5120.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_fps() {
        assert!(matches!(
            ConstantFpsVideo::new(0.0, vec![]),
            Err(VideoError::InvalidFps(_))
        ));
        assert!(ConstantFpsVideo::new(f64::NAN, vec![]).is_err());
        assert!(ConstantFpsVideo::new(-24.0, vec![]).is_err());
    }

    #[test]
    fn rejects_unsorted_keyframes() {
        assert!(matches!(
            ConstantFpsVideo::new(24.0, vec![0, 10, 10]),
            Err(VideoError::UnsortedKeyframes { index: 2 })
        ));
        assert!(matches!(
            ConstantFpsVideo::new(24.0, vec![5, 3]),
            Err(VideoError::UnsortedKeyframes { index: 1 })
        ));
        assert!(matches!(
            ConstantFpsVideo::new(24.0, vec![-1, 3]),
            Err(VideoError::UnsortedKeyframes { index: 0 })
        ));
    }

    #[test]
    fn parses_aegisub_keyframes() {
        let content = "# keyframe format v1\nfps 0\n0\n48\n120\n";
        let parsed = parse_keyframes(content).unwrap();
        assert_eq!(parsed.fps, Some(0.0));
        assert_eq!(parsed.keyframes, vec![0, 48, 120]);

        // fps 0 falls back to the provided rate
        let video = ConstantFpsVideo::from_keyframe_file(content, 23.976).unwrap();
        assert!((video.fps() - 23.976).abs() < 1e-9);
        assert_eq!(video.keyframes(), &[0, 48, 120]);
    }

    #[test]
    fn parses_plain_list_with_comments() {
        let content = "# exported\n\n0\n  30\n# middle\n90\n";
        let parsed = parse_keyframes(content).unwrap();
        assert_eq!(parsed.fps, None);
        assert_eq!(parsed.keyframes, vec![0, 30, 90]);
    }

    #[test]
    fn reports_bad_line() {
        let err = parse_keyframes("0\n12\nabc\n").unwrap_err();
        match err {
            VideoError::InvalidKeyframe { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serde_validates_on_load() {
        let ok: ConstantFpsVideo =
            serde_json::from_str(r#"{"fps": 25.0, "keyframes": [0, 10]}"#).unwrap();
        assert_eq!(ok.keyframes(), &[0, 10]);

        let bad: Result<ConstantFpsVideo, _> =
            serde_json::from_str(r#"{"fps": 25.0, "keyframes": [10, 0]}"#);
        assert!(bad.is_err());
    }
}
