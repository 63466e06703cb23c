//! Nearest-keyframe lookup.

/// Find the keyframe closest to `frame`.
///
/// `keyframes` must be sorted ascending without duplicates. On a tie
/// between the keyframe before and the keyframe after `frame`, the
/// earlier one is returned. Frames outside the keyframe range clamp to
/// the first or last keyframe.
///
/// # Panics
/// Panics if `keyframes` is empty. Callers check that a video with
/// keyframes is loaded before locating anything.
pub fn nearest_keyframe(frame: i32, keyframes: &[i32]) -> i32 {
    assert!(
        !keyframes.is_empty(),
        "nearest_keyframe requires at least one keyframe"
    );
    debug_assert!(
        keyframes.windows(2).all(|w| w[0] < w[1]),
        "keyframes must be strictly increasing"
    );

    match keyframes.binary_search(&frame) {
        Ok(idx) => keyframes[idx],
        Err(0) => keyframes[0],
        Err(idx) if idx >= keyframes.len() => keyframes[keyframes.len() - 1],
        Err(idx) => {
            let before = keyframes[idx - 1];
            let after = keyframes[idx];
            if frame - before <= after - frame {
                before
            } else {
                after
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYFRAMES: [i32; 5] = [0, 24, 48, 100, 250];

    #[test]
    fn exact_match_returns_keyframe() {
        assert_eq!(nearest_keyframe(48, &KEYFRAMES), 48);
        assert_eq!(nearest_keyframe(250, &KEYFRAMES), 250);
        // Exact match must return the keyframe itself, not its index
        assert_eq!(nearest_keyframe(100, &KEYFRAMES), 100);
    }

    #[test]
    fn picks_closer_neighbour() {
        assert_eq!(nearest_keyframe(30, &KEYFRAMES), 24);
        assert_eq!(nearest_keyframe(40, &KEYFRAMES), 48);
        assert_eq!(nearest_keyframe(99, &KEYFRAMES), 100);
    }

    #[test]
    fn tie_prefers_earlier_keyframe() {
        assert_eq!(nearest_keyframe(12, &KEYFRAMES), 0);
        assert_eq!(nearest_keyframe(36, &KEYFRAMES), 24);
        assert_eq!(nearest_keyframe(74, &KEYFRAMES), 48);
        assert_eq!(nearest_keyframe(175, &KEYFRAMES), 100);
    }

    #[test]
    fn clamps_outside_range() {
        let kfs = [10, 20, 30];
        assert_eq!(nearest_keyframe(0, &kfs), 10);
        assert_eq!(nearest_keyframe(-5, &kfs), 10);
        assert_eq!(nearest_keyframe(31, &kfs), 30);
        assert_eq!(nearest_keyframe(10_000, &kfs), 30);
    }

    #[test]
    fn single_keyframe() {
        assert_eq!(nearest_keyframe(0, &[42]), 42);
        assert_eq!(nearest_keyframe(1000, &[42]), 42);
    }

    #[test]
    #[should_panic(expected = "at least one keyframe")]
    fn empty_keyframes_panics() {
        nearest_keyframe(5, &[]);
    }
}
