//! Seekable-range adapter
//!
//! Live and event playlists need their seekable end held back from the
//! live edge, which the native surface does not know about. The view is
//! recomputed on every query.

use crate::engine::LiveWindow;
use crate::types::TimeRanges;

/// Compute the seekable view for an engine window.
///
/// `hold_back_segments` is the live-edge margin in target durations, used
/// only when the engine has not computed a live sync position itself.
pub fn seekable_ranges(
    window: Option<&LiveWindow>,
    native: impl FnOnce() -> TimeRanges,
    hold_back_segments: u32,
) -> TimeRanges {
    let Some(window) = window else {
        return native();
    };
    if !window.live {
        return TimeRanges::single(window.start, window.end);
    }

    let edge = window.live_sync_position.unwrap_or_else(|| {
        window.end - f64::from(hold_back_segments) * window.target_duration
    });
    TimeRanges::single(window.start, edge.min(window.end).max(window.start))
}
