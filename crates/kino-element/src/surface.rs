//! Playback surface boundary
//!
//! The surface is the native media element the engine renders into. This
//! crate only reads and writes the handful of properties below.

use crate::tracks::{AudioTrack, SharedTextTracks, SharedTrackList, VideoTrack};
use crate::types::TimeRanges;
use chrono::{DateTime, Utc};

/// Capability of a surface to advertise video/audio track lists.
///
/// Surfaces that implement it let several subsystems share one list per
/// media kind.
pub trait TrackListHost {
    fn video_tracks(&self) -> Option<SharedTrackList<VideoTrack>>;

    fn set_video_tracks(&mut self, list: SharedTrackList<VideoTrack>);

    fn audio_tracks(&self) -> Option<SharedTrackList<AudioTrack>>;

    fn set_audio_tracks(&mut self, list: SharedTrackList<AudioTrack>);
}

/// A native playback surface
pub trait PlaybackSurface {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64);

    /// Seekable ranges as computed by the surface itself
    fn native_seekable(&self) -> TimeRanges;

    /// Source attribute
    fn src(&self) -> Option<String>;

    /// Assign or clear (`None`) the source attribute
    fn set_src(&mut self, src: Option<&str>);

    /// The surface's text-track collection
    fn text_tracks(&self) -> SharedTextTracks;

    /// Track-list host capability, if the surface has one
    fn track_list_host(&mut self) -> Option<&mut dyn TrackListHost> {
        None
    }

    /// Wall-clock date of media time zero, when the surface knows it
    fn native_start_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Whether the surface can play HLS without an engine
    fn supports_native_hls(&self) -> bool {
        false
    }
}
