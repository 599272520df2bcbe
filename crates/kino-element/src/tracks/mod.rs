//! Track-list containers for video, audio and text tracks

mod media;
mod notify;
mod text;

pub use media::{
    AudioTrack, MediaTrack, SharedTrackList, TrackHandle, TrackList, TrackListChange, VideoTrack,
};
pub use notify::{ListChange, Listener, ListenerId};
pub use text::{
    SharedTextTracks, TextTrack, TextTrackChange, TextTrackId, TextTrackList, TextTrackMode,
};
