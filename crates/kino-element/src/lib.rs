//! Kino Element - HLS media element core for Kino
//!
//! This crate binds an adaptive streaming engine to a native playback
//! surface and keeps the surface's track lists consistent with it:
//! - Video levels and audio renditions mirrored into track lists
//! - Subtitle renditions mirrored as placeholder text tracks with cues
//! - User selections forwarded back to the engine
//! - Live seekable ranges held back from the live edge
//! - Attach/detach lifecycle with idempotent teardown
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       HlsMediaElement                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Video     │  │    Audio     │  │   Subtitle   │          │
//! │  │RenditionSync │  │RenditionSync │  │    Bridge    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │  ┌──────┴─────────────────┴──────┐   ┌──────┴───────┐          │
//! │  │        TrackListBinder        │   │  TextTracks  │          │
//! │  └──────────────┬────────────────┘   └──────┬───────┘          │
//! │                 │                           │                   │
//! │          ┌──────┴──────┐             ┌──────┴──────┐           │
//! │          │  Playback   │             │  Adaptive   │           │
//! │          │  Surface    │             │   Engine    │           │
//! │          └─────────────┘             └─────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread. Engine events and list notifications are
//! queued and processed in order by [`HlsMediaElement::dispatch_pending`].

pub mod binder;
pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod seekable;
pub mod source;
pub mod subtitles;
pub mod surface;
pub mod sync;
pub mod tracks;
pub mod types;

#[cfg(feature = "sim")]
pub mod sim;

pub use config::{ElementConfig, EngineConfig, PlaybackPreference};
pub use element::{AttachmentState, HlsMediaElement};
pub use engine::{
    AdaptiveEngine, EngineEvent, EngineEventKind, EngineFactory, EngineSubscription, LiveWindow,
    SubscriptionId,
};
pub use error::{Error, Result};
pub use source::SourceKind;
pub use surface::{PlaybackSurface, TrackListHost};
pub use tracks::{
    AudioTrack, MediaTrack, SharedTextTracks, SharedTrackList, TextTrack, TextTrackId,
    TextTrackList, TextTrackMode, TrackList, VideoTrack,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Kino Element initialized");
}
