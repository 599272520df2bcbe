//! Engine scripts from HLS master playlists

use super::EngineScript;
use crate::types::{Rendition, Resolution, SubtitleRendition, TextTrackKind};
use crate::{Error, Result};
use m3u8_rs::{AlternativeMediaType, MasterPlaylist};

impl EngineScript {
    /// Build a script from master playlist text.
    ///
    /// Variant URIs become level ids; alternates are identified by
    /// `GROUP-ID/NAME`. Default alternates start active.
    pub fn from_master_playlist(content: &[u8]) -> Result<Self> {
        let master = m3u8_rs::parse_master_playlist_res(content)
            .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS master: {:?}", e)))?;
        Ok(Self::from_master(&master))
    }

    fn from_master(master: &MasterPlaylist) -> Self {
        let levels: Vec<Rendition> = master
            .variants
            .iter()
            .filter(|v| !v.is_i_frame)
            .map(|variant| Rendition {
                resolution: variant.resolution.map(|r| Resolution {
                    width: r.width as u32,
                    height: r.height as u32,
                }),
                bandwidth: variant.bandwidth,
                codecs: variant.codecs.clone(),
                group_id: variant.audio.clone(),
                ..Rendition::new(variant.uri.as_str())
            })
            .collect();

        let mut audio_tracks = Vec::new();
        let mut subtitle_tracks = Vec::new();
        for alt in &master.alternatives {
            let id = format!("{}/{}", alt.group_id, alt.name);
            match alt.media_type {
                AlternativeMediaType::Audio => audio_tracks.push(Rendition {
                    name: Some(alt.name.clone()),
                    language: alt.language.clone(),
                    group_id: Some(alt.group_id.clone()),
                    channels: alt.channels.clone(),
                    default: alt.default,
                    ..Rendition::new(id)
                }),
                AlternativeMediaType::Subtitles | AlternativeMediaType::ClosedCaptions => {
                    let kind = match alt.media_type {
                        AlternativeMediaType::ClosedCaptions => TextTrackKind::Captions,
                        _ => TextTrackKind::Subtitles,
                    };
                    let mut rendition = SubtitleRendition::new(
                        id,
                        kind,
                        alt.name.as_str(),
                        alt.language.as_deref(),
                    );
                    rendition.default = alt.default;
                    rendition.forced = alt.forced;
                    subtitle_tracks.push(rendition);
                }
                _ => {}
            }
        }

        let initial_audio_track = audio_tracks
            .iter()
            .position(|r| r.default)
            .or_else(|| (!audio_tracks.is_empty()).then_some(0));
        let initial_subtitle_track = subtitle_tracks.iter().position(|r| r.default);

        Self {
            initial_level: (!levels.is_empty()).then_some(0),
            levels,
            audio_tracks,
            subtitle_tracks,
            initial_audio_track,
            initial_subtitle_track,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",NAME="English",LANGUAGE="en",DEFAULT=NO,AUTOSELECT=YES,CHANNELS="2",URI="audio/en.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",NAME="French",LANGUAGE="fr",DEFAULT=YES,AUTOSELECT=YES,CHANNELS="6",URI="audio/fr.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",DEFAULT=NO,AUTOSELECT=YES,URI="subs/en.m3u8"
#EXT-X-MEDIA:TYPE=CLOSED-CAPTIONS,GROUP-ID="cc",NAME="CC1",LANGUAGE="en",INSTREAM-ID="CC1"
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS="avc1.4d401e,mp4a.40.2",AUDIO="aud",SUBTITLES="subs"
video/360p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,CODECS="avc1.640028,mp4a.40.2",AUDIO="aud",SUBTITLES="subs"
video/1080p.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=200000,RESOLUTION=640x360,URI="video/iframes.m3u8"
"#;

    #[test]
    fn test_master_playlist_to_script() {
        let script = EngineScript::from_master_playlist(MASTER.as_bytes()).unwrap();

        let ids: Vec<_> = script.levels.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["video/360p.m3u8", "video/1080p.m3u8"]);
        assert_eq!(script.levels[1].label(), "1080p@5Mbps");
        assert_eq!(script.initial_level, Some(0));

        assert_eq!(script.audio_tracks.len(), 2);
        assert_eq!(script.audio_tracks[1].id.as_str(), "aud/French");
        assert_eq!(script.audio_tracks[1].channels.as_deref(), Some("6"));
        assert_eq!(script.initial_audio_track, Some(1));

        assert_eq!(script.subtitle_tracks.len(), 2);
        assert_eq!(script.subtitle_tracks[0].language.as_deref(), Some("en"));
        assert_eq!(script.subtitle_tracks[1].kind, TextTrackKind::Captions);
        assert_eq!(script.subtitle_tracks[1].id.as_str(), "cc/CC1");
        assert_eq!(script.initial_subtitle_track, None);
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let err = EngineScript::from_master_playlist(b"video/360p.m3u8\n").unwrap_err();
        assert_eq!(err.error_code(), "MANIFEST_PARSE");
    }
}
