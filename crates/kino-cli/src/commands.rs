//! CLI command implementations

use crate::output::{self, ClassifyReport, TrackReport, TrackRow};
use anyhow::Context;
use kino_element::sim::{EngineScript, MemorySurface, ScriptedEngineFactory};
use kino_element::{ElementConfig, HlsMediaElement, MediaTrack, SourceKind, TextTrackMode};
use std::path::Path;
use tracing::{info, warn};

/// Playlists are read from disk, so their path may not end in `.m3u8`
const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Track selections to apply after the manifest loads
#[derive(Debug, Default)]
pub struct Selections {
    pub video: Option<String>,
    pub audio: Option<String>,
    pub subtitle: Option<String>,
}

/// Load configuration from a JSON file, or use defaults
pub async fn load_config(path: Option<&Path>) -> anyhow::Result<ElementConfig> {
    let Some(path) = path else {
        return Ok(ElementConfig::default());
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = ElementConfig::from_json(&content)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Run a master playlist through an element and print its track lists
pub async fn tracks(
    playlist: &Path,
    config: ElementConfig,
    selections: Selections,
    format: &str,
) -> anyhow::Result<()> {
    let content = tokio::fs::read(playlist)
        .await
        .with_context(|| format!("Failed to read playlist {}", playlist.display()))?;
    let script = EngineScript::from_master_playlist(&content)?;

    let factory = ScriptedEngineFactory::new(script);
    let mut element = HlsMediaElement::new(MemorySurface::new())
        .with_config(config)
        .with_engine_factory(factory.clone());
    element.set_type_hint(Some(HLS_MIME));

    let src = playlist.display().to_string();
    element.set_src(&src)?;
    let engine = factory.latest().context("No engine was created")?;
    engine.complete_manifest_load();
    element.dispatch_pending();

    apply_selections(&element, &selections);
    let handled = element.dispatch_pending();
    info!(handled, "Selections processed");

    let report = TrackReport {
        src,
        session_id: element.session_id().map(|id| id.to_string()),
        rows: collect_rows(&element),
        engine_commands: engine.commands().iter().map(|c| format!("{:?}", c)).collect(),
    };
    output::print_tracks(&report, format)
}

fn apply_selections(element: &HlsMediaElement<MemorySurface>, selections: &Selections) {
    if let (Some(id), Some(list)) = (&selections.video, element.video_tracks()) {
        if !list.borrow_mut().set_active(id, true) {
            warn!(id = %id, "No video track with that id");
        }
    }
    if let (Some(id), Some(list)) = (&selections.audio, element.audio_tracks()) {
        if !list.borrow_mut().set_active(id, true) {
            warn!(id = %id, "No audio track with that id");
        }
    }
    if let Some(label) = &selections.subtitle {
        let tracks = element.text_tracks();
        let id = tracks
            .borrow()
            .iter()
            .find(|t| &t.label == label)
            .map(|t| t.id());
        match id {
            Some(id) => {
                tracks.borrow_mut().set_mode(id, TextTrackMode::Showing);
            }
            None => warn!(label = %label, "No text track with that label"),
        }
    }
}

fn collect_rows(element: &HlsMediaElement<MemorySurface>) -> Vec<TrackRow> {
    let mut rows = Vec::new();

    if let Some(list) = element.video_tracks() {
        rows.extend(list.borrow().iter().map(|t| TrackRow {
            kind: "video".to_string(),
            id: t.id.clone(),
            label: t.label.clone(),
            language: t.language.clone(),
            state: active_state(t.is_active(), "selected"),
        }));
    }
    if let Some(list) = element.audio_tracks() {
        rows.extend(list.borrow().iter().map(|t| TrackRow {
            kind: "audio".to_string(),
            id: t.id.clone(),
            label: t.label.clone(),
            language: t.language.clone(),
            state: active_state(t.is_active(), "enabled"),
        }));
    }
    rows.extend(element.text_tracks().borrow().iter().map(|t| TrackRow {
        kind: format!("{:?}", t.kind).to_lowercase(),
        id: t.id().to_string(),
        label: t.label.clone(),
        language: t.language.clone().unwrap_or_default(),
        state: t.mode.to_string(),
    }));

    rows
}

fn active_state(active: bool, word: &str) -> String {
    if active {
        word.to_string()
    } else {
        "-".to_string()
    }
}

/// Classify a source the way the element would
pub fn classify(src: &str, mime: Option<&str>, format: &str) -> anyhow::Result<()> {
    let report = ClassifyReport {
        src: src.to_string(),
        mime: mime.unwrap_or("-").to_string(),
        kind: SourceKind::classify(src, mime).to_string(),
    };
    output::print_classification(&report, format)
}

/// Print the effective configuration
pub fn show_config(config: &ElementConfig, format: &str) -> anyhow::Result<()> {
    config.validate()?;
    output::print_config(config, format)
}
