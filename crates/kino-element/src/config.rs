//! Element and engine configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration handed to the engine factory for every new instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Report live stream duration as unbounded
    pub live_duration_infinity: bool,
    /// Let the engine create native text tracks itself
    pub render_text_tracks_natively: bool,
    /// Distance from the live edge, in target durations
    pub live_sync_duration_count: u32,
    /// Initial level index (`None` = engine chooses)
    pub start_level: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            live_duration_infinity: true,
            render_text_tracks_natively: false,
            live_sync_duration_count: 3,
            start_level: None,
        }
    }
}

/// How HLS sources are played when the surface can play them natively
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPreference {
    /// Always go through the engine
    #[default]
    Mse,
    /// Hand HLS to the surface when it supports it
    Native,
}

/// Element configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    /// Engine settings
    pub engine: EngineConfig,
    /// Native vs engine playback for HLS
    pub preference: PlaybackPreference,
    /// Upper bound on dispatch rounds per `dispatch_pending` call
    pub max_dispatch_rounds: u32,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            preference: PlaybackPreference::Mse,
            max_dispatch_rounds: 32,
        }
    }
}

impl ElementConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_dispatch_rounds == 0 {
            return Err(Error::InvalidConfig(
                "max_dispatch_rounds must be at least 1".to_string(),
            ));
        }
        if self.engine.render_text_tracks_natively {
            return Err(Error::InvalidConfig(
                "render_text_tracks_natively conflicts with subtitle placeholders".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ElementConfig::default();
        assert!(config.engine.live_duration_infinity);
        assert!(!config.engine.render_text_tracks_natively);
        assert_eq!(config.engine.live_sync_duration_count, 3);
        assert_eq!(config.preference, PlaybackPreference::Mse);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            ElementConfig::from_json(r#"{"preference": "native", "engine": {"start_level": 2}}"#)
                .unwrap();
        assert_eq!(config.preference, PlaybackPreference::Native);
        assert_eq!(config.engine.start_level, Some(2));
        assert_eq!(config.max_dispatch_rounds, 32);
    }

    #[test]
    fn test_invalid_config() {
        let err = ElementConfig::from_json(r#"{"max_dispatch_rounds": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = ElementConfig::from_json("not json").unwrap_err();
        assert_eq!(err.error_code(), "JSON");
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ElementConfig::default();
        let parsed = ElementConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(parsed, config);
    }
}
