//! Error types for Kino Element

use thiserror::Error;

/// Result type alias for element operations
pub type Result<T> = std::result::Result<T, Error>;

/// Element error types
///
/// Races between engine events and user interaction (stale rendition ids,
/// missing text tracks, absent containers) are not errors; they are handled
/// as no-ops where they occur.
#[derive(Error, Debug)]
pub enum Error {
    // Engine errors
    #[error("No adaptive engine implementation configured; cannot load {src}")]
    EngineUnavailable { src: String },

    // Manifest errors
    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if retrying the same operation can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::EngineUnavailable { .. } => "ENGINE_UNAVAILABLE",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_unavailable_message() {
        let err = Error::EngineUnavailable {
            src: "https://host/master.m3u8".to_string(),
        };
        assert!(err.to_string().contains("https://host/master.m3u8"));
        assert_eq!(err.error_code(), "ENGINE_UNAVAILABLE");
        assert!(!err.is_recoverable());
    }
}
