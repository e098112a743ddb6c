//! Error types for soundscape-core.

use thiserror::Error;

/// Main error type for the soundscape-core library.
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Failed to load config '{0}': {1}")]
    ConfigLoad(String, String),

    #[error("Failed to parse config '{0}': {1}")]
    ConfigParse(String, String),

    #[error("Config validation error in '{0}': {1}")]
    ConfigValidation(String, String),

    // Catalog errors
    #[error("Unknown sound id: {0}")]
    UnknownSound(String),

    // Playback errors
    #[error("No audio output available: {0}")]
    AudioOutput(String),

    #[error("Failed to decode '{0}': {1}")]
    Decode(String, String),

    #[error("Nothing loaded to play")]
    NothingLoaded,

    // Cast errors
    #[error("Cast receiver unavailable: {0}")]
    CastUnavailable(String),

    #[error("Failed to send cast message: {0}")]
    CastSend(String),

    // Preset errors
    #[error("Failed to encode preset: {0}")]
    PresetEncode(String),

    #[error("Failed to parse preset: {0}")]
    PresetParse(String),

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
