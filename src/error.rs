//! Error types for the Visage engine

use thiserror::Error;

/// Result type alias for Visage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Visage engine
#[derive(Debug, Error)]
pub enum Error {
    /// Capability construction failed (primary implementation unavailable)
    #[error("capability unavailable: {0}")]
    Capability(String),

    /// No playable content (empty or missing frame store)
    #[error("content error: {0}")]
    Content(String),

    /// Speech synthesis error
    #[error("speech error: {0}")]
    Speech(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Projection sink error
    #[error("projection error: {0}")]
    Projection(String),

    /// Animation session error
    #[error("animation error: {0}")]
    Animation(String),

    /// Clip loading error
    #[error("clip error: {0}")]
    Clip(#[from] LoadError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while loading a clip into the frame store
#[derive(Debug, Error)]
pub enum LoadError {
    /// The clip source could not be opened or probed
    #[error("cannot open clip source: {0}")]
    Unopenable(String),

    /// The source opened but zero frames decoded
    #[error("clip contains no decodable frames")]
    Empty,
}
