//! TOML configuration file loading
//!
//! Supports `~/.config/visage/config.toml` as a persistent config source.
//! All fields are optional - the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VisageConfigFile {
    /// Path to a persona TOML file
    #[serde(default)]
    pub persona: Option<String>,

    /// Video/animation configuration
    #[serde(default)]
    pub video: VideoFileConfig,

    /// Audio/speech configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Session loop configuration
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Video and animation configuration
#[derive(Debug, Default, Deserialize)]
pub struct VideoFileConfig {
    /// Target animation frame rate
    pub fps: Option<u32>,

    /// Maximum number of decoded frames held in memory
    pub frame_cap: Option<usize>,

    /// Default overlay blend opacity (0.0 to 1.0)
    pub overlay_opacity: Option<f64>,

    /// Enable per-frame face-region detection
    pub face_detection: Option<bool>,

    /// Path to the face clip (video file or image-sequence directory)
    pub clip: Option<String>,

    /// Projection window width in pixels
    pub projection_width: Option<u32>,

    /// Projection window height in pixels
    pub projection_height: Option<u32>,
}

/// Audio and speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Voice speed multiplier
    pub voice_speed: Option<f64>,

    /// Voice volume (0.0 to 1.0)
    pub voice_volume: Option<f64>,
}

/// Session loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Seconds of silence before the session ends
    pub idle_timeout_secs: Option<u64>,

    /// Hard ceiling on total session length in seconds
    pub max_session_secs: Option<u64>,

    /// Seconds to wait for input per listen attempt
    pub listen_window_secs: Option<u64>,

    /// Append conversation transcripts under the data directory
    pub save_transcripts: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VisageConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> VisageConfigFile {
    let Some(path) = config_file_path() else {
        return VisageConfigFile::default();
    };

    if !path.exists() {
        return VisageConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VisageConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VisageConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/visage/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("visage").join("config.toml"))
}
