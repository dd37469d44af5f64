//! Configuration management for the Visage engine
//!
//! Configuration is loaded once at startup into an owned snapshot and passed
//! by value to the components that need it. Nothing mutates the snapshot
//! after load; components copy the fields they care about at construction.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration snapshot
#[derive(Debug, Clone)]
pub struct Config {
    /// Video and animation settings
    pub video: VideoConfig,

    /// Audio and speech settings
    pub audio: AudioConfig,

    /// Session loop settings
    pub session: SessionConfig,

    /// Optional path to a persona TOML file
    pub persona_path: Option<PathBuf>,

    /// Path to the data directory (transcripts, caches)
    pub data_dir: PathBuf,
}

/// Video and animation configuration
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Target animation frame rate
    pub fps: u32,

    /// Maximum number of decoded frames held in memory per clip
    pub frame_cap: usize,

    /// Default overlay blend opacity (0.0 to 1.0)
    pub overlay_opacity: f64,

    /// Enable per-frame face-region detection
    pub face_detection: bool,

    /// Path to the face clip (video file or image-sequence directory)
    pub clip: PathBuf,

    /// Projection window width in pixels
    pub projection_width: u32,

    /// Projection window height in pixels
    pub projection_height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            frame_cap: 300,
            overlay_opacity: 0.9,
            face_detection: true,
            clip: PathBuf::from("assets/face.mp4"),
            projection_width: 1920,
            projection_height: 1080,
        }
    }
}

/// Audio and speech configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Voice speed multiplier
    pub voice_speed: f64,

    /// Voice volume (0.0 to 1.0)
    pub voice_volume: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voice_speed: 0.9,
            voice_volume: 0.8,
        }
    }
}

/// Session loop configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Silence before the session ends
    pub idle_timeout: Duration,

    /// Hard ceiling on total session length
    pub max_session_time: Duration,

    /// How long each listen attempt waits for input
    pub listen_window: Duration,

    /// Append conversation transcripts under the data directory
    pub save_transcripts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            max_session_time: Duration::from_secs(1800),
            listen_window: Duration::from_secs(5),
            save_transcripts: true,
        }
    }
}

/// Parse an environment variable, discarding unreadable or malformed values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

/// Parse a boolean environment variable ("1"/"true" and "0"/"false")
fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| {
        if v == "1" || v.eq_ignore_ascii_case("true") {
            Some(true)
        } else if v == "0" || v.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            tracing::warn!(key, value = %v, "ignoring unparsable boolean override");
            None
        }
    })
}

impl Config {
    /// Load configuration from defaults, the optional TOML file, and
    /// `VISAGE_*` environment variables (env > toml > default).
    ///
    /// Never fails: unreadable files or malformed values degrade to the
    /// defaults with a logged warning.
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::from_file(fc)
    }

    /// Apply the env > toml > default layering on top of a parsed file
    #[must_use]
    pub fn from_file(fc: file::VisageConfigFile) -> Self {
        let video_default = VideoConfig::default();
        let video = VideoConfig {
            fps: env_parse("VISAGE_FPS")
                .or(fc.video.fps)
                .filter(|&fps| fps > 0)
                .unwrap_or(video_default.fps),
            frame_cap: env_parse("VISAGE_FRAME_CAP")
                .or(fc.video.frame_cap)
                .filter(|&cap| cap > 0)
                .unwrap_or(video_default.frame_cap),
            overlay_opacity: env_parse("VISAGE_OVERLAY_OPACITY")
                .or(fc.video.overlay_opacity)
                .filter(|o| (0.0..=1.0).contains(o))
                .unwrap_or(video_default.overlay_opacity),
            face_detection: env_bool("VISAGE_FACE_DETECTION")
                .or(fc.video.face_detection)
                .unwrap_or(video_default.face_detection),
            clip: env_parse::<PathBuf>("VISAGE_CLIP")
                .or_else(|| fc.video.clip.map(PathBuf::from))
                .unwrap_or(video_default.clip),
            projection_width: env_parse("VISAGE_PROJECTION_WIDTH")
                .or(fc.video.projection_width)
                .unwrap_or(video_default.projection_width),
            projection_height: env_parse("VISAGE_PROJECTION_HEIGHT")
                .or(fc.video.projection_height)
                .unwrap_or(video_default.projection_height),
        };

        let audio_default = AudioConfig::default();
        let audio = AudioConfig {
            voice_speed: env_parse("VISAGE_VOICE_SPEED")
                .or(fc.audio.voice_speed)
                .filter(|s| (0.1..=4.0).contains(s))
                .unwrap_or(audio_default.voice_speed),
            voice_volume: env_parse("VISAGE_VOICE_VOLUME")
                .or(fc.audio.voice_volume)
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(audio_default.voice_volume),
        };

        let session_default = SessionConfig::default();
        let session = SessionConfig {
            idle_timeout: env_parse("VISAGE_IDLE_TIMEOUT")
                .or(fc.session.idle_timeout_secs)
                .map_or(session_default.idle_timeout, Duration::from_secs),
            max_session_time: env_parse("VISAGE_MAX_SESSION")
                .or(fc.session.max_session_secs)
                .map_or(session_default.max_session_time, Duration::from_secs),
            listen_window: env_parse("VISAGE_LISTEN_WINDOW")
                .or(fc.session.listen_window_secs)
                .filter(|&secs| secs > 0)
                .map_or(session_default.listen_window, Duration::from_secs),
            save_transcripts: env_bool("VISAGE_TRANSCRIPTS")
                .or(fc.session.save_transcripts)
                .unwrap_or(session_default.save_transcripts),
        };

        let persona_path = env_parse::<PathBuf>("VISAGE_PERSONA")
            .or_else(|| fc.persona.map(PathBuf::from));

        // ~/.local/share/visage on Linux
        let data_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("visage"));
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            tracing::warn!(path = %data_dir.display(), error = %e, "failed to create data directory");
        }

        Self {
            video,
            audio,
            session,
            persona_path,
            data_dir,
        }
    }
}
