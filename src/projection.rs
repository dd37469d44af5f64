//! Frame projection
//!
//! Composited frames leave the process through a sink. The primary sink
//! pipes raw rgb24 bytes into a spawned `ffplay` window; display hardware,
//! windowing, and vsync stay that process's problem. A failed write tears
//! the player down and the next frame respawns it.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use crate::config::VideoConfig;
use crate::error::{Error, Result};
use crate::video::VideoFrame;

/// Receives composited frames for display.
pub trait ProjectionSink: Send + Sync {
    /// Display one frame
    ///
    /// # Errors
    ///
    /// Fails when the frame cannot be handed to the output surface. Callers
    /// treat this as transient and keep going.
    fn present(&self, frame: &VideoFrame) -> Result<()>;

    /// Blank the output surface
    ///
    /// # Errors
    ///
    /// Fails when the surface exists but cannot be blanked.
    fn clear(&self) -> Result<()>;

    /// Short identifier used in logs and status output
    fn name(&self) -> &'static str;
}

struct PlayerProcess {
    child: Child,
    stdin: ChildStdin,
    width: u32,
    height: u32,
}

impl PlayerProcess {
    fn shutdown(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "projection process already gone");
        }
        if let Err(e) = self.child.wait() {
            tracing::warn!(error = %e, "failed to reap projection process");
        }
    }
}

/// Sink that streams frames into an `ffplay` window over a pipe.
///
/// The player is spawned lazily on the first frame and respawned whenever
/// the incoming frame size changes, since the raw pipe format is fixed at
/// spawn time.
pub struct FfplaySink {
    binary: PathBuf,
    window_width: u32,
    window_height: u32,
    fps: u32,
    state: Mutex<Option<PlayerProcess>>,
}

impl FfplaySink {
    /// Locate `ffplay` on `PATH` and size the window from the video settings.
    ///
    /// # Errors
    ///
    /// Fails when `ffplay` is not installed.
    pub fn new(video: &VideoConfig) -> Result<Self> {
        let binary = which::which("ffplay")
            .map_err(|e| Error::Projection(format!("ffplay not found on PATH: {e}")))?;
        tracing::debug!(binary = %binary.display(), "projection sink ready");
        Ok(Self {
            binary,
            window_width: video.projection_width,
            window_height: video.projection_height,
            fps: video.fps,
            state: Mutex::new(None),
        })
    }

    fn spawn_player(&self, frame_width: u32, frame_height: u32) -> Result<PlayerProcess> {
        let mut child = Command::new(&self.binary)
            .args(["-loglevel", "error", "-f", "rawvideo", "-pixel_format", "rgb24"])
            .arg("-video_size")
            .arg(format!("{frame_width}x{frame_height}"))
            .arg("-framerate")
            .arg(self.fps.to_string())
            .arg("-x")
            .arg(self.window_width.to_string())
            .arg("-y")
            .arg(self.window_height.to_string())
            .args(["-window_title", "visage", "-i", "pipe:0"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Projection(format!("failed to spawn ffplay: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Projection("ffplay stdin unavailable".to_string()))?;

        tracing::info!(frame_width, frame_height, "projection window opened");
        Ok(PlayerProcess {
            child,
            stdin,
            width: frame_width,
            height: frame_height,
        })
    }
}

impl ProjectionSink for FfplaySink {
    fn present(&self, frame: &VideoFrame) -> Result<()> {
        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.data.len() != expected {
            return Err(Error::Projection(format!(
                "frame holds {} bytes, expected {expected} for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let needs_spawn = guard
            .as_ref()
            .is_none_or(|p| p.width != frame.width || p.height != frame.height);
        if needs_spawn {
            if let Some(mut old) = guard.take() {
                old.shutdown();
            }
            *guard = Some(self.spawn_player(frame.width, frame.height)?);
        }

        if let Some(player) = guard.as_mut() {
            if let Err(e) = player.stdin.write_all(&frame.data) {
                if let Some(mut dead) = guard.take() {
                    dead.shutdown();
                }
                return Err(Error::Projection(format!("projection write failed: {e}")));
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(player) = guard.as_mut() else {
            return Ok(());
        };

        let black = vec![0u8; player.width as usize * player.height as usize * 3];
        let blanked = player
            .stdin
            .write_all(&black)
            .and_then(|()| player.stdin.flush());
        if let Err(e) = blanked {
            if let Some(mut dead) = guard.take() {
                dead.shutdown();
            }
            return Err(Error::Projection(format!("failed to blank projection: {e}")));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffplay"
    }
}

impl Drop for FfplaySink {
    fn drop(&mut self) {
        let taken = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut player) = taken {
            player.shutdown();
        }
    }
}

/// Sink that discards every frame. Used when no display path is available.
#[derive(Debug, Default)]
pub struct NullSink;

impl NullSink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProjectionSink for NullSink {
    fn present(&self, _frame: &VideoFrame) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
