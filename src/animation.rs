//! Animation sessions
//!
//! A session walks the loaded clip cyclically at a fixed cadence for a
//! planned number of frames, compositing the overlay and presenting each
//! result. State and cursor live in atomics shared with the cadence task,
//! so stop requests and completion race cleanly toward a single terminal
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::events;
use crate::projection::ProjectionSink;
use crate::video::{self, FaceDetector, FrameSet, FrameStore};

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_COMPLETED: u8 = 2;
const STATE_STOPPED: u8 = 3;

/// How long `stop` waits for the cadence task to settle before aborting it
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of one animation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has started yet
    Idle,
    /// The cadence task is presenting frames
    Running,
    /// The session presented its full frame plan
    Completed,
    /// The session was cut short by a stop request
    Stopped,
}

/// Number of whole frames that fit into `duration` at `fps`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn frames_for_duration(duration: Duration, fps: u32) -> u64 {
    (duration.as_secs_f64() * f64::from(fps)).floor() as u64
}

/// Drives facial animation for the duration of an utterance.
///
/// `start` on an already-running animator restarts it: the previous session
/// is stopped first. `stop` is idempotent and bounded; it never blocks the
/// caller indefinitely.
#[async_trait]
pub trait FacialAnimator: Send + Sync {
    /// Begin a session covering `duration` at `fps`
    ///
    /// # Errors
    ///
    /// Fails when no clip content is available or `fps` is zero.
    async fn start(&self, duration: Duration, fps: u32) -> Result<()>;

    /// Request the current session to end and wait briefly for it to settle
    async fn stop(&self);

    /// Whether a session is currently presenting frames
    fn is_running(&self) -> bool;

    /// Short identifier used in logs and status output
    fn name(&self) -> &'static str;
}

/// State shared between an animator and its cadence task
struct SessionShared {
    state: AtomicU8,
    cursor: AtomicU64,
}

impl SessionShared {
    fn decode_state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => SessionState::Running,
            STATE_COMPLETED => SessionState::Completed,
            STATE_STOPPED => SessionState::Stopped,
            _ => SessionState::Idle,
        }
    }
}

/// Animator backed by the loaded clip, a detector, and a projection sink
pub struct SessionAnimator {
    store: Arc<FrameStore>,
    detector: Arc<dyn FaceDetector>,
    sink: Arc<dyn ProjectionSink>,
    overlay_opacity: f64,
    face_detection: bool,
    fps: u32,
    shared: Arc<SessionShared>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionAnimator {
    #[must_use]
    pub fn new(
        store: Arc<FrameStore>,
        detector: Arc<dyn FaceDetector>,
        sink: Arc<dyn ProjectionSink>,
        overlay_opacity: f64,
        face_detection: bool,
        fps: u32,
    ) -> Self {
        Self {
            store,
            detector,
            sink,
            overlay_opacity,
            face_detection,
            fps,
            shared: Arc::new(SessionShared {
                state: AtomicU8::new(STATE_IDLE),
                cursor: AtomicU64::new(0),
            }),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.decode_state()
    }

    /// Frames presented so far in the current or most recent session
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.shared.cursor.load(Ordering::SeqCst)
    }

    /// Configured cadence in frames per second
    #[must_use]
    pub const fn fps(&self) -> u32 {
        self.fps
    }
}

#[async_trait]
impl FacialAnimator for SessionAnimator {
    async fn start(&self, duration: Duration, fps: u32) -> Result<()> {
        if fps == 0 {
            return Err(Error::Animation("cannot animate at zero fps".to_string()));
        }

        // Restart semantics: a running session yields to the new one.
        self.stop().await;

        let frames = self.store.snapshot();
        if frames.is_empty() {
            return Err(Error::Content("no clip frames loaded".to_string()));
        }

        let total_frames = frames_for_duration(duration, fps);
        self.shared.cursor.store(0, Ordering::SeqCst);
        self.shared.state.store(STATE_RUNNING, Ordering::SeqCst);
        events::session_started(total_frames, fps);
        tracing::debug!(total_frames, fps, "animation session started");

        let task = run_cadence(
            Arc::clone(&self.shared),
            frames,
            Arc::clone(&self.detector),
            Arc::clone(&self.sink),
            self.overlay_opacity,
            self.face_detection,
            total_frames,
            fps,
        );
        *self.handle.lock().await = Some(tokio::spawn(task));
        Ok(())
    }

    async fn stop(&self) {
        let was_running = self
            .shared
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if let Some(handle) = self.handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
                abort.abort();
                tracing::warn!(
                    waited_ms = events::duration_to_ms(STOP_JOIN_TIMEOUT),
                    "cadence task did not settle in time, aborting"
                );
                events::session_stop_timeout(STOP_JOIN_TIMEOUT);
            }
        }

        if was_running {
            let cursor = self.shared.cursor.load(Ordering::SeqCst);
            events::session_stopped(cursor);
            tracing::debug!(cursor, "animation session stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    fn name(&self) -> &'static str {
        "session"
    }
}

impl Drop for SessionAnimator {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.handle.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

/// Present frames at a fixed cadence until the plan completes or the state
/// leaves `Running`.
///
/// Timing is best effort: each tick sleeps one frame interval after the
/// work, so composition and presentation cost stretches the wall-clock
/// session slightly. Presentation failures skip the frame and keep going.
#[allow(clippy::too_many_arguments)]
async fn run_cadence(
    shared: Arc<SessionShared>,
    frames: Arc<FrameSet>,
    detector: Arc<dyn FaceDetector>,
    sink: Arc<dyn ProjectionSink>,
    overlay_opacity: f64,
    face_detection: bool,
    total_frames: u64,
    fps: u32,
) {
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(fps));

    loop {
        if shared.state.load(Ordering::SeqCst) != STATE_RUNNING {
            break;
        }

        let cursor = shared.cursor.load(Ordering::SeqCst);
        if cursor >= total_frames {
            let completed = shared
                .state
                .compare_exchange(
                    STATE_RUNNING,
                    STATE_COMPLETED,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok();
            if completed {
                events::session_completed(cursor);
                tracing::debug!(frames = cursor, "animation session completed");
            }
            break;
        }

        let Some(frame) = frames.frame_at(cursor) else {
            break;
        };

        let region = if face_detection {
            video::select_region(&detector.detect(frame))
        } else {
            None
        };
        let output = video::compose(frame, region, overlay_opacity);

        if let Err(e) = sink.present(&output) {
            tracing::warn!(error = %e, cursor, "frame presentation failed, skipping");
        }

        shared.cursor.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(frame_interval).await;
    }
}

/// Animator used when no clip content could be loaded. Sessions are
/// accepted and immediately satisfied without presenting anything.
#[derive(Debug, Default)]
pub struct InertAnimator;

impl InertAnimator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FacialAnimator for InertAnimator {
    async fn start(&self, duration: Duration, fps: u32) -> Result<()> {
        tracing::debug!(
            duration_ms = events::duration_to_ms(duration),
            fps,
            "animation unavailable, ignoring session start"
        );
        Ok(())
    }

    async fn stop(&self) {}

    fn is_running(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "inert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_for_duration_floors() {
        assert_eq!(frames_for_duration(Duration::from_secs(5), 30), 150);
        assert_eq!(frames_for_duration(Duration::from_millis(4999), 30), 149);
        assert_eq!(frames_for_duration(Duration::ZERO, 30), 0);
        assert_eq!(frames_for_duration(Duration::from_millis(33), 30), 0);
    }

    #[test]
    fn session_state_decodes_from_raw() {
        let shared = SessionShared {
            state: AtomicU8::new(STATE_IDLE),
            cursor: AtomicU64::new(0),
        };
        assert_eq!(shared.decode_state(), SessionState::Idle);
        shared.state.store(STATE_RUNNING, Ordering::SeqCst);
        assert_eq!(shared.decode_state(), SessionState::Running);
        shared.state.store(STATE_COMPLETED, Ordering::SeqCst);
        assert_eq!(shared.decode_state(), SessionState::Completed);
        shared.state.store(STATE_STOPPED, Ordering::SeqCst);
        assert_eq!(shared.decode_state(), SessionState::Stopped);
    }
}
