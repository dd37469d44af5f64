//! Playback coordination
//!
//! One "speak and animate" unit of work: start speech, start an animation
//! session sized to the estimated utterance length, poll the speaking flag,
//! and tear both down. This is the only place aware of both the audio and
//! the video timelines.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::animation::FacialAnimator;
use crate::events;
use crate::speech::{self, SpeechSynthesizer};

/// How often the coordinator samples the synthesizer's speaking flag
const SPEECH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extra wall-clock allowance past the estimate before a stuck utterance is
/// cut off
const SPEECH_WAIT_GRACE: Duration = Duration::from_secs(30);

/// Orchestrates speech and facial animation for single utterances.
pub struct PlaybackCoordinator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    animator: Arc<dyn FacialAnimator>,
    fps: u32,
}

impl PlaybackCoordinator {
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        animator: Arc<dyn FacialAnimator>,
        fps: u32,
    ) -> Self {
        Self {
            synthesizer,
            animator,
            fps,
        }
    }

    /// Speak `text` while animating, returning when both have wound down.
    ///
    /// The animation session is sized from the character-count estimate and
    /// stopped once the synthesizer reports the utterance over, whether or
    /// not the session ran its full plan. Speech or animation failures are
    /// logged and absorbed; a broken capability degrades this call, never
    /// the surrounding session.
    pub async fn speak_and_animate(&self, text: &str) {
        let unit = Uuid::new_v4();
        let estimate = speech::estimate_duration(text);
        let started = Instant::now();
        events::playback_started(unit, text.chars().count(), estimate.as_secs_f64());

        if let Err(e) = self.synthesizer.speak(text).await {
            tracing::error!(error = %e, unit = %unit, "speech failed, continuing without audio");
        }
        if let Err(e) = self.animator.start(estimate, self.fps).await {
            tracing::error!(error = %e, unit = %unit, "animation failed, continuing without frames");
        }

        // The estimate plus grace bounds the poll loop even if the
        // synthesizer's flag sticks.
        let ceiling = estimate + SPEECH_WAIT_GRACE;
        while self.synthesizer.is_speaking() {
            if started.elapsed() >= ceiling {
                tracing::warn!(unit = %unit, "utterance exceeded its estimate grace, cutting it off");
                self.synthesizer.stop().await;
                break;
            }
            tokio::time::sleep(SPEECH_POLL_INTERVAL).await;
        }

        self.animator.stop().await;

        let elapsed = started.elapsed();
        events::playback_finished(unit, elapsed);
        tracing::debug!(
            unit = %unit,
            elapsed_ms = events::duration_to_ms(elapsed),
            "playback unit finished"
        );
    }

    /// Cut off any in-flight speech and animation
    pub async fn halt(&self) {
        self.synthesizer.stop().await;
        self.animator.stop().await;
    }
}
