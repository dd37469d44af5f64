//! Speech synthesis backends
//!
//! The primary backend shells out to `espeak-ng`, keeping audio devices and
//! codecs out of process. Each utterance is one child process; a poll task
//! tracks its exit so `is_speaking` stays honest without blocking anyone.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::process::Child;

use crate::config::AudioConfig;
use crate::error::{Error, Result};
use crate::speech::{SpeechSynthesizer, estimate_duration};

/// espeak's default speaking rate in words per minute
const BASE_RATE_WPM: f64 = 175.0;

/// How often the poll task checks whether the utterance process exited
const WATCH_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// Synthesizer backed by an external `espeak-ng` (or `espeak`) binary
pub struct CommandSynthesizer {
    binary: PathBuf,
    rate: u32,
    amplitude: u32,
    speaking: Arc<AtomicBool>,
    // Bumped on every speak/stop so a stale poll task cannot clear the
    // speaking flag of a newer utterance.
    generation: Arc<AtomicU64>,
    child: Arc<tokio::sync::Mutex<Option<Child>>>,
}

impl CommandSynthesizer {
    /// Locate a speech binary on `PATH` and derive espeak arguments from
    /// the audio settings.
    ///
    /// # Errors
    ///
    /// Fails when neither `espeak-ng` nor `espeak` is installed.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(audio: &AudioConfig) -> Result<Self> {
        let binary = which::which("espeak-ng")
            .or_else(|_| which::which("espeak"))
            .map_err(|e| Error::Speech(format!("no speech binary on PATH: {e}")))?;

        // espeak accepts -s 80..450 wpm and -a 0..200.
        let rate = (BASE_RATE_WPM * audio.voice_speed).round().clamp(80.0, 450.0) as u32;
        let amplitude = (audio.voice_volume * 200.0).round().clamp(0.0, 200.0) as u32;

        tracing::debug!(binary = %binary.display(), rate, amplitude, "speech synthesizer ready");
        Ok(Self {
            binary,
            rate,
            amplitude,
            speaking: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            child: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    async fn kill_current(&self) {
        let current = self.child.lock().await.take();
        if let Some(mut child) = current {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "utterance process already gone");
            }
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        self.stop().await;
        if text.trim().is_empty() {
            return Ok(());
        }

        let child = tokio::process::Command::new(&self.binary)
            .arg("-s")
            .arg(self.rate.to_string())
            .arg("-a")
            .arg(self.amplitude.to_string())
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::Speech(format!("failed to spawn {}: {e}", self.binary.display()))
            })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.child.lock().await = Some(child);
        self.speaking.store(true, Ordering::SeqCst);
        tracing::debug!(chars = text.chars().count(), "utterance started");

        let speaking = Arc::clone(&self.speaking);
        let generations = Arc::clone(&self.generation);
        let slot = Arc::clone(&self.child);
        tokio::spawn(async move {
            loop {
                let finished = {
                    let mut guard = slot.lock().await;
                    match guard.as_mut() {
                        None => true,
                        Some(child) => match child.try_wait() {
                            Ok(Some(_)) => {
                                *guard = None;
                                true
                            }
                            Ok(None) => false,
                            Err(e) => {
                                tracing::warn!(error = %e, "utterance process poll failed");
                                *guard = None;
                                true
                            }
                        },
                    }
                };
                if finished {
                    if generations.load(Ordering::SeqCst) == generation {
                        speaking.store(false, Ordering::SeqCst);
                    }
                    break;
                }
                tokio::time::sleep(WATCH_INTERVAL).await;
            }
        });

        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.kill_current().await;
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "espeak"
    }
}

/// Synthesizer used when no speech binary is available.
///
/// Utterances make no sound but still occupy their estimated duration, so
/// callers pacing against `is_speaking` behave the same with or without
/// audio.
#[derive(Default)]
pub struct SilentSynthesizer {
    speaking: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl SilentSynthesizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if text.trim().is_empty() {
            return Ok(());
        }

        let duration = estimate_duration(text);
        self.speaking.store(true, Ordering::SeqCst);
        tracing::info!(chars = text.chars().count(), "speaking silently");

        let speaking = Arc::clone(&self.speaking);
        let generations = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if generations.load(Ordering::SeqCst) == generation {
                speaking.store(false, Ordering::SeqCst);
            }
        });
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silent_utterance_paces_by_estimate() {
        let synth = SilentSynthesizer::new();
        assert!(!synth.is_speaking());

        synth.speak("ab").await.unwrap();
        assert!(synth.is_speaking());

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert!(!synth.is_speaking());
    }

    #[tokio::test]
    async fn silent_stop_clears_flag_immediately() {
        let synth = SilentSynthesizer::new();
        synth.speak(&"x".repeat(100)).await.unwrap();
        assert!(synth.is_speaking());

        synth.stop().await;
        assert!(!synth.is_speaking());

        // The stale pacing task must not resurrect or re-clear a newer
        // utterance's flag.
        synth.speak(&"y".repeat(100)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(synth.is_speaking());
        synth.stop().await;
    }

    #[tokio::test]
    async fn blank_text_is_a_no_op() {
        let synth = SilentSynthesizer::new();
        synth.speak("   ").await.unwrap();
        assert!(!synth.is_speaking());
    }
}
