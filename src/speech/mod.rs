//! Speech: synthesis and recognition capabilities

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub mod recognizer;
pub mod synth;

pub use recognizer::{ConsoleRecognizer, SilentRecognizer};
pub use synth::{CommandSynthesizer, SilentSynthesizer};

/// Rough speech pacing: one character takes about this long to say out loud
pub const SECONDS_PER_CHAR: f64 = 0.1;

/// Estimate how long `text` takes to speak.
///
/// Deliberately crude. Animation sessions are planned from this figure and
/// then trimmed to the actual utterance, so overshoot costs little.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_duration(text: &str) -> Duration {
    Duration::from_secs_f64(text.chars().count() as f64 * SECONDS_PER_CHAR)
}

/// Turns text into audible speech.
///
/// `speak` starts an utterance and returns once it is underway; progress is
/// observed through `is_speaking`. Starting a new utterance cuts off the
/// previous one.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Begin speaking `text`
    ///
    /// # Errors
    ///
    /// Fails when the utterance cannot be started.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Whether an utterance is currently playing
    fn is_speaking(&self) -> bool;

    /// Cut off the current utterance, if any
    async fn stop(&self);

    /// Short identifier used in logs and status output
    fn name(&self) -> &'static str;
}

/// Produces user utterances from some input source.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Wait up to `window` for one utterance.
    ///
    /// `None` means the window elapsed without input.
    ///
    /// # Errors
    ///
    /// Fails when the input source breaks mid-read.
    async fn listen(&self, window: Duration) -> Result<Option<String>>;

    /// Short identifier used in logs and status output
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_estimate_scales_with_length() {
        assert_eq!(estimate_duration(""), Duration::ZERO);
        assert_eq!(estimate_duration("hello"), Duration::from_millis(500));
        assert_eq!(estimate_duration(&"x".repeat(50)), Duration::from_secs(5));
    }

    #[test]
    fn duration_estimate_counts_chars_not_bytes() {
        assert_eq!(estimate_duration("héllo"), Duration::from_millis(500));
    }
}
