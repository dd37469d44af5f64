//! Daemon - the interactive session service
//!
//! Resolves every capability once at startup, then drives the
//! listen / respond / speak cycle until the visitor leaves, a timeout
//! fires, or the process is interrupted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::animation::{FacialAnimator, InertAnimator, SessionAnimator};
use crate::capability::CapabilityBinding;
use crate::config::Config;
use crate::error::Error;
use crate::persona::Persona;
use crate::playback::PlaybackCoordinator;
use crate::projection::{FfplaySink, NullSink, ProjectionSink};
use crate::responder::{ResponseProvider, StockResponder, TemplateOracle};
use crate::speech::{
    CommandSynthesizer, ConsoleRecognizer, SilentRecognizer, SilentSynthesizer, SpeechRecognizer,
    SpeechSynthesizer,
};
use crate::transcript::Transcript;
use crate::video::{FaceDetector, FrameStore, LumaRegionDetector, NoopDetector};

/// Words that end the session when heard as a whole word.
const EXIT_WORDS: [&str; 5] = ["goodbye", "bye", "exit", "quit", "stop"];

/// Speaker label for visitor lines in transcripts.
const VISITOR: &str = "visitor";

/// Pause after a failed listen attempt, so a broken input source cannot
/// spin the loop.
const LISTEN_RETRY_DELAY: Duration = Duration::from_millis(250);

/// One resolved capability, as shown in logs and the status report.
#[derive(Debug, Clone)]
pub struct CapabilityReport {
    /// Capability family name.
    pub family: &'static str,

    /// Implementation that won resolution.
    pub implementation: &'static str,

    /// Whether the fallback is active.
    pub fallback: bool,
}

/// The visage daemon - owns every resolved capability and runs sessions.
pub struct Daemon {
    config: Config,
    persona: Persona,
    recognizer: Arc<dyn SpeechRecognizer>,
    responder: Arc<dyn ResponseProvider>,
    sink: Arc<dyn ProjectionSink>,
    coordinator: PlaybackCoordinator,
    transcript: Option<Transcript>,
    capabilities: Vec<CapabilityReport>,
}

impl Daemon {
    /// Resolve every capability and assemble the session engine.
    ///
    /// Construction never fails: each capability falls back to its
    /// silent implementation when the primary cannot be bound.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let persona = Persona::load_or_default(config.persona_path.as_deref());

        let store = Arc::new(FrameStore::new(config.video.frame_cap));
        let clip_frames = store.load_clip(&config.video.clip).map_err(Error::from);

        let detector = CapabilityBinding::resolve(
            "face-detection",
            if config.video.face_detection {
                Ok(Arc::new(LumaRegionDetector::new()) as Arc<dyn FaceDetector>)
            } else {
                Err(Error::Capability(
                    "face detection disabled by configuration".to_string(),
                ))
            },
            Arc::new(NoopDetector::new()),
        );

        let sink = CapabilityBinding::resolve(
            "projection",
            FfplaySink::new(&config.video).map(|s| Arc::new(s) as Arc<dyn ProjectionSink>),
            Arc::new(NullSink::new()),
        );

        let animator = CapabilityBinding::resolve(
            "animation",
            clip_frames.map(|frames| {
                tracing::info!(frames, clip = %config.video.clip.display(), "face clip ready");
                Arc::new(SessionAnimator::new(
                    Arc::clone(&store),
                    detector.active(),
                    sink.active(),
                    config.video.overlay_opacity,
                    config.video.face_detection,
                    config.video.fps,
                )) as Arc<dyn FacialAnimator>
            }),
            Arc::new(InertAnimator::new()),
        );

        let synthesizer = CapabilityBinding::resolve(
            "speech-synthesis",
            CommandSynthesizer::new(&config.audio)
                .map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
            Arc::new(SilentSynthesizer::new()),
        );

        let recognizer = CapabilityBinding::resolve(
            "speech-recognition",
            ConsoleRecognizer::new().map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>),
            Arc::new(SilentRecognizer::new()),
        );

        let responder = CapabilityBinding::resolve(
            "response-generation",
            TemplateOracle::new(&persona).map(|o| Arc::new(o) as Arc<dyn ResponseProvider>),
            Arc::new(StockResponder::new()),
        );

        let capabilities = vec![
            CapabilityReport {
                family: synthesizer.family(),
                implementation: synthesizer.active().name(),
                fallback: synthesizer.is_fallback(),
            },
            CapabilityReport {
                family: recognizer.family(),
                implementation: recognizer.active().name(),
                fallback: recognizer.is_fallback(),
            },
            CapabilityReport {
                family: responder.family(),
                implementation: responder.active().name(),
                fallback: responder.is_fallback(),
            },
            CapabilityReport {
                family: detector.family(),
                implementation: detector.active().name(),
                fallback: detector.is_fallback(),
            },
            CapabilityReport {
                family: sink.family(),
                implementation: sink.active().name(),
                fallback: sink.is_fallback(),
            },
            CapabilityReport {
                family: animator.family(),
                implementation: animator.active().name(),
                fallback: animator.is_fallback(),
            },
        ];

        let transcript = config
            .session
            .save_transcripts
            .then(|| Transcript::new(&config.data_dir));
        if let Some(t) = &transcript {
            tracing::debug!(
                path = %t.path().display(),
                session = %t.session(),
                "transcript enabled"
            );
        }

        let coordinator =
            PlaybackCoordinator::new(synthesizer.active(), animator.active(), config.video.fps);

        Self {
            config,
            persona,
            recognizer: recognizer.active(),
            responder: responder.active(),
            sink: sink.active(),
            coordinator,
            transcript,
            capabilities,
        }
    }

    /// Resolved capability summary, in presentation order.
    #[must_use]
    pub fn capabilities(&self) -> &[CapabilityReport] {
        &self.capabilities
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Active persona.
    #[must_use]
    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Run one interactive session until the visitor leaves, a timeout
    /// fires, or the process is interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error when the session loop hits an unrecoverable
    /// fault. Capability failures never end a session; they degrade to
    /// the fallback implementations instead.
    pub async fn run(self) -> crate::Result<()> {
        tracing::info!(persona = %self.persona.name, "session daemon starting");
        for cap in &self.capabilities {
            tracing::info!(
                family = cap.family,
                implementation = cap.implementation,
                fallback = cap.fallback,
                "capability ready"
            );
        }

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        // Picked up front so the thread-local RNG never crosses an await.
        let (greeting, farewell) = {
            let mut rng = rand::thread_rng();
            (
                self.persona.random_greeting(&mut rng).map(ToString::to_string),
                self.persona.random_farewell(&mut rng).map(ToString::to_string),
            )
        };

        if let Some(greeting) = greeting {
            self.record(&self.persona.name, &greeting);
            self.coordinator.speak_and_animate(&greeting).await;
        }

        let session_started = Instant::now();
        let mut last_heard = Instant::now();

        loop {
            if session_started.elapsed() >= self.config.session.max_session_time {
                tracing::info!("maximum session time reached");
                break;
            }
            if last_heard.elapsed() >= self.config.session.idle_timeout {
                tracing::info!("idle timeout reached");
                break;
            }

            let heard = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                heard = self.recognizer.listen(self.config.session.listen_window) => heard,
            };

            match heard {
                Ok(Some(line)) => {
                    last_heard = Instant::now();
                    tracing::debug!(text = %line, "visitor spoke");
                    self.record(VISITOR, &line);

                    let reply = self.responder.generate_response(&line);
                    self.record(&self.persona.name, &reply);
                    self.coordinator.speak_and_animate(&reply).await;

                    if wants_to_leave(&line) {
                        tracing::info!("visitor said goodbye");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "listen failed");
                    tokio::time::sleep(LISTEN_RETRY_DELAY).await;
                }
            }
        }

        if let Some(farewell) = farewell {
            self.record(&self.persona.name, &farewell);
            self.coordinator.speak_and_animate(&farewell).await;
        }

        self.coordinator.halt().await;
        if let Err(e) = self.sink.clear() {
            tracing::warn!(error = %e, "failed to clear projection");
        }
        tracing::info!("session ended");
        Ok(())
    }

    fn record(&self, speaker: &str, text: &str) {
        if let Some(transcript) = &self.transcript {
            transcript.append(speaker, text);
        }
    }
}

/// True when any exit word appears as a whole word in the utterance.
fn wants_to_leave(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| EXIT_WORDS.contains(&word))
}
