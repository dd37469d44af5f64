use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use visage_engine::animation::{FacialAnimator, SessionAnimator, frames_for_duration};
use visage_engine::capability::CapabilityBinding;
use visage_engine::projection::{FfplaySink, NullSink, ProjectionSink};
use visage_engine::speech::{
    CommandSynthesizer, SilentSynthesizer, SpeechSynthesizer, estimate_duration,
};
use visage_engine::video::{
    FaceDetector, FaceRegion, FrameStore, LumaRegionDetector, NoopDetector, VideoFrame, compose,
};
use visage_engine::{Config, Daemon, Error};

/// Visage - synchronized speech and facial animation for projected characters
#[derive(Parser)]
#[command(name = "visage", version, about)]
struct Cli {
    /// Path to a persona TOML file (overrides configuration)
    #[arg(short, long)]
    persona: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive session loop (default)
    Run,
    /// Speak a line through the resolved synthesizer
    TestSpeech {
        /// Text to speak
        #[arg(default_value = "The spirits are listening. This is a test of the speech system.")]
        text: String,
    },
    /// Sweep a test pattern through the projection sink
    TestProjection,
    /// Load the face clip and run a short animation session
    TestAnimation {
        /// Duration in seconds
        #[arg(short, long, default_value = "3")]
        seconds: u64,
    },
    /// Show resolved capabilities and effective configuration
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,visage_engine=info",
        1 => "info,visage_engine=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(path) = cli.persona {
        config.persona_path = Some(path);
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Run => run_daemon(config).await,
            Command::TestSpeech { text } => test_speech(&config, &text).await,
            Command::TestProjection => test_projection(&config).await,
            Command::TestAnimation { seconds } => test_animation(&config, seconds).await,
            Command::Status => {
                let daemon = build_daemon(config).await?;
                status(&daemon);
                Ok(())
            }
        };
    }

    run_daemon(config).await
}

/// Assemble the daemon off the async workers.
///
/// Construction decodes the configured clip, which can take seconds for
/// video sources, so it runs on the blocking pool.
async fn build_daemon(config: Config) -> anyhow::Result<Daemon> {
    Ok(tokio::task::spawn_blocking(move || Daemon::new(config)).await?)
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    tracing::info!("starting visage");
    tracing::debug!(?config, "loaded configuration");

    let daemon = build_daemon(config).await?;
    daemon.run().await?;
    Ok(())
}

/// Speak one line and wait for it to finish
async fn test_speech(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing speech with text: \"{text}\"\n");

    let synthesizer = CapabilityBinding::resolve(
        "speech-synthesis",
        CommandSynthesizer::new(&config.audio).map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
        Arc::new(SilentSynthesizer::new()),
    );
    let active = synthesizer.active();
    println!("Synthesizer: {}{}", active.name(), fallback_tag(&synthesizer));

    active.speak(text).await?;

    // Generous ceiling so a wedged player cannot hang the test
    let ceiling = estimate_duration(text) * 3 + Duration::from_secs(5);
    let started = Instant::now();
    while active.is_speaking() && started.elapsed() < ceiling {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("\n---");
    println!("If you heard the line, speech output is working.");
    println!("If it was silent, check that espeak-ng (or espeak) is on your PATH.");
    Ok(())
}

/// Sweep the overlay from invisible to full strength on a black frame
async fn test_projection(config: &Config) -> anyhow::Result<()> {
    println!("Testing projection output...\n");

    let sink = CapabilityBinding::resolve(
        "projection",
        FfplaySink::new(&config.video).map(|s| Arc::new(s) as Arc<dyn ProjectionSink>),
        Arc::new(NullSink::new()),
    );
    let active = sink.active();
    println!("Sink: {}{}", active.name(), fallback_tag(&sink));

    let base = VideoFrame::filled(640, 360, [0, 0, 0]);
    let region = FaceRegion {
        x: 0,
        y: 0,
        width: 640,
        height: 360,
    };

    let steps = 45_u32;
    let interval = Duration::from_millis(1000 / u64::from(config.video.fps.max(1)));
    for step in 0..steps {
        let opacity = f64::from(step + 1) / f64::from(steps);
        let frame = compose(&base, Some(region), opacity);
        active.present(&frame)?;
        tokio::time::sleep(interval).await;
    }
    active.clear()?;

    println!("\n---");
    println!("Presented {steps} frames and cleared the display.");
    println!("If a window showed a color wash fading in, projection is working.");
    println!("If nothing appeared, check that ffplay is on your PATH.");
    Ok(())
}

/// Load the configured clip and run one timed animation session
async fn test_animation(config: &Config, seconds: u64) -> anyhow::Result<()> {
    println!("Testing animation for {seconds} seconds...\n");

    let store = Arc::new(FrameStore::new(config.video.frame_cap));
    let frames = {
        let store = Arc::clone(&store);
        let clip = config.video.clip.clone();
        tokio::task::spawn_blocking(move || store.load_clip(&clip)).await??
    };
    println!("Loaded {frames} frames from {}", config.video.clip.display());

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
    println!(
        "Detector: {}{}",
        detector.active().name(),
        fallback_tag(&detector)
    );
    println!("Sink: {}{}\n", sink.active().name(), fallback_tag(&sink));

    let animator = SessionAnimator::new(
        store,
        detector.active(),
        sink.active(),
        config.video.overlay_opacity,
        config.video.face_detection,
        config.video.fps,
    );

    let duration = Duration::from_secs(seconds);
    animator.start(duration, config.video.fps).await?;
    println!(
        "Running {} frames at {} fps...",
        frames_for_duration(duration, config.video.fps),
        config.video.fps
    );

    while animator.is_running() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!(
        "Session {:?} after {} frames.",
        animator.state(),
        animator.cursor()
    );
    Ok(())
}

/// Print resolved capabilities and the effective configuration
fn status(daemon: &Daemon) {
    let config = daemon.config();

    println!("Persona: {}", daemon.persona().name);
    println!();
    println!("Capabilities:");
    for cap in daemon.capabilities() {
        println!(
            "  {:<18} {}{}",
            cap.family,
            cap.implementation,
            if cap.fallback { " (fallback)" } else { "" }
        );
    }
    println!();
    println!("Video:");
    println!("  clip:            {}", config.video.clip.display());
    println!("  fps:             {}", config.video.fps);
    println!("  frame cap:       {}", config.video.frame_cap);
    println!("  overlay opacity: {}", config.video.overlay_opacity);
    println!("  face detection:  {}", config.video.face_detection);
    println!(
        "  projection:      {}x{}",
        config.video.projection_width, config.video.projection_height
    );
    println!();
    println!("Audio:");
    println!("  voice speed:  {}", config.audio.voice_speed);
    println!("  voice volume: {}", config.audio.voice_volume);
    println!();
    println!("Session:");
    println!("  idle timeout:  {}s", config.session.idle_timeout.as_secs());
    println!(
        "  max length:    {}s",
        config.session.max_session_time.as_secs()
    );
    println!("  listen window: {}s", config.session.listen_window.as_secs());
    println!("  transcripts:   {}", config.session.save_transcripts);
    println!("  data dir:      {}", config.data_dir.display());
}

fn fallback_tag<T: ?Sized>(binding: &CapabilityBinding<T>) -> &'static str {
    if binding.is_fallback() { " (fallback)" } else { "" }
}
