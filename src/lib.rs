//! Visage - synchronized speech and facial animation for projected characters
//!
//! This library provides the core functionality for the visage engine:
//! - Tiered capability resolution with silent fallbacks
//! - Speech synthesis and recognition
//! - Face-clip decoding, region detection, and overlay compositing
//! - Fixed-cadence animation sessions coordinated with speech
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Daemon                          │
//! │   listen  │  respond  │  transcript  │  timeouts    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               PlaybackCoordinator                    │
//! │   estimate  │  speak  │  animate  │  poll-to-end    │
//! └──────┬─────────────────────────────────┬────────────┘
//!        │                                 │
//! ┌──────▼──────────┐             ┌────────▼────────────┐
//! │     Speech      │             │      Animation       │
//! │  espeak │ stub  │             │  frames │ detector   │
//! └─────────────────┘             │  compose │ ffplay    │
//!                                 └─────────────────────┘
//! ```
//!
//! Every seam above is a capability: a primary implementation backed by
//! external tooling, and a silent fallback that keeps sessions alive when
//! that tooling is missing.

pub mod animation;
pub mod capability;
pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod persona;
pub mod playback;
pub mod projection;
pub mod responder;
pub mod speech;
pub mod transcript;
pub mod video;

pub use capability::{CapabilityBinding, Selection};
pub use config::{AudioConfig, Config, SessionConfig, VideoConfig};
pub use daemon::{CapabilityReport, Daemon};
pub use error::{Error, LoadError, Result};
pub use persona::{FortuneCategory, Persona};
pub use playback::PlaybackCoordinator;
pub use responder::{ResponseProvider, StockResponder, TemplateOracle};
pub use transcript::{Transcript, TranscriptRecord};
