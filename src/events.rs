//! Structured observability events
//!
//! Emits one-line JSON payloads through `tracing` under a fixed target so
//! downstream collectors can filter engine lifecycle events from ordinary
//! logs. Emission is best-effort - serialization failures are logged and
//! never propagate to callers.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// Tracing target for all engine events
const TARGET: &str = "visage_events";

/// Cap a duration to whole milliseconds for event payloads
#[must_use]
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn emit<T: Serialize>(event: &'static str, payload: &T) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            tracing::info!(target: TARGET, event, payload = %json);
        }
        Err(e) => {
            tracing::warn!(target: TARGET, event, error = %e, "failed to encode event payload");
        }
    }
}

#[derive(Serialize)]
struct CapabilityResolvedPayload<'a> {
    family: &'a str,
    selection: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<&'a str>,
}

/// A capability binding chose its primary or fallback implementation.
pub fn capability_resolved(family: &str, fallback: bool, cause: Option<&str>) {
    emit(
        "capability_resolved",
        &CapabilityResolvedPayload {
            family,
            selection: if fallback { "fallback" } else { "primary" },
            cause,
        },
    );
}

#[derive(Serialize)]
struct ClipLoadedPayload<'a> {
    source: &'a str,
    frames: usize,
    capped: bool,
}

/// A clip finished decoding into the frame store.
pub fn clip_loaded(source: &str, frames: usize, capped: bool) {
    emit(
        "clip_loaded",
        &ClipLoadedPayload {
            source,
            frames,
            capped,
        },
    );
}

#[derive(Serialize)]
struct SessionStartedPayload {
    total_frames: u64,
    fps: u32,
}

/// An animation session entered the running state.
pub fn session_started(total_frames: u64, fps: u32) {
    emit("session_started", &SessionStartedPayload { total_frames, fps });
}

#[derive(Serialize)]
struct SessionEndedPayload {
    cursor: u64,
}

/// An animation session ran its full frame schedule.
pub fn session_completed(cursor: u64) {
    emit("session_completed", &SessionEndedPayload { cursor });
}

/// An animation session was stopped before completing.
pub fn session_stopped(cursor: u64) {
    emit("session_stopped", &SessionEndedPayload { cursor });
}

#[derive(Serialize)]
struct SessionStopTimeoutPayload {
    waited_ms: u64,
}

/// The cadence loop failed to exit within the stop join bound.
pub fn session_stop_timeout(waited: Duration) {
    emit(
        "session_stop_timeout",
        &SessionStopTimeoutPayload {
            waited_ms: duration_to_ms(waited),
        },
    );
}

#[derive(Serialize)]
struct PlaybackStartedPayload {
    unit: Uuid,
    chars: usize,
    estimated_secs: f64,
}

/// A speak-and-animate unit began.
pub fn playback_started(unit: Uuid, chars: usize, estimated_secs: f64) {
    emit(
        "playback_started",
        &PlaybackStartedPayload {
            unit,
            chars,
            estimated_secs,
        },
    );
}

#[derive(Serialize)]
struct PlaybackFinishedPayload {
    unit: Uuid,
    elapsed_ms: u64,
}

/// A speak-and-animate unit tore down both timelines.
pub fn playback_finished(unit: Uuid, elapsed: Duration) {
    emit(
        "playback_finished",
        &PlaybackFinishedPayload {
            unit,
            elapsed_ms: duration_to_ms(elapsed),
        },
    );
}
