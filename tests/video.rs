//! Frame store and compositing integration tests
//!
//! Exercises clip loading from image sequences and the pure overlay
//! compositing path without any external playback tooling.

use std::sync::Arc;

use visage_engine::LoadError;
use visage_engine::video::{FaceRegion, FrameStore, VideoFrame, compose, select_region};

mod common;
use common::{gradient_frame, write_png_sequence};

#[test]
fn test_compose_without_region_returns_frame_unchanged() {
    let frame = gradient_frame(32, 24);
    let out = compose(&frame, None, 0.9);
    assert_eq!(out, frame);
}

#[test]
fn test_compose_zero_opacity_returns_frame_unchanged() {
    let frame = gradient_frame(32, 24);
    let region = FaceRegion {
        x: 0,
        y: 0,
        width: 32,
        height: 24,
    };
    assert_eq!(compose(&frame, Some(region), 0.0), frame);
    assert_eq!(compose(&frame, Some(region), -1.0), frame);
}

#[test]
fn test_compose_blends_inside_the_region() {
    let frame = VideoFrame::filled(32, 32, [0, 0, 0]);
    let region = FaceRegion {
        x: 0,
        y: 0,
        width: 32,
        height: 32,
    };
    let out = compose(&frame, Some(region), 1.0);

    assert_eq!(out.width, frame.width);
    assert_eq!(out.height, frame.height);
    // The overlay wash is never black, so every pixel must move.
    let changed = out.data.iter().zip(&frame.data).any(|(a, b)| a != b);
    assert!(changed, "blend left a black frame untouched");
}

#[test]
fn test_compose_is_deterministic() {
    let frame = gradient_frame(48, 32);
    let region = FaceRegion {
        x: 4,
        y: 4,
        width: 16,
        height: 16,
    };
    let first = compose(&frame, Some(region), 0.7);
    let second = compose(&frame, Some(region), 0.7);
    assert_eq!(first, second);
}

#[test]
fn test_compose_clips_region_to_frame_bounds() {
    let frame = VideoFrame::filled(64, 64, [0, 0, 0]);
    // Region hangs past the bottom-right corner.
    let region = FaceRegion {
        x: 59,
        y: 59,
        width: 50,
        height: 50,
    };
    let out = compose(&frame, Some(region), 1.0);

    assert_eq!(out.pixel(0, 0), Some([0, 0, 0]));
    assert_eq!(out.pixel(58, 58), Some([0, 0, 0]));
    assert_ne!(out.pixel(62, 62), Some([0, 0, 0]));
}

#[test]
fn test_compose_ignores_region_fully_outside_the_frame() {
    let frame = gradient_frame(16, 16);
    let region = FaceRegion {
        x: 100,
        y: 100,
        width: 8,
        height: 8,
    };
    assert_eq!(compose(&frame, Some(region), 1.0), frame);
}

#[test]
fn test_select_region_prefers_largest_area() {
    let small = FaceRegion {
        x: 0,
        y: 0,
        width: 4,
        height: 4,
    };
    let big = FaceRegion {
        x: 10,
        y: 10,
        width: 20,
        height: 20,
    };
    let mid = FaceRegion {
        x: 5,
        y: 5,
        width: 10,
        height: 10,
    };
    assert_eq!(select_region(&[small, big, mid]), Some(big));
    assert_eq!(select_region(&[]), None);
}

#[test]
fn test_select_region_keeps_earliest_on_ties() {
    let first = FaceRegion {
        x: 0,
        y: 0,
        width: 8,
        height: 8,
    };
    let second = FaceRegion {
        x: 20,
        y: 20,
        width: 8,
        height: 8,
    };
    assert_eq!(select_region(&[first, second]), Some(first));
}

#[test]
fn test_store_loads_image_sequence_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 5, 8, 8);

    let store = FrameStore::new(300);
    let count = store.load_clip(dir.path()).unwrap();
    assert_eq!(count, 5);

    let frames = store.snapshot();
    assert_eq!(frames.len(), 5);
    for i in 0..5_u64 {
        let frame = frames.frame_at(i).unwrap();
        let expected = u8::try_from(i).unwrap();
        assert_eq!(frame.pixel(0, 0), Some([expected, 0, 0]));
    }
}

#[test]
fn test_store_enforces_frame_cap() {
    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 7, 4, 4);

    let store = FrameStore::new(4);
    let count = store.load_clip(dir.path()).unwrap();
    assert_eq!(count, 4);
    assert_eq!(store.snapshot().len(), 4);

    // Leading frames survive, trailing frames are dropped.
    let frames = store.snapshot();
    assert_eq!(frames.frame_at(0).unwrap().pixel(0, 0), Some([0, 0, 0]));
    assert_eq!(frames.frame_at(3).unwrap().pixel(0, 0), Some([3, 0, 0]));
}

#[test]
fn test_frame_lookup_wraps_cyclically() {
    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 3, 4, 4);

    let store = FrameStore::new(300);
    store.load_clip(dir.path()).unwrap();

    let frames = store.snapshot();
    assert_eq!(frames.frame_at(3), frames.frame_at(0));
    assert_eq!(frames.frame_at(7), frames.frame_at(1));
    assert_eq!(frames.frame_at(302), frames.frame_at(2));
}

#[test]
fn test_empty_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new(300);
    assert!(matches!(store.load_clip(dir.path()), Err(LoadError::Empty)));
}

#[test]
fn test_missing_source_is_rejected() {
    let store = FrameStore::new(300);
    let result = store.load_clip(std::path::Path::new("/no/such/clip.mp4"));
    assert!(matches!(result, Err(LoadError::Unopenable(_))));
}

#[test]
fn test_non_image_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 2, 4, 4);
    std::fs::write(dir.path().join("notes.txt"), b"not a frame").unwrap();

    let store = FrameStore::new(300);
    assert_eq!(store.load_clip(dir.path()).unwrap(), 2);
}

#[test]
fn test_reload_swaps_atomically_under_a_held_snapshot() {
    let store = FrameStore::with_frames(300, vec![gradient_frame(4, 4)]);
    let old = store.snapshot();

    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 3, 4, 4);
    store.load_clip(dir.path()).unwrap();

    // The held snapshot still sees the old clip; new readers see the new one.
    assert_eq!(old.len(), 1);
    assert_eq!(store.snapshot().len(), 3);
}

#[tokio::test]
async fn test_clip_decode_runs_off_the_async_workers() {
    let dir = tempfile::tempdir().unwrap();
    write_png_sequence(dir.path(), 3, 4, 4);

    // Decode on the blocking pool, the way the daemon and the animation
    // self-test hand off a potentially multi-second load.
    let store = Arc::new(FrameStore::new(300));
    let decode = Arc::clone(&store);
    let path = dir.path().to_path_buf();
    let count = tokio::task::spawn_blocking(move || decode.load_clip(&path))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(store.snapshot().len(), 3);
}
