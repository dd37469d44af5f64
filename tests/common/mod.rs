//! Shared test utilities

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use visage_engine::Result;
use visage_engine::projection::ProjectionSink;
use visage_engine::video::VideoFrame;

/// Build a frame with a per-pixel gradient so any modification is visible
#[must_use]
pub fn gradient_frame(width: u32, height: u32) -> VideoFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.push(u8::try_from(x % 256).expect("fits in u8"));
            data.push(u8::try_from(y % 256).expect("fits in u8"));
            data.push(u8::try_from((x + y) % 256).expect("fits in u8"));
        }
    }
    VideoFrame {
        width,
        height,
        data,
    }
}

/// Write `count` solid-color PNG frames into `dir`, named in play order.
/// Frame `i` is filled with `[i, 0, 0]` so ordering is checkable by pixel.
pub fn write_png_sequence(dir: &Path, count: usize, width: u32, height: u32) {
    for i in 0..count {
        let level = u8::try_from(i).expect("sequence fits in u8");
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([level, 0, 0]));
        img.save(dir.join(format!("frame_{i:03}.png")))
            .expect("failed to write test frame");
    }
}

/// Projection sink that records every presented frame
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<VideoFrame>>,
    cleared: AtomicUsize,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.lock().expect("sink lock").len()
    }

    /// Copy of every presented frame, in order
    #[must_use]
    pub fn frames(&self) -> Vec<VideoFrame> {
        self.frames.lock().expect("sink lock").clone()
    }

    /// Number of `clear` calls
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl ProjectionSink for RecordingSink {
    fn present(&self, frame: &VideoFrame) -> Result<()> {
        self.frames.lock().expect("sink lock").push(frame.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
