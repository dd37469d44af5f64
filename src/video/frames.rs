//! Frame storage
//!
//! Decodes a clip (an image-sequence directory or a video file handed to the
//! system `ffmpeg`) into a bounded, in-memory frame sequence. The live
//! sequence is an `Arc` snapshot swapped atomically on reload, so readers
//! holding the previous snapshot keep a consistent view mid-session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;

use crate::error::LoadError;
use crate::events;

/// A single decoded frame: 3-channel 8-bit RGB, row major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Create a frame filled with a single color
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Read the pixel at `(x, y)`, or `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        self.data
            .get(offset..offset + 3)
            .map(|px| [px[0], px[1], px[2]])
    }
}

/// An immutable, ordered sequence of decoded frames for one loaded clip
#[derive(Debug, Default)]
pub struct FrameSet {
    frames: Vec<VideoFrame>,
}

impl FrameSet {
    /// Number of frames in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Fetch a frame by cyclic index (`index % len`).
    ///
    /// Returns `None` only when the set is empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn frame_at(&self, index: u64) -> Option<&VideoFrame> {
        if self.frames.is_empty() {
            return None;
        }
        let wrapped = (index % self.frames.len() as u64) as usize;
        self.frames.get(wrapped)
    }
}

/// Bounded in-memory store for the frames of the currently loaded clip
pub struct FrameStore {
    current: RwLock<Arc<FrameSet>>,
    cap: usize,
}

impl FrameStore {
    /// Create an empty store holding at most `cap` frames per clip
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(FrameSet::default())),
            cap,
        }
    }

    /// Create a store preloaded with in-memory frames, applying the cap
    #[must_use]
    pub fn with_frames(cap: usize, mut frames: Vec<VideoFrame>) -> Self {
        if frames.len() > cap {
            frames.truncate(cap);
        }
        Self {
            current: RwLock::new(Arc::new(FrameSet { frames })),
            cap,
        }
    }

    /// The frame cap this store enforces
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// Clone a handle to the current frame set
    #[must_use]
    pub fn snapshot(&self) -> Arc<FrameSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Decode `source` and replace the current frame set.
    ///
    /// `source` may be a directory of image files (decoded in file-name
    /// order) or a video file decoded through the system `ffmpeg`. At most
    /// `cap` frames are kept; the rest of the clip is discarded. The swap is
    /// atomic: readers hold either the old set or the new one, never a mix.
    /// Callers must stop any running animation session before reloading.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Unopenable`] when the source cannot be opened or
    /// probed, and [`LoadError::Empty`] when zero frames decode.
    pub fn load_clip(&self, source: &Path) -> std::result::Result<usize, LoadError> {
        let (frames, capped) = if source.is_dir() {
            decode_image_dir(source, self.cap)?
        } else if source.is_file() {
            let frames = decode_video(source, self.cap)?;
            let capped = frames.len() >= self.cap;
            if capped {
                tracing::warn!(
                    cap = self.cap,
                    "clip decoding stopped at the frame cap"
                );
            }
            (frames, capped)
        } else {
            return Err(LoadError::Unopenable(format!(
                "no such clip source: {}",
                source.display()
            )));
        };

        if frames.is_empty() {
            return Err(LoadError::Empty);
        }

        let count = frames.len();
        let set = Arc::new(FrameSet { frames });
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = set;

        events::clip_loaded(&source.display().to_string(), count, capped);
        tracing::info!(source = %source.display(), frames = count, "clip loaded");
        Ok(count)
    }
}

/// Decode an image-sequence directory in file-name order
fn decode_image_dir(
    dir: &Path,
    cap: usize,
) -> std::result::Result<(Vec<VideoFrame>, bool), LoadError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| LoadError::Unopenable(format!("cannot read clip directory: {e}")))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_image_file(path))
        .collect();
    paths.sort();

    let capped = paths.len() > cap;
    if capped {
        tracing::warn!(
            cap,
            available = paths.len(),
            "clip longer than frame cap, loading leading frames only"
        );
        paths.truncate(cap);
    }

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        match image::open(path) {
            Ok(img) => {
                let rgb = img.to_rgb8();
                let (width, height) = rgb.dimensions();
                frames.push(VideoFrame {
                    width,
                    height,
                    data: rgb.into_raw(),
                });
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping undecodable frame");
            }
        }
    }

    Ok((frames, capped))
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "bmp"
            )
        })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video's dimensions, then stream raw rgb24 frames from `ffmpeg`
fn decode_video(source: &Path, cap: usize) -> std::result::Result<Vec<VideoFrame>, LoadError> {
    let ffprobe = which::which("ffprobe")
        .map_err(|e| LoadError::Unopenable(format!("ffprobe not found on PATH: {e}")))?;

    let probe_out = std::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ])
        .arg(source)
        .output()
        .map_err(|e| LoadError::Unopenable(format!("failed to run ffprobe: {e}")))?;

    if !probe_out.status.success() {
        return Err(LoadError::Unopenable(format!(
            "ffprobe exited with {}: {}",
            probe_out.status,
            String::from_utf8_lossy(&probe_out.stderr).trim()
        )));
    }

    let probe: ProbeOutput = serde_json::from_slice(&probe_out.stdout)
        .map_err(|e| LoadError::Unopenable(format!("unreadable ffprobe output: {e}")))?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| LoadError::Unopenable("no video stream in clip".to_string()))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(LoadError::Unopenable(
            "video stream is missing dimensions".to_string(),
        ));
    };
    if width == 0 || height == 0 {
        return Err(LoadError::Unopenable(
            "video stream has zero-sized dimensions".to_string(),
        ));
    }

    let ffmpeg = which::which("ffmpeg")
        .map_err(|e| LoadError::Unopenable(format!("ffmpeg not found on PATH: {e}")))?;

    let decode_out = std::process::Command::new(ffmpeg)
        .args(["-v", "error", "-i"])
        .arg(source)
        .args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-frames:v",
            &cap.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| LoadError::Unopenable(format!("failed to run ffmpeg: {e}")))?;

    if !decode_out.status.success() {
        return Err(LoadError::Unopenable(format!(
            "ffmpeg exited with {}: {}",
            decode_out.status,
            String::from_utf8_lossy(&decode_out.stderr).trim()
        )));
    }

    if decode_out.stdout.is_empty() {
        return Err(LoadError::Empty);
    }

    let frame_bytes = width as usize * height as usize * 3;
    if decode_out.stdout.len() % frame_bytes != 0 {
        return Err(LoadError::Unopenable(format!(
            "unexpected byte count from ffmpeg: {} is not a multiple of {frame_bytes}",
            decode_out.stdout.len()
        )));
    }

    let frames = decode_out
        .stdout
        .chunks_exact(frame_bytes)
        .map(|chunk| VideoFrame {
            width,
            height,
            data: chunk.to_vec(),
        })
        .collect();

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_access_is_bounds_checked() {
        let frame = VideoFrame::filled(4, 2, [10, 20, 30]);
        assert_eq!(frame.pixel(3, 1), Some([10, 20, 30]));
        assert_eq!(frame.pixel(4, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
    }

    #[test]
    fn frame_at_wraps_cyclically() {
        let frames = vec![
            VideoFrame::filled(2, 2, [0, 0, 0]),
            VideoFrame::filled(2, 2, [1, 0, 0]),
            VideoFrame::filled(2, 2, [2, 0, 0]),
        ];
        let store = FrameStore::with_frames(10, frames);
        let set = store.snapshot();

        assert_eq!(set.frame_at(0).and_then(|f| f.pixel(0, 0)), Some([0, 0, 0]));
        assert_eq!(set.frame_at(4).and_then(|f| f.pixel(0, 0)), Some([1, 0, 0]));
        assert_eq!(set.frame_at(302).and_then(|f| f.pixel(0, 0)), Some([2, 0, 0]));
    }

    #[test]
    fn empty_set_yields_no_frames() {
        let store = FrameStore::new(10);
        let set = store.snapshot();
        assert!(set.is_empty());
        assert!(set.frame_at(0).is_none());
    }

    #[test]
    fn preload_applies_cap() {
        let frames = (0..8)
            .map(|i| VideoFrame::filled(2, 2, [i, 0, 0]))
            .collect();
        let store = FrameStore::with_frames(3, frames);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn image_extension_filter() {
        assert!(is_image_file(Path::new("frame_001.png")));
        assert!(is_image_file(Path::new("frame_001.JPG")));
        assert!(!is_image_file(Path::new("frame_001.txt")));
        assert!(!is_image_file(Path::new("frames")));
    }
}
