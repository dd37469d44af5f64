//! Video pipeline: frame storage, face detection, and overlay composition

pub mod compositor;
pub mod detector;
pub mod frames;

pub use compositor::{OVERLAY_WEIGHT, compose, select_region};
pub use detector::{FaceDetector, FaceRegion, LumaRegionDetector, NoopDetector};
pub use frames::{FrameSet, FrameStore, VideoFrame};
