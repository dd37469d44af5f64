//! Face region detection
//!
//! Detection is advisory: it steers where the overlay is composited and
//! nothing downstream fails when a frame yields no regions.

use crate::video::frames::VideoFrame;

/// Cell granularity of the luma sampling grid
const GRID: u32 = 8;

/// Minimum luma spread inside a cell before it counts as textured
const CONTRAST_FLOOR: u16 = 24;

/// A rectangular region of interest within a frame, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Region width
    pub width: u32,
    /// Region height
    pub height: u32,
}

impl FaceRegion {
    /// Area in pixels
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Locates candidate face regions in a decoded frame.
///
/// Implementations must tolerate arbitrary frame content and return an empty
/// list rather than fail when nothing is found.
pub trait FaceDetector: Send + Sync {
    /// Detect candidate regions in `frame`
    fn detect(&self, frame: &VideoFrame) -> Vec<FaceRegion>;

    /// Short identifier used in logs and status output
    fn name(&self) -> &'static str;
}

/// Heuristic detector: samples frame luma on a coarse grid and proposes a
/// region around the brightest high-contrast cell.
///
/// Faces in portrait footage are reliably brighter and more textured than
/// their surroundings, which is enough signal to anchor an overlay without
/// pulling in a trained model.
#[derive(Debug, Default)]
pub struct LumaRegionDetector;

impl LumaRegionDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[derive(Clone, Copy)]
struct CellStats {
    mean: u16,
    spread: u16,
}

impl FaceDetector for LumaRegionDetector {
    fn detect(&self, frame: &VideoFrame) -> Vec<FaceRegion> {
        let cell_w = frame.width / GRID;
        let cell_h = frame.height / GRID;
        if cell_w == 0 || cell_h == 0 {
            return Vec::new();
        }

        let mut best: Option<(u32, u32, CellStats)> = None;
        for cy in 0..GRID {
            for cx in 0..GRID {
                let stats = cell_stats(frame, cx * cell_w, cy * cell_h, cell_w, cell_h);
                if stats.spread < CONTRAST_FLOOR {
                    continue;
                }
                let brighter = best.is_none_or(|(_, _, b)| stats.mean > b.mean);
                if brighter {
                    best = Some((cx, cy, stats));
                }
            }
        }

        let Some((cx, cy, _)) = best else {
            return Vec::new();
        };

        // Widen to a 3x3 cell neighborhood centered on the anchor cell,
        // clamped to the frame.
        let x = (cx.saturating_sub(1)) * cell_w;
        let y = (cy.saturating_sub(1)) * cell_h;
        let width = (cell_w * 3).min(frame.width - x);
        let height = (cell_h * 3).min(frame.height - y);

        vec![FaceRegion {
            x,
            y,
            width,
            height,
        }]
    }

    fn name(&self) -> &'static str {
        "luma-region"
    }
}

/// Mean and min-to-max luma spread over one grid cell, subsampled
#[allow(clippy::cast_possible_truncation)]
fn cell_stats(frame: &VideoFrame, x0: u32, y0: u32, w: u32, h: u32) -> CellStats {
    let step_x = (w / 4).max(1);
    let step_y = (h / 4).max(1);

    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    let mut min = u16::MAX;
    let mut max = 0u16;

    let mut y = y0;
    while y < y0 + h {
        let mut x = x0;
        while x < x0 + w {
            if let Some([r, g, b]) = frame.pixel(x, y) {
                // Integer Rec. 601 luma
                let luma =
                    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8) as u16;
                sum += u64::from(luma);
                count += 1;
                min = min.min(luma);
                max = max.max(luma);
            }
            x += step_x;
        }
        y += step_y;
    }

    if count == 0 {
        return CellStats { mean: 0, spread: 0 };
    }

    CellStats {
        mean: (sum / count) as u16,
        spread: max.saturating_sub(min),
    }
}

/// Detector that never reports a region. Composition degrades to passing
/// frames through untouched.
#[derive(Debug, Default)]
pub struct NoopDetector;

impl NoopDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FaceDetector for NoopDetector {
    fn detect(&self, _frame: &VideoFrame) -> Vec<FaceRegion> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
