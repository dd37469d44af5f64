//! Overlay composition
//!
//! Pure pixel math: given a frame, an optional face region, and an opacity,
//! produce the output frame. No I/O, no clock, no randomness, so identical
//! inputs always produce identical output.

use crate::video::detector::FaceRegion;
use crate::video::frames::VideoFrame;

/// Value scale applied to the procedural overlay before blending.
///
/// Keeps the hue wash dim enough that the underlying footage stays readable
/// even at high opacity.
pub const OVERLAY_WEIGHT: f64 = 0.3;

/// Pick the region to composite over: the largest by area, earliest on ties
#[must_use]
pub fn select_region(regions: &[FaceRegion]) -> Option<FaceRegion> {
    let mut best: Option<FaceRegion> = None;
    for region in regions {
        let larger = best.is_none_or(|b| region.area() > b.area());
        if larger {
            best = Some(*region);
        }
    }
    best
}

/// Composite the procedural hue overlay into `frame` over `region`.
///
/// Returns the input unchanged when there is no region, when `opacity` is
/// zero or below, or when the region clips to nothing inside the frame
/// bounds. Pixels outside the clipped region are never touched.
#[must_use]
pub fn compose(frame: &VideoFrame, region: Option<FaceRegion>, opacity: f64) -> VideoFrame {
    let Some(region) = region else {
        return frame.clone();
    };
    if opacity <= 0.0 {
        return frame.clone();
    }
    let opacity = opacity.min(1.0);
    let Some((x0, y0, w, h)) = clip_region(region, frame.width, frame.height) else {
        return frame.clone();
    };

    let mut out = frame.clone();
    for row in 0..h {
        for col in 0..w {
            let overlay = overlay_pixel(row, col);
            let x = x0 + col;
            let y = y0 + row;
            let offset = (y as usize * frame.width as usize + x as usize) * 3;
            for channel in 0..3 {
                out.data[offset + channel] =
                    blend(frame.data[offset + channel], overlay[channel], opacity);
            }
        }
    }
    out
}

/// Intersect `region` with the frame bounds.
///
/// `None` when nothing survives the clip.
fn clip_region(region: FaceRegion, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if region.x >= width || region.y >= height || region.width == 0 || region.height == 0 {
        return None;
    }
    let w = region.width.min(width - region.x);
    let h = region.height.min(height - region.y);
    Some((region.x, region.y, w, h))
}

/// Overlay color at local overlay coordinates: hue walks diagonally, one
/// degree per pixel, wrapping at 360
fn overlay_pixel(row: u32, col: u32) -> [u8; 3] {
    #[allow(clippy::cast_possible_truncation)]
    let hue = ((row + col) % 360) as u16;
    hue_rgb(hue)
}

/// Fully saturated hue converted to rgb, scaled by [`OVERLAY_WEIGHT`]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hue_rgb(hue: u16) -> [u8; 3] {
    let f = f64::from(hue % 60) / 60.0;
    let (r, g, b) = match hue / 60 {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    };
    let scale = |v: f64| (v * OVERLAY_WEIGHT * 255.0).round() as u8;
    [scale(r), scale(g), scale(b)]
}

/// Alpha blend a single channel, rounded and saturated to u8 range
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(base: u8, over: u8, opacity: f64) -> u8 {
    let mixed = f64::from(base).mul_add(1.0 - opacity, f64::from(over) * opacity);
    mixed.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_primaries_land_on_sextant_boundaries() {
        assert_eq!(hue_rgb(0), [76, 0, 0]);
        assert_eq!(hue_rgb(60), [76, 76, 0]);
        assert_eq!(hue_rgb(120), [0, 76, 0]);
        assert_eq!(hue_rgb(180), [0, 76, 76]);
        assert_eq!(hue_rgb(240), [0, 0, 76]);
        assert_eq!(hue_rgb(300), [76, 0, 76]);
    }

    #[test]
    fn no_region_is_identity() {
        let frame = VideoFrame::filled(8, 8, [50, 100, 150]);
        assert_eq!(compose(&frame, None, 0.9), frame);
    }

    #[test]
    fn zero_opacity_is_identity() {
        let frame = VideoFrame::filled(8, 8, [50, 100, 150]);
        let region = FaceRegion {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        };
        assert_eq!(compose(&frame, Some(region), 0.0), frame);
        assert_eq!(compose(&frame, Some(region), -1.0), frame);
    }

    #[test]
    fn region_fully_outside_frame_is_identity() {
        let frame = VideoFrame::filled(8, 8, [50, 100, 150]);
        let region = FaceRegion {
            x: 20,
            y: 20,
            width: 4,
            height: 4,
        };
        assert_eq!(compose(&frame, Some(region), 0.9), frame);
    }

    #[test]
    fn pixels_outside_region_are_untouched() {
        let frame = VideoFrame::filled(10, 10, [50, 100, 150]);
        let region = FaceRegion {
            x: 2,
            y: 3,
            width: 4,
            height: 4,
        };
        let out = compose(&frame, Some(region), 0.9);

        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..6).contains(&x) && (3..7).contains(&y);
                if !inside {
                    assert_eq!(out.pixel(x, y), frame.pixel(x, y), "pixel ({x}, {y})");
                }
            }
        }
        assert_ne!(out.pixel(2, 3), frame.pixel(2, 3));
    }

    #[test]
    fn partially_clipped_region_only_touches_overlap() {
        let frame = VideoFrame::filled(20, 20, [50, 100, 150]);
        let region = FaceRegion {
            x: 15,
            y: 15,
            width: 50,
            height: 50,
        };
        let out = compose(&frame, Some(region), 0.9);

        for y in 0..20 {
            for x in 0..20 {
                let inside = x >= 15 && y >= 15;
                if inside {
                    assert_ne!(out.pixel(x, y), frame.pixel(x, y), "pixel ({x}, {y})");
                } else {
                    assert_eq!(out.pixel(x, y), frame.pixel(x, y), "pixel ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn composition_is_deterministic() {
        let frame = VideoFrame::filled(16, 16, [10, 200, 90]);
        let region = FaceRegion {
            x: 1,
            y: 1,
            width: 12,
            height: 9,
        };
        let first = compose(&frame, Some(region), 0.9);
        let second = compose(&frame, Some(region), 0.9);
        assert_eq!(first, second);
    }

    #[test]
    fn largest_region_wins_earliest_on_ties() {
        let small = FaceRegion {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        let big_a = FaceRegion {
            x: 1,
            y: 1,
            width: 4,
            height: 4,
        };
        let big_b = FaceRegion {
            x: 9,
            y: 9,
            width: 4,
            height: 4,
        };

        assert_eq!(select_region(&[]), None);
        assert_eq!(select_region(&[small, big_a, big_b]), Some(big_a));
        assert_eq!(select_region(&[big_b, small, big_a]), Some(big_b));
    }
}
