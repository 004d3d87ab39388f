//! Pure geometry for the photo pipeline.
//!
//! All functions here are pure and testable without any I/O or images:
//! pinch distances, region clamping, aspect-ratio sizing, display → source
//! coordinate mapping, and the inverse transform used to render a rotated,
//! zoomed crop. Inputs are assumed to be finite; callers validate first.

use crate::types::{CropRegion, Point, Rotation, Size};

/// Euclidean distance between two points.
///
/// Pinch zoom derives its scale factor as `distance(current) / distance(previous)`.
pub fn distance(p1: Point, p2: Point) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Scale factor between two pinch distances.
///
/// A zero or degenerate previous distance yields `1.0` (no change) so a
/// pinch that starts with both fingers on the same pixel cannot blow up.
pub fn pinch_scale(previous: f64, current: f64) -> f64 {
    if previous <= f64::EPSILON || !current.is_finite() {
        1.0
    } else {
        current / previous
    }
}

/// Height for `width` at the given width/height ratio.
pub fn scale_to_aspect_ratio(width: f64, target_ratio: f64) -> f64 {
    width / target_ratio
}

/// Constrain the region's origin so it stays inside the container.
///
/// Width and height are left as they are. A region larger than the
/// container is pinned to the top-left corner.
pub fn clamp_region(region: CropRegion, container_width: f64, container_height: f64) -> CropRegion {
    let max_x = (container_width - region.width).max(0.0);
    let max_y = (container_height - region.height).max(0.0);
    CropRegion {
        x: region.x.clamp(0.0, max_x),
        y: region.y.clamp(0.0, max_y),
        ..region
    }
}

/// Largest `(width, height)` at `ratio` that fits `container`, starting from
/// `width` and shrinking only when needed.
pub fn fit_size_to_container(width: f64, ratio: f64, container: Size) -> (f64, f64) {
    let width = width.min(container.width);
    let height = scale_to_aspect_ratio(width, ratio);
    if height <= container.height {
        (width, height)
    } else {
        (container.height * ratio, container.height)
    }
}

/// Default crop region: `fraction` of the container width at `ratio`,
/// centered, with no zoom or rotation.
pub fn default_region(container: Size, ratio: f64, fraction: f64) -> CropRegion {
    let (width, height) = fit_size_to_container(container.width * fraction, ratio, container);
    CropRegion::new(
        (container.width - width) / 2.0,
        (container.height - height) / 2.0,
        width,
        height,
    )
}

/// Rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a crop region in display pixels to source-image pixels.
///
/// Scales by `natural / display` on each axis and floors every coordinate,
/// then trims the rect so it never extends past the natural image edge.
/// The result is at least 1×1.
pub fn compute_crop_source_rect(region: &CropRegion, display: Size, natural: (u32, u32)) -> SourceRect {
    let (natural_w, natural_h) = natural;
    let scale_x = natural_w as f64 / display.width;
    let scale_y = natural_h as f64 / display.height;

    let x = ((region.x * scale_x).floor().max(0.0) as u32).min(natural_w.saturating_sub(1));
    let y = ((region.y * scale_y).floor().max(0.0) as u32).min(natural_h.saturating_sub(1));
    let width = ((region.width * scale_x).floor() as u32)
        .min(natural_w - x)
        .max(1);
    let height = ((region.height * scale_y).floor() as u32)
        .min(natural_h - y)
        .max(1);

    SourceRect {
        x,
        y,
        width,
        height,
    }
}

/// Pixel dimensions for `ratio` with `long_edge` on the longer side.
///
/// ```
/// # use cv_photo::imaging::dimensions_for_ratio;
/// // 4:6 portrait at 400 px → 267×400
/// assert_eq!(dimensions_for_ratio(4.0 / 6.0, 400), (267, 400));
/// // 1:1 at 800 px → 800×800
/// assert_eq!(dimensions_for_ratio(1.0, 800), (800, 800));
/// ```
pub fn dimensions_for_ratio(ratio: f64, long_edge: u32) -> (u32, u32) {
    if ratio >= 1.0 {
        let h = (long_edge as f64 / ratio).round().max(1.0) as u32;
        (long_edge, h)
    } else {
        let w = (long_edge as f64 * ratio).round().max(1.0) as u32;
        (w, long_edge)
    }
}

/// Scale `source` to fit entirely inside `bounds`, preserving aspect ratio.
///
/// Fit-within, not fill: one edge matches the bound, the other is at most
/// its bound. Upscales small sources.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = (src_w as f64 * scale).round().clamp(1.0, max_w.max(1) as f64) as u32;
    let h = (src_h as f64 * scale).round().clamp(1.0, max_h.max(1) as f64) as u32;
    (w, h)
}

/// On-screen size of an image shown with its long edge at most `viewport_long_edge`.
///
/// Small images are shown at natural size rather than upscaled.
pub fn display_size(natural: (u32, u32), viewport_long_edge: u32) -> Size {
    let (w, h) = natural;
    let scale = (viewport_long_edge as f64 / w.max(h) as f64).min(1.0);
    Size::new(w as f64 * scale, h as f64 * scale)
}

/// Exact `(cos, sin)` for a quarter turn, avoiding `1e-17` residue from
/// `f64::cos` on multiples of π/2.
pub fn quarter_turn(rotation: Rotation) -> (f64, f64) {
    match rotation {
        Rotation::R0 => (1.0, 0.0),
        Rotation::R90 => (0.0, 1.0),
        Rotation::R180 => (-1.0, 0.0),
        Rotation::R270 => (0.0, -1.0),
    }
}

/// Canvas transform used to render a crop.
///
/// The forward transform is: translate to the canvas center, rotate, scale
/// by zoom, then draw the source rect into an `output`-sized box centered
/// on the origin. [`CropTransform::map_to_source`] inverts it per output
/// pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropTransform {
    pub source: SourceRect,
    pub output: (u32, u32),
    pub zoom: f64,
    pub rotation: Rotation,
}

impl CropTransform {
    /// Source-image coordinate sampled by output position `(px, py)`.
    ///
    /// `(px, py)` is a continuous canvas position (pixel centers sit at
    /// `+0.5`). Returns `None` when the position falls outside the drawn
    /// source after rotation and zoom.
    pub fn map_to_source(&self, px: f64, py: f64) -> Option<(f64, f64)> {
        let (out_w, out_h) = (self.output.0 as f64, self.output.1 as f64);
        let (cos, sin) = quarter_turn(self.rotation);

        let u = (px - out_w / 2.0) / self.zoom;
        let v = (py - out_h / 2.0) / self.zoom;

        let dx = u * cos + v * sin + out_w / 2.0;
        let dy = -u * sin + v * cos + out_h / 2.0;

        if dx < 0.0 || dy < 0.0 || dx >= out_w || dy >= out_h {
            return None;
        }

        Some((
            self.source.x as f64 + dx * self.source.width as f64 / out_w,
            self.source.y as f64 + dy * self.source.height as f64 / out_h,
        ))
    }
}
