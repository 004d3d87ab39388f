//! Interactive crop controller.
//!
//! Owns the [`CropRegion`] for the image currently on screen and the
//! ephemeral gesture state that drives it. Pointer input arrives as the
//! full list of active pointers on every event, the way touch events
//! report them:
//!
//! ```text
//!            1 pointer inside region          all pointers lifted
//!   Idle ───────────────────────────▶ Dragging ──────────────────▶ Idle
//!    │                                  ▲  │
//!    │ 2 pointers          1 remains    │  │ 2nd pointer added
//!    └──────────────▶ Pinching ─────────┘◀─┘
//!                        │ all lifted
//!                        └──────────────▶ Idle
//! ```
//!
//! Every mutation ends with a clamp, so the region always lies inside the
//! container and zoom stays within `[min_zoom, max_zoom]`. The pure
//! transition functions make the machine testable without synthesized
//! pointer events.

use crate::config::CropConfig;
use crate::imaging::geometry::{
    clamp_region, default_region, distance, fit_size_to_container, pinch_scale,
    scale_to_aspect_ratio,
};
use crate::types::{AspectRatio, CropRegion, Point, Size};
use tracing::debug;

/// Gesture in progress. Discarded when the last pointer lifts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// One pointer moving the region. `offset` is pointer minus region origin.
    Dragging { offset: Point },
    /// Two pointers zooming. `last_distance` is the previous inter-pointer distance.
    Pinching { last_distance: f64 },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Dragging { .. } => "dragging",
            GestureState::Pinching { .. } => "pinching",
        }
    }
}

/// Crop region state for one displayed image.
#[derive(Debug, Clone)]
pub struct CropController {
    container: Size,
    ratio: AspectRatio,
    free_form: bool,
    region: CropRegion,
    gesture: GestureState,
    default_width_fraction: f64,
    min_zoom: f64,
    max_zoom: f64,
    min_size: f64,
}

impl CropController {
    /// Controller for an image displayed at `container` size, starting at
    /// the default region.
    pub fn new(container: Size, ratio: AspectRatio, config: &CropConfig) -> Self {
        let mut controller = Self {
            container,
            ratio,
            free_form: false,
            region: CropRegion::new(0.0, 0.0, container.width, container.height),
            gesture: GestureState::Idle,
            default_width_fraction: config.default_width_fraction,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            min_size: config.min_size,
        };
        controller.reset();
        controller
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.ratio
    }

    pub fn is_free_form(&self) -> bool {
        self.free_form
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Pointers went down. `pointers` lists every active pointer.
    pub fn on_gesture_start(&mut self, pointers: &[Point]) {
        match pointers {
            [] => {}
            [p] => {
                if matches!(self.gesture, GestureState::Idle) && self.region.contains(*p) {
                    self.gesture = GestureState::Dragging {
                        offset: self.offset_from_origin(*p),
                    };
                }
            }
            [a, b, ..] => {
                self.gesture = GestureState::Pinching {
                    last_distance: distance(*a, *b),
                };
            }
        }
        debug!(state = self.gesture.name(), pointers = pointers.len(), "gesture start");
    }

    /// Pointers moved.
    pub fn on_gesture_move(&mut self, pointers: &[Point]) {
        match (self.gesture, pointers) {
            (GestureState::Dragging { offset }, [p, ..]) => {
                self.region.x = p.x - offset.x;
                self.region.y = p.y - offset.y;
                self.clamp();
            }
            (GestureState::Pinching { last_distance }, [a, b, ..]) => {
                let current = distance(*a, *b);
                self.apply_zoom(self.region.zoom * pinch_scale(last_distance, current));
                self.gesture = GestureState::Pinching {
                    last_distance: current,
                };
            }
            _ => {}
        }
    }

    /// Pointers lifted. `remaining` lists the pointers still down.
    pub fn on_gesture_end(&mut self, remaining: &[Point]) {
        self.gesture = match (self.gesture, remaining) {
            (_, []) => GestureState::Idle,
            (GestureState::Idle, _) => GestureState::Idle,
            // One finger left: the drag continues from where that finger is.
            (_, [p]) => GestureState::Dragging {
                offset: self.offset_from_origin(*p),
            },
            (_, [a, b, ..]) => GestureState::Pinching {
                last_distance: distance(*a, *b),
            },
        };
        debug!(state = self.gesture.name(), remaining = remaining.len(), "gesture end");
    }

    fn offset_from_origin(&self, p: Point) -> Point {
        Point::new(p.x - self.region.x, p.y - self.region.y)
    }

    // =========================================================================
    // Direct mutators
    // =========================================================================

    /// Add `delta` to the zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, delta: f64) {
        if delta.is_finite() {
            self.apply_zoom(self.region.zoom + delta);
        }
    }

    fn apply_zoom(&mut self, zoom: f64) {
        self.region.zoom = if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.region.zoom
        };
    }

    /// Rotate a quarter turn clockwise. Four calls return to the start.
    pub fn rotate(&mut self) {
        self.region.rotation = self.region.rotation.rotate_cw();
    }

    /// Restore the default region: centered, sized to a fraction of the
    /// container width at the active ratio, no zoom or rotation.
    pub fn reset(&mut self) {
        self.region = if self.free_form {
            let w = self.container.width * self.default_width_fraction;
            let h = self.container.height * self.default_width_fraction;
            CropRegion::new(
                (self.container.width - w) / 2.0,
                (self.container.height - h) / 2.0,
                w,
                h,
            )
        } else {
            default_region(self.container, self.ratio.value(), self.default_width_fraction)
        };
        self.gesture = GestureState::Idle;
    }

    /// Resize to `width`, keeping the active aspect ratio (or the current
    /// ratio of the region in free-form mode) and the region origin.
    pub fn resize(&mut self, width: f64) {
        if !width.is_finite() {
            return;
        }
        let height = if self.free_form {
            width * self.region.height / self.region.width
        } else {
            scale_to_aspect_ratio(width, self.ratio.value())
        };
        self.normalize(width, height);
    }

    /// Resize both edges independently. Ignored unless free-form cropping
    /// is enabled.
    pub fn resize_free(&mut self, width: f64, height: f64) {
        if !self.free_form {
            debug!("free-form resize ignored: aspect ratio is locked");
            return;
        }
        if width.is_finite() && height.is_finite() {
            self.normalize(width, height);
        }
    }

    /// Place the region explicitly. Height follows the ratio unless
    /// free-form cropping is enabled.
    pub fn set_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return;
        }
        self.region.x = x;
        self.region.y = y;
        let height = if self.free_form {
            height
        } else {
            scale_to_aspect_ratio(width, self.ratio.value())
        };
        self.normalize(width, height);
    }

    pub fn set_free_form(&mut self, enabled: bool) {
        if self.free_form == enabled {
            return;
        }
        self.free_form = enabled;
        if !enabled {
            let width = self.region.width;
            self.normalize(width, scale_to_aspect_ratio(width, self.ratio.value()));
        }
    }

    /// Switch ratio and re-normalize the region around its center.
    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.ratio = ratio;
        self.free_form = false;
        let center = Point::new(
            self.region.x + self.region.width / 2.0,
            self.region.y + self.region.height / 2.0,
        );
        let width = self.region.width;
        self.normalize(width, scale_to_aspect_ratio(width, ratio.value()));
        self.region.x = center.x - self.region.width / 2.0;
        self.region.y = center.y - self.region.height / 2.0;
        self.clamp();
    }

    /// Bound the size to `[min_size, container]`, restore the ratio when
    /// locked, then clamp the origin.
    fn normalize(&mut self, width: f64, height: f64) {
        let c = self.container;
        let min = self.min_size.min(c.width).min(c.height).max(0.0);
        let (w, h) = if self.free_form {
            (width.clamp(min, c.width), height.clamp(min, c.height))
        } else {
            let ratio = self.ratio.value();
            let (max_w, _) = fit_size_to_container(c.width, ratio, c);
            let min_w = if ratio >= 1.0 { min * ratio } else { min };
            let w = width.clamp(min_w.min(max_w), max_w);
            (w, scale_to_aspect_ratio(w, ratio))
        };
        self.region.width = w;
        self.region.height = h;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.region = clamp_region(self.region, self.container.width, self.container.height);
    }
}
