//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what each stage renders) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing stage logic.
//!
//! ## Types
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 92). Clamped on construction.
//! - [`Adjustment`] / [`FilterChain`] — Ordered pixel adjustments with CSS filter semantics.
//! - [`SubjectPlacement`] — Where the subject lands on a template canvas.
//! - [`CompositeParams`] — Full specification for a template composite.

use crate::template::{Background, Frame};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// A single filter step.
///
/// Amounts follow CSS filter functions: `1.0` is "unchanged" for
/// brightness, contrast and saturate, `0.0` is unchanged for sepia, and
/// blur is a Gaussian standard deviation in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Sepia(f32),
    Blur(f32),
}

impl Adjustment {
    /// True when the step leaves every pixel as it is.
    pub fn is_identity(self) -> bool {
        match self {
            Adjustment::Brightness(a) | Adjustment::Contrast(a) | Adjustment::Saturate(a) => {
                a == 1.0
            }
            Adjustment::Sepia(a) | Adjustment::Blur(a) => a <= 0.0,
        }
    }
}

/// Ordered list of adjustments, applied first to last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain {
    steps: Vec<Adjustment>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: Adjustment) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Adjustment] {
        &self.steps
    }

    pub fn is_identity(&self) -> bool {
        self.steps.iter().all(|s| s.is_identity())
    }
}

/// Subject rectangle on the template canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectPlacement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for a template composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeParams {
    pub canvas: (u32, u32),
    pub background: Background,
    pub subject: SubjectPlacement,
    /// Applied to the subject draw only.
    pub effects: FilterChain,
    pub frame: Frame,
    pub isolate_subject: bool,
}
