//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five raster operations every
//! backend must support: decode, crop, filter, composite and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust on top of
//! the `image` crate, with row-parallel kernels on rayon.

use super::geometry::CropTransform;
use super::params::{CompositeParams, FilterChain, Quality};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Template could not be applied: {0}")]
    TemplateApplyFailed(String),
}

/// Trait for image processing backends.
///
/// Every operation consumes a borrowed RGBA buffer and returns a new one;
/// inputs are never mutated. The rest of the crate is backend-agnostic.
pub trait ImageBackend: Sync {
    /// Decode encoded bytes of a known format.
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, BackendError>;

    /// Render a rotated, zoomed crop.
    fn crop(&self, source: &RgbaImage, transform: &CropTransform) -> Result<RgbaImage, BackendError>;

    /// Run a filter chain.
    fn filter(&self, source: &RgbaImage, chain: &FilterChain) -> Result<RgbaImage, BackendError>;

    /// Composite the subject onto a template canvas.
    fn composite(
        &self,
        subject: &RgbaImage,
        params: &CompositeParams,
    ) -> Result<RgbaImage, BackendError>;

    /// Encode as baseline JPEG, flattening alpha onto white.
    fn encode_jpeg(&self, source: &RgbaImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}
