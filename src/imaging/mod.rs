//! Image processing — pure Rust on the `image` crate, rayon for row kernels.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Crop** | inverse-mapped bilinear warp |
//! | **Filter** | CSS-style color matrices + `imageops::blur` |
//! | **Composite** | gradient fill, Lanczos3 resize, `imageops::overlay` |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for pinch, clamp, and crop math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Kernels**: warp, filters, segmentation, compositing
//! - **Operations**: High-level functions combining geometry + backend

pub mod backend;
pub mod compose;
pub mod filters;
pub mod geometry;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod segment;
pub mod warp;

pub use backend::{BackendError, ImageBackend};
pub use geometry::{CropTransform, SourceRect, dimensions_for_ratio};
pub use operations::{
    ExportedPhoto, apply_crop, apply_filters, apply_template, export_filename, export_jpeg,
};
pub use params::{Adjustment, CompositeParams, FilterChain, Quality, SubjectPlacement};
pub use rust_backend::RustBackend;
