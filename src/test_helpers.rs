//! Shared test utilities for the cv-photo test suite.
//!
//! Synthetic images built in memory, encoders that turn them into upload
//! bytes, and a camera double with observable release counts.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = encode_jpeg(&gradient_image(1280, 720));
//! let artifact = ingest_file(&pool, &backend, &bytes, "image/jpeg", &limits).unwrap();
//! assert_eq!(artifact.dimensions(), (1280, 720));
//! ```

use crate::capture::{CameraDevice, CameraStream, CaptureError, DeviceConstraints};
use image::{ImageEncoder, Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =========================================================================
// Synthetic images
// =========================================================================

/// Deterministic RGB gradient: red follows x, green follows y.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    })
}

/// Single-color opaque image.
pub fn uniform_image(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

// =========================================================================
// Encoders — produce bytes as an upload would deliver them
// =========================================================================

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    bytes
}

pub fn encode_jpeg(image: &RgbaImage) -> Vec<u8> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 95)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    bytes
}

// =========================================================================
// Camera double
// =========================================================================

/// Camera that serves a fixed frame and counts stream releases.
pub struct FakeCamera {
    pub frame: RgbaImage,
    pub available: bool,
    pub releases: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            frame,
            available: true,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(RgbaImage::new(1, 1))
        }
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    frame: RgbaImage,
    releases: Arc<AtomicUsize>,
}

impl CameraStream for FakeStream {
    fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        Ok(self.frame.clone())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl CameraDevice for FakeCamera {
    fn open(&self, _constraints: &DeviceConstraints) -> Result<Box<dyn CameraStream>, CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable(
                "permission denied".to_string(),
            ));
        }
        Ok(Box::new(FakeStream {
            frame: self.frame.clone(),
            releases: Arc::clone(&self.releases),
        }))
    }
}
