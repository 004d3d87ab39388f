//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory_with_format` |
//! | Crop | inverse-mapped bilinear warp ([`warp`](super::warp)), rayon rows |
//! | Filter | CSS-style color matrices + `image::imageops::blur` ([`filters`](super::filters)) |
//! | Composite | gradient fill, `imageops::resize` (Lanczos3), `imageops::overlay` ([`compose`](super::compose)) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::compose::composite;
use super::filters::apply_chain;
use super::geometry::CropTransform;
use super::params::{CompositeParams, FilterChain, Quality};
use super::warp::render_crop;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage, RgbaImage};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite RGBA over opaque white.
fn flatten_on_white(source: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0;
        let a = a as u32;
        let over = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, BackendError> {
        image::load_from_memory_with_format(bytes, format)
            .map(|img| img.to_rgba8())
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode {format:?}: {e}")))
    }

    fn crop(&self, source: &RgbaImage, transform: &CropTransform) -> Result<RgbaImage, BackendError> {
        if transform.output.0 == 0 || transform.output.1 == 0 {
            return Err(BackendError::ProcessingFailed(
                "Crop output must be at least 1x1".into(),
            ));
        }
        Ok(render_crop(source, transform))
    }

    fn filter(&self, source: &RgbaImage, chain: &FilterChain) -> Result<RgbaImage, BackendError> {
        Ok(apply_chain(source, chain))
    }

    fn composite(
        &self,
        subject: &RgbaImage,
        params: &CompositeParams,
    ) -> Result<RgbaImage, BackendError> {
        if subject.width() == 0 || subject.height() == 0 {
            return Err(BackendError::TemplateApplyFailed(
                "Subject image is empty".into(),
            ));
        }
        if params.subject.width == 0 || params.subject.height == 0 {
            return Err(BackendError::TemplateApplyFailed(
                "Subject placement is empty".into(),
            ));
        }
        Ok(composite(subject, params))
    }

    fn encode_jpeg(&self, source: &RgbaImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let rgb = flatten_on_white(source);
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.value())
            .encode_image(&rgb)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(bytes)
    }
}
