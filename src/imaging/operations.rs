//! High-level image operations.
//!
//! These functions combine geometry with backend execution. They take an
//! input artifact and configuration, compute parameters, call the backend,
//! and install the result as a new artifact. Inputs are never mutated; on
//! error nothing is installed.

use super::backend::{BackendError, ImageBackend};
use super::geometry::{CropTransform, compute_crop_source_rect, dimensions_for_ratio, fit_within};
use super::params::{CompositeParams, SubjectPlacement};
use crate::artifact::{ArtifactPool, ImageArtifact};
use crate::config::{ExportConfig, TemplateConfig};
use crate::enhance::FilterSettings;
use crate::template::PhotoTemplate;
use crate::types::{CropRegion, Size};
use chrono::NaiveDateTime;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// MIME type of exported photos.
pub const EXPORT_MIME: &str = "image/jpeg";

/// Transform that renders `region` of an image shown at `display` size.
///
/// The output keeps the region's aspect ratio with `output_long_edge`
/// pixels on its longer side.
pub fn crop_transform(
    region: &CropRegion,
    display: Size,
    natural: (u32, u32),
    output_long_edge: u32,
) -> CropTransform {
    CropTransform {
        source: compute_crop_source_rect(region, display, natural),
        output: dimensions_for_ratio(region.width / region.height, output_long_edge),
        zoom: region.zoom,
        rotation: region.rotation,
    }
}

/// Render the crop region of `source` into a new artifact.
pub fn apply_crop(
    backend: &impl ImageBackend,
    pool: &ArtifactPool,
    source: &ImageArtifact,
    region: &CropRegion,
    display: Size,
    output_long_edge: u32,
) -> Result<ImageArtifact> {
    if !(region.width > 0.0 && region.height > 0.0) {
        return Err(BackendError::ProcessingFailed(
            "Crop region must have a positive size".into(),
        ));
    }
    let transform = crop_transform(region, display, source.dimensions(), output_long_edge);
    debug!(?transform, "rendering crop");
    let pixels = backend.crop(source.pixels(), &transform)?;
    Ok(pool.install(pixels))
}

/// Re-render `source` through the filter settings.
///
/// Non-finite settings are rejected; finite values are clamped to their
/// slider ranges.
pub fn apply_filters(
    backend: &impl ImageBackend,
    pool: &ArtifactPool,
    source: &ImageArtifact,
    settings: &FilterSettings,
) -> Result<ImageArtifact> {
    settings
        .validate()
        .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
    let chain = settings.clamped().chain();
    let pixels = backend.filter(source.pixels(), &chain)?;
    Ok(pool.install(pixels))
}

/// Canvas size and subject placement for `template`.
///
/// The canvas has the template's aspect ratio with `max_edge` on its long
/// side. The subject is fitted inside the canvas minus `padding` on every
/// side, preserving its own aspect ratio, and centered.
pub fn template_layout(
    subject: (u32, u32),
    template: &PhotoTemplate,
    config: &TemplateConfig,
) -> ((u32, u32), SubjectPlacement) {
    let canvas = dimensions_for_ratio(template.aspect_ratio.value(), config.max_edge);
    let inner = (
        canvas.0.saturating_sub(config.padding * 2).max(1),
        canvas.1.saturating_sub(config.padding * 2).max(1),
    );
    let (width, height) = fit_within(subject, inner);
    let placement = SubjectPlacement {
        x: (canvas.0 - width) / 2,
        y: (canvas.1 - height) / 2,
        width,
        height,
    };
    (canvas, placement)
}

/// Composite `source` onto `template`.
pub fn apply_template(
    backend: &impl ImageBackend,
    pool: &ArtifactPool,
    source: &ImageArtifact,
    template: &PhotoTemplate,
    config: &TemplateConfig,
) -> Result<ImageArtifact> {
    let (canvas, subject) = template_layout(source.dimensions(), template, config);
    let params = CompositeParams {
        canvas,
        background: template.background.clone(),
        subject,
        effects: template.effects.chain(),
        frame: template.frame,
        isolate_subject: template.isolate_subject,
    };
    debug!(template = %template.id, ?canvas, ?subject, "compositing template");
    let pixels = backend.composite(source.pixels(), &params)?;
    Ok(pool.install(pixels))
}

/// Encoded final photo, ready to save or hand to a callback.
#[derive(Debug, Clone)]
pub struct ExportedPhoto {
    /// `<prefix>-YYYYMMDD-HHMMSS.jpg`
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    /// The artifact the bytes were encoded from.
    pub artifact: ImageArtifact,
}

/// Export file name for a photo taken at `at`.
pub fn export_filename(prefix: &str, at: NaiveDateTime) -> String {
    format!("{prefix}-{}.jpg", at.format("%Y%m%d-%H%M%S"))
}

/// Encode `source` as JPEG.
pub fn export_jpeg(
    backend: &impl ImageBackend,
    source: &ImageArtifact,
    config: &ExportConfig,
    at: NaiveDateTime,
) -> Result<ExportedPhoto> {
    let bytes = backend.encode_jpeg(source.pixels(), config.quality())?;
    Ok(ExportedPhoto {
        filename: export_filename(&config.filename_prefix, at),
        mime: EXPORT_MIME,
        bytes,
        artifact: source.clone(),
    })
}
