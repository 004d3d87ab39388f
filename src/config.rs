//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `cv-photo.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [ingest]
//! max_file_bytes = 10485760   # Upload limit (10 MiB)
//!
//! [crop]
//! aspect_ratio = "passport"   # passport | square | headshot | id | linkedin
//! output_long_edge = 400      # Long edge of the cropped raster, in px
//! viewport_long_edge = 600    # Long edge of the on-screen crop view, in px
//! default_width_fraction = 0.8
//! min_zoom = 0.5
//! max_zoom = 3.0
//! min_size = 40.0             # Smallest crop edge, in display px
//!
//! [enhance]
//! auto = true                 # Apply the auto-enhance preset on entering enhance
//!
//! [template]
//! id = "professional-white"
//! max_edge = 800              # Long edge of the template canvas
//! padding = 40                # Space kept free around the subject
//!
//! [export]
//! quality = 92                # JPEG quality (1-100)
//! filename_prefix = "cv-photo"
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//!
//! [[templates]]               # Extra templates appended to the catalog
//! id = "brand-teal"
//! name = "Brand Teal"
//! category = "professional"
//! background = { solid = "#0f766e" }
//! aspect_ratio = "headshot"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::capture::{DEFAULT_MAX_FILE_BYTES, IngestLimits};
use crate::imaging::Quality;
use crate::template::{Catalog, PhotoTemplate};
use crate::types::AspectRatio;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `cv-photo.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub crop: CropConfig,
    pub enhance: EnhanceConfig,
    pub template: TemplateConfig,
    pub export: ExportConfig,
    pub processing: ProcessingConfig,
    /// User-defined templates appended to the built-in catalog.
    pub templates: Vec<PhotoTemplate>,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.max_file_bytes == 0 {
            return Err(ConfigError::Validation(
                "ingest.max_file_bytes must be greater than 0".into(),
            ));
        }
        self.crop.validate()?;
        if self.template.max_edge <= self.template.padding * 2 {
            return Err(ConfigError::Validation(
                "template.max_edge must exceed twice template.padding".into(),
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        let prefix = &self.export.filename_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "export.filename_prefix must be a non-empty file name".into(),
            ));
        }
        let catalog = self.catalog()?;
        if catalog.get(&self.template.id).is_none() {
            return Err(ConfigError::Validation(format!(
                "template.id '{}' is not in the catalog",
                self.template.id
            )));
        }
        Ok(())
    }

    /// Built-in templates plus the ones declared in `[[templates]]`.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::with_custom(&self.templates).map_err(ConfigError::Validation)
    }
}

/// Upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl IngestConfig {
    pub fn limits(&self) -> IngestLimits {
        IngestLimits {
            max_file_bytes: self.max_file_bytes,
        }
    }
}

/// Crop controller and crop rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    pub aspect_ratio: AspectRatio,
    /// Long edge of the rendered crop, in pixels.
    pub output_long_edge: u32,
    /// Long edge of the on-screen image the region is measured against.
    pub viewport_long_edge: u32,
    /// Width of the default region as a fraction of the container width.
    pub default_width_fraction: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Smallest crop edge, in display pixels.
    pub min_size: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Passport,
            output_long_edge: 400,
            viewport_long_edge: 600,
            default_width_fraction: 0.8,
            min_zoom: 0.5,
            max_zoom: 3.0,
            min_size: 40.0,
        }
    }
}

impl CropConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.output_long_edge == 0 || self.viewport_long_edge == 0 {
            return Err(ConfigError::Validation(
                "crop.output_long_edge and crop.viewport_long_edge must be non-zero".into(),
            ));
        }
        if !(self.default_width_fraction > 0.0 && self.default_width_fraction <= 1.0) {
            return Err(ConfigError::Validation(
                "crop.default_width_fraction must be in (0, 1]".into(),
            ));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()) {
            return Err(ConfigError::Validation(
                "crop zoom range must satisfy 0 < min_zoom <= max_zoom".into(),
            ));
        }
        if !(self.min_size >= 0.0 && self.min_size.is_finite()) {
            return Err(ConfigError::Validation(
                "crop.min_size must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhanceConfig {
    /// Apply the auto-enhance preset when the enhance stage is entered.
    pub auto: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self { auto: true }
    }
}

/// Template canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template used when none is chosen explicitly.
    pub id: String,
    pub max_edge: u32,
    pub padding: u32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            id: "professional-white".to_string(),
            max_edge: 800,
            padding: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub quality: u8,
    pub filename_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quality: 92,
            filename_prefix: "cv-photo".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `cv-photo.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# cv-photo Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[ingest]
# Largest accepted upload, in bytes. JPEG, PNG and WebP are accepted.
max_file_bytes = 10485760

# ---------------------------------------------------------------------------
# Crop
# ---------------------------------------------------------------------------
[crop]
# passport (4:6), square (1:1), headshot (3:4), id (2:3), linkedin (4:5)
aspect_ratio = "passport"

# Long edge of the cropped photo, in pixels.
output_long_edge = 400

# Long edge of the on-screen view that crop regions are measured against.
viewport_long_edge = 600

# Default region width as a fraction of the view width.
default_width_fraction = 0.8

# Pinch / slider zoom range.
min_zoom = 0.5
max_zoom = 3.0

# Smallest crop edge, in view pixels.
min_size = 40.0

# ---------------------------------------------------------------------------
# Enhance
# ---------------------------------------------------------------------------
[enhance]
# Apply brightness 105%, contrast 108%, saturation 95% on entering the stage.
auto = true

# ---------------------------------------------------------------------------
# Template
# ---------------------------------------------------------------------------
[template]
# Default template id. Run `cv-photo templates` for the list.
id = "professional-white"

# Long edge of the template canvas, in pixels.
max_edge = 800

# Space kept free around the subject, in pixels.
padding = 40

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# JPEG quality (1 = worst, 100 = best).
quality = 92

# Exported files are named <prefix>-YYYYMMDD-HHMMSS.jpg
filename_prefix = "cv-photo"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Custom templates
# ---------------------------------------------------------------------------
# [[templates]]
# id = "brand-teal"
# name = "Brand Teal"
# category = "professional"        # professional | creative | formal | social
# background = { gradient = ["#0f766e", "#134e4a"] }
# aspect_ratio = "headshot"
# isolate_subject = false
# [templates.effects]
# lighting = "studio"              # natural | soft | studio | dramatic
# contrast_boost = 5.0
# warmth = 10.0
# [templates.frame]
# style = "thin"                   # none | thin | thick | shadow
# color = "#ffffff"
"##
}
