//! Enhancement settings: the four user sliders and their presets.
//!
//! [`FilterSettings`] are percentages (brightness, contrast, saturation;
//! `100` is unchanged) plus a blur radius in pixels. They turn into an
//! explicit [`FilterChain`] in the fixed order brightness → contrast →
//! saturate → blur; rendering happens in
//! [`operations::apply_filters`](crate::imaging::operations::apply_filters).

use crate::imaging::{Adjustment, FilterChain};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Upper bound for brightness, contrast and saturation, in percent.
pub const MAX_PERCENT: f32 = 200.0;
/// Upper bound for the blur radius, in pixels.
pub const MAX_BLUR: f32 = 20.0;

#[derive(Error, Debug, PartialEq)]
pub enum EnhanceError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("Unknown preset '{0}' (expected one of: {presets})", presets = preset_names().join(", "))]
    UnknownPreset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub blur: f32,
}

impl FilterSettings {
    /// No adjustment.
    pub const NEUTRAL: FilterSettings = FilterSettings {
        brightness: 100.0,
        contrast: 100.0,
        saturation: 100.0,
        blur: 0.0,
    };

    /// Applied automatically when the enhance stage is entered.
    pub const AUTO_ENHANCE: FilterSettings = FilterSettings {
        brightness: 105.0,
        contrast: 108.0,
        saturation: 95.0,
        blur: 0.0,
    };

    /// Reject NaN and infinities. Out-of-range finite values are allowed
    /// here; [`clamped`](Self::clamped) bounds them.
    pub fn validate(&self) -> Result<(), EnhanceError> {
        for (field, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("blur", self.blur),
        ] {
            if !value.is_finite() {
                return Err(EnhanceError::NonFinite { field, value });
            }
        }
        Ok(())
    }

    /// Copy with every value inside its slider range.
    pub fn clamped(&self) -> Self {
        Self {
            brightness: self.brightness.clamp(0.0, MAX_PERCENT),
            contrast: self.contrast.clamp(0.0, MAX_PERCENT),
            saturation: self.saturation.clamp(0.0, MAX_PERCENT),
            blur: self.blur.clamp(0.0, MAX_BLUR),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Ordered filter chain: brightness, contrast, saturate, blur.
    pub fn chain(&self) -> FilterChain {
        FilterChain::new()
            .then(Adjustment::Brightness(self.brightness / 100.0))
            .then(Adjustment::Contrast(self.contrast / 100.0))
            .then(Adjustment::Saturate(self.saturation / 100.0))
            .then(Adjustment::Blur(self.blur))
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for FilterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "brightness {}%, contrast {}%, saturation {}%, blur {}px",
            self.brightness, self.contrast, self.saturation, self.blur
        )
    }
}

const PRESETS: [(&str, FilterSettings); 5] = [
    ("natural", FilterSettings::NEUTRAL),
    ("auto", FilterSettings::AUTO_ENHANCE),
    (
        "vivid",
        FilterSettings {
            brightness: 104.0,
            contrast: 115.0,
            saturation: 125.0,
            blur: 0.0,
        },
    ),
    (
        "soft",
        FilterSettings {
            brightness: 103.0,
            contrast: 92.0,
            saturation: 95.0,
            blur: 0.6,
        },
    ),
    (
        "mono",
        FilterSettings {
            brightness: 100.0,
            contrast: 110.0,
            saturation: 0.0,
            blur: 0.0,
        },
    ),
];

/// Look up a preset by name, case-insensitively.
pub fn preset(name: &str) -> Result<FilterSettings, EnhanceError> {
    PRESETS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, s)| *s)
        .ok_or_else(|| EnhanceError::UnknownPreset(name.to_string()))
}

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(n, _)| *n).collect()
}
