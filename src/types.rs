//! Shared value types used across all pipeline stages.
//!
//! These are plain `Copy` values: points and sizes in display-pixel space,
//! the named aspect ratios a photo can be cropped to, and RGB colors used by
//! template backgrounds and frames. Colors and aspect ratios serialize as
//! strings (`"#1e3a5f"`, `"passport"`) so they read naturally in TOML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 2-D point in display-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Named aspect ratio (width / height) a photo is cropped and framed to.
///
/// | Name | Ratio |
/// |---|---|
/// | `passport` | 4:6 |
/// | `square` | 1:1 |
/// | `headshot` | 3:4 |
/// | `id` | 2:3 |
/// | `linkedin` | 4:5 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Passport,
    Square,
    Headshot,
    Id,
    Linkedin,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Passport,
        AspectRatio::Square,
        AspectRatio::Headshot,
        AspectRatio::Id,
        AspectRatio::Linkedin,
    ];

    /// Rational form as `(width, height)`.
    pub fn parts(self) -> (u32, u32) {
        match self {
            AspectRatio::Passport => (4, 6),
            AspectRatio::Square => (1, 1),
            AspectRatio::Headshot => (3, 4),
            AspectRatio::Id => (2, 3),
            AspectRatio::Linkedin => (4, 5),
        }
    }

    /// Width divided by height.
    pub fn value(self) -> f64 {
        let (w, h) = self.parts();
        w as f64 / h as f64
    }

    pub fn name(self) -> &'static str {
        match self {
            AspectRatio::Passport => "passport",
            AspectRatio::Square => "square",
            AspectRatio::Headshot => "headshot",
            AspectRatio::Id => "id",
            AspectRatio::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.parts();
        write!(f, "{} ({}:{})", self.name(), w, h)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown aspect ratio '{value}'. Expected passport, square, headshot, id, or linkedin"
                )
            })
    }
}

/// Quarter-turn rotation applied to the source before cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Next clockwise quarter turn; 270 wraps to 0.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees % 360 {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            _ => Err(format!("rotation must be a multiple of 90 degrees, got {degrees}")),
        }
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Crop rectangle in display pixels relative to the shown image, plus the
/// zoom and rotation applied when the crop is rendered.
///
/// Owned by the crop controller, which keeps it inside the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
    pub rotation: Rotation,
}

impl CropRegion {
    /// A region with no zoom or rotation.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            zoom: 1.0,
            rotation: Rotation::R0,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// True when the region lies entirely inside `container`.
    pub fn fits_within(&self, container: Size) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= container.width + EPS
            && self.y + self.height <= container.height + EPS
    }
}

/// An opaque RGB color, written as `#rrggbb` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }

    /// Linear interpolation between two colors, `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{value}' must start with '#'"))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("color '{value}' must be #rrggbb"));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
