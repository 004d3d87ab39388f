//! Photo template catalog.
//!
//! A [`PhotoTemplate`] is an immutable preset describing how the enhanced
//! subject is placed on its final canvas: background fill, subject effects,
//! frame decoration and the output aspect ratio. The built-in catalog is
//! returned by [`builtin_templates`]; users can add more through
//! `[[templates]]` entries in `cv-photo.toml`, see [`Catalog::with_custom`].
//!
//! ```toml
//! [[templates]]
//! id = "forest"
//! name = "Forest"
//! category = "creative"
//! aspect_ratio = "square"
//! background = { gradient = ["#14532d", "#4ade80"] }
//! effects = { lighting = "soft", contrast_boost = 8, warmth = 10 }
//! frame = { style = "thin", color = "#ffffff" }
//! ```

use crate::imaging::{Adjustment, FilterChain};
use crate::types::{AspectRatio, Color};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Professional,
    Creative,
    Formal,
    Social,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Professional,
        Category::Creative,
        Category::Formal,
        Category::Social,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Professional => "professional",
            Category::Creative => "creative",
            Category::Formal => "formal",
            Category::Social => "social",
        };
        f.write_str(name)
    }
}

/// Canvas fill painted behind the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    Solid(Color),
    /// Evenly spaced color stops along the top-left → bottom-right diagonal.
    Gradient(Vec<Color>),
}

/// Lighting preset applied to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lighting {
    #[default]
    Natural,
    Soft,
    Studio,
    Dramatic,
}

impl Lighting {
    /// `(brightness %, blur px)` for this preset.
    pub fn adjustments(self) -> (f32, f32) {
        match self {
            Lighting::Natural => (100.0, 0.0),
            Lighting::Soft => (102.0, 0.6),
            Lighting::Studio => (106.0, 0.0),
            Lighting::Dramatic => (94.0, 0.0),
        }
    }
}

/// Subject-only effects. Never applied to the background or frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Effects {
    pub lighting: Lighting,
    /// Percentage points added to 100% contrast.
    pub contrast_boost: f32,
    /// Warmth 0–100, rendered as a sepia percentage.
    pub warmth: f32,
}

impl Effects {
    /// Filter chain in draw order: brightness, contrast, sepia, blur.
    pub fn chain(&self) -> FilterChain {
        let (brightness, blur) = self.lighting.adjustments();
        FilterChain::new()
            .then(Adjustment::Brightness(brightness / 100.0))
            .then(Adjustment::Contrast((100.0 + self.contrast_boost) / 100.0))
            .then(Adjustment::Sepia(self.warmth / 100.0))
            .then(Adjustment::Blur(blur))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStyle {
    #[default]
    None,
    /// 2 px border around the subject.
    Thin,
    /// 8 px border around the subject.
    Thick,
    /// Soft drop shadow behind the subject.
    Shadow,
}

impl FrameStyle {
    /// Border width in pixels; zero for styles that draw no border.
    pub fn border_width(self) -> u32 {
        match self {
            FrameStyle::Thin => 2,
            FrameStyle::Thick => 8,
            FrameStyle::None | FrameStyle::Shadow => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Frame {
    pub style: FrameStyle,
    pub color: Color,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            style: FrameStyle::None,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhotoTemplate {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub background: Background,
    #[serde(default)]
    pub effects: Effects,
    #[serde(default)]
    pub frame: Frame,
    pub aspect_ratio: AspectRatio,
    /// Mask the subject with the heuristic background isolation before
    /// compositing. Off by default.
    #[serde(default)]
    pub isolate_subject: bool,
}

impl PhotoTemplate {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("template id must not be empty".into());
        }
        if let Background::Gradient(stops) = &self.background {
            if stops.len() < 2 {
                return Err(format!(
                    "template '{}': gradient needs at least 2 color stops",
                    self.id
                ));
            }
        }
        if !(0.0..=100.0).contains(&self.effects.warmth) {
            return Err(format!("template '{}': warmth must be 0-100", self.id));
        }
        if !(-50.0..=100.0).contains(&self.effects.contrast_boost) {
            return Err(format!(
                "template '{}': contrast_boost must be -50 to 100",
                self.id
            ));
        }
        Ok(())
    }
}

fn template(
    id: &str,
    name: &str,
    category: Category,
    background: Background,
    effects: Effects,
    frame: Frame,
    aspect_ratio: AspectRatio,
) -> PhotoTemplate {
    PhotoTemplate {
        id: id.to_string(),
        name: name.to_string(),
        category,
        background,
        effects,
        frame,
        aspect_ratio,
        isolate_subject: false,
    }
}

/// The built-in template catalog.
pub fn builtin_templates() -> Vec<PhotoTemplate> {
    let hex = |s: &str| s.parse::<Color>().unwrap_or(Color::WHITE);
    vec![
        template(
            "professional-white",
            "Professional White",
            Category::Professional,
            Background::Solid(Color::WHITE),
            Effects {
                lighting: Lighting::Natural,
                contrast_boost: 5.0,
                warmth: 0.0,
            },
            Frame {
                style: FrameStyle::Shadow,
                color: Color::BLACK,
            },
            AspectRatio::Headshot,
        ),
        template(
            "corporate-blue",
            "Corporate Blue",
            Category::Professional,
            Background::Gradient(vec![hex("#1e3a5f"), hex("#2d5a87")]),
            Effects {
                lighting: Lighting::Studio,
                contrast_boost: 10.0,
                warmth: 0.0,
            },
            Frame {
                style: FrameStyle::Thin,
                color: Color::WHITE,
            },
            AspectRatio::Headshot,
        ),
        template(
            "studio-gray",
            "Studio Gray",
            Category::Professional,
            Background::Gradient(vec![hex("#e5e7eb"), hex("#9ca3af")]),
            Effects {
                lighting: Lighting::Soft,
                contrast_boost: 5.0,
                warmth: 5.0,
            },
            Frame {
                style: FrameStyle::Shadow,
                color: Color::BLACK,
            },
            AspectRatio::Headshot,
        ),
        template(
            "linkedin-blue",
            "LinkedIn Blue",
            Category::Social,
            Background::Gradient(vec![hex("#0a66c2"), hex("#70b5f9")]),
            Effects {
                lighting: Lighting::Natural,
                contrast_boost: 8.0,
                warmth: 0.0,
            },
            Frame::default(),
            AspectRatio::Linkedin,
        ),
        PhotoTemplate {
            isolate_subject: true,
            ..template(
                "warm-creative",
                "Warm Creative",
                Category::Creative,
                Background::Gradient(vec![hex("#f59e0b"), hex("#ef4444"), hex("#8b5cf6")]),
                Effects {
                    lighting: Lighting::Soft,
                    contrast_boost: 5.0,
                    warmth: 25.0,
                },
                Frame {
                    style: FrameStyle::Thick,
                    color: Color::WHITE,
                },
                AspectRatio::Square,
            )
        },
        template(
            "dramatic-dark",
            "Dramatic Dark",
            Category::Creative,
            Background::Gradient(vec![hex("#111827"), hex("#374151")]),
            Effects {
                lighting: Lighting::Dramatic,
                contrast_boost: 20.0,
                warmth: 0.0,
            },
            Frame::default(),
            AspectRatio::Square,
        ),
        template(
            "passport-classic",
            "Passport Classic",
            Category::Formal,
            Background::Solid(Color::WHITE),
            Effects::default(),
            Frame::default(),
            AspectRatio::Passport,
        ),
        template(
            "formal-id",
            "Formal ID",
            Category::Formal,
            Background::Solid(hex("#f3f4f6")),
            Effects::default(),
            Frame {
                style: FrameStyle::Thin,
                color: hex("#111827"),
            },
            AspectRatio::Id,
        ),
    ]
}

/// Template lookup over the built-in catalog plus user-defined entries.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<PhotoTemplate>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }
}

impl Catalog {
    /// Built-ins followed by `custom`. Rejects invalid entries and ids that
    /// collide with an existing template.
    pub fn with_custom(custom: &[PhotoTemplate]) -> Result<Self, String> {
        let mut catalog = Self::default();
        for t in custom {
            t.validate()?;
            if catalog.get(&t.id).is_some() {
                return Err(format!("duplicate template id '{}'", t.id));
            }
            catalog.templates.push(t.clone());
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&PhotoTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[PhotoTemplate] {
        &self.templates
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &PhotoTemplate> {
        self.templates.iter().filter(move |t| t.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_are_valid_and_unique() {
        let templates = builtin_templates();
        for t in &templates {
            t.validate().unwrap();
        }
        let mut ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), templates.len());
    }

    #[test]
    fn catalog_lookup_by_id() {
        let catalog = Catalog::default();
        let t = catalog.get("corporate-blue").unwrap();
        assert_eq!(t.aspect_ratio, AspectRatio::Headshot);
        assert_eq!(t.frame.style, FrameStyle::Thin);
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn catalog_filters_by_category() {
        let catalog = Catalog::default();
        let formal: Vec<&str> = catalog
            .by_category(Category::Formal)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(formal, vec!["passport-classic", "formal-id"]);
    }

    #[test]
    fn custom_template_from_toml() {
        let toml_src = r##"
            id = "forest"
            name = "Forest"
            category = "creative"
            aspect_ratio = "square"
            background = { gradient = ["#14532d", "#4ade80"] }
            effects = { lighting = "soft", contrast_boost = 8, warmth = 10 }
            frame = { style = "thin", color = "#ffffff" }
        "##;
        let t: PhotoTemplate = toml::from_str(toml_src).unwrap();
        assert_eq!(t.effects.lighting, Lighting::Soft);
        assert_eq!(t.frame.style, FrameStyle::Thin);
        assert!(!t.isolate_subject);

        let catalog = Catalog::with_custom(&[t]).unwrap();
        assert!(catalog.get("forest").is_some());
    }

    #[test]
    fn custom_template_duplicate_id_rejected() {
        let mut t = builtin_templates().remove(0);
        t.name = "Copy".into();
        let err = Catalog::with_custom(&[t]).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn single_stop_gradient_rejected() {
        let mut t = builtin_templates().remove(1);
        t.background = Background::Gradient(vec![Color::WHITE]);
        assert!(t.validate().is_err());
    }

    #[test]
    fn effects_chain_order() {
        let effects = Effects {
            lighting: Lighting::Soft,
            contrast_boost: 10.0,
            warmth: 30.0,
        };
        let chain = effects.chain();
        assert_eq!(
            chain.steps(),
            &[
                Adjustment::Brightness(1.02),
                Adjustment::Contrast(1.1),
                Adjustment::Sepia(0.3),
                Adjustment::Blur(0.6),
            ]
        );
    }

    #[test]
    fn frame_border_widths() {
        assert_eq!(FrameStyle::Thin.border_width(), 2);
        assert_eq!(FrameStyle::Thick.border_width(), 8);
        assert_eq!(FrameStyle::Shadow.border_width(), 0);
    }
}
