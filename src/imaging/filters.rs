//! Pixel filters with CSS filter-function semantics.
//!
//! Color steps (brightness, contrast, saturate, sepia) are evaluated per
//! pixel in normalized `[0, 1]` space and clamped after every step, the way
//! a browser evaluates a `filter:` list. Consecutive color steps are fused
//! into a single row-parallel pass; a blur step flushes the pending color
//! steps and then runs a Gaussian blur over the whole buffer. Alpha is
//! never modified by color steps.

use super::params::{Adjustment, FilterChain};
use image::RgbaImage;
use rayon::prelude::*;

/// Luminance weights shared by the saturate and sepia matrices.
const LUMA_R: f32 = 0.213;
const LUMA_G: f32 = 0.715;
const LUMA_B: f32 = 0.072;

/// Run `chain` over a copy of `source`.
pub fn apply_chain(source: &RgbaImage, chain: &FilterChain) -> RgbaImage {
    let mut image = source.clone();
    let mut pending: Vec<Adjustment> = Vec::new();

    for step in chain.steps().iter().copied().filter(|s| !s.is_identity()) {
        match step {
            Adjustment::Blur(sigma) => {
                apply_color_steps(&mut image, &pending);
                pending.clear();
                image = image::imageops::blur(&image, sigma);
            }
            color => pending.push(color),
        }
    }
    apply_color_steps(&mut image, &pending);
    image
}

fn apply_color_steps(image: &mut RgbaImage, steps: &[Adjustment]) {
    let stride = image.width() as usize * 4;
    if steps.is_empty() || stride == 0 {
        return;
    }
    let pixels: &mut [u8] = &mut **image;
    pixels.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let mut rgb = [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ];
            for &step in steps {
                rgb = apply_color(step, rgb);
            }
            px[0] = to_u8(rgb[0]);
            px[1] = to_u8(rgb[1]);
            px[2] = to_u8(rgb[2]);
        }
    });
}

/// Apply one color step to a normalized RGB triple.
pub fn apply_color(step: Adjustment, [r, g, b]: [f32; 3]) -> [f32; 3] {
    let out = match step {
        Adjustment::Brightness(a) => [r * a, g * a, b * a],
        Adjustment::Contrast(a) => [
            (r - 0.5) * a + 0.5,
            (g - 0.5) * a + 0.5,
            (b - 0.5) * a + 0.5,
        ],
        Adjustment::Saturate(s) => [
            (LUMA_R + (1.0 - LUMA_R) * s) * r + (LUMA_G - LUMA_G * s) * g + (LUMA_B - LUMA_B * s) * b,
            (LUMA_R - LUMA_R * s) * r + (LUMA_G + (1.0 - LUMA_G) * s) * g + (LUMA_B - LUMA_B * s) * b,
            (LUMA_R - LUMA_R * s) * r + (LUMA_G - LUMA_G * s) * g + (LUMA_B + (1.0 - LUMA_B) * s) * b,
        ],
        Adjustment::Sepia(a) => {
            let inv = 1.0 - a.clamp(0.0, 1.0);
            [
                (0.393 + 0.607 * inv) * r + (0.769 - 0.769 * inv) * g + (0.189 - 0.189 * inv) * b,
                (0.349 - 0.349 * inv) * r + (0.686 + 0.314 * inv) * g + (0.168 - 0.168 * inv) * b,
                (0.272 - 0.272 * inv) * r + (0.534 - 0.534 * inv) * g + (0.131 + 0.869 * inv) * b,
            ]
        }
        Adjustment::Blur(_) => [r, g, b],
    };
    out.map(|v| v.clamp(0.0, 1.0))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
