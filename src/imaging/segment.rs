//! Heuristic subject isolation.
//!
//! This is a placeholder, not segmentation: each pixel's alpha is a smooth
//! threshold over a weighted mix of its distance from the image center and
//! its Sobel edge strength. Portraits cropped around a face keep the head
//! and shoulders; flat backgrounds near the corners fade out. Results are
//! deterministic for identical input.

use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

const CENTER_WEIGHT: f32 = 0.7;
const EDGE_WEIGHT: f32 = 0.3;
/// Scores below this are fully transparent.
const LOW: f32 = 0.3;
/// Scores above this are fully opaque.
const HIGH: f32 = 0.5;

/// Compute the subject mask (255 = keep) for `image`.
pub fn subject_mask(image: &RgbaImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut mask = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return mask;
    }

    let luma = image::imageops::grayscale(image);
    let edges = sobel_magnitude(&luma);
    let max_edge = edges.iter().copied().fold(0.0f32, f32::max);

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let max_dist = cx.hypot(cy);

    let stride = w as usize;
    let pixels: &mut [u8] = &mut mask;
    pixels.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for (x, m) in row.iter_mut().enumerate() {
            let dist = (x as f32 + 0.5 - cx).hypot(y as f32 + 0.5 - cy);
            let center = 1.0 - dist / max_dist;
            let edge = if max_edge > 0.0 {
                edges[y * stride + x] / max_edge
            } else {
                0.0
            };
            let score = CENTER_WEIGHT * center + EDGE_WEIGHT * edge;
            *m = (smoothstep(LOW, HIGH, score) * 255.0).round() as u8;
        }
    });
    mask
}

/// Multiply `image`'s alpha by `mask`.
pub fn apply_mask(image: &mut RgbaImage, mask: &GrayImage) {
    for (px, Luma([m])) in image.pixels_mut().zip(mask.pixels()) {
        px[3] = ((px[3] as u16 * *m as u16 + 127) / 255) as u8;
    }
}

/// Sobel gradient magnitude, row-major. Border pixels use clamped neighbours.
fn sobel_magnitude(luma: &GrayImage) -> Vec<f32> {
    let (w, h) = luma.dimensions();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, w as i64 - 1) as u32;
        let cy = y.clamp(0, h as i64 - 1) as u32;
        luma.get_pixel(cx, cy)[0] as f32
    };

    (0..h as i64)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..w as i64).map(move |x| {
                let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2.0 * at(x - 1, y)
                    - at(x - 1, y + 1);
                let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2.0 * at(x, y - 1)
                    - at(x + 1, y - 1);
                gx.hypot(gy)
            })
        })
        .collect()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn flat_image_keeps_center_drops_corners() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([90, 120, 150, 255]));
        let mask = subject_mask(&img);
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn edges_raise_the_score() {
        // Hard vertical edge two thirds of the way across
        let img = RgbaImage::from_fn(90, 90, |x, _| {
            if x < 60 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let flat = RgbaImage::from_pixel(90, 90, Rgba([0, 0, 0, 255]));
        let with_edge = subject_mask(&img).get_pixel(60, 20)[0];
        let without = subject_mask(&flat).get_pixel(60, 20)[0];
        assert!(with_edge > without);
    }

    #[test]
    fn mask_is_deterministic() {
        let img = RgbaImage::from_fn(64, 48, |x, y| Rgba([(x * 3) as u8, (y * 5) as u8, 77, 255]));
        assert_eq!(subject_mask(&img), subject_mask(&img));
    }

    #[test]
    fn apply_mask_scales_alpha() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([10, 10, 10, 255]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([0]));
        mask.put_pixel(1, 0, Luma([128]));
        apply_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 0)[3], 128);
        assert_eq!(img.get_pixel(1, 0)[0], 10);
    }
}
