//! Crop rendering: inverse-mapped, bilinear-sampled warp.
//!
//! Every output pixel is mapped back through [`CropTransform`] into the
//! source image and sampled bilinearly. Pixels that fall outside the drawn
//! source (zoomed out, or rotated off a non-square canvas) stay fully
//! transparent, like an untouched canvas.

use super::geometry::CropTransform;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Render `transform.source` of `source` into a `transform.output`-sized image.
pub fn render_crop(source: &RgbaImage, transform: &CropTransform) -> RgbaImage {
    let (out_w, out_h) = transform.output;
    let mut out = RgbaImage::new(out_w, out_h);
    let stride = out_w as usize * 4;
    if stride == 0 || source.width() == 0 || source.height() == 0 {
        return out;
    }

    let pixels: &mut [u8] = &mut out;
    pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(row, line)| {
            let py = row as f64 + 0.5;
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let Some((sx, sy)) = transform.map_to_source(col as f64 + 0.5, py) else {
                    continue;
                };
                px.copy_from_slice(&sample_bilinear(source, sx, sy).0);
            }
        });
    out
}

/// Bilinear sample at continuous coordinate `(x, y)`, where pixel centers
/// sit at `+0.5`. Coordinates are clamped to the image edge.
pub fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = image.width() as f64 - 1.0;
    let max_y = image.height() as f64 - 1.0;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
