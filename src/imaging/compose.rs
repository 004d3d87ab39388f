//! Template compositing: background fill, subject draw, frame decoration.
//!
//! Draw order is fixed:
//!
//! 1. Background (solid fill or diagonal gradient)
//! 2. Drop shadow behind the subject (shadow frames only)
//! 3. Subject, resized into its placement, with the template effects
//!    applied to the subject pixels only
//! 4. Border around the subject (thin/thick frames), drawn unfiltered

use super::filters::apply_chain;
use super::params::{CompositeParams, SubjectPlacement};
use super::segment::{apply_mask, subject_mask};
use crate::template::{Background, FrameStyle};
use crate::types::Color;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

const SHADOW_OFFSET: i64 = 6;
const SHADOW_BLUR: f32 = 10.0;
const SHADOW_ALPHA: u8 = 90;

/// Paint the full composite for `subject`.
pub fn composite(subject: &RgbaImage, params: &CompositeParams) -> RgbaImage {
    let (w, h) = params.canvas;
    let mut canvas = fill_background(w, h, &params.background);
    let place = params.subject;

    if params.frame.style == FrameStyle::Shadow {
        draw_shadow(&mut canvas, place);
    }

    let mut drawn = imageops::resize(subject, place.width, place.height, FilterType::Lanczos3);
    drawn = apply_chain(&drawn, &params.effects);
    if params.isolate_subject {
        let mask = subject_mask(&drawn);
        apply_mask(&mut drawn, &mask);
    }
    imageops::overlay(&mut canvas, &drawn, place.x as i64, place.y as i64);

    let border = params.frame.style.border_width();
    if border > 0 {
        draw_border(&mut canvas, place, border, params.frame.color);
    }
    canvas
}

/// Fill a `w`×`h` canvas with `background`.
///
/// Gradients run from the top-left corner to the bottom-right corner with
/// evenly spaced stops; each pixel is projected onto that diagonal.
pub fn fill_background(w: u32, h: u32, background: &Background) -> RgbaImage {
    match background {
        Background::Solid(color) => RgbaImage::from_pixel(w, h, Rgba(color.to_rgba(255))),
        Background::Gradient(stops) => {
            let mut canvas = RgbaImage::new(w, h);
            let stride = w as usize * 4;
            if stride == 0 {
                return canvas;
            }
            let (fw, fh) = (w as f64, h as f64);
            let len_sq = fw * fw + fh * fh;
            let pixels: &mut [u8] = &mut canvas;
            pixels.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
                let py = y as f64 + 0.5;
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let t = ((x as f64 + 0.5) * fw + py * fh) / len_sq;
                    px.copy_from_slice(&gradient_at(stops, t).to_rgba(255));
                }
            });
            canvas
        }
    }
}

/// Color at position `t ∈ [0, 1]` along evenly spaced `stops`.
pub fn gradient_at(stops: &[Color], t: f64) -> Color {
    match stops {
        [] => Color::WHITE,
        [only] => *only,
        _ => {
            let segments = (stops.len() - 1) as f64;
            let pos = t.clamp(0.0, 1.0) * segments;
            let i = (pos.floor() as usize).min(stops.len() - 2);
            stops[i].lerp(stops[i + 1], pos - i as f64)
        }
    }
}

fn draw_shadow(canvas: &mut RgbaImage, place: SubjectPlacement) {
    let mut layer = RgbaImage::new(canvas.width(), canvas.height());
    fill_rect(
        &mut layer,
        place.x as i64,
        place.y as i64 + SHADOW_OFFSET,
        place.width as i64,
        place.height as i64,
        Rgba([0, 0, 0, SHADOW_ALPHA]),
    );
    let layer = imageops::blur(&layer, SHADOW_BLUR);
    imageops::overlay(canvas, &layer, 0, 0);
}

/// Stroke a `width`-pixel border just outside the subject rectangle.
fn draw_border(canvas: &mut RgbaImage, place: SubjectPlacement, width: u32, color: Color) {
    let rgba = Rgba(color.to_rgba(255));
    let (x, y) = (place.x as i64, place.y as i64);
    let (w, h) = (place.width as i64, place.height as i64);
    let b = width as i64;

    fill_rect(canvas, x - b, y - b, w + 2 * b, b, rgba);
    fill_rect(canvas, x - b, y + h, w + 2 * b, b, rgba);
    fill_rect(canvas, x - b, y, b, h, rgba);
    fill_rect(canvas, x + w, y, b, h, rgba);
}

/// Fill a rectangle, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(canvas.width() as i64);
    let y1 = (y + h).min(canvas.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px as u32, py as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::FilterChain;
    use crate::template::Frame;

    fn params(background: Background, frame: FrameStyle) -> CompositeParams {
        CompositeParams {
            canvas: (120, 160),
            background,
            subject: SubjectPlacement {
                x: 20,
                y: 30,
                width: 80,
                height: 100,
            },
            effects: FilterChain::new(),
            frame: Frame {
                style: frame,
                color: Color::rgb(255, 0, 0),
            },
            isolate_subject: false,
        }
    }

    fn green_subject() -> RgbaImage {
        RgbaImage::from_pixel(40, 50, Rgba([0, 200, 0, 255]))
    }

    #[test]
    fn gradient_endpoints_and_middle() {
        let stops = [Color::BLACK, Color::rgb(200, 200, 200)];
        assert_eq!(gradient_at(&stops, 0.0), Color::BLACK);
        assert_eq!(gradient_at(&stops, 1.0), Color::rgb(200, 200, 200));
        assert_eq!(gradient_at(&stops, 0.5), Color::rgb(100, 100, 100));
    }

    #[test]
    fn three_stop_gradient_hits_middle_stop() {
        let mid = Color::rgb(10, 20, 30);
        let stops = [Color::BLACK, mid, Color::WHITE];
        assert_eq!(gradient_at(&stops, 0.5), mid);
    }

    #[test]
    fn gradient_runs_along_diagonal() {
        let bg = fill_background(
            100,
            100,
            &Background::Gradient(vec![Color::BLACK, Color::WHITE]),
        );
        let top_left = bg.get_pixel(0, 0)[0];
        let bottom_right = bg.get_pixel(99, 99)[0];
        // Pixels on the same anti-diagonal share a color
        assert_eq!(bg.get_pixel(99, 0), bg.get_pixel(0, 99));
        assert!(top_left < 5 && bottom_right > 250);
    }

    #[test]
    fn subject_lands_in_placement_over_solid_background() {
        let out = composite(
            &green_subject(),
            &params(Background::Solid(Color::WHITE), FrameStyle::None),
        );
        assert_eq!(out.dimensions(), (120, 160));
        assert_eq!(out.get_pixel(60, 80), &Rgba([0, 200, 0, 255]));
        assert_eq!(out.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn effects_touch_subject_not_background() {
        let mut p = params(Background::Solid(Color::rgb(100, 100, 100)), FrameStyle::None);
        p.effects = FilterChain::new().then(crate::imaging::Adjustment::Brightness(0.5));
        let out = composite(&green_subject(), &p);
        assert_eq!(out.get_pixel(60, 80), &Rgba([0, 100, 0, 255]));
        assert_eq!(out.get_pixel(2, 2), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn thin_border_sits_outside_subject() {
        let out = composite(
            &green_subject(),
            &params(Background::Solid(Color::WHITE), FrameStyle::Thin),
        );
        let red = Rgba([255, 0, 0, 255]);
        assert_eq!(out.get_pixel(18, 60), &red);
        assert_eq!(out.get_pixel(19, 60), &red);
        assert_eq!(out.get_pixel(17, 60), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(20, 60), &Rgba([0, 200, 0, 255]));
    }

    #[test]
    fn thick_border_is_eight_pixels() {
        let out = composite(
            &green_subject(),
            &params(Background::Solid(Color::WHITE), FrameStyle::Thick),
        );
        assert_eq!(out.get_pixel(12, 60)[0], 255);
        assert_eq!(out.get_pixel(12, 60)[1], 0);
        assert_eq!(out.get_pixel(11, 60), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn shadow_darkens_below_subject() {
        let out = composite(
            &green_subject(),
            &params(Background::Solid(Color::WHITE), FrameStyle::Shadow),
        );
        let below = out.get_pixel(60, 133);
        assert!(below[0] < 255, "expected shadow under subject, got {below:?}");
        assert_eq!(out.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn composite_is_deterministic() {
        let mut p = params(
            Background::Gradient(vec![Color::BLACK, Color::WHITE]),
            FrameStyle::Shadow,
        );
        p.isolate_subject = true;
        assert_eq!(
            composite(&green_subject(), &p),
            composite(&green_subject(), &p)
        );
    }
}
