// Turns the trail ring into a transparent RGBA image, software-drawn.
// Visual outcomes:
// 1) Everything that is not a trail dot is fully see-through.
// 2) Each dot fades with age: newest is strongest, the tail disappears.
// 3) Dots sampled while a button was held are red, the rest are blue.

use crate::config;
use crate::trail::TrailBuffer;
use crate::types::{Rgb, Sample};
use image::{Rgba, RgbaImage};

/// Look of the trail. `Default` is the built-in constant set.
#[derive(Clone, Copy, Debug)]
pub struct TrailStyle {
    pub radius: f32,
    pub trail_color: Rgb,
    pub click_color: Rgb,
    pub trail_opacity: f32,
    pub click_opacity: f32,
    pub min_visible_alpha: f32,
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self {
            radius: config::TRAIL_RADIUS,
            trail_color: config::TRAIL_COLOR,
            click_color: config::CLICK_COLOR,
            trail_opacity: config::TRAIL_OPACITY,
            click_opacity: config::CLICK_OPACITY,
            min_visible_alpha: config::MIN_VISIBLE_ALPHA,
        }
    }
}

impl TrailStyle {
    /// Linear age falloff, `None` once the dot would be imperceptible.
    pub fn age_alpha(&self, age: usize, capacity: usize) -> Option<f32> {
        let alpha = 1.0 - age as f32 / capacity as f32;
        (alpha >= self.min_visible_alpha).then_some(alpha)
    }

    /// Color and final opacity for one sample, or `None` if it is not drawn.
    pub fn paint_for(&self, sample: &Sample, age: usize, capacity: usize) -> Option<(Rgb, f32)> {
        if !sample.valid {
            return None;
        }
        let alpha = self.age_alpha(age, capacity)?;
        Some(if sample.clicked {
            (self.click_color, alpha * self.click_opacity)
        } else {
            (self.trail_color, alpha * self.trail_opacity)
        })
    }
}

pub struct TrailRenderer {
    style: TrailStyle,
}

impl TrailRenderer {
    pub fn new(style: TrailStyle) -> Self {
        Self { style }
    }

    /// Redraw the whole canvas from the trail. Same trail in, same pixels out.
    pub fn render(&self, trail: &TrailBuffer, canvas: &mut RgbaImage) {
        clear_transparent(canvas);

        let capacity = trail.capacity();
        for (age, sample) in trail.iter_by_age() {
            if let Some((color, opacity)) = self.style.paint_for(&sample, age, capacity) {
                fill_disc(canvas, sample.x as f32, sample.y as f32, self.style.radius, color, opacity);
            }
        }
    }
}

/// Replace (not blend) every pixel with transparent black.
pub fn clear_transparent(canvas: &mut RgbaImage) {
    for p in canvas.pixels_mut() {
        *p = Rgba([0, 0, 0, 0]);
    }
}

/// Source-over one straight-alpha color onto a straight-alpha pixel.
#[inline]
fn blend_over(dst: &mut Rgba<u8>, src: [u8; 3], src_a: f32) {
    if src_a <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let keep = da * (1.0 - src_a); // how much of the old pixel shows through
    let out_a = src_a + keep;

    let mix = |s: u8, d: u8| ((s as f32 * src_a + d as f32 * keep) / out_a).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

/// Filled, anti-aliased circle centered at (cx,cy); clipped to the canvas.
/// Visual: a round dot with a one-pixel soft rim.
pub fn fill_disc(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgb, opacity: f32) {
    if radius <= 0.0 || opacity <= 0.0 {
        return;
    }
    let (w, h) = canvas.dimensions();
    let rgb = color.to_u8();

    // Scan just the bounding box, clipped to the image
    let x0 = (cx - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (cy - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((cx + radius + 1.0).ceil().max(0.0) as u32).min(w);
    let y1 = ((cy + radius + 1.0).ceil().max(0.0) as u32).min(h);

    for y in y0..y1 {
        for x in x0..x1 {
            // Pixel centers sit at +0.5
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let coverage = (radius + 0.5 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_over(canvas.get_pixel_mut(x, y), rgb, opacity * coverage);
            }
        }
    }
}

/// Pack the composite as premultiplied 0xAARRGGBB for the overlay window.
/// `out` is reused between frames to avoid reallocating.
pub fn pack_premultiplied_argb(canvas: &RgbaImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(canvas.pixels().map(|p| {
        let a = p[3] as u32;
        let pm = |c: u8| (c as u32 * a + 127) / 255;
        (a << 24) | (pm(p[0]) << 16) | (pm(p[1]) << 8) | pm(p[2])
    }));
}
