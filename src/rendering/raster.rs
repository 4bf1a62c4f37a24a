//! Minimal CPU rasterizer for surface primitives.
//!
//! Every routine takes a clip rectangle in pixel space; pixels outside of it
//! or outside the target image are left untouched.

use crate::{
    core::{bounds::Bounds, geo::Point},
    rendering::pen::{Color, Pen},
};
use image::{Rgba, RgbaImage};

/// Integer clip rectangle, half-open on the max side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl ClipRect {
    /// Whole image, optionally restricted to `bounds`
    pub fn for_image(image: &RgbaImage, bounds: Option<&Bounds>) -> Self {
        let full = Self {
            x0: 0,
            y0: 0,
            x1: image.width() as i64,
            y1: image.height() as i64,
        };
        match bounds {
            Some(b) => Self {
                x0: full.x0.max(b.min.x.floor() as i64),
                y0: full.y0.max(b.min.y.floor() as i64),
                x1: full.x1.min(b.max.x.ceil() as i64 + 1),
                y1: full.y1.min(b.max.y.ceil() as i64 + 1),
            },
            None => full,
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Source-over blend of one pixel
pub fn blend_pixel(image: &mut RgbaImage, x: i64, y: i64, color: Color, clip: &ClipRect) {
    if color.a == 0 || !clip.contains(x, y) {
        return;
    }
    let dst = image.get_pixel_mut(x as u32, y as u32);
    *dst = blend(*dst, color);
}

fn blend(dst: Rgba<u8>, src: Color) -> Rgba<u8> {
    if src.a == 255 {
        return src.into();
    }
    let sa = src.a as f32 / 255.0;
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |s: u8, d: u8| {
        ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a).round() as u8
    };
    Rgba([
        channel(src.r, dst.0[0]),
        channel(src.g, dst.0[1]),
        channel(src.b, dst.0[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Fills the whole clip area with `color`, replacing what was there
pub fn clear(image: &mut RgbaImage, color: Color, clip: &ClipRect) {
    for y in clip.y0..clip.y1 {
        for x in clip.x0..clip.x1 {
            image.put_pixel(x as u32, y as u32, color.into());
        }
    }
}

pub fn fill_rect(image: &mut RgbaImage, bounds: &Bounds, color: Color, clip: &ClipRect) {
    let x0 = bounds.min.x.round() as i64;
    let y0 = bounds.min.y.round() as i64;
    let x1 = bounds.max.x.round() as i64;
    let y1 = bounds.max.y.round() as i64;
    for y in y0.max(clip.y0)..=y1.min(clip.y1 - 1) {
        for x in x0.max(clip.x0)..=x1.min(clip.x1 - 1) {
            blend_pixel(image, x, y, color, clip);
        }
    }
}

/// Stamps a square pen tip centered on (x, y)
fn stamp(image: &mut RgbaImage, x: i64, y: i64, pen: &Pen, clip: &ClipRect) {
    let size = pen.width.max(1.0).round() as i64;
    let start = -(size - 1) / 2;
    for dy in start..start + size {
        for dx in start..start + size {
            blend_pixel(image, x + dx, y + dy, pen.color, clip);
        }
    }
}

/// Clips the segment a-b to `[x0, x1] x [y0, y1]` (Liang-Barsky).
///
/// Returns `None` when no part of the segment lies inside.
fn clip_segment(a: Point, b: Point, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<(Point, Point)> {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return None;
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if !(dx.is_finite() && dy.is_finite()) {
        return None;
    }
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.x - x0), (dx, x1 - a.x), (-dy, a.y - y0), (dy, y1 - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| Point::new(a.x + t * dx, a.y + t * dy);
    Some((at(t0), at(t1)))
}

/// Bresenham line between two points.
///
/// The segment is first clipped to `clip` grown by the pen size, so only
/// the visible part is stepped through.
pub fn stroke_line(image: &mut RgbaImage, a: Point, b: Point, pen: &Pen, clip: &ClipRect) {
    if clip.is_empty() {
        return;
    }
    let reach = pen.width.max(1.0).round() + 1.0;
    let Some((a, b)) = clip_segment(
        a,
        b,
        clip.x0 as f64 - reach,
        clip.y0 as f64 - reach,
        clip.x1 as f64 + reach,
        clip.y1 as f64 + reach,
    ) else {
        return;
    };

    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(image, x0, y0, pen, clip);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Connected path through `points` (N-1 segments)
pub fn stroke_polyline(image: &mut RgbaImage, points: &[Point], pen: &Pen, clip: &ClipRect) {
    for pair in points.windows(2) {
        stroke_line(image, pair[0], pair[1], pen, clip);
    }
}

pub fn stroke_rect(image: &mut RgbaImage, bounds: &Bounds, pen: &Pen, clip: &ClipRect) {
    let ring = [
        bounds.min,
        Point::new(bounds.max.x, bounds.min.y),
        bounds.max,
        Point::new(bounds.min.x, bounds.max.y),
        bounds.min,
    ];
    stroke_polyline(image, &ring, pen, clip);
}

/// Even-odd scanline fill of a closed polygon
pub fn fill_polygon(image: &mut RgbaImage, points: &[Point], color: Color, clip: &ClipRect) {
    let Some(bounds) = Bounds::from_points(points) else {
        return;
    };
    if points.len() < 3 || color.is_transparent() {
        return;
    }
    let y_start = (bounds.min.y.floor() as i64).max(clip.y0);
    let y_end = (bounds.max.y.ceil() as i64).min(clip.y1 - 1);

    let mut crossings = Vec::with_capacity(points.len());
    for y in y_start..=y_end {
        let scan = y as f64 + 0.5;
        crossings.clear();
        let mut j = points.len() - 1;
        for i in 0..points.len() {
            let (pi, pj) = (points[i], points[j]);
            if (pi.y > scan) != (pj.y > scan) {
                crossings.push(pi.x + (scan - pi.y) * (pj.x - pi.x) / (pj.y - pi.y));
            }
            j = i;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let x_start = (span[0].round() as i64).max(clip.x0);
            let x_end = (span[1].round() as i64).min(clip.x1);
            for x in x_start..x_end {
                blend_pixel(image, x, y, color, clip);
            }
        }
    }
}

/// Circle outline and optional fill
pub fn draw_circle(
    image: &mut RgbaImage,
    center: Point,
    radius: f64,
    pen: &Pen,
    fill: Option<Color>,
    clip: &ClipRect,
) {
    let half = pen.width.max(1.0) / 2.0;
    let reach = radius + half;
    let x0 = ((center.x - reach).floor() as i64).max(clip.x0);
    let x1 = ((center.x + reach).ceil() as i64).min(clip.x1 - 1);
    let y0 = ((center.y - reach).floor() as i64).max(clip.y0);
    let y1 = ((center.y + reach).ceil() as i64).min(clip.y1 - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = Point::new(x as f64, y as f64).distance_to(&center);
            if (d - radius).abs() <= half {
                blend_pixel(image, x, y, pen.color, clip);
            } else if d < radius {
                if let Some(color) = fill {
                    blend_pixel(image, x, y, color, clip);
                }
            }
        }
    }
}

/// Copies `src` onto `dst` with its top-left corner at (x, y).
///
/// With `transparent` the source is alpha blended, otherwise copied verbatim.
pub fn blit(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    x: i64,
    y: i64,
    transparent: bool,
    clip: &ClipRect,
) {
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let (dx, dy) = (x + sx as i64, y + sy as i64);
        if !clip.contains(dx, dy) {
            continue;
        }
        if transparent {
            blend_pixel(dst, dx, dy, Color::from(*pixel), clip);
        } else {
            dst.put_pixel(dx as u32, dy as u32, *pixel);
        }
    }
}
