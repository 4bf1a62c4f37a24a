//! Text decorations and their on-screen extents.

use crate::{
    core::{bounds::Bounds, geo::Point},
    rendering::pen::Color,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A text label placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInfo {
    pub text: String,
    /// Top-left corner of the unrotated text, in pixels
    pub coords: Point,
    pub color: Color,
    pub background: Option<Color>,
    /// Counter-clockwise rotation in degrees
    pub rotation: f64,
    pub active: bool,
    pub font_size: f64,
}

impl TextInfo {
    pub fn new(text: impl Into<String>, coords: Point) -> Self {
        Self {
            text: text.into(),
            coords,
            color: Color::BLACK,
            background: None,
            rotation: 0.0,
            active: true,
            font_size: 12.0,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }
}

/// Measures rendered text. Plug in a real font backend to get exact extents.
pub trait TextMetrics: Send + Sync + fmt::Debug {
    /// Width and height of `text` at `font_size`, in pixels
    fn extent(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Fixed-advance approximation: every glyph is `advance * font_size` wide.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    pub advance: f64,
    pub line_height: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.0,
        }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn extent(&self, text: &str, font_size: f64) -> (f64, f64) {
        let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let lines = text.lines().count().max(1);
        (
            widest as f64 * self.advance * font_size,
            lines as f64 * self.line_height * font_size,
        )
    }
}

/// Placement of a text item once measured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub coords: Point,
    /// Hit-test rectangle, grown to contain the rotated text
    pub bbox: Bounds,
    /// Offset of `coords` inside `bbox` before inflation
    pub relative: Point,
    pub width: f64,
    pub height: f64,
}

/// Computes the bounding box of a possibly rotated text item.
///
/// Rotated boxes are sized `|sin r|*w + h` by `|cos r|*w + h`, shifted
/// according to the quadrant of the rotation and then inflated by the text
/// height on every side so drag handles stay generous.
pub fn text_bounds(info: &TextInfo, metrics: &dyn TextMetrics) -> TextPlacement {
    let (w, h) = metrics.extent(&info.text, info.font_size);
    let coords = info.coords;
    let rotation = info.rotation.rem_euclid(360.0);

    if rotation == 0.0 {
        return TextPlacement {
            coords,
            bbox: Bounds::from_origin_and_size(coords.x, coords.y, w, h),
            relative: Point::default(),
            width: w,
            height: h,
        };
    }

    let radians = rotation.to_radians();
    let box_h = (radians.sin() * w).abs() + h;
    let box_w = (radians.cos() * w).abs() + h;
    let (mut x, mut y) = (coords.x, coords.y);
    let mut relative = Point::default();

    if rotation > 0.0 && rotation < 90.0 {
        y -= box_h;
        relative = Point::new(0.0, box_h);
    } else if (90.0..180.0).contains(&rotation) {
        x -= box_w;
        y -= box_h;
        relative = Point::new(box_w, box_h);
    } else if (180.0..270.0).contains(&rotation) {
        x -= box_w;
        relative = Point::new(box_w, 0.0);
    }

    TextPlacement {
        coords,
        bbox: Bounds::from_origin_and_size(x, y, box_w, box_h).inflated(h, h),
        relative,
        width: w,
        height: h,
    }
}

/// Corners of the rotated text rectangle: top-left, top-right, bottom-right, bottom-left
pub fn text_quad(origin: Point, width: f64, height: f64, rotation: f64) -> [Point; 4] {
    let r = rotation.to_radians();
    let along = Point::new(r.cos() * width, -r.sin() * width);
    let down = Point::new(r.sin() * height, r.cos() * height);
    [
        origin,
        origin.add(&along),
        origin.add(&along).add(&down),
        origin.add(&down),
    ]
}
