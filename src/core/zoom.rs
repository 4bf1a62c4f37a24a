//! Zoom and pan arithmetic on pixel boxes.

use crate::core::{
    constants::ZOOM_BOX_THRESHOLD,
    geo::{Extent, Point},
    region::Region,
    transform::pixel_to_geo,
};
use serde::{Deserialize, Serialize};

/// What a finished box gesture does to the map window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomDirection {
    In,
    Out,
    Pan,
}

impl ZoomDirection {
    /// Maps the classic signed zoom type (1 in, -1 out, 0 pan)
    pub fn from_sign(zoom_type: i32) -> Self {
        match zoom_type.signum() {
            1 => Self::In,
            -1 => Self::Out,
            _ => Self::Pan,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
            Self::Pan => Self::Pan,
        }
    }
}

/// Computes the new extent for a zoom box or pan gesture from `begin` to `end`.
///
/// The pixel size of the window is read once from `region` and used for the
/// whole computation. Returns `None` when the gesture does not change the
/// window (a zoom box not larger than the threshold in both directions).
pub fn compute_zoom(
    begin: Point,
    end: Point,
    direction: ZoomDirection,
    region: &Region,
) -> Option<Extent> {
    let width = region.width as f64;
    let height = region.height as f64;
    let (mut x1, mut y1) = (begin.x, begin.y);
    let (mut x2, mut y2) = (end.x, end.y);

    let (nw, se) = match direction {
        ZoomDirection::Pan => {
            let mut dx = x1 - x2;
            let mut dy = y1 - y2;
            if dx == 0.0 && dy == 0.0 {
                dx = x1 - width / 2.0;
                dy = y1 - height / 2.0;
            }
            (Point::new(dx, dy), Point::new(width + dx, height + dy))
        }
        _ if (x2 - x1).abs() <= ZOOM_BOX_THRESHOLD || (y2 - y1).abs() <= ZOOM_BOX_THRESHOLD => {
            return None;
        }
        ZoomDirection::In | ZoomDirection::Out => {
            if x1 > x2 {
                std::mem::swap(&mut x1, &mut x2);
            }
            if y1 > y2 {
                std::mem::swap(&mut y1, &mut y2);
            }
            if direction == ZoomDirection::In {
                (Point::new(x1, y1), Point::new(x2, y2))
            } else {
                (
                    Point::new(-x1 * 2.0, -y1 * 2.0),
                    Point::new(width + 2.0 * (width - x2), height + 2.0 * (height - y2)),
                )
            }
        }
    };

    let top_left = pixel_to_geo(nw, region)?;
    let bottom_right = pixel_to_geo(se, region)?;
    Some(Extent::new(top_left.y, bottom_right.y, bottom_right.x, top_left.x))
}

/// Box for zooming by a single click or wheel step: a quarter window around
/// the cursor when zooming in, a box recentering on the cursor when zooming out
pub fn zoom_to_point_and_recenter(
    position: Point,
    direction: ZoomDirection,
    width: f64,
    height: f64,
) -> (Point, Point) {
    if direction == ZoomDirection::In {
        (
            Point::new(position.x - width / 4.0, position.y - height / 4.0),
            Point::new(position.x + width / 4.0, position.y + height / 4.0),
        )
    } else {
        let begin = Point::new((width - position.x) / 2.0, (height - position.y) / 2.0);
        (
            begin,
            Point::new(begin.x + width / 2.0, begin.y + height / 2.0),
        )
    }
}

/// Box for zooming while keeping the geographic point under the cursor fixed
pub fn zoom_to_cursor(position: Point, width: f64, height: f64) -> (Point, Point) {
    (
        Point::new(position.x / 2.0, position.y / 2.0),
        Point::new(
            (width - position.x) / 2.0 + position.x,
            (height - position.y) / 2.0 + position.y,
        ),
    )
}
