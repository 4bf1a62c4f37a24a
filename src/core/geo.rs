use serde::{Deserialize, Serialize};

/// Represents a point in screen pixels or in projected (east, north) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn round(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

/// Geographic extent of a map window, in map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub n: f64,
    pub s: f64,
    pub e: f64,
    pub w: f64,
}

impl Extent {
    pub fn new(n: f64, s: f64, e: f64, w: f64) -> Self {
        Self { n, s, e, w }
    }

    /// Builds an extent from two opposite corners given in any order
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            n: a.y.max(b.y),
            s: a.y.min(b.y),
            e: a.x.max(b.x),
            w: a.x.min(b.x),
        }
    }

    pub fn width(&self) -> f64 {
        self.e - self.w
    }

    pub fn height(&self) -> f64 {
        self.n - self.s
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.w + (self.e - self.w) / 2.0,
            self.s + (self.n - self.s) / 2.0,
        )
    }

    /// Checks if this extent lies completely inside `other`
    pub fn is_inside(&self, other: &Extent) -> bool {
        self.n <= other.n && self.s >= other.s && self.e <= other.e && self.w >= other.w
    }

    /// Closed ring of corner coordinates (NW, NE, SE, SW, NW)
    pub fn ring(&self) -> [Point; 5] {
        [
            Point::new(self.w, self.n),
            Point::new(self.e, self.n),
            Point::new(self.e, self.s),
            Point::new(self.w, self.s),
            Point::new(self.w, self.n),
        ]
    }

    pub fn approx_eq(&self, other: &Extent, epsilon: f64) -> bool {
        (self.n - other.n).abs() <= epsilon
            && (self.s - other.s).abs() <= epsilon
            && (self.e - other.e).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_math() {
        let a = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&Point::default()), 5.0);
        assert_eq!(a.subtract(&Point::new(1.0, 1.0)), Point::new(2.0, 3.0));
        assert!(!Point::new(f64::NAN, 0.0).is_finite());
    }

    #[test]
    fn test_extent_from_corners() {
        let extent = Extent::from_corners(Point::new(10.0, 0.0), Point::new(0.0, 20.0));
        assert_eq!(extent, Extent::new(20.0, 0.0, 10.0, 0.0));
        assert_eq!(extent.center(), Point::new(5.0, 10.0));
    }

    #[test]
    fn test_extent_inside() {
        let outer = Extent::new(100.0, 0.0, 100.0, 0.0);
        let inner = Extent::new(75.0, 25.0, 75.0, 25.0);
        assert!(inner.is_inside(&outer));
        assert!(!outer.is_inside(&inner));
    }
}
