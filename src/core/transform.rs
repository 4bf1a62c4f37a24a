//! Conversions between canvas pixels and geographic coordinates.
//!
//! Both directions use the larger of the east-west and north-south
//! resolutions as a single square-pixel size and anchor the window on the
//! region center, so the canvas never distorts the map when the two
//! resolutions differ slightly.

use crate::core::{
    geo::Point,
    region::{Projection, Region},
};
use geo::HaversineDistance;

/// Geographic origin (west, north) of the pixel window and the effective resolution
fn window_origin(region: &Region) -> (f64, f64, f64) {
    let res = region.resolution();
    let west = region.center_easting - (region.width as f64 / 2.0) * res;
    let north = region.center_northing + (region.height as f64 / 2.0) * res;
    (west, north, res)
}

/// Converts a pixel position to (easting, northing).
///
/// Returns `None` when the input is not a finite number.
pub fn pixel_to_geo(pixel: Point, region: &Region) -> Option<Point> {
    if !pixel.is_finite() {
        return None;
    }
    let (west, north, res) = window_origin(region);
    Some(Point::new(west + pixel.x * res, north - pixel.y * res))
}

/// Converts (easting, northing) to the nearest whole pixel.
///
/// Returns `None` when the input is not a finite number or the region has no
/// usable resolution.
pub fn geo_to_pixel(coords: Point, region: &Region) -> Option<Point> {
    if !coords.is_finite() {
        return None;
    }
    let (west, north, res) = window_origin(region);
    if res == 0.0 || !res.is_finite() {
        return None;
    }
    Some(Point::new(
        ((coords.x - west) / res).round(),
        ((north - coords.y) / res).round(),
    ))
}

/// Distance between two geographic points and their (dE, dN) delta.
///
/// Lat/long regions use the great-circle distance in metres; planar regions
/// use the Euclidean distance in map units.
pub fn distance(begin: Point, end: Point, projection: Projection) -> (f64, (f64, f64)) {
    let d_east = end.x - begin.x;
    let d_north = end.y - begin.y;

    let dist = match projection {
        Projection::LatLong => {
            geo::Point::new(begin.x, begin.y).haversine_distance(&geo::Point::new(end.x, end.y))
        }
        Projection::Planar => (d_east * d_east + d_north * d_north).sqrt(),
    };

    (dist, (d_east, d_north))
}
