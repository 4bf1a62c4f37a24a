//! Geographic window shown by the canvas.

use crate::core::geo::{Extent, Point};
use serde::{Deserialize, Serialize};

/// Kind of coordinate system the region is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Projection {
    /// Projected, planar coordinates (metres, feet, ...)
    #[default]
    Planar,
    /// Geographic latitude/longitude in degrees
    LatLong,
}

/// Geographic bounds, resolution, center and pixel size of a map window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub ewres: f64,
    pub nsres: f64,
    pub center_easting: f64,
    pub center_northing: f64,
    /// Width of the window in pixels
    pub width: u32,
    /// Height of the window in pixels
    pub height: u32,
    pub projection: Projection,
}

impl Region {
    /// Creates a region covering `extent` on a `width` x `height` pixel window
    pub fn new(extent: Extent, width: u32, height: u32) -> Self {
        let mut region = Self {
            north: extent.n,
            south: extent.s,
            east: extent.e,
            west: extent.w,
            ewres: 0.0,
            nsres: 0.0,
            center_easting: 0.0,
            center_northing: 0.0,
            width,
            height,
            projection: Projection::Planar,
        };
        region.update_derived();
        region
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.north, self.south, self.east, self.west)
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_easting, self.center_northing)
    }

    /// Replaces the bounds and recomputes center and resolution
    pub fn set_extent(&mut self, extent: Extent) {
        self.north = extent.n;
        self.south = extent.s;
        self.east = extent.e;
        self.west = extent.w;
        self.update_derived();
    }

    /// Changes the pixel size and recomputes resolution for the current bounds
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.update_derived();
    }

    /// Recomputes center and resolution from bounds and pixel size
    pub fn update_derived(&mut self) {
        self.center_easting = self.west + (self.east - self.west) / 2.0;
        self.center_northing = self.south + (self.north - self.south) / 2.0;
        self.ewres = (self.east - self.west) / self.width.max(1) as f64;
        self.nsres = (self.north - self.south) / self.height.max(1) as f64;
    }

    /// Larger of the two resolutions, used as the square-pixel size
    pub fn resolution(&self) -> f64 {
        if self.ewres > self.nsres {
            self.ewres
        } else {
            self.nsres
        }
    }

    /// Clamps north/south to the valid latitude range for lat/long regions
    pub fn clamp_latitude(&mut self) {
        if self.projection == Projection::LatLong {
            self.north = self.north.min(90.0);
            self.south = self.south.max(-90.0);
        }
    }

    /// Grows the shorter side of the bounds so their aspect ratio matches the
    /// pixel window, keeping the center fixed
    pub fn align_to_display(&mut self) {
        let res = self.resolution();
        let half_w = res * self.width.max(1) as f64 / 2.0;
        let half_h = res * self.height.max(1) as f64 / 2.0;
        self.west = self.center_easting - half_w;
        self.east = self.center_easting + half_w;
        self.south = self.center_northing - half_h;
        self.north = self.center_northing + half_h;
        self.ewres = res;
        self.nsres = res;
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(Extent::new(1.0, 0.0, 1.0, 0.0), 1, 1)
    }
}
