//! Zoom, pan, history and region commands.

use super::{Damage, MapCanvas};
use crate::{
    core::{
        geo::{Extent, Point},
        transform,
        zoom::{self, ZoomDirection},
    },
    input::events::CanvasEvent,
    Result,
};

impl MapCanvas {
    /// Seeds the zoom history with the current display extent. Emits nothing.
    pub fn init_zoom_history(&mut self) {
        let extent = self.renderer.region().extent();
        self.history.init(extent);
    }

    pub fn reset_zoom_history(&mut self) {
        self.history.reset();
    }

    pub fn zoom_history(&self) -> &crate::core::history::ZoomHistory {
        &self.history
    }

    /// Computes and applies the window for a box or pan gesture.
    ///
    /// `zoom_type` is 1 to zoom in, -1 to zoom out and 0 to pan. The region is
    /// read once, so the canvas size cannot change halfway through. Returns
    /// false when the gesture was too small to change anything; the base
    /// layers are marked for a full redraw either way.
    pub fn zoom(&mut self, begin: Point, end: Point, zoom_type: i32) -> bool {
        let region = *self.renderer.region();
        let direction = ZoomDirection::from_sign(zoom_type);
        let changed = match zoom::compute_zoom(begin, end, direction, &region) {
            Some(extent) => {
                log::debug!("MapCanvas::zoom(): {:?} {:?} -> {:?}", begin, end, extent);
                self.apply_extent(extent, self.properties.align_extent);
                true
            }
            None => false,
        };
        self.redraw_all = true;
        changed
    }

    /// Installs `extent` as the display window and records it in the history
    pub(crate) fn apply_extent(&mut self, extent: Extent, align: bool) {
        let region = self.renderer.region_mut();
        region.set_extent(extent);
        region.clamp_latitude();
        region.update_derived();
        if align {
            self.renderer.align_extent_from_display();
        }

        let extent = self.renderer.region().extent();
        self.push_history(extent);
        self.redraw_all = true;
        self.damage = Damage::Full;
    }

    /// Records an extent and announces the new history state and extent.
    ///
    /// Returns the evicted oldest entry, if the history was full.
    pub fn push_history(&mut self, extent: Extent) -> Option<Extent> {
        let removed = self.history.push(extent);
        if self.history.is_available() {
            self.emit(CanvasEvent::ZoomHistoryAvailable);
        } else {
            self.emit(CanvasEvent::ZoomHistoryUnavailable);
        }
        self.emit(CanvasEvent::ZoomChanged { extent });
        removed
    }

    /// Returns to the previous extent in the history.
    ///
    /// Returns false when there is nothing to go back to.
    pub fn zoom_back(&mut self) -> bool {
        log::debug!("MapCanvas::zoom_back(): hist={:?}", self.history);
        let previous = self.history.back();
        if self.history.is_available() {
            self.emit(CanvasEvent::ZoomHistoryAvailable);
        } else {
            self.emit(CanvasEvent::ZoomHistoryUnavailable);
        }
        let Some(extent) = previous else {
            return false;
        };

        self.renderer.region_mut().set_extent(extent);
        self.redraw_all = true;
        self.update_map(true, true);
        self.emit(CanvasEvent::ZoomChanged { extent });
        true
    }

    /// Shows `extent`, for instance the bounds of the selected layers
    pub fn zoom_to_extent(&mut self, extent: Extent, render: bool) {
        self.renderer.region_mut().set_extent(extent);
        let extent = self.renderer.region().extent();
        self.push_history(extent);
        self.redraw_all = true;
        if render {
            self.update_map(true, true);
        }
    }

    /// Shows the computational region
    pub fn zoom_to_computational_region(&mut self) {
        let extent = self.renderer.computational_region().extent();
        self.renderer.region_mut().set_extent(extent);
        self.push_history(extent);
        self.redraw_all = true;
        self.update_map(true, true);
    }

    /// Shows the default region, aligned to the display
    pub fn zoom_to_default(&mut self) {
        let extent = self.renderer.default_region().extent();
        self.apply_extent(extent, true);
        self.update_map(true, true);
    }

    /// Recenters the display on (`east`, `north`) keeping the resolution
    pub fn go_to(&mut self, east: f64, north: f64) {
        let region = self.renderer.region();
        let half_h = region.nsres * region.height as f64 / 2.0;
        let half_w = region.ewres * region.width as f64 / 2.0;
        let extent = Extent::new(north + half_h, north - half_h, east + half_w, east - half_w);

        self.apply_extent(extent, true);
        self.update_map(true, true);
    }

    /// Shifts the window by a pixel offset; positive `dx` shows more of the east
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let moved = self.zoom(Point::new(dx, dy), Point::default(), 0);
        if moved {
            self.update_map(true, true);
        }
        moved
    }

    /// Sets the computational region to the display extent, keeping the
    /// computational resolution
    pub fn display_to_computational_region(&mut self) -> Result<()> {
        let display = self.renderer.region().extent();
        let computational = self.renderer.computational_region();
        self.renderer
            .set_computational_region(display, computational.ewres, computational.nsres)?;
        self.update_map(false, true);
        Ok(())
    }

    /// Distance between two points and their (dE, dN) delta.
    ///
    /// With `screen` the points are pixels, otherwise east/north. Returns
    /// `None` when a point cannot be converted.
    pub fn distance(&self, begin: Point, end: Point, screen: bool) -> Option<(f64, (f64, f64))> {
        let (begin, end) = if screen {
            (self.pixel_to_geo(begin)?, self.pixel_to_geo(end)?)
        } else {
            (begin, end)
        };
        Some(transform::distance(begin, end, self.renderer.region().projection))
    }
}
