//! Contract with the external map renderer.

use crate::{
    core::{
        geo::{Extent, Point},
        region::Region,
    },
    Result,
};
use crossbeam_channel::Sender;
use image::RgbaImage;
use std::sync::Arc;

/// Completion of a deferred render, tagged with the epoch it was requested under
#[derive(Debug)]
pub struct RenderDone {
    pub epoch: u64,
    pub result: Result<RenderedMap>,
}

/// One render pass requested by the canvas
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub epoch: u64,
    /// Re-rasterize layers even if the renderer thinks its cache is fresh
    pub force: bool,
    pub use_computational_resolution: bool,
    pub width: u32,
    pub height: u32,
    /// Where deferred renders post their [`RenderDone`]
    pub completion: Sender<RenderDone>,
}

impl RenderRequest {
    /// Posts the result of a deferred render back to the canvas
    pub fn complete(&self, result: Result<RenderedMap>) {
        let done = RenderDone {
            epoch: self.epoch,
            result,
        };
        if self.completion.send(done).is_err() {
            log::debug!("render {} finished after the canvas went away", self.epoch);
        }
    }
}

/// What the renderer produced
#[derive(Debug, Clone, Default)]
pub struct RenderedMap {
    /// Composited base map; `None` when nothing is displayed
    pub image: Option<RgbaImage>,
}

impl RenderedMap {
    pub fn new(image: RgbaImage) -> Self {
        Self { image: Some(image) }
    }

    pub fn empty() -> Self {
        Self { image: None }
    }
}

/// Synchronous renderers return `Done`; renderers working off the UI thread
/// return `Deferred` and later call [`RenderRequest::complete`].
#[derive(Debug)]
pub enum RenderOutcome {
    Done(RenderedMap),
    Deferred,
}

/// A decoration image (legend, scale bar, north arrow) placed over the map
#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: u32,
    pub image: Arc<RgbaImage>,
    /// Top-left corner in pixels
    pub coords: Point,
    pub active: bool,
}

impl Overlay {
    pub fn new(id: u32, image: RgbaImage, coords: Point) -> Self {
        Self {
            id,
            image: Arc::new(image),
            coords,
            active: true,
        }
    }
}

/// The engine that rasterizes geospatial layers.
///
/// The canvas owns one renderer and reads or mutates its display region
/// directly during zoom and pan.
pub trait MapRenderer: Send {
    /// Current display region
    fn region(&self) -> &Region;

    fn region_mut(&mut self) -> &mut Region;

    /// Region computations run in
    fn computational_region(&self) -> Region;

    /// Region restored by "zoom to default"; defaults to the computational region
    fn default_region(&self) -> Region {
        self.computational_region()
    }

    fn set_computational_region(&mut self, extent: Extent, ewres: f64, nsres: f64) -> Result<()>;

    /// Informs the renderer of the pixel size of the display
    fn change_size(&mut self, width: u32, height: u32) {
        self.region_mut().set_size(width, height);
    }

    /// Grows the display region to the aspect ratio of the display
    fn align_extent_from_display(&mut self) {
        self.region_mut().align_to_display();
    }

    fn render(&mut self, request: RenderRequest) -> Result<RenderOutcome>;

    /// Asks an in-flight render to stop; no-op for synchronous renderers
    fn abort(&mut self) {}
}
