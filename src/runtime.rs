//! Async bridge for renderers that rasterize off the UI thread.
//!
//! [`AsyncRenderer`] adapts an [`AsyncRasterizer`] to the synchronous
//! [`MapRenderer`] contract: every render is spawned as a task and reported
//! back through [`RenderRequest::complete`], so the canvas only ever sees
//! [`RenderOutcome::Deferred`]. A newer render cancels the task of the
//! previous one.

use crate::{
    core::{geo::Extent, region::Region},
    rendering::renderer::{MapRenderer, RenderOutcome, RenderRequest, RenderedMap},
    MapError, Result,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Spawns render tasks on some executor (object-safe)
pub trait AsyncSpawner: Send + Sync + 'static {
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned render task
pub trait AsyncHandle: Send + Sync {
    fn is_finished(&self) -> bool;

    fn cancel(&self);
}

/// Spawns onto a tokio runtime, from any thread
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller runs in, if any
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle> {
        Box::new(TokioHandle(self.handle.spawn(future)))
    }
}

struct TokioHandle(tokio::task::JoinHandle<()>);

impl AsyncHandle for TokioHandle {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    fn cancel(&self) {
        self.0.abort();
    }
}

/// What an asynchronous rasterizer is asked to draw
#[derive(Debug, Clone)]
pub struct RasterJob {
    pub epoch: u64,
    /// Display region at the time of the request
    pub region: Region,
    pub width: u32,
    pub height: u32,
    pub force: bool,
    pub use_computational_resolution: bool,
}

/// Produces map images asynchronously, e.g. by running an external process
#[async_trait]
pub trait AsyncRasterizer: Send + Sync + 'static {
    async fn rasterize(&self, job: RasterJob) -> Result<RenderedMap>;
}

/// [`MapRenderer`] that runs an [`AsyncRasterizer`] on a spawner
pub struct AsyncRenderer<R> {
    rasterizer: Arc<R>,
    spawner: Arc<dyn AsyncSpawner>,
    region: Region,
    computational: Region,
    default: Option<Region>,
    task: Option<Box<dyn AsyncHandle>>,
}

impl<R: AsyncRasterizer> AsyncRenderer<R> {
    /// The display and computational regions both start as `region`
    pub fn new(rasterizer: R, spawner: Arc<dyn AsyncSpawner>, region: Region) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            spawner,
            region,
            computational: region,
            default: None,
            task: None,
        }
    }

    pub fn with_computational_region(mut self, region: Region) -> Self {
        self.computational = region;
        self
    }

    pub fn with_default_region(mut self, region: Region) -> Self {
        self.default = Some(region);
        self
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// True while a spawned render has not finished
    pub fn is_busy(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<R: AsyncRasterizer> MapRenderer for AsyncRenderer<R> {
    fn region(&self) -> &Region {
        &self.region
    }

    fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    fn computational_region(&self) -> Region {
        self.computational
    }

    fn default_region(&self) -> Region {
        self.default.unwrap_or(self.computational)
    }

    fn set_computational_region(&mut self, extent: Extent, ewres: f64, nsres: f64) -> Result<()> {
        if !(ewres > 0.0 && nsres > 0.0) {
            return Err(MapError::InvalidCoordinates(format!(
                "resolution must be positive, got {}x{}",
                ewres, nsres
            )));
        }
        let cols = (extent.width() / ewres).round().max(1.0) as u32;
        let rows = (extent.height() / nsres).round().max(1.0) as u32;
        let mut region = Region::new(extent, cols, rows).with_projection(self.region.projection);
        region.ewres = ewres;
        region.nsres = nsres;
        self.computational = region;
        Ok(())
    }

    fn render(&mut self, request: RenderRequest) -> Result<RenderOutcome> {
        self.abort();

        let job = RasterJob {
            epoch: request.epoch,
            region: self.region,
            width: request.width,
            height: request.height,
            force: request.force,
            use_computational_resolution: request.use_computational_resolution,
        };
        let rasterizer = Arc::clone(&self.rasterizer);
        log::debug!("spawning render {}", job.epoch);

        self.task = Some(self.spawner.spawn_boxed(Box::pin(async move {
            let result = rasterizer.rasterize(job).await;
            request.complete(result);
        })));
        Ok(RenderOutcome::Deferred)
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                log::debug!("cancelling running render task");
                task.cancel();
            }
        }
    }
}
