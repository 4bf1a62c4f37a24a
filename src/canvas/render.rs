//! Update pipeline: coalesced requests, render passes, compositing and export.

use super::{CachedLayers, Damage, InFlight, MapCanvas};
use crate::{
    background::coalescer::UpdateFlags,
    core::{constants, geo::Point},
    input::events::CanvasEvent,
    layers::graphics::GraphicsContext,
    rendering::{
        pen::{Brush, Color, Pen},
        raster::{self, ClipRect},
        renderer::{RenderDone, RenderOutcome, RenderRequest, RenderedMap},
        surface::{DrawId, DrawSurface, Shape},
    },
    MapError, Result,
};
use crossbeam_channel::RecvTimeoutError;
use image::{
    imageops::{self, FilterType},
    ImageFormat, RgbaImage,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

/// A pending export started by [`MapCanvas::save_to_file`]
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl MapCanvas {
    /// Requests a coalesced update with no extra delay
    pub fn update_map(&mut self, render: bool, render_vector: bool) {
        self.request_update(render, render_vector, 0, false);
    }

    /// Requests an update of the canvas.
    ///
    /// Requests arriving before the pending one runs are merged: the shortest
    /// delay wins and the flags are OR-ed. A negative delay runs the merged
    /// update right away. With auto-render disabled only `force` requests
    /// get through.
    pub fn request_update(&mut self, render: bool, render_vector: bool, delay_ms: i64, force: bool) {
        if !self.properties.auto_render && !force {
            log::trace!("update ignored, auto render is off");
            return;
        }
        if let Some(flags) = self
            .coalescer
            .request(UpdateFlags::new(render, render_vector), delay_ms)
        {
            self.run_update(flags);
        }
    }

    /// Runs whatever became due on the UI thread: an expired update timer
    /// and completed deferred renders. Returns true if anything ran.
    pub fn process_pending(&mut self) -> bool {
        let mut progressed = false;
        if let Some(flags) = self.coalescer.poll() {
            self.run_update(flags);
            progressed = true;
        }
        progressed | self.drain_completions()
    }

    /// Waits up to `timeout` for the pending update and the render it starts
    pub fn flush(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut progressed = self.process_pending();

        if self.coalescer.is_pending() {
            if let Some(flags) = self.coalescer.wait(deadline.saturating_duration_since(Instant::now())) {
                self.run_update(flags);
                progressed = true;
            }
        }

        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_rx.recv_timeout(remaining) {
                Ok(done) => {
                    let _ = self.finish_render(done);
                    progressed = true;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        progressed
    }

    /// True while an update timer is armed
    pub fn is_update_pending(&self) -> bool {
        self.coalescer.is_pending()
    }

    /// True while a deferred render has not reported back
    pub fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn render_epoch(&self) -> u64 {
        self.epoch
    }

    fn drain_completions(&mut self) -> bool {
        let mut progressed = false;
        while let Ok(done) = self.completion_rx.try_recv() {
            let _ = self.finish_render(done);
            progressed = true;
        }
        progressed
    }

    pub(crate) fn run_update(&mut self, flags: UpdateFlags) {
        log::debug!(
            "MapCanvas::update_map(): started (render={}, render_vector={})",
            flags.render,
            flags.render_vector
        );
        let mut render = flags.render;
        if self.always_render && self.image.is_none() {
            render = true;
        }
        if render {
            self.renderer.change_size(self.width, self.height);
        }
        let _ = self.start_render(render, flags.render_vector, None);
    }

    fn start_render(&mut self, force: bool, render_vector: bool, save: Option<SaveRequest>) -> Result<()> {
        if let Some(previous) = self.in_flight.take() {
            log::debug!("render {} superseded", previous.epoch);
            if previous.save.is_some() {
                log::warn!("image export superseded by a newer render");
            }
            self.renderer.abort();
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let (width, height) = save
            .as_ref()
            .map(|s| (s.width, s.height))
            .unwrap_or((self.width, self.height));
        let request = RenderRequest {
            epoch,
            force,
            use_computational_resolution: self.properties.use_computational_resolution,
            width,
            height,
            completion: self.completion_tx.clone(),
        };
        self.in_flight = Some(InFlight {
            epoch,
            render_vector,
            save,
        });

        match self.renderer.render(request) {
            Ok(RenderOutcome::Done(map)) => self.finish_render(RenderDone {
                epoch,
                result: Ok(map),
            }),
            Ok(RenderOutcome::Deferred) => {
                log::debug!("render {} deferred", epoch);
                Ok(())
            }
            Err(e) => self.finish_render(RenderDone {
                epoch,
                result: Err(e),
            }),
        }
    }

    /// Handles a render completion; completions of superseded epochs are dropped
    fn finish_render(&mut self, done: RenderDone) -> Result<()> {
        match &self.in_flight {
            Some(in_flight) if in_flight.epoch == done.epoch => {}
            _ => {
                log::debug!("discarding stale render {}", done.epoch);
                return Ok(());
            }
        }
        let Some(in_flight) = self.in_flight.take() else {
            return Ok(());
        };

        if let Some(save) = in_flight.save {
            return self.finish_save(save, done.result).map_err(|e| {
                log::error!("image export failed: {}", e);
                self.emit(CanvasEvent::RenderFailed {
                    message: e.to_string(),
                });
                e
            });
        }

        match done.result {
            Ok(map) => {
                self.image = map.image.map(Arc::new);
                self.compose(in_flight.render_vector);
                self.emit(CanvasEvent::MapRendered { epoch: done.epoch });
                Ok(())
            }
            Err(e) => {
                log::error!("rendering failed: {}", e);
                self.image = None;
                self.clear_to_background();
                self.emit(CanvasEvent::RenderFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn clear_to_background(&mut self) {
        for surface in [&mut self.base, &mut self.transparent, &mut self.ephemeral] {
            surface.clear();
        }
        self.redraw_all = true;
        self.damage = Damage::Full;
    }

    /// Rebuilds the surfaces from the current image and decorations
    fn compose(&mut self, render_vector: bool) {
        log::debug!("MapCanvas::update_map(): finished");
        self.clear_to_background();

        if let Some(image) = &self.image {
            self.base.draw(
                Shape::Image {
                    image: image.clone(),
                    origin: Point::default(),
                },
                Pen::default(),
                Brush::default(),
                Some(DrawId(constants::BASE_IMAGE_ID)),
            );
        }

        if render_vector {
            if let Some(digitizer) = self.digitizer.as_mut().filter(|d| d.is_active()) {
                self.vector.clear();
                if let Err(e) = digitizer.draw(&mut self.vector, self.renderer.region()) {
                    log::warn!("{} failed to draw: {}", digitizer.name(), e);
                }
            }
        }

        for overlay in self.overlays.values().filter(|o| o.active) {
            self.base.draw(
                Shape::Image {
                    image: overlay.image.clone(),
                    origin: overlay.coords,
                },
                Pen::default(),
                Brush::default(),
                Some(DrawId(overlay.id)),
            );
        }

        for (id, info) in &self.texts {
            self.base
                .draw(Shape::Text(info.clone()), Pen::default(), Brush::default(), Some(*id));
        }

        self.draw_region_box();
        self.draw_graphics();

        if !self.polycoords.is_empty() {
            self.draw_lines();
        }
    }

    /// Outlines the display region in blue when it lies inside the
    /// computational region, otherwise the computational region in red
    fn draw_region_box(&mut self) {
        if !self.properties.show_region_box {
            return;
        }
        let display = *self.renderer.region();
        let computational = self.renderer.computational_region().extent();
        let (extent, color) = if display.extent().is_inside(&computational) {
            (display.extent(), Color::BLUE.with_alpha(128))
        } else {
            (computational, Color::RED.with_alpha(128))
        };

        let mut ctx = GraphicsContext::new(&mut self.transparent, &display);
        if let Err(e) = ctx.draw_lines(&extent.ring(), Pen::new(color, 3.0), None) {
            log::warn!("cannot draw region extent: {}", e);
        }
    }

    /// Replays registered graphics sets; a set that fails is unregistered
    fn draw_graphics(&mut self) {
        let region = *self.renderer.region();
        let mut dropped = Vec::new();
        for (id, set) in self.graphics.iter_mut() {
            if let Err(e) = set.draw(&mut self.ephemeral, &region) {
                log::warn!("unable to draw graphics set {:?}, unregistered: {}", id, e);
                dropped.push(*id);
            }
        }
        for id in dropped {
            self.unregister_graphics(id);
            self.emit(CanvasEvent::GraphicsDropped { set: id });
        }
    }

    /// Composites the surfaces into the frame buffer and returns it.
    ///
    /// The base and vector layers are cached; as long as neither changed only
    /// the transparent and ephemeral layers are drawn again, and only inside
    /// the invalidated area. Moving a decoration rebuilds the cache inside
    /// that area alone.
    pub fn paint(&mut self) -> &RgbaImage {
        let (width, height) = (self.width, self.height);
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::from_pixel(width, height, self.properties.background.into());
            self.damage = Damage::Full;
        }

        let size_ok = self
            .layers_cache
            .as_ref()
            .is_some_and(|cache| cache.image.dimensions() == (width, height));
        let fresh = size_ok
            && self.layers_cache.as_ref().is_some_and(|cache| {
                cache.base_revision == self.base.revision()
                    && cache.vector_revision == self.vector.revision()
            });
        let show_vector = self.digitizer.as_ref().is_some_and(|d| d.is_active());

        if self.redraw_all || !fresh {
            // every base/vector change outside a full redraw is invalidated,
            // so a damage rectangle is all that needs rebuilding
            let partial = match self.damage {
                Damage::Rect(rect) if !self.redraw_all && size_ok => Some(rect),
                _ => None,
            };
            match (partial, self.layers_cache.as_mut()) {
                (Some(rect), Some(cache)) => {
                    log::trace!("MapCanvas::paint(): rebuilding layers inside {:?}", rect);
                    self.base.composite_onto(&mut cache.image, Some(&rect), false);
                    if show_vector {
                        self.vector.composite_onto(&mut cache.image, Some(&rect), true);
                    }
                    cache.base_revision = self.base.revision();
                    cache.vector_revision = self.vector.revision();
                }
                _ => {
                    let mut layers =
                        RgbaImage::from_pixel(width, height, self.properties.background.into());
                    self.base.composite_onto(&mut layers, None, false);
                    if show_vector {
                        self.vector.composite_onto(&mut layers, None, true);
                    }
                    self.layers_cache = Some(CachedLayers {
                        image: layers,
                        base_revision: self.base.revision(),
                        vector_revision: self.vector.revision(),
                    });
                    self.damage = Damage::Full;
                }
            }
            self.redraw_all = false;
        }

        let clip = match self.damage {
            Damage::None => None,
            Damage::Rect(rect) => Some(Some(rect)),
            Damage::Full => Some(None),
        };
        if let (Some(clip), Some(cache)) = (clip, self.layers_cache.as_ref()) {
            let clip_rect = ClipRect::for_image(&self.buffer, clip.as_ref());
            raster::blit(&mut self.buffer, &cache.image, 0, 0, false, &clip_rect);
            self.transparent.composite_onto(&mut self.buffer, clip.as_ref(), true);
            self.ephemeral.composite_onto(&mut self.buffer, clip.as_ref(), true);
        }
        self.damage = Damage::None;

        self.drag_frame = self.drag_offset.map(|offset| {
            let mut frame = RgbaImage::from_pixel(width, height, Color::WHITE.into());
            let full = ClipRect::for_image(&frame, None);
            raster::blit(
                &mut frame,
                &self.buffer,
                offset.x.round() as i64,
                offset.y.round() as i64,
                false,
                &full,
            );
            frame
        });

        match self.drag_frame {
            Some(ref frame) => frame,
            None => &self.buffer,
        }
    }

    /// Frame produced by the last [`paint`](Self::paint)
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Renders the map at `width` x `height`, composites the base image,
    /// decorations and edited vector layer and writes the result to `path`.
    ///
    /// Overlay and text positions are scaled by the ratio between the export
    /// size and the canvas size. Afterwards the live size is restored and a
    /// render is requested. With a deferred renderer the file is written once
    /// the render reports back, announced by [`CanvasEvent::ImageSaved`].
    pub fn save_to_file(
        &mut self,
        path: impl AsRef<Path>,
        format: ImageFormat,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(MapError::Render(format!("cannot export a {}x{} image", width, height)));
        }
        let save = SaveRequest {
            path: path.as_ref().to_path_buf(),
            format,
            width,
            height,
        };
        self.renderer.change_size(width, height);
        self.start_render(true, false, Some(save))
    }

    fn finish_save(&mut self, save: SaveRequest, result: Result<RenderedMap>) -> Result<()> {
        let outcome = result.and_then(|map| self.export(&save, map));

        self.renderer.change_size(self.width, self.height);
        self.request_update(true, true, 0, true);

        outcome?;
        log::info!("map exported to {}", save.path.display());
        self.emit(CanvasEvent::ImageSaved { path: save.path });
        Ok(())
    }

    fn export(&self, save: &SaveRequest, map: RenderedMap) -> Result<()> {
        let background = self.properties.background;
        let mut surface = DrawSurface::new("export").with_background(background);
        if let Some(image) = map.image {
            surface.draw(
                Shape::Image {
                    image: Arc::new(image),
                    origin: Point::default(),
                },
                Pen::default(),
                Brush::default(),
                Some(DrawId(constants::BASE_IMAGE_ID)),
            );
        }

        let ratio_x = save.width as f64 / self.width as f64;
        let ratio_y = save.height as f64 / self.height as f64;
        let scaled = |p: Point| Point::new((p.x * ratio_x).trunc(), (p.y * ratio_y).trunc());

        for overlay in self.overlays.values().filter(|o| o.active) {
            surface.draw(
                Shape::Image {
                    image: overlay.image.clone(),
                    origin: scaled(overlay.coords),
                },
                Pen::default(),
                Brush::default(),
                Some(DrawId(overlay.id)),
            );
        }
        for (id, info) in &self.texts {
            let mut info = info.clone();
            info.coords = scaled(info.coords);
            surface.draw(Shape::Text(info), Pen::default(), Brush::default(), Some(*id));
        }

        let mut out = RgbaImage::from_pixel(save.width, save.height, background.into());
        surface.composite_onto(&mut out, None, false);
        if self.digitizer.as_ref().is_some_and(|d| d.is_active()) {
            self.vector.composite_onto(&mut out, None, true);
        }
        out.save_with_format(&save.path, save.format)?;
        Ok(())
    }

    /// Notes a new window size; the canvas re-renders once resizing settles
    pub fn on_size(&mut self, width: u32, height: u32) {
        self.resize = Some((Instant::now(), width, height));
    }

    /// Applies a settled resize. Returns true when the canvas was resized.
    pub fn on_idle(&mut self, now: Instant) -> bool {
        let Some((since, width, height)) = self.resize else {
            return false;
        };
        if now.saturating_duration_since(since) < Duration::from_millis(self.properties.resize_delay_ms) {
            return false;
        }
        self.resize = None;
        self.width = width.max(1);
        self.height = height.max(1);
        log::debug!("canvas resized to {}x{}", self.width, self.height);

        self.renderer.change_size(self.width, self.height);
        self.buffer = RgbaImage::from_pixel(self.width, self.height, self.properties.background.into());
        self.layers_cache = None;
        self.redraw_all = true;
        self.damage = Damage::Full;

        // Show the stretched old image until the new render arrives
        if let Some(image) = &self.image {
            let scaled = imageops::resize(image.as_ref(), self.width, self.height, FilterType::Triangle);
            self.image = Some(Arc::new(scaled));
        }
        self.request_update(true, true, 0, false);
        true
    }
}
