//! The buffered map canvas.
//!
//! [`MapCanvas`] owns four draw surfaces, stacked bottom to top:
//!
//! * `base`: rendered map image, overlay decorations and text labels
//! * `vector`: the layer being edited by an attached [`Digitizer`]
//! * `transparent`: semi-transparent feedback such as the region box
//! * `ephemeral`: rubber bands and measurement lines, cheap to redraw
//!
//! Rendering, input dispatch and navigation live in the submodules.

mod interaction;
mod navigation;
mod render;

use crate::{
    background::coalescer::RenderCoalescer,
    core::{
        bounds::Bounds,
        config::CanvasProperties,
        constants,
        geo::Point,
        history::ZoomHistory,
        region::Region,
        transform,
    },
    input::{
        events::{CanvasEvent, EventKind},
        handler::{BoxKind, EventManager, MouseState, MouseUse},
    },
    layers::graphics::{GraphicsContext, GraphicsSet, GraphicsSetId, LabelAlign},
    plugins::digitizer::Digitizer,
    rendering::{
        pen::{Brush, Color, Pen},
        renderer::{MapRenderer, Overlay, RenderDone},
        surface::{DrawId, DrawSurface, Shape},
        text::TextInfo,
    },
    MapError, Result,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbaImage;
use std::{collections::BTreeMap, fmt, sync::Arc, time::Instant};

pub use render::SaveRequest;

/// Selects one of the canvas surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Base,
    Vector,
    Transparent,
    Ephemeral,
}

/// Area of the frame that must be repainted
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Damage {
    None,
    Rect(Bounds),
    Full,
}

impl Damage {
    fn add(&mut self, rect: Bounds) {
        *self = match *self {
            Damage::None => Damage::Rect(rect),
            Damage::Rect(r) => Damage::Rect(r.union(&rect)),
            Damage::Full => Damage::Full,
        };
    }
}

/// Render pass awaiting completion
#[derive(Debug)]
pub(crate) struct InFlight {
    epoch: u64,
    render_vector: bool,
    save: Option<SaveRequest>,
}

/// Cached composite of the base and vector surfaces
#[derive(Debug)]
pub(crate) struct CachedLayers {
    image: RgbaImage,
    base_revision: u64,
    vector_revision: u64,
}

pub struct MapCanvas {
    renderer: Box<dyn MapRenderer>,
    properties: CanvasProperties,
    width: u32,
    height: u32,

    base: DrawSurface,
    vector: DrawSurface,
    transparent: DrawSurface,
    ephemeral: DrawSurface,

    /// Last image produced by the renderer
    image: Option<Arc<RgbaImage>>,
    buffer: RgbaImage,
    drag_frame: Option<RgbaImage>,
    layers_cache: Option<CachedLayers>,
    redraw_all: bool,
    damage: Damage,

    mouse: MouseState,
    drag_id: Option<DrawId>,
    last_pos: Point,
    drag_offset: Option<Point>,
    tooltip: Option<&'static str>,

    history: ZoomHistory,
    coalescer: RenderCoalescer,
    epoch: u64,
    in_flight: Option<InFlight>,
    completion_tx: Sender<RenderDone>,
    completion_rx: Receiver<RenderDone>,
    always_render: bool,
    resize: Option<(Instant, u32, u32)>,

    overlays: BTreeMap<u32, Overlay>,
    texts: BTreeMap<DrawId, TextInfo>,
    graphics: Vec<(GraphicsSetId, GraphicsSet)>,
    next_graphics_id: u32,
    polycoords: Vec<Point>,
    /// Rubber band pen
    pen: Pen,
    /// Pen of the rubber-band polyline
    polypen: Pen,

    digitizer: Option<Box<dyn Digitizer>>,
    events: EventManager,
}

impl fmt::Debug for MapCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapCanvas")
            .field("size", &(self.width, self.height))
            .field("region", self.renderer.region())
            .field("mouse", &self.mouse)
            .field("epoch", &self.epoch)
            .field("graphics_sets", &self.graphics.len())
            .finish()
    }
}

impl MapCanvas {
    /// Creates a canvas sized after the renderer's display region and seeds
    /// the zoom history with that region.
    pub fn new(renderer: Box<dyn MapRenderer>, properties: CanvasProperties) -> Self {
        let region = *renderer.region();
        let (width, height) = (region.width.max(1), region.height.max(1));
        let (completion_tx, completion_rx) = unbounded();
        let background = properties.background;

        let mut canvas = Self {
            renderer,
            always_render: properties.always_render,
            properties,
            width,
            height,
            base: DrawSurface::new("base").with_background(background),
            vector: DrawSurface::new("vector"),
            transparent: DrawSurface::new("transparent"),
            ephemeral: DrawSurface::new("ephemeral"),
            image: None,
            buffer: RgbaImage::from_pixel(width, height, background.into()),
            drag_frame: None,
            layers_cache: None,
            redraw_all: true,
            damage: Damage::Full,
            mouse: MouseState::default(),
            drag_id: None,
            last_pos: Point::default(),
            drag_offset: None,
            tooltip: None,
            history: ZoomHistory::new(),
            coalescer: RenderCoalescer::new(),
            epoch: 0,
            in_flight: None,
            completion_tx,
            completion_rx,
            resize: None,
            overlays: BTreeMap::new(),
            texts: BTreeMap::new(),
            graphics: Vec::new(),
            next_graphics_id: 0,
            polycoords: Vec::new(),
            pen: Pen::new(Color::RED, 2.0),
            polypen: Pen::new(Color::rgb(0, 100, 0), 2.0),
            digitizer: None,
            events: EventManager::new(),
        };
        canvas.init_zoom_history();
        canvas
    }

    pub fn with_digitizer(mut self, digitizer: Box<dyn Digitizer>) -> Self {
        self.digitizer = Some(digitizer);
        self
    }

    pub fn set_digitizer(&mut self, digitizer: Option<Box<dyn Digitizer>>) {
        self.digitizer = digitizer;
        self.redraw_all = true;
    }

    pub fn properties(&self) -> &CanvasProperties {
        &self.properties
    }

    /// Replaces the settings snapshot read by every following frame
    pub fn set_properties(&mut self, properties: CanvasProperties) -> Result<()> {
        properties.validate()?;
        self.base.set_background(properties.background);
        self.properties = properties;
        self.redraw_all = true;
        Ok(())
    }

    pub fn renderer(&self) -> &dyn MapRenderer {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn MapRenderer {
        self.renderer.as_mut()
    }

    pub fn region(&self) -> &Region {
        self.renderer.region()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn surface(&self, kind: SurfaceKind) -> &DrawSurface {
        match kind {
            SurfaceKind::Base => &self.base,
            SurfaceKind::Vector => &self.vector,
            SurfaceKind::Transparent => &self.transparent,
            SurfaceKind::Ephemeral => &self.ephemeral,
        }
    }

    pub fn surface_mut(&mut self, kind: SurfaceKind) -> &mut DrawSurface {
        self.damage = Damage::Full;
        match kind {
            SurfaceKind::Base => &mut self.base,
            SurfaceKind::Vector => &mut self.vector,
            SurfaceKind::Transparent => &mut self.transparent,
            SurfaceKind::Ephemeral => &mut self.ephemeral,
        }
    }

    /// Drawing helpers targeting one surface, placing map coordinates with
    /// the current display region
    pub fn graphics_context(&mut self, kind: SurfaceKind) -> GraphicsContext<'_> {
        self.damage = Damage::Full;
        let surface = match kind {
            SurfaceKind::Base => &mut self.base,
            SurfaceKind::Vector => &mut self.vector,
            SurfaceKind::Transparent => &mut self.transparent,
            SurfaceKind::Ephemeral => &mut self.ephemeral,
        };
        GraphicsContext::new(surface, self.renderer.region())
    }

    /// Last image produced by the renderer
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_deref()
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    /// Switches the left-button mode; picks the matching rubber band
    pub fn set_mouse_use(&mut self, use_mode: MouseUse) {
        self.mouse.box_kind = match use_mode {
            MouseUse::Zoom | MouseUse::DrawRegion => BoxKind::Box,
            MouseUse::Measure => BoxKind::Line,
            MouseUse::Pointer | MouseUse::Pan | MouseUse::Query => BoxKind::None,
            MouseUse::Tool(_) => self.mouse.box_kind,
        };
        if use_mode == MouseUse::Pan {
            self.mouse.zoom_type = 0;
        } else if use_mode == MouseUse::Zoom && self.mouse.zoom_type == 0 {
            self.mouse.zoom_type = 1;
        }
        self.mouse.use_mode = use_mode;
        self.drag_id = None;
    }

    pub fn set_box_kind(&mut self, box_kind: BoxKind) {
        self.mouse.box_kind = box_kind;
    }

    /// 1 zooms in, -1 zooms out, 0 pans
    pub fn set_zoom_type(&mut self, zoom_type: i32) {
        self.mouse.zoom_type = zoom_type.signum();
    }

    /// Tooltip to show for the pointer position, if any
    pub fn tooltip(&self) -> Option<&'static str> {
        self.tooltip
    }

    pub fn drag_id(&self) -> Option<DrawId> {
        self.drag_id
    }

    pub fn is_always_render(&self) -> bool {
        self.always_render
    }

    pub fn set_always_render(&mut self, always_render: bool) {
        self.always_render = always_render;
    }

    pub fn pixel_to_geo(&self, pixel: Point) -> Option<Point> {
        transform::pixel_to_geo(pixel, self.renderer.region())
    }

    pub fn geo_to_pixel(&self, coords: Point) -> Option<Point> {
        transform::geo_to_pixel(coords, self.renderer.region())
    }

    /// Register a notification listener
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: Fn(&CanvasEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, callback);
    }

    /// Delivers queued notifications to listeners and returns them
    pub fn process_events(&mut self) -> Vec<CanvasEvent> {
        self.events.process_events()
    }

    pub fn pending_events(&self) -> usize {
        self.events.pending_events()
    }

    pub(crate) fn emit(&mut self, event: CanvasEvent) {
        self.events.emit(event);
    }

    pub(crate) fn invalidate(&mut self, rect: Option<Bounds>) {
        match rect {
            Some(rect) => self.damage.add(rect.inflated(constants::REFRESH_MARGIN, constants::REFRESH_MARGIN)),
            None => self.damage = Damage::Full,
        }
    }

    // Overlay decorations and text labels

    /// Adds or replaces a decoration image; shown from the next composite.
    ///
    /// Ids from [`constants::FIRST_AUTO_ID`] up belong to text labels, and
    /// the base image id is taken; both are rejected.
    pub fn add_overlay(&mut self, overlay: Overlay) -> Result<()> {
        if overlay.id == constants::BASE_IMAGE_ID || overlay.id >= constants::FIRST_AUTO_ID {
            return Err(MapError::ReservedId(overlay.id));
        }
        self.overlays.insert(overlay.id, overlay);
        Ok(())
    }

    pub fn overlay(&self, id: u32) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values()
    }

    pub fn remove_overlay(&mut self, id: u32) -> bool {
        if self.overlays.remove(&id).is_none() {
            return false;
        }
        let bounds = self.base.get_bounds(DrawId(id));
        self.base.remove_id(DrawId(id));
        self.invalidate(Some(bounds));
        self.emit(CanvasEvent::OverlayRemoved { id });
        true
    }

    /// Adds a text label and draws it right away
    pub fn add_text(&mut self, info: TextInfo) -> DrawId {
        let id = self.base.new_id();
        self.base
            .draw(Shape::Text(info.clone()), Pen::default(), Brush::default(), Some(id));
        self.invalidate(Some(self.base.get_bounds(id)));
        self.texts.insert(id, info);
        id
    }

    pub fn text(&self, id: DrawId) -> Option<&TextInfo> {
        self.texts.get(&id)
    }

    pub fn text_mut(&mut self, id: DrawId) -> Option<&mut TextInfo> {
        self.texts.get_mut(&id)
    }

    pub fn remove_text(&mut self, id: DrawId) -> bool {
        if self.texts.remove(&id).is_none() {
            return false;
        }
        let bounds = self.base.get_bounds(id);
        self.base.remove_id(id);
        self.invalidate(Some(bounds));
        true
    }

    // Graphics sets

    /// Registers a set drawn on the ephemeral surface at every composite
    pub fn register_graphics(&mut self, set: GraphicsSet) -> GraphicsSetId {
        let id = GraphicsSetId(self.next_graphics_id);
        self.next_graphics_id += 1;
        log::debug!("registering graphics set {:?} ({:?})", id, set.kind());
        self.graphics.push((id, set));
        id
    }

    pub fn unregister_graphics(&mut self, id: GraphicsSetId) -> bool {
        let before = self.graphics.len();
        self.graphics.retain(|(set_id, _)| *set_id != id);
        before != self.graphics.len()
    }

    pub fn graphics_set(&self, id: GraphicsSetId) -> Option<&GraphicsSet> {
        self.graphics.iter().find(|(set_id, _)| *set_id == id).map(|(_, set)| set)
    }

    pub fn graphics_set_mut(&mut self, id: GraphicsSetId) -> Option<&mut GraphicsSet> {
        self.graphics
            .iter_mut()
            .find(|(set_id, _)| *set_id == id)
            .map(|(_, set)| set)
    }

    pub fn graphics_sets(&self) -> impl Iterator<Item = GraphicsSetId> + '_ {
        self.graphics.iter().map(|(id, _)| *id)
    }

    // Rubber-band polyline

    /// Appends a vertex, in map coordinates, to the rubber-band polyline
    pub fn add_polycoord(&mut self, coords: Point) {
        self.polycoords.push(coords);
    }

    pub fn polycoords(&self) -> &[Point] {
        &self.polycoords
    }

    /// Draws the rubber-band polyline on the ephemeral surface
    pub fn draw_lines(&mut self) -> Option<DrawId> {
        if self.polycoords.is_empty() {
            return None;
        }
        let region = self.renderer.region();
        let points: Vec<Point> = self
            .polycoords
            .iter()
            .filter_map(|p| transform::geo_to_pixel(*p, region))
            .collect();
        let id = DrawId(constants::POLYLINE_ID);
        let drawn = GraphicsContext::new(&mut self.ephemeral, region).draw_polyline(points, self.polypen, Some(id));
        log::trace!("draw_lines(): coords={:?}, id={:?}", self.polycoords, drawn);
        self.invalidate(Some(self.ephemeral.get_bounds(id)));
        drawn
    }

    /// Removes the rubber band and polyline from the ephemeral surface
    pub fn clear_lines(&mut self) {
        for id in [constants::RUBBER_BAND_ID, constants::POLYLINE_ID] {
            let bounds = self.ephemeral.get_bounds(DrawId(id));
            self.ephemeral.remove_id(DrawId(id));
            self.invalidate(Some(bounds));
        }
    }

    /// Forgets the polyline vertices and clears its drawing
    pub fn reset_polyline(&mut self) {
        self.polycoords.clear();
        self.clear_lines();
    }

    // Drawing helpers, pixel coordinates

    pub fn draw_cross(
        &mut self,
        kind: SurfaceKind,
        center: Point,
        size: f64,
        pen: Option<Pen>,
        label: Option<TextInfo>,
        align: LabelAlign,
    ) -> Option<DrawId> {
        let pen = pen.unwrap_or(self.pen);
        self.graphics_context(kind)
            .draw_cross(center, size, pen, label, align, None)
    }

    pub fn draw_rectangle(&mut self, kind: SurfaceKind, a: Point, b: Point, pen: Pen, brush: Brush) -> Option<DrawId> {
        self.graphics_context(kind).draw_rectangle(a, b, pen, brush)
    }

    pub fn draw_circle(&mut self, kind: SurfaceKind, center: Point, radius: f64, pen: Pen, brush: Brush) -> Option<DrawId> {
        self.graphics_context(kind).draw_circle(center, radius, pen, brush)
    }

    pub fn draw_polygon(&mut self, kind: SurfaceKind, points: Vec<Point>, pen: Pen, brush: Brush) -> Option<DrawId> {
        self.graphics_context(kind).draw_polygon(points, pen, brush)
    }

    pub fn draw_polylines(&mut self, kind: SurfaceKind, points: Vec<Point>, pen: Pen) -> Option<DrawId> {
        self.graphics_context(kind).draw_polyline(points, pen, None)
    }

    /// Clears every surface
    pub fn erase_map(&mut self) {
        for surface in [&mut self.base, &mut self.vector, &mut self.transparent, &mut self.ephemeral] {
            surface.clear();
        }
        self.redraw_all = true;
        self.damage = Damage::Full;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::Extent,
        rendering::renderer::{RenderOutcome, RenderRequest, RenderedMap},
    };

    struct BlankRenderer {
        region: Region,
    }

    impl MapRenderer for BlankRenderer {
        fn region(&self) -> &Region {
            &self.region
        }

        fn region_mut(&mut self) -> &mut Region {
            &mut self.region
        }

        fn computational_region(&self) -> Region {
            self.region
        }

        fn set_computational_region(&mut self, _extent: Extent, _ewres: f64, _nsres: f64) -> Result<()> {
            Ok(())
        }

        fn render(&mut self, _request: RenderRequest) -> Result<RenderOutcome> {
            Ok(RenderOutcome::Done(RenderedMap::empty()))
        }
    }

    fn canvas() -> MapCanvas {
        let region = Region::new(Extent::new(100.0, 0.0, 100.0, 0.0), 200, 100);
        MapCanvas::new(Box::new(BlankRenderer { region }), CanvasProperties::default())
    }

    #[test]
    fn test_size_follows_renderer_region() {
        let canvas = canvas();
        assert_eq!(canvas.size(), (200, 100));
        assert_eq!(canvas.zoom_history().len(), 1);
        assert_eq!(canvas.pending_events(), 0);
    }

    #[test]
    fn test_mouse_use_picks_rubber_band() {
        let mut canvas = canvas();
        canvas.set_mouse_use(MouseUse::Measure);
        assert_eq!(canvas.mouse().box_kind, BoxKind::Line);
        canvas.set_mouse_use(MouseUse::Pan);
        assert_eq!(canvas.mouse().zoom_type, 0);
        canvas.set_mouse_use(MouseUse::Zoom);
        assert_eq!(canvas.mouse().zoom_type, 1);
        assert_eq!(canvas.mouse().box_kind, BoxKind::Box);
        canvas.set_mouse_use(MouseUse::Tool("profile".into()));
        assert_eq!(canvas.mouse().box_kind, BoxKind::Box);
    }

    #[test]
    fn test_labelled_cross() {
        let mut canvas = canvas();
        let label = TextInfo::new("A", Point::default());
        let id = canvas.draw_cross(
            SurfaceKind::Ephemeral,
            Point::new(50.0, 50.0),
            5.0,
            None,
            Some(label),
            LabelAlign::UpperLeft,
        );
        assert!(id.is_some());
        assert_eq!(canvas.surface(SurfaceKind::Ephemeral).len(), 2);
    }

    #[test]
    fn test_text_lifecycle_and_erase() {
        let mut canvas = canvas();
        let id = canvas.add_text(TextInfo::new("north", Point::new(20.0, 20.0)));
        assert_eq!(canvas.text(id).map(|t| t.text.as_str()), Some("north"));
        canvas.draw_rectangle(
            SurfaceKind::Transparent,
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Pen::default(),
            Brush::default(),
        );

        canvas.erase_map();
        assert!(canvas.surface(SurfaceKind::Base).is_empty());
        assert!(canvas.surface(SurfaceKind::Transparent).is_empty());

        assert!(canvas.remove_text(id));
        assert!(!canvas.remove_text(id));
    }

    #[test]
    fn test_set_properties_validates() {
        let mut canvas = canvas();
        let bad = CanvasProperties {
            hit_radius: 0.0,
            ..CanvasProperties::default()
        };
        assert!(canvas.set_properties(bad).is_err());

        let dark = CanvasProperties {
            background: Color::BLACK,
            ..CanvasProperties::default()
        };
        canvas.set_properties(dark).unwrap();
        assert_eq!(canvas.surface(SurfaceKind::Base).background(), Color::BLACK);
    }

    #[test]
    fn test_overlay_ids_stay_clear_of_labels() {
        let mut canvas = canvas();
        let image = RgbaImage::new(4, 4);
        let label = canvas.add_text(TextInfo::new("north", Point::new(20.0, 20.0)));
        assert_eq!(label, DrawId(constants::FIRST_AUTO_ID));

        for id in [constants::BASE_IMAGE_ID, constants::FIRST_AUTO_ID, u32::MAX] {
            let err = canvas.add_overlay(Overlay::new(id, image.clone(), Point::default()));
            assert!(matches!(err, Err(MapError::ReservedId(rejected)) if rejected == id));
        }
        canvas.add_overlay(Overlay::new(1, image, Point::default())).unwrap();
        assert_eq!(canvas.overlays().count(), 1);
        assert!(canvas.text(label).is_some());
    }

    #[test]
    fn test_drag_rebuilds_only_damaged_part_of_cache() {
        use crate::input::events::MouseEvent;
        use image::Rgba;
        use std::time::Duration;

        let mut canvas = canvas();
        let blue: Rgba<u8> = Color::BLUE.into();
        let legend = RgbaImage::from_pixel(20, 10, blue);
        canvas.add_overlay(Overlay::new(1, legend, Point::new(10.0, 10.0))).unwrap();
        canvas.update_map(true, true);
        assert!(canvas.flush(Duration::from_secs(2)));
        canvas.paint();

        let marker = Rgba([1, 2, 3, 255]);
        if let Some(cache) = canvas.layers_cache.as_mut() {
            cache.image.put_pixel(150, 80, marker);
        }

        canvas.set_mouse_use(MouseUse::Pointer);
        canvas.handle_mouse(MouseEvent::left_down(15.0, 15.0));
        canvas.handle_mouse(MouseEvent::drag(16.0, 15.0));
        assert_eq!(*canvas.paint().get_pixel(30, 15), blue);

        let base_revision = canvas.base.revision();
        let cache = canvas.layers_cache.as_ref().unwrap();
        assert_eq!(*cache.image.get_pixel(150, 80), marker);
        assert_eq!(cache.base_revision, base_revision);
    }
}
