use image::{ImageFormat, Rgba, RgbaImage};
use mapcanvas::{constants, prelude::*};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

/// Shared counters a test keeps after handing the renderer to the canvas
#[derive(Clone, Default)]
struct Tally {
    renders: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
    forced: Arc<Mutex<Vec<bool>>>,
    pending: Arc<Mutex<Vec<RenderRequest>>>,
}

impl Tally {
    fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    fn take_pending(&self) -> Vec<RenderRequest> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }
}

/// Renderer filling the requested size with one colour
struct FakeRenderer {
    region: Region,
    computational: Region,
    color: Color,
    fail: bool,
    deferred: bool,
    tally: Tally,
}

impl FakeRenderer {
    fn new(tally: Tally) -> Self {
        let region = Region::new(Extent::new(100.0, 0.0, 100.0, 0.0), 200, 200);
        Self {
            region,
            computational: region,
            color: Color::GREEN,
            fail: false,
            deferred: false,
            tally,
        }
    }

    fn failing(tally: Tally) -> Self {
        Self {
            fail: true,
            ..Self::new(tally)
        }
    }

    fn deferred(tally: Tally) -> Self {
        Self {
            deferred: true,
            ..Self::new(tally)
        }
    }
}

impl MapRenderer for FakeRenderer {
    fn region(&self) -> &Region {
        &self.region
    }

    fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    fn computational_region(&self) -> Region {
        self.computational
    }

    fn set_computational_region(&mut self, extent: Extent, ewres: f64, nsres: f64) -> Result<()> {
        let cols = (extent.width() / ewres).round() as u32;
        let rows = (extent.height() / nsres).round() as u32;
        let mut region = Region::new(extent, cols, rows);
        region.ewres = ewres;
        region.nsres = nsres;
        self.computational = region;
        Ok(())
    }

    fn render(&mut self, request: RenderRequest) -> Result<RenderOutcome> {
        self.tally.renders.fetch_add(1, Ordering::SeqCst);
        self.tally.forced.lock().unwrap().push(request.force);
        if self.fail {
            return Err(MapError::Render("layer is missing".into()));
        }
        if self.deferred {
            self.tally.pending.lock().unwrap().push(request);
            return Ok(RenderOutcome::Deferred);
        }
        let image = RgbaImage::from_pixel(request.width, request.height, self.color.into());
        Ok(RenderOutcome::Done(RenderedMap::new(image)))
    }

    fn abort(&mut self) {
        self.tally.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Interactive settings without aspect alignment, so extents stay exact
fn properties() -> CanvasProperties {
    CanvasProperties {
        align_extent: false,
        ..CanvasProperties::default()
    }
}

fn canvas_with(renderer: FakeRenderer) -> MapCanvas {
    mapcanvas::init_logging();
    MapCanvas::new(Box::new(renderer), properties())
}

/// Canvas that already shows one rendered frame; its events are drained
fn rendered_canvas(tally: Tally) -> MapCanvas {
    let mut canvas = canvas_with(FakeRenderer::new(tally));
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    canvas.process_events();
    canvas
}

fn kinds(events: &[CanvasEvent]) -> Vec<EventKind> {
    events.iter().map(CanvasEvent::kind).collect()
}

fn drag(canvas: &mut MapCanvas, from: (f64, f64), to: (f64, f64)) {
    canvas.handle_mouse(MouseEvent::left_down(from.0, from.1));
    canvas.handle_mouse(MouseEvent::drag(to.0, to.1));
    canvas.handle_mouse(MouseEvent::left_up(to.0, to.1));
}

fn rgba(color: Color) -> Rgba<u8> {
    color.into()
}

#[test]
fn test_pixel_to_geo_center() {
    let canvas = canvas_with(FakeRenderer::new(Tally::default()));
    assert_eq!(canvas.pixel_to_geo(Point::new(100.0, 100.0)), Some(Point::new(50.0, 50.0)));
    assert_eq!(canvas.geo_to_pixel(Point::new(25.0, 75.0)), Some(Point::new(50.0, 50.0)));
}

#[test]
fn test_zoom_box_sets_extent_and_history() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    canvas.on(EventKind::ZoomChanged, move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    canvas.set_mouse_use(MouseUse::Zoom);
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));

    let expected = Extent::new(75.0, 25.0, 75.0, 25.0);
    assert_eq!(canvas.region().extent(), expected);
    assert_eq!(canvas.zoom_history().len(), 2);

    let events = canvas.process_events();
    let received = kinds(&events);
    assert!(received.contains(&EventKind::ZoomHistoryAvailable));
    assert!(received.contains(&EventKind::MouseLeftDown));
    assert!(received.contains(&EventKind::MouseLeftUp));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![CanvasEvent::ZoomChanged { extent: expected }]
    );
}

#[test]
fn test_zoom_out_box_restores_extent() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Zoom);
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));

    canvas.set_zoom_type(-1);
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));
    assert!(canvas
        .region()
        .extent()
        .approx_eq(&Extent::new(100.0, 0.0, 100.0, 0.0), 1e-9));
}

#[test]
fn test_small_box_does_not_zoom() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Zoom);
    drag(&mut canvas, (50.0, 50.0), (53.0, 150.0));

    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert_eq!(canvas.zoom_history().len(), 1);
}

#[test]
fn test_click_zooms_around_point() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Zoom);
    canvas.handle_mouse(MouseEvent::left_down(150.0, 50.0));
    canvas.handle_mouse(MouseEvent::left_up(150.0, 50.0));

    assert_eq!(canvas.region().extent(), Extent::new(100.0, 50.0, 100.0, 50.0));
}

#[test]
fn test_pan_drag_previews_then_commits() {
    let mut canvas = rendered_canvas(Tally::default());
    canvas.set_mouse_use(MouseUse::Pan);

    canvas.handle_mouse(MouseEvent::left_down(100.0, 100.0));
    canvas.handle_mouse(MouseEvent::drag(120.0, 90.0));
    let frame = canvas.paint();
    assert_eq!(*frame.get_pixel(5, 100), rgba(Color::WHITE));
    assert_eq!(*frame.get_pixel(100, 100), rgba(Color::GREEN));
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));

    canvas.handle_mouse(MouseEvent::left_up(120.0, 90.0));
    assert_eq!(canvas.region().extent(), Extent::new(95.0, -5.0, 90.0, -10.0));
    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(*canvas.paint().get_pixel(5, 100), rgba(Color::GREEN));
}

#[test]
fn test_pan_preview_needs_auto_render() {
    let tally = Tally::default();
    let mut canvas = MapCanvas::new(
        Box::new(FakeRenderer::new(tally)),
        CanvasProperties {
            align_extent: false,
            ..CanvasProfile::Static.resolve()
        },
    );
    canvas.request_update(true, true, 0, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    canvas.set_mouse_use(MouseUse::Pan);
    canvas.handle_mouse(MouseEvent::left_down(100.0, 100.0));
    canvas.handle_mouse(MouseEvent::drag(120.0, 90.0));
    assert_eq!(*canvas.paint().get_pixel(5, 100), rgba(Color::GREEN));
}

#[test]
fn test_middle_button_pans() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.handle_mouse(MouseEvent::MiddleDown {
        position: Point::new(100.0, 100.0),
    });
    canvas.handle_mouse(MouseEvent::Motion {
        position: Point::new(110.0, 100.0),
        buttons: MouseButtons::MIDDLE,
    });
    canvas.handle_mouse(MouseEvent::MiddleUp {
        position: Point::new(110.0, 100.0),
    });

    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 95.0, -5.0));
}

#[test]
fn test_query_click_reports_pixels() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Query);
    canvas.handle_mouse(MouseEvent::left_down(30.0, 40.0));
    canvas.handle_mouse(MouseEvent::left_up(30.0, 40.0));

    let events = canvas.process_events();
    assert!(events.contains(&CanvasEvent::MapQueried { x: 30.0, y: 40.0 }));
    assert!(events.contains(&CanvasEvent::MouseLeftUp { x: 15.0, y: 80.0 }));
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
}

fn canvas_with_overlay() -> MapCanvas {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let legend = RgbaImage::from_pixel(20, 10, rgba(Color::BLUE));
    canvas
        .add_overlay(Overlay::new(1, legend, Point::new(10.0, 10.0)))
        .unwrap();
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    canvas.set_mouse_use(MouseUse::Pointer);
    canvas.process_events();
    canvas
}

#[test]
fn test_overlay_drag_commits_position() {
    let mut canvas = canvas_with_overlay();
    assert_eq!(*canvas.paint().get_pixel(15, 15), rgba(Color::BLUE));

    canvas.handle_mouse(MouseEvent::left_down(15.0, 15.0));
    assert_eq!(canvas.drag_id(), Some(DrawId(1)));
    canvas.handle_mouse(MouseEvent::drag(25.0, 35.0));
    canvas.handle_mouse(MouseEvent::left_up(25.0, 35.0));

    assert_eq!(canvas.drag_id(), None);
    assert_eq!(canvas.overlay(1).unwrap().coords, Point::new(20.0, 30.0));
    assert_eq!(*canvas.paint().get_pixel(25, 35), rgba(Color::BLUE));
    assert_eq!(*canvas.paint().get_pixel(12, 12), rgba(Color::GREEN));

    let events = canvas.process_events();
    assert!(kinds(&events).contains(&EventKind::MouseLeftUpPointer));
}

#[test]
fn test_base_image_is_never_dragged() {
    let mut canvas = canvas_with_overlay();
    canvas.handle_mouse(MouseEvent::left_down(150.0, 150.0));
    assert_eq!(canvas.drag_id(), None);
    canvas.handle_mouse(MouseEvent::drag(170.0, 160.0));
    canvas.handle_mouse(MouseEvent::left_up(170.0, 160.0));

    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert!(!canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::RUBBER_BAND_ID)));
}

#[test]
fn test_double_click_activates_overlay() {
    let mut canvas = canvas_with_overlay();
    canvas.handle_mouse(MouseEvent::DoubleClick {
        position: Point::new(15.0, 15.0),
    });

    assert_eq!(canvas.drag_id(), Some(DrawId(1)));
    let events = canvas.process_events();
    assert!(events.contains(&CanvasEvent::OverlayActivated { id: 1 }));
    assert!(kinds(&events).contains(&EventKind::MouseDClick));
}

#[test]
fn test_overlay_tooltip_on_hover() {
    let mut canvas = canvas_with_overlay();
    canvas.handle_mouse(MouseEvent::moving(20.0, 15.0));
    assert_eq!(canvas.tooltip(), Some(constants::OVERLAY_TOOLTIP));

    canvas.handle_mouse(MouseEvent::moving(150.0, 150.0));
    assert_eq!(canvas.tooltip(), None);
    assert!(kinds(&canvas.process_events()).contains(&EventKind::MouseMoving));
}

#[test]
fn test_remove_overlay() {
    let mut canvas = canvas_with_overlay();
    assert!(canvas.remove_overlay(1));
    assert!(!canvas.remove_overlay(1));
    assert!(!canvas.surface(SurfaceKind::Base).contains(DrawId(1)));
    assert_eq!(*canvas.paint().get_pixel(15, 15), rgba(Color::GREEN));
    assert_eq!(canvas.process_events(), vec![CanvasEvent::OverlayRemoved { id: 1 }]);
}

#[test]
fn test_text_label_drag() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let id = canvas.add_text(TextInfo::new("legend", Point::new(100.0, 100.0)));
    canvas.set_mouse_use(MouseUse::Pointer);

    canvas.handle_mouse(MouseEvent::left_down(101.0, 101.0));
    assert_eq!(canvas.drag_id(), Some(id));
    canvas.handle_mouse(MouseEvent::drag(111.0, 106.0));
    canvas.handle_mouse(MouseEvent::left_up(111.0, 106.0));

    assert_eq!(canvas.text(id).unwrap().coords, Point::new(110.0, 105.0));

    canvas.update_map(false, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(canvas.text(id).unwrap().coords, Point::new(110.0, 105.0));
    assert!(canvas.surface(SurfaceKind::Base).contains(id));
}

#[test]
fn test_graphics_status_sees_every_item() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let orders = Arc::new(Mutex::new(Vec::new()));
    let sink = orders.clone();
    let mut set = GraphicsSet::new(GraphicsKind::Point).with_status(move |item, order| {
        sink.lock().unwrap().push(order);
        if order == 1 {
            item.hidden = true;
        }
    });
    for coords in [(10.0, 10.0), (50.0, 50.0), (90.0, 90.0)] {
        set.add_item(vec![Point::new(coords.0, coords.1)], None, None, false);
    }
    canvas.register_graphics(set);

    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    assert_eq!(*orders.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(canvas.surface(SurfaceKind::Ephemeral).len(), 2);
}

#[test]
fn test_failing_graphics_set_is_dropped() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let mut broken = GraphicsSet::new(GraphicsKind::Point)
        .with_draw(|_, _, _| Err(MapError::Graphics("symbol not found".into())));
    broken.add_item(vec![Point::new(10.0, 10.0)], None, None, false);
    let id = canvas.register_graphics(broken);

    let mut healthy = GraphicsSet::new(GraphicsKind::Point);
    healthy.add_item(vec![Point::new(50.0, 50.0)], None, None, false);
    let kept = canvas.register_graphics(healthy);

    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    assert_eq!(canvas.graphics_sets().collect::<Vec<_>>(), vec![kept]);
    let events = canvas.process_events();
    assert!(events.contains(&CanvasEvent::GraphicsDropped { set: id }));
    assert!(kinds(&events).contains(&EventKind::MapRendered));
}

#[test]
fn test_render_failure_clears_to_background() {
    let mut canvas = canvas_with(FakeRenderer::failing(Tally::default()));
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    assert!(canvas.image().is_none());
    assert!(!canvas.is_rendering());
    assert_eq!(*canvas.paint().get_pixel(100, 100), rgba(Color::WHITE));
    let events = canvas.process_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, CanvasEvent::RenderFailed { message } if message.contains("layer is missing"))));
}

#[test]
fn test_stale_render_is_discarded() {
    let tally = Tally::default();
    let mut canvas = canvas_with(FakeRenderer::deferred(tally.clone()));

    canvas.request_update(true, false, -1, false);
    assert!(canvas.is_rendering());
    canvas.request_update(true, false, -1, false);
    assert_eq!(tally.aborts(), 1);
    assert_eq!(canvas.render_epoch(), 2);

    let mut pending = tally.take_pending();
    assert_eq!(pending.len(), 2);
    let newest = pending.pop().unwrap();
    let stale = pending.pop().unwrap();
    newest.complete(Ok(RenderedMap::new(RgbaImage::from_pixel(200, 200, rgba(Color::GREEN)))));
    stale.complete(Ok(RenderedMap::new(RgbaImage::from_pixel(200, 200, rgba(Color::RED)))));

    assert!(canvas.process_pending());
    assert!(!canvas.is_rendering());
    assert_eq!(*canvas.paint().get_pixel(100, 100), rgba(Color::GREEN));
    assert_eq!(canvas.process_events(), vec![CanvasEvent::MapRendered { epoch: 2 }]);
}

#[test]
fn test_late_completion_of_superseded_render() {
    let tally = Tally::default();
    let mut canvas = canvas_with(FakeRenderer::deferred(tally.clone()));
    canvas.request_update(true, false, -1, false);
    canvas.request_update(true, false, -1, false);

    let mut pending = tally.take_pending();
    let newest = pending.pop().unwrap();
    let stale = pending.pop().unwrap();

    stale.complete(Ok(RenderedMap::new(RgbaImage::from_pixel(200, 200, rgba(Color::RED)))));
    canvas.process_pending();
    assert!(canvas.image().is_none());
    assert!(canvas.is_rendering());

    newest.complete(Ok(RenderedMap::new(RgbaImage::from_pixel(200, 200, rgba(Color::GREEN)))));
    canvas.process_pending();
    assert_eq!(*canvas.image().unwrap().get_pixel(0, 0), rgba(Color::GREEN));
}

#[test]
fn test_request_burst_renders_once() {
    let tally = Tally::default();
    let mut canvas = canvas_with(FakeRenderer::new(tally.clone()));
    for _ in 0..12 {
        canvas.request_update(true, false, 100, false);
    }
    assert!(canvas.is_update_pending());
    assert_eq!(tally.renders(), 0);

    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(tally.renders(), 1);
    assert!(!canvas.is_update_pending());

    canvas.flush(Duration::from_millis(150));
    assert_eq!(tally.renders(), 1);
}

#[test]
fn test_auto_render_off_ignores_unforced_updates() {
    let tally = Tally::default();
    let mut canvas = MapCanvas::new(Box::new(FakeRenderer::new(tally.clone())), CanvasProfile::Static.resolve());

    canvas.update_map(true, true);
    assert!(!canvas.is_update_pending());
    canvas.flush(Duration::from_millis(100));
    assert_eq!(tally.renders(), 0);

    canvas.request_update(true, true, 0, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(tally.renders(), 1);
}

#[test]
fn test_always_render_forces_first_pass() {
    let tally = Tally::default();
    let mut canvas = MapCanvas::new(
        Box::new(FakeRenderer::new(tally.clone())),
        CanvasProperties {
            always_render: true,
            ..properties()
        },
    );
    canvas.update_map(false, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    canvas.update_map(false, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    assert_eq!(*tally.forced.lock().unwrap(), vec![true, false]);
}

#[test]
fn test_save_to_file_writes_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.png");
    let mut canvas = rendered_canvas(Tally::default());

    canvas.save_to_file(&path, ImageFormat::Png, 100, 80).unwrap();

    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (100, 80));
    assert_eq!(*saved.get_pixel(50, 40), rgba(Color::GREEN));
    assert_eq!((canvas.region().width, canvas.region().height), (200, 200));
    assert!(canvas.is_update_pending());
    assert!(canvas
        .process_events()
        .contains(&CanvasEvent::ImageSaved { path: path.clone() }));
}

#[test]
fn test_save_rejects_empty_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut canvas = rendered_canvas(Tally::default());
    assert!(canvas
        .save_to_file(dir.path().join("empty.png"), ImageFormat::Png, 0, 10)
        .is_err());
}

#[test]
fn test_zoom_back_walks_history() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    let first = Extent::new(75.0, 25.0, 75.0, 25.0);
    canvas.set_mouse_use(MouseUse::Zoom);
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));
    assert_eq!(canvas.region().extent(), Extent::new(62.5, 37.5, 62.5, 37.5));
    canvas.process_events();

    assert!(canvas.zoom_back());
    assert_eq!(canvas.region().extent(), first);
    let events = canvas.process_events();
    let received = kinds(&events);
    assert!(received.contains(&EventKind::ZoomHistoryAvailable));
    assert!(!received.contains(&EventKind::ZoomHistoryUnavailable));
    assert!(events.contains(&CanvasEvent::ZoomChanged { extent: first }));

    assert!(canvas.zoom_back());
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert!(kinds(&canvas.process_events()).contains(&EventKind::ZoomHistoryUnavailable));

    assert!(!canvas.zoom_back());
    assert_eq!(canvas.process_events(), vec![CanvasEvent::ZoomHistoryUnavailable]);
}

#[test]
fn test_deep_zoom_region_box_paints_quickly() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas
        .set_properties(CanvasProperties {
            show_region_box: true,
            ..properties()
        })
        .unwrap();
    canvas.zoom_to_extent(Extent::new(50.0001, 49.9999, 100.0001, 99.9999), false);

    let started = Instant::now();
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    let frame = canvas.paint();
    assert_eq!(*frame.get_pixel(50, 50), rgba(Color::GREEN));
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
}

#[test]
fn test_history_keeps_last_ten_extents() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    for _ in 0..12 {
        canvas.handle_key(KeyCode::ArrowRight.into());
    }
    assert_eq!(canvas.zoom_history().len(), 10);
}

#[test]
fn test_wheel_burst_coalesces() {
    let tally = Tally::default();
    let mut canvas = canvas_with(FakeRenderer::new(tally.clone()));
    assert_eq!(canvas.handle_mouse(MouseEvent::wheel(100.0, 100.0, 120)), EventHandled::Handled);
    assert_eq!(canvas.handle_mouse(MouseEvent::wheel(100.0, 100.0, 120)), EventHandled::Handled);
    assert_eq!(canvas.region().extent(), Extent::new(62.5, 37.5, 62.5, 37.5));
    assert_eq!(tally.renders(), 0);

    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(tally.renders(), 1);
    let zooms = kinds(&canvas.process_events())
        .into_iter()
        .filter(|kind| *kind == EventKind::ZoomChanged)
        .count();
    assert_eq!(zooms, 2);
}

#[test]
fn test_wheel_inverted_and_disabled() {
    let mut canvas = MapCanvas::new(
        Box::new(FakeRenderer::new(Tally::default())),
        CanvasProperties {
            invert_scroll: true,
            ..properties()
        },
    );
    canvas.handle_mouse(MouseEvent::wheel(100.0, 100.0, 120));
    assert_eq!(canvas.region().extent(), Extent::new(150.0, -50.0, 150.0, -50.0));

    let mut disabled = MapCanvas::new(
        Box::new(FakeRenderer::new(Tally::default())),
        CanvasProperties {
            wheel_zoom: WheelZoom::Disabled,
            ..properties()
        },
    );
    assert_eq!(
        disabled.handle_mouse(MouseEvent::wheel(100.0, 100.0, 120)),
        EventHandled::NotHandled
    );
    assert_eq!(disabled.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert_eq!(
        canvas.handle_mouse(MouseEvent::wheel(100.0, 100.0, 0)),
        EventHandled::NotHandled
    );
}

#[test]
fn test_draw_region_sets_computational_region() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::DrawRegion);

    canvas.handle_mouse(MouseEvent::left_down(0.0, 0.0));
    canvas.handle_mouse(MouseEvent::drag(100.0, 100.0));
    assert!(canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::RUBBER_BAND_ID)));
    canvas.handle_mouse(MouseEvent::left_up(100.0, 100.0));

    let expected = Extent::new(100.0, 50.0, 50.0, 0.0);
    let computational = canvas.renderer().computational_region();
    assert_eq!(computational.extent(), expected);
    assert_eq!((computational.width, computational.height), (100, 100));
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert!(!canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::RUBBER_BAND_ID)));
    assert!(canvas
        .process_events()
        .contains(&CanvasEvent::RegionDrawn { extent: expected }));
}

#[test]
fn test_resize_waits_for_idle() {
    let tally = Tally::default();
    let mut canvas = rendered_canvas(tally.clone());
    let now = Instant::now();
    canvas.on_size(100, 50);
    assert!(!canvas.on_idle(now));
    assert_eq!(canvas.size(), (200, 200));

    assert!(canvas.on_idle(now + Duration::from_millis(300)));
    assert_eq!(canvas.size(), (100, 50));
    assert_eq!((canvas.region().width, canvas.region().height), (100, 50));
    assert_eq!(canvas.image().unwrap().dimensions(), (100, 50));

    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(tally.renders(), 2);
    assert_eq!(canvas.paint().dimensions(), (100, 50));
    assert!(!canvas.on_idle(now + Duration::from_secs(1)));
}

#[test]
fn test_arrow_keys_pan_quarter_window() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    assert_eq!(canvas.handle_key(KeyCode::ArrowRight.into()), EventHandled::Handled);
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 125.0, 25.0));

    canvas.handle_key(KeyCode::ArrowUp.into());
    assert_eq!(canvas.region().extent(), Extent::new(125.0, 25.0, 125.0, 25.0));
    assert_eq!(canvas.handle_key(KeyCode::Other(42).into()), EventHandled::NotHandled);
}

#[test]
fn test_plus_key_zooms_on_center() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.handle_key(KeyCode::Plus.into());
    assert_eq!(canvas.region().extent(), Extent::new(75.0, 25.0, 75.0, 25.0));
    canvas.handle_key(KeyCode::Minus.into());
    assert!(canvas
        .region()
        .extent()
        .approx_eq(&Extent::new(100.0, 0.0, 100.0, 0.0), 1e-9));
}

#[test]
fn test_escape_drops_rubber_band() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Zoom);
    canvas.handle_mouse(MouseEvent::left_down(20.0, 20.0));
    canvas.handle_mouse(MouseEvent::drag(120.0, 120.0));
    assert!(canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::RUBBER_BAND_ID)));

    canvas.handle_key(KeyCode::Escape.into());
    assert!(!canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::RUBBER_BAND_ID)));
    assert_eq!(canvas.mouse().begin, Point::default());
}

#[test]
fn test_measure_clicks_build_polyline() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.set_mouse_use(MouseUse::Measure);
    for (x, y) in [(0.0, 0.0), (100.0, 0.0)] {
        canvas.handle_mouse(MouseEvent::left_down(x, y));
        canvas.handle_mouse(MouseEvent::left_up(x, y));
    }

    let points = canvas.polycoords().to_vec();
    assert_eq!(points, vec![Point::new(0.0, 100.0), Point::new(50.0, 100.0)]);
    assert!(canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::POLYLINE_ID)));
    assert_eq!(
        canvas.distance(points[0], points[1], false),
        Some((50.0, (50.0, 0.0)))
    );
    assert_eq!(
        canvas.distance(Point::new(0.0, 0.0), Point::new(0.0, 40.0), true),
        Some((20.0, (0.0, -20.0)))
    );

    canvas.reset_polyline();
    assert!(canvas.polycoords().is_empty());
    assert!(!canvas.surface(SurfaceKind::Ephemeral).contains(DrawId(constants::POLYLINE_ID)));
}

#[test]
fn test_display_to_computational_region() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.handle_key(KeyCode::Plus.into());
    canvas.display_to_computational_region().unwrap();

    let computational = canvas.renderer().computational_region();
    assert_eq!(computational.extent(), Extent::new(75.0, 25.0, 75.0, 25.0));
    assert_eq!(computational.ewres, 0.5);
    assert_eq!((computational.width, computational.height), (100, 100));
}

#[test]
fn test_go_to_recenters() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.go_to(20.0, 30.0);
    assert_eq!(canvas.region().extent(), Extent::new(80.0, -20.0, 70.0, -30.0));
    assert_eq!(canvas.region().center(), Point::new(20.0, 30.0));

    canvas.zoom_to_default();
    assert_eq!(canvas.region().extent(), Extent::new(100.0, 0.0, 100.0, 0.0));
    assert_eq!(canvas.zoom_history().len(), 3);
}

#[test]
fn test_zoom_to_extent_without_render() {
    let tally = Tally::default();
    let mut canvas = canvas_with(FakeRenderer::new(tally.clone()));
    let extent = Extent::new(60.0, 40.0, 60.0, 40.0);
    canvas.zoom_to_extent(extent, false);

    assert_eq!(canvas.region().extent(), extent);
    assert!(!canvas.is_update_pending());
    assert!(canvas
        .process_events()
        .contains(&CanvasEvent::ZoomChanged { extent }));
}

#[test]
fn test_right_up_reports_position() {
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default()));
    canvas.handle_mouse(MouseEvent::RightUp {
        position: Point::new(0.0, 200.0),
    });
    canvas.handle_mouse(MouseEvent::Enter);
    assert_eq!(canvas.handle_mouse(MouseEvent::Leave), EventHandled::NotHandled);

    assert_eq!(
        canvas.process_events(),
        vec![
            CanvasEvent::MouseRightUp { x: 0.0, y: 0.0 },
            CanvasEvent::MouseEntered
        ]
    );
}

#[derive(Default)]
struct DigitizerCalls {
    draws: AtomicUsize,
    left_downs: AtomicUsize,
    right_ups: AtomicUsize,
}

struct RecordingDigitizer {
    calls: Arc<DigitizerCalls>,
}

impl Digitizer for RecordingDigitizer {
    fn is_active(&self) -> bool {
        true
    }

    fn draw(&mut self, surface: &mut DrawSurface, _region: &Region) -> Result<()> {
        self.calls.draws.fetch_add(1, Ordering::SeqCst);
        surface.draw(
            Shape::Line(Point::new(0.0, 100.0), Point::new(199.0, 100.0)),
            Pen::new(Color::RED, 3.0),
            Brush::default(),
            None,
        );
        Ok(())
    }

    fn on_left_down(&mut self, _position: Point, _ctrl: bool, _region: &Region) -> Result<()> {
        self.calls.left_downs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_right_up(&mut self, _position: Point, _region: &Region) -> Result<()> {
        self.calls.right_ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_digitizer_receives_pointer_events() {
    let calls = Arc::new(DigitizerCalls::default());
    let mut canvas = canvas_with(FakeRenderer::new(Tally::default())).with_digitizer(Box::new(RecordingDigitizer {
        calls: calls.clone(),
    }));
    let label = canvas.add_text(TextInfo::new("label", Point::new(10.0, 10.0)));
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));

    assert_eq!(calls.draws.load(Ordering::SeqCst), 1);
    assert_eq!(canvas.surface(SurfaceKind::Vector).len(), 1);
    assert_eq!(*canvas.paint().get_pixel(50, 100), rgba(Color::RED));

    canvas.set_mouse_use(MouseUse::Pointer);
    canvas.handle_mouse(MouseEvent::left_down(12.0, 12.0));
    assert_eq!(calls.left_downs.load(Ordering::SeqCst), 1);
    assert_ne!(canvas.drag_id(), Some(label));

    canvas.handle_mouse(MouseEvent::RightUp {
        position: Point::new(50.0, 50.0),
    });
    assert_eq!(calls.right_ups.load(Ordering::SeqCst), 1);

    canvas.update_map(true, false);
    assert!(canvas.flush(Duration::from_secs(2)));
    assert_eq!(calls.draws.load(Ordering::SeqCst), 1);
}

#[test]
fn test_region_box_colour() {
    let mut canvas = MapCanvas::new(
        Box::new(FakeRenderer::new(Tally::default())),
        CanvasProperties {
            show_region_box: true,
            ..properties()
        },
    );
    canvas.update_map(true, true);
    assert!(canvas.flush(Duration::from_secs(2)));
    let pen = canvas.surface(SurfaceKind::Transparent).primitives().next().unwrap().pen;
    assert_eq!(pen.color, Color::BLUE.with_alpha(128));

    canvas.handle_key(KeyCode::Minus.into());
    assert!(canvas.flush(Duration::from_secs(2)));
    let pen = canvas.surface(SurfaceKind::Transparent).primitives().next().unwrap().pen;
    assert_eq!(pen.color, Color::RED.with_alpha(128));
}

#[test]
fn test_lat_long_zoom_out_is_clamped() {
    let mut renderer = FakeRenderer::new(Tally::default());
    renderer.region = Region::new(Extent::new(80.0, -80.0, 80.0, -80.0), 200, 200).with_projection(Projection::LatLong);
    let mut canvas = canvas_with(renderer);

    canvas.set_mouse_use(MouseUse::Zoom);
    canvas.set_zoom_type(-1);
    drag(&mut canvas, (50.0, 50.0), (150.0, 150.0));

    let extent = canvas.region().extent();
    assert_eq!((extent.n, extent.s), (90.0, -90.0));
    assert_eq!((extent.e, extent.w), (160.0, -160.0));
}
