//! Mouse and keyboard dispatch.
//!
//! Every raw event enters through [`MapCanvas::handle_mouse`] or
//! [`MapCanvas::handle_key`] and is routed by the current [`MouseUse`] mode.

use super::{Damage, MapCanvas};
use crate::{
    core::{
        config::WheelZoom,
        constants,
        geo::{Extent, Point},
        region::Region,
        zoom::{self, ZoomDirection},
    },
    input::{
        events::{CanvasEvent, EventHandled, KeyCode, KeyEvent, MouseButtons, MouseEvent},
        handler::{BoxKind, MouseUse},
    },
    plugins::digitizer::Digitizer,
    rendering::{pen::Brush, surface::{DrawId, Shape}},
    Result,
};

impl MapCanvas {
    /// Dispatches one pointer event
    pub fn handle_mouse(&mut self, event: MouseEvent) -> EventHandled {
        match event {
            MouseEvent::Wheel { position, rotation } => return self.on_mouse_wheel(position, rotation),
            MouseEvent::LeftDown { position, ctrl } => self.on_left_down(position, ctrl),
            MouseEvent::LeftUp { position } => self.on_left_up(position),
            MouseEvent::Motion { position, buttons } if buttons.any() => self.on_dragging(position, buttons),
            MouseEvent::Motion { position, .. } => self.on_mouse_moving(position),
            MouseEvent::DoubleClick { position } => self.on_double_click(position),
            MouseEvent::MiddleDown { position } => self.mouse.begin = position,
            MouseEvent::MiddleUp { position } => self.on_middle_up(position),
            MouseEvent::RightDown { position } => {
                self.forward_to_digitizer(|d, region| d.on_right_down(position, region));
            }
            MouseEvent::RightUp { position } => self.on_right_up(position),
            MouseEvent::Enter => self.emit(CanvasEvent::MouseEntered),
            MouseEvent::Leave => return EventHandled::NotHandled,
        }
        EventHandled::Handled
    }

    /// Dispatches one key press
    pub fn handle_key(&mut self, event: KeyEvent) -> EventHandled {
        let (width, height) = (self.width as f64, self.height as f64);
        match event.key {
            KeyCode::ArrowUp => {
                self.pan_by(0.0, -height / 4.0);
            }
            KeyCode::ArrowDown => {
                self.pan_by(0.0, height / 4.0);
            }
            KeyCode::ArrowLeft => {
                self.pan_by(-width / 4.0, 0.0);
            }
            KeyCode::ArrowRight => {
                self.pan_by(width / 4.0, 0.0);
            }
            KeyCode::Plus | KeyCode::Minus => {
                let zoom_type = if event.key == KeyCode::Plus { 1 } else { -1 };
                let center = Point::new(width / 2.0, height / 2.0);
                let (begin, end) = zoom::zoom_to_point_and_recenter(
                    center,
                    ZoomDirection::from_sign(zoom_type),
                    width,
                    height,
                );
                self.zoom(begin, end, zoom_type);
                self.update_map(true, true);
            }
            KeyCode::Escape => {
                self.mouse.start(Point::default());
                self.drag_id = None;
                self.drag_offset = None;
                self.remove_rubber_band();
            }
            KeyCode::Other(_) => return EventHandled::NotHandled,
        }
        EventHandled::Handled
    }

    fn on_mouse_wheel(&mut self, position: Point, rotation: i32) -> EventHandled {
        let behaviour = self.properties.wheel_zoom;
        if behaviour == WheelZoom::Disabled || rotation == 0 {
            return EventHandled::NotHandled;
        }
        log::trace!("MapCanvas::on_mouse_wheel(): wheel={}", rotation);

        let mut zoom_type = if rotation > 0 { 1 } else { -1 };
        if self.properties.invert_scroll {
            zoom_type = -zoom_type;
        }
        let (width, height) = (self.width as f64, self.height as f64);
        let (begin, end) = match behaviour {
            WheelZoom::ZoomToCursor => zoom::zoom_to_cursor(position, width, height),
            _ => zoom::zoom_to_point_and_recenter(
                position,
                ZoomDirection::from_sign(zoom_type),
                width,
                height,
            ),
        };

        self.zoom(begin, end, zoom_type);
        self.request_update(true, true, self.properties.wheel_delay_ms, false);
        EventHandled::Handled
    }

    fn on_left_down(&mut self, position: Point, ctrl: bool) {
        log::trace!("MapCanvas::on_left_down(): use={:?}", self.mouse.use_mode);
        self.mouse.start(position);
        self.drag_offset = None;

        if self.mouse.use_mode == MouseUse::Pointer
            && !self.forward_to_digitizer(|d, region| d.on_left_down(position, ctrl, region))
        {
            self.last_pos = position;
            self.drag_id = self
                .base
                .find_objects(position, self.properties.hit_radius)
                .into_iter()
                .find(|id| id.0 != constants::BASE_IMAGE_ID);
        }

        if let Some(coords) = self.pixel_to_geo(position) {
            self.emit(CanvasEvent::MouseLeftDown {
                x: coords.x,
                y: coords.y,
            });
        }
    }

    fn on_dragging(&mut self, position: Point, buttons: MouseButtons) {
        let moved = position.subtract(&self.mouse.begin);
        let digitizing = self.digitizer_active();

        if self.mouse.use_mode == MouseUse::Pan || buttons.middle {
            self.drag_map(moved);
        } else if self.mouse.use_mode == MouseUse::Pointer && !digitizing && self.drag_id.is_some() {
            if let Some(id) = self.drag_id {
                self.drag_item(id, position);
            }
        } else {
            if self.mouse.use_mode == MouseUse::Pointer && !digitizing {
                return;
            }
            self.mouse.end = position;
            let suppressed = self
                .digitizer
                .as_ref()
                .is_some_and(|d| d.is_active() && d.suppresses_rubber_band());
            if buttons.left && !suppressed {
                self.mouse_draw();
            }
        }
    }

    fn on_left_up(&mut self, position: Point) {
        log::trace!("MapCanvas::on_left_up(): use={:?}", self.mouse.use_mode);
        self.mouse.end = position;
        let coords = self.pixel_to_geo(position);

        match self.mouse.use_mode.clone() {
            MouseUse::Zoom | MouseUse::Pan => {
                let (mut begin, mut end) = (self.mouse.begin, self.mouse.end);
                let zoom_type = self.mouse.zoom_type;
                // a click without a box zooms around the click point
                if self.mouse.use_mode == MouseUse::Zoom && (begin.x == end.x || begin.y == end.y) {
                    (begin, end) = zoom::zoom_to_point_and_recenter(
                        end,
                        ZoomDirection::from_sign(zoom_type),
                        self.width as f64,
                        self.height as f64,
                    );
                }
                self.drag_offset = None;
                self.remove_rubber_band();
                self.zoom(begin, end, zoom_type);
                self.update_map(true, true);
            }
            MouseUse::Query => self.emit(CanvasEvent::MapQueried {
                x: position.x,
                y: position.y,
            }),
            MouseUse::Pointer => {
                if !self.forward_to_digitizer(|d, region| d.on_left_up(position, region)) {
                    self.end_drag_item();
                    if let Some(coords) = coords {
                        self.emit(CanvasEvent::MouseLeftUpPointer {
                            x: coords.x,
                            y: coords.y,
                        });
                    }
                }
            }
            MouseUse::DrawRegion => {
                self.remove_rubber_band();
                if let (Some(begin), Some(end)) = (self.pixel_to_geo(self.mouse.begin), coords) {
                    let extent = Extent::from_corners(begin, end);
                    match self.set_computational_extent(extent) {
                        Ok(()) => self.emit(CanvasEvent::RegionDrawn { extent }),
                        Err(e) => log::error!("cannot set computational region: {}", e),
                    }
                }
                self.update_map(false, true);
            }
            MouseUse::Measure => {
                self.remove_rubber_band();
                if let Some(coords) = coords {
                    self.add_polycoord(coords);
                    self.draw_lines();
                }
            }
            MouseUse::Tool(_) => {}
        }

        if let Some(coords) = coords {
            self.emit(CanvasEvent::MouseLeftUp {
                x: coords.x,
                y: coords.y,
            });
        }
    }

    fn on_double_click(&mut self, position: Point) {
        if self.mouse.use_mode == MouseUse::Pointer {
            let hit = self
                .base
                .find_objects(position, self.properties.hit_radius)
                .first()
                .copied();
            if let Some(id) = hit.filter(|id| id.0 != constants::BASE_IMAGE_ID) {
                self.drag_id = Some(id);
                self.emit(CanvasEvent::OverlayActivated { id: id.0 });
            }
        }
        if let Some(coords) = self.pixel_to_geo(position) {
            self.emit(CanvasEvent::MouseDClick {
                x: coords.x,
                y: coords.y,
            });
        }
    }

    fn on_right_up(&mut self, position: Point) {
        self.forward_to_digitizer(|d, region| d.on_right_up(position, region));
        self.redraw_all = true;
        self.damage = Damage::Full;
        if let Some(coords) = self.pixel_to_geo(position) {
            self.emit(CanvasEvent::MouseRightUp {
                x: coords.x,
                y: coords.y,
            });
        }
    }

    fn on_middle_up(&mut self, position: Point) {
        self.mouse.end = position;
        self.drag_offset = None;
        let (begin, end) = (self.mouse.begin, self.mouse.end);
        self.zoom(begin, end, 0);
        self.update_map(true, true);
    }

    fn on_mouse_moving(&mut self, position: Point) {
        if let Some(coords) = self.pixel_to_geo(position) {
            self.emit(CanvasEvent::MouseMoving {
                x: coords.x,
                y: coords.y,
            });
        }
        if self.mouse.use_mode == MouseUse::Pointer {
            self.forward_to_digitizer(|d, region| d.on_mouse_moving(position, region));
        }

        let over_overlay = self
            .base
            .find_objects(position, self.properties.hit_radius)
            .iter()
            .any(|id| self.overlays.contains_key(&id.0));
        self.tooltip = over_overlay.then_some(constants::OVERLAY_TOOLTIP);
    }

    /// Shifts the whole frame as a preview of a pan; nothing is re-rendered
    fn drag_map(&mut self, offset: Point) {
        if !self.properties.auto_render {
            return;
        }
        self.drag_offset = Some(offset);
    }

    /// Moves a decoration or text label by the pointer movement since the
    /// last drag step
    fn drag_item(&mut self, id: DrawId, position: Point) {
        if id.0 == constants::BASE_IMAGE_ID {
            return;
        }
        log::trace!("MapCanvas::drag_item(): id={}", id.0);
        let dx = position.x - self.last_pos.x;
        let dy = position.y - self.last_pos.y;

        let mut before = self.base.get_bounds(id);
        if self.texts.contains_key(&id) {
            // rotated labels may reach above and left of their box
            before = before.union(&before.translated(0.0, -before.height()));
            before = before.union(&before.translated(-before.width(), 0.0));
        }

        self.base.translate_id(id, dx, dy);
        let after = self.base.get_bounds(id);
        if let Some(info) = self.texts.get_mut(&id) {
            info.coords = info.coords.add(&Point::new(dx, dy));
        }

        self.invalidate(Some(before.union(&after)));
        self.last_pos = position;
    }

    /// Commits the dragged decoration position
    fn end_drag_item(&mut self) {
        let Some(id) = self.drag_id.take() else {
            return;
        };
        let bounds = self.base.get_bounds(id);
        if let Some(overlay) = self.overlays.get_mut(&id.0) {
            overlay.coords = bounds.min;
        }
    }

    /// Redraws the rubber band from the gesture begin to its end
    fn mouse_draw(&mut self) {
        let (begin, end) = (self.mouse.begin, self.mouse.end);
        let shape = match self.mouse.box_kind {
            BoxKind::Box => Shape::Box(begin, end),
            BoxKind::Line => Shape::Line(begin, end),
            BoxKind::None => return,
        };
        log::trace!(
            "MapCanvas::mouse_draw(): use={:?}, box={:?}, begin={:?}, end={:?}",
            self.mouse.use_mode,
            self.mouse.box_kind,
            begin,
            end
        );

        self.remove_rubber_band();
        let id = DrawId(constants::RUBBER_BAND_ID);
        self.ephemeral.draw(shape, self.pen, Brush::TRANSPARENT, Some(id));
        self.invalidate(Some(self.ephemeral.get_bounds(id)));
    }

    fn remove_rubber_band(&mut self) {
        let id = DrawId(constants::RUBBER_BAND_ID);
        if self.ephemeral.contains(id) {
            let bounds = self.ephemeral.get_bounds(id);
            self.ephemeral.remove_id(id);
            self.invalidate(Some(bounds));
        }
    }

    /// Sets the computational region to `extent` at its current resolution
    fn set_computational_extent(&mut self, extent: Extent) -> Result<()> {
        let computational = self.renderer.computational_region();
        self.renderer
            .set_computational_region(extent, computational.ewres, computational.nsres)
    }

    fn digitizer_active(&self) -> bool {
        self.digitizer.as_ref().is_some_and(|d| d.is_active())
    }

    /// Hands an event to the active digitizer. Returns false when there is none.
    fn forward_to_digitizer<F>(&mut self, hook: F) -> bool
    where
        F: FnOnce(&mut dyn Digitizer, &Region) -> Result<()>,
    {
        let Some(digitizer) = self.digitizer.as_mut().filter(|d| d.is_active()) else {
            return false;
        };
        if let Err(e) = hook(&mut **digitizer, self.renderer.region()) {
            log::warn!("{} failed to handle mouse event: {}", digitizer.name(), e);
        }
        true
    }
}
