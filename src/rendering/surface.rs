//! Retained-mode draw surfaces.
//!
//! A [`DrawSurface`] records primitives under integer ids and replays them in
//! insertion order when composited. Primitives live in an arena; the id map
//! points at arena slots, so removing or translating one primitive never
//! disturbs the handles of the others.

use crate::{
    core::{bounds::Bounds, constants, geo::Point},
    rendering::{
        pen::{Brush, Color, Pen},
        raster::{self, ClipRect},
        text::{self, MonospaceMetrics, TextInfo, TextMetrics},
    },
};
use fxhash::FxHashMap;
use image::RgbaImage;
use std::sync::Arc;

/// Handle of a primitive on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawId(pub u32);

impl From<u32> for DrawId {
    fn from(id: u32) -> Self {
        DrawId(id)
    }
}

/// Something that can be drawn on a surface
#[derive(Debug, Clone)]
pub enum Shape {
    /// Wipes the surface
    Clear,
    Image {
        image: Arc<RgbaImage>,
        origin: Point,
    },
    /// Rectangle spanned by two opposite corners
    Box(Point, Point),
    Line(Point, Point),
    /// Connected path, N-1 segments for N points
    Polyline(Vec<Point>),
    /// Independent segments sharing one id
    Lines(Vec<(Point, Point)>),
    Polygon(Vec<Point>),
    Circle {
        center: Point,
        radius: f64,
    },
    Point(Point),
    Text(TextInfo),
}

impl Shape {
    /// Circle inscribed in the horizontal span of a two-corner box
    pub fn circle_from_corners(a: Point, b: Point) -> Shape {
        let radius = (b.x - a.x).abs() / 2.0;
        Shape::Circle {
            center: Point::new(a.x.min(b.x) + radius, a.y.min(b.y) + radius),
            radius,
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let d = Point::new(dx, dy);
        match self {
            Shape::Clear => {}
            Shape::Image { origin, .. } => *origin = origin.add(&d),
            Shape::Box(a, b) | Shape::Line(a, b) => {
                *a = a.add(&d);
                *b = b.add(&d);
            }
            Shape::Polyline(points) | Shape::Polygon(points) => {
                for p in points.iter_mut() {
                    *p = p.add(&d);
                }
            }
            Shape::Lines(segments) => {
                for (a, b) in segments.iter_mut() {
                    *a = a.add(&d);
                    *b = b.add(&d);
                }
            }
            Shape::Circle { center, .. } => *center = center.add(&d),
            Shape::Point(p) => *p = p.add(&d),
            Shape::Text(info) => info.coords = info.coords.add(&d),
        }
    }
}

/// A recorded primitive with its hit-test bounds
#[derive(Debug, Clone)]
pub struct Primitive {
    pub id: DrawId,
    pub shape: Shape,
    pub pen: Pen,
    pub brush: Brush,
    pub bounds: Bounds,
}

/// An ordered, id-addressable drawing target
#[derive(Debug, Clone)]
pub struct DrawSurface {
    name: &'static str,
    background: Color,
    slots: Vec<Option<Primitive>>,
    index: FxHashMap<DrawId, usize>,
    next_id: u32,
    dirty: Option<Bounds>,
    revision: u64,
    metrics: Arc<dyn TextMetrics>,
}

impl DrawSurface {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            background: Color::TRANSPARENT,
            slots: Vec::new(),
            index: FxHashMap::default(),
            next_id: constants::FIRST_AUTO_ID,
            dirty: None,
            revision: 0,
            metrics: Arc::new(MonospaceMetrics::default()),
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
        self.touch(None);
    }

    pub fn metrics(&self) -> &dyn TextMetrics {
        self.metrics.as_ref()
    }

    /// Bumped on every mutation; compositors use it to validate caches
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Starts collecting the area touched by subsequent operations
    pub fn begin_draw(&mut self) {
        self.dirty = None;
    }

    /// Area touched since [`begin_draw`](Self::begin_draw), if any
    pub fn end_draw(&mut self) -> Option<Bounds> {
        self.dirty.take()
    }

    /// Hands out a fresh id without drawing anything.
    ///
    /// Saturates at `u32::MAX`, which is then handed out again.
    pub fn new_id(&mut self) -> DrawId {
        let id = DrawId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Records `shape`. Drawing again under an existing id replaces that
    /// primitive without changing its stacking position.
    ///
    /// Returns the id used, or `None` for [`Shape::Clear`] and inactive text.
    pub fn draw(
        &mut self,
        shape: Shape,
        pen: Pen,
        brush: Brush,
        id: Option<DrawId>,
    ) -> Option<DrawId> {
        if matches!(shape, Shape::Clear) {
            self.clear();
            return None;
        }
        if let Shape::Text(info) = &shape {
            if !info.active {
                return None;
            }
        }

        let id = match id {
            Some(id) => {
                if id.0 >= self.next_id {
                    self.next_id = id.0.saturating_add(1);
                }
                id
            }
            None => self.new_id(),
        };
        let bounds = self.shape_bounds(&shape);
        log::trace!("{}: draw {} id={} bounds={:?}", self.name, kind_name(&shape), id.0, bounds);

        let primitive = Primitive {
            id,
            shape,
            pen,
            brush,
            bounds,
        };
        match self.index.get(&id).copied() {
            Some(slot) => {
                if let Some(old) = self.slots[slot].replace(primitive) {
                    self.touch(Some(old.bounds));
                }
            }
            None => {
                self.index.insert(id, self.slots.len());
                self.slots.push(Some(primitive));
            }
        }
        self.touch(Some(bounds));
        Some(id)
    }

    /// Removes every primitive
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.touch(None);
    }

    pub fn remove_id(&mut self, id: DrawId) {
        if let Some(slot) = self.index.remove(&id) {
            if let Some(old) = self.slots[slot].take() {
                self.touch(Some(old.bounds));
            }
            self.compact_if_sparse();
        }
    }

    /// Moves one primitive by a pixel offset; unknown ids are ignored
    pub fn translate_id(&mut self, id: DrawId, dx: f64, dy: f64) {
        let Some(&slot) = self.index.get(&id) else {
            return;
        };
        let Some(primitive) = self.slots[slot].as_mut() else {
            return;
        };
        let old = primitive.bounds;
        primitive.shape.translate(dx, dy);
        primitive.bounds = old.translated(dx, dy);
        let new = primitive.bounds;
        self.touch(Some(old.union(&new)));
    }

    /// Hit-test bounds of `id`, or a zero rectangle when unknown
    pub fn get_bounds(&self, id: DrawId) -> Bounds {
        self.primitive(id).map(|p| p.bounds).unwrap_or_default()
    }

    /// Overrides the hit-test bounds of `id`
    pub fn set_bounds(&mut self, id: DrawId, bounds: Bounds) {
        if let Some(&slot) = self.index.get(&id) {
            if let Some(primitive) = self.slots[slot].as_mut() {
                primitive.bounds = bounds;
            }
        }
    }

    pub fn contains(&self, id: DrawId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn primitive(&self, id: DrawId) -> Option<&Primitive> {
        self.index
            .get(&id)
            .and_then(|&slot| self.slots.get(slot))
            .and_then(|p| p.as_ref())
    }

    pub fn shape(&self, id: DrawId) -> Option<&Shape> {
        self.primitive(id).map(|p| &p.shape)
    }

    /// Live primitives in stacking order, bottom first
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.slots.iter().flatten()
    }

    pub fn ids(&self) -> Vec<DrawId> {
        self.primitives().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ids whose bounds come within `radius` of `point`, topmost first
    pub fn find_objects(&self, point: Point, radius: f64) -> Vec<DrawId> {
        self.slots
            .iter()
            .rev()
            .flatten()
            .filter(|p| p.bounds.inflated(radius, radius).contains(&point))
            .map(|p| p.id)
            .collect()
    }

    /// Replays the surface onto `target`.
    ///
    /// Opaque surfaces paint their background first; transparent ones only
    /// contribute what was drawn on them, alpha blended.
    pub fn composite_onto(&self, target: &mut RgbaImage, clip: Option<&Bounds>, transparent: bool) {
        let clip = ClipRect::for_image(target, clip);
        if clip.is_empty() {
            return;
        }
        if !transparent {
            raster::clear(target, self.background, &clip);
        }
        for primitive in self.primitives() {
            self.rasterize(target, primitive, &clip);
        }
    }

    fn rasterize(&self, target: &mut RgbaImage, p: &Primitive, clip: &ClipRect) {
        let fill = (!p.brush.is_transparent()).then_some(p.brush.color);
        match &p.shape {
            Shape::Clear => {}
            Shape::Image { image, origin } => raster::blit(
                target,
                image,
                origin.x.round() as i64,
                origin.y.round() as i64,
                true,
                clip,
            ),
            Shape::Box(a, b) => {
                let rect = Bounds::from_corners(*a, *b);
                if let Some(color) = fill {
                    raster::fill_rect(target, &rect, color, clip);
                }
                raster::stroke_rect(target, &rect, &p.pen, clip);
            }
            Shape::Line(a, b) => raster::stroke_line(target, *a, *b, &p.pen, clip),
            Shape::Polyline(points) => raster::stroke_polyline(target, points, &p.pen, clip),
            Shape::Lines(segments) => {
                for (a, b) in segments {
                    raster::stroke_line(target, *a, *b, &p.pen, clip);
                }
            }
            Shape::Polygon(points) => {
                if let Some(color) = fill {
                    raster::fill_polygon(target, points, color, clip);
                }
                if let Some(first) = points.first() {
                    let mut ring = points.clone();
                    ring.push(*first);
                    raster::stroke_polyline(target, &ring, &p.pen, clip);
                }
            }
            Shape::Circle { center, radius } => {
                raster::draw_circle(target, *center, *radius, &p.pen, fill, clip)
            }
            Shape::Point(point) => raster::stroke_line(target, *point, *point, &p.pen, clip),
            Shape::Text(info) => self.rasterize_text(target, info, clip),
        }
    }

    /// Glyphs are approximated by solid cells; real text shaping is the
    /// business of whoever supplies the [`TextMetrics`].
    fn rasterize_text(&self, target: &mut RgbaImage, info: &TextInfo, clip: &ClipRect) {
        let (w, h) = self.metrics.extent(&info.text, info.font_size);
        if let Some(background) = info.background {
            let quad = text::text_quad(info.coords, w, h, info.rotation);
            raster::fill_polygon(target, &quad, background, clip);
        }

        let r = info.rotation.to_radians();
        let along = Point::new(r.cos(), -r.sin());
        let down = Point::new(r.sin(), r.cos());
        let line_height = h / info.text.lines().count().max(1) as f64;
        let (cell_w, _) = self.metrics.extent("M", info.font_size);

        for (row, line) in info.text.lines().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let origin = info
                    .coords
                    .add(&along.multiply(col as f64 * cell_w + cell_w * 0.15))
                    .add(&down.multiply(row as f64 * line_height + line_height * 0.2));
                let quad = text::text_quad(origin, cell_w * 0.7, line_height * 0.6, info.rotation);
                raster::fill_polygon(target, &quad, info.color, clip);
            }
        }
    }

    fn shape_bounds(&self, shape: &Shape) -> Bounds {
        match shape {
            Shape::Clear => Bounds::default(),
            Shape::Image { image, origin } => Bounds::from_origin_and_size(
                origin.x,
                origin.y,
                image.width() as f64,
                image.height() as f64,
            ),
            Shape::Box(a, b) | Shape::Line(a, b) => Bounds::from_corners(*a, *b),
            Shape::Polyline(points) | Shape::Polygon(points) => {
                Bounds::from_points(points).unwrap_or_default()
            }
            Shape::Lines(segments) => {
                let points: Vec<Point> = segments.iter().flat_map(|(a, b)| [*a, *b]).collect();
                Bounds::from_points(&points).unwrap_or_default()
            }
            Shape::Circle { center, radius } => Bounds::from_coords(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
            Shape::Point(p) => {
                let half = constants::POINT_HIT_HALF_SIZE;
                Bounds::from_coords(p.x - half, p.y - half, p.x + half, p.y + half)
            }
            Shape::Text(info) => text::text_bounds(info, self.metrics.as_ref()).bbox,
        }
    }

    /// `None` marks the whole surface as touched
    fn touch(&mut self, area: Option<Bounds>) {
        self.revision += 1;
        let area = area.unwrap_or_else(|| Bounds::from_coords(f64::MIN, f64::MIN, f64::MAX, f64::MAX));
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(&area),
            None => area,
        });
    }

    fn compact_if_sparse(&mut self) {
        let live = self.index.len();
        if self.slots.len() < 64 || live * 2 > self.slots.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (slot, primitive) in self.slots.iter().enumerate() {
            if let Some(p) = primitive {
                self.index.insert(p.id, slot);
            }
        }
    }
}

fn kind_name(shape: &Shape) -> &'static str {
    match shape {
        Shape::Clear => "clear",
        Shape::Image { .. } => "image",
        Shape::Box(..) => "box",
        Shape::Line(..) => "line",
        Shape::Polyline(_) => "polyline",
        Shape::Lines(_) => "lines",
        Shape::Polygon(_) => "polygon",
        Shape::Circle { .. } => "circle",
        Shape::Point(_) => "point",
        Shape::Text(_) => "text",
    }
}
