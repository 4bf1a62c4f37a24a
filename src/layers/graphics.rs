//! Externally managed marker and line sets drawn on the canvas.
//!
//! Tools such as the digitizer or a network-analysis point list register a
//! [`GraphicsSet`] and keep mutating its items; the canvas replays every
//! registered set once per composite.

use crate::{
    core::{constants, geo::Point, region::Region, transform},
    rendering::{
        pen::{Brush, Color, Pen},
        surface::{DrawId, DrawSurface, Shape},
        text::TextInfo,
    },
    MapError, Result,
};
use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

static DEFAULT_PENS: Lazy<Vec<(&'static str, Pen)>> = Lazy::new(|| {
    vec![
        ("default", Pen::new(Color::BLACK, 2.0)),
        ("selected", Pen::new(Color::GREEN, 2.0)),
        ("unused", Pen::new(Color::LIGHT_GREY, 2.0)),
        ("highest", Pen::new(Color::RED, 2.0)),
    ]
});

/// Handle of a registered set, issued by the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphicsSetId(pub u32);

/// Handle of an item, unique within its set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphicsKind {
    /// Cross marker with an optional label
    Point,
    /// Polyline through all coordinates
    Line,
    /// Box spanned by the first two coordinates
    Rectangle,
}

/// Space item coordinates are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordSpace {
    #[default]
    Map,
    Pixel,
}

/// Where a cross label sits relative to the cross center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelAlign {
    UpperLeft,
    UpperRight,
    #[default]
    LowerRight,
    LowerLeft,
}

impl LabelAlign {
    fn anchor(self, center: Point, offset: Point) -> Point {
        match self {
            LabelAlign::UpperLeft => Point::new(center.x - offset.x, center.y - offset.y),
            LabelAlign::UpperRight => Point::new(center.x + offset.x, center.y - offset.y),
            LabelAlign::LowerRight => Point::new(center.x + offset.x, center.y + offset.y),
            LabelAlign::LowerLeft => Point::new(center.x - offset.x, center.y + offset.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsItem {
    id: ItemId,
    pub coords: Vec<Point>,
    pub pen_name: Option<String>,
    pub label: Option<String>,
    pub hidden: bool,
}

impl GraphicsItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// First coordinate; the position of point items
    pub fn position(&self) -> Option<Point> {
        self.coords.first().copied()
    }
}

/// Visual parameters handed to draw functions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub pen: Pen,
    /// Marker half size for point sets, in pixels
    pub size: f64,
    pub font_size: f64,
}

/// Drawing helpers bound to one surface and the region used to place map coordinates
pub struct GraphicsContext<'a> {
    pub surface: &'a mut DrawSurface,
    pub region: &'a Region,
    pub space: CoordSpace,
}

impl<'a> GraphicsContext<'a> {
    pub fn new(surface: &'a mut DrawSurface, region: &'a Region) -> Self {
        Self {
            surface,
            region,
            space: CoordSpace::Map,
        }
    }

    pub fn with_space(mut self, space: CoordSpace) -> Self {
        self.space = space;
        self
    }

    /// Places a coordinate of the current space on screen
    pub fn to_pixel(&self, coords: Point) -> Result<Point> {
        match self.space {
            CoordSpace::Pixel => Ok(coords),
            CoordSpace::Map => transform::geo_to_pixel(coords, self.region).ok_or_else(|| {
                MapError::InvalidCoordinates(format!("({}, {})", coords.x, coords.y))
            }),
        }
    }

    fn to_pixels(&self, coords: &[Point]) -> Result<Vec<Point>> {
        coords.iter().map(|p| self.to_pixel(*p)).collect()
    }

    /// Cross of half size `size` around a pixel center, plus an optional label.
    ///
    /// Returns the id of the cross; the label gets an id of its own.
    pub fn draw_cross(
        &mut self,
        center: Point,
        size: f64,
        pen: Pen,
        label: Option<TextInfo>,
        align: LabelAlign,
        id: Option<DrawId>,
    ) -> Option<DrawId> {
        log::trace!("draw cross at {:?} size {}", center, size);
        let segments = vec![
            (
                Point::new(center.x, center.y - size),
                Point::new(center.x, center.y + size),
            ),
            (
                Point::new(center.x - size, center.y),
                Point::new(center.x + size, center.y),
            ),
        ];
        let cross = self.surface.draw(Shape::Lines(segments), pen, Brush::default(), id);

        if let Some(mut label) = label {
            label.coords = align.anchor(center, Point::new(5.0, 5.0));
            self.surface
                .draw(Shape::Text(label), pen, Brush::default(), None);
        }
        cross
    }

    /// Connected path through pixel coordinates
    pub fn draw_polyline(&mut self, points: Vec<Point>, pen: Pen, id: Option<DrawId>) -> Option<DrawId> {
        if points.len() < 2 {
            return None;
        }
        self.surface.draw(Shape::Polyline(points), pen, Brush::default(), id)
    }

    /// Polyline through map coordinates of the current space
    pub fn draw_lines(&mut self, coords: &[Point], pen: Pen, id: Option<DrawId>) -> Result<Option<DrawId>> {
        let points = self.to_pixels(coords)?;
        Ok(self.draw_polyline(points, pen, id))
    }

    pub fn draw_rectangle(&mut self, a: Point, b: Point, pen: Pen, brush: Brush) -> Option<DrawId> {
        self.surface.draw(Shape::Box(a, b), pen, brush, None)
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64, pen: Pen, brush: Brush) -> Option<DrawId> {
        self.surface
            .draw(Shape::Circle { center, radius }, pen, brush, None)
    }

    pub fn draw_polygon(&mut self, points: Vec<Point>, pen: Pen, brush: Brush) -> Option<DrawId> {
        if points.len() < 3 {
            return None;
        }
        self.surface.draw(Shape::Polygon(points), pen, brush, None)
    }

    pub fn draw_text(&mut self, info: TextInfo, id: Option<DrawId>) -> Option<DrawId> {
        self.surface
            .draw(Shape::Text(info), Pen::default(), Brush::default(), id)
    }
}

/// Called before each item is drawn with its position in the draw order
pub type StatusCallback = Box<dyn FnMut(&mut GraphicsItem, usize) + Send>;

/// Replaces the default drawing of an item
pub type DrawCallback =
    Box<dyn FnMut(&mut GraphicsContext<'_>, &GraphicsItem, &DrawStyle) -> Result<()> + Send>;

/// An ordered collection of items drawn with one draw function
pub struct GraphicsSet {
    kind: GraphicsKind,
    space: CoordSpace,
    items: Vec<GraphicsItem>,
    pens: FxHashMap<String, Pen>,
    size: f64,
    font_size: f64,
    next_item: u32,
    status_fn: Option<StatusCallback>,
    draw_fn: Option<DrawCallback>,
}

impl fmt::Debug for GraphicsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsSet")
            .field("kind", &self.kind)
            .field("space", &self.space)
            .field("items", &self.items.len())
            .field("custom_draw", &self.draw_fn.is_some())
            .finish()
    }
}

impl GraphicsSet {
    pub fn new(kind: GraphicsKind) -> Self {
        Self {
            kind,
            space: CoordSpace::Map,
            items: Vec::new(),
            pens: DEFAULT_PENS
                .iter()
                .map(|(name, pen)| (name.to_string(), *pen))
                .collect(),
            size: constants::DEFAULT_MARKER_SIZE,
            font_size: 10.0,
            next_item: 0,
            status_fn: None,
            draw_fn: None,
        }
    }

    pub fn with_status<F>(mut self, status: F) -> Self
    where
        F: FnMut(&mut GraphicsItem, usize) + Send + 'static,
    {
        self.status_fn = Some(Box::new(status));
        self
    }

    pub fn with_draw<F>(mut self, draw: F) -> Self
    where
        F: FnMut(&mut GraphicsContext<'_>, &GraphicsItem, &DrawStyle) -> Result<()> + Send + 'static,
    {
        self.draw_fn = Some(Box::new(draw));
        self
    }

    pub fn with_space(mut self, space: CoordSpace) -> Self {
        self.space = space;
        self
    }

    pub fn kind(&self) -> GraphicsKind {
        self.kind
    }

    pub fn space(&self) -> CoordSpace {
        self.space
    }

    /// Appends an item at the end of the draw order
    pub fn add_item(
        &mut self,
        coords: Vec<Point>,
        pen_name: Option<&str>,
        label: Option<&str>,
        hidden: bool,
    ) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        self.items.push(GraphicsItem {
            id,
            coords,
            pen_name: pen_name.map(str::to_string),
            label: label.map(str::to_string),
            hidden,
        });
        id
    }

    pub fn delete_item(&mut self, id: ItemId) -> bool {
        match self.position_of(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Items in draw order
    pub fn items(&self) -> &[GraphicsItem] {
        &self.items
    }

    /// Item drawn at position `draw_num`
    pub fn item(&self, draw_num: usize) -> Option<&GraphicsItem> {
        self.items.get(draw_num)
    }

    pub fn item_by_id(&self, id: ItemId) -> Option<&GraphicsItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut GraphicsItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn item_draw_order(&self, id: ItemId) -> Option<usize> {
        self.position_of(id)
    }

    /// Moves an item to position `draw_num`; false when either is unknown
    pub fn set_item_draw_order(&mut self, id: ItemId, draw_num: usize) -> bool {
        if draw_num >= self.items.len() {
            return false;
        }
        let Some(index) = self.position_of(id) else {
            return false;
        };
        let item = self.items.remove(index);
        self.items.insert(draw_num, item);
        true
    }

    /// Registers a named pen; false if the name is taken
    pub fn add_pen(&mut self, name: &str, pen: Pen) -> bool {
        if self.pens.contains_key(name) {
            return false;
        }
        self.pens.insert(name.to_string(), pen);
        true
    }

    pub fn pen(&self, name: &str) -> Option<Pen> {
        self.pens.get(name).copied()
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size;
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Draws every visible item in list order.
    ///
    /// The status callback sees every item, hidden ones included, so the order
    /// number it receives always equals the item's list position.
    pub fn draw(&mut self, surface: &mut DrawSurface, region: &Region) -> Result<()> {
        let mut ctx = GraphicsContext::new(surface, region).with_space(self.space);
        let fallback = self
            .pens
            .get("default")
            .copied()
            .unwrap_or_else(|| Pen::new(Color::BLACK, 2.0));

        for (order, item) in self.items.iter_mut().enumerate() {
            if let Some(status) = self.status_fn.as_mut() {
                status(item, order);
            }
            if item.hidden {
                continue;
            }

            let pen = item
                .pen_name
                .as_deref()
                .and_then(|name| self.pens.get(name).copied())
                .unwrap_or(fallback);
            let style = DrawStyle {
                pen,
                size: self.size,
                font_size: self.font_size,
            };

            match self.draw_fn.as_mut() {
                Some(draw) => draw(&mut ctx, item, &style)?,
                None => draw_default(self.kind, &mut ctx, item, &style)?,
            }
        }
        Ok(())
    }

    fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

fn draw_default(
    kind: GraphicsKind,
    ctx: &mut GraphicsContext<'_>,
    item: &GraphicsItem,
    style: &DrawStyle,
) -> Result<()> {
    match kind {
        GraphicsKind::Point => {
            let Some(position) = item.position() else {
                return Ok(());
            };
            let center = ctx.to_pixel(position)?;
            let label = item.label.as_ref().map(|text| {
                TextInfo::new(text.clone(), center)
                    .with_color(style.pen.color)
                    .with_font_size(style.font_size)
            });
            ctx.draw_cross(center, style.size, style.pen, label, LabelAlign::LowerRight, None);
        }
        GraphicsKind::Line => {
            ctx.draw_lines(&item.coords, style.pen, None)?;
        }
        GraphicsKind::Rectangle => {
            if let [a, b, ..] = item.coords.as_slice() {
                let (a, b) = (ctx.to_pixel(*a)?, ctx.to_pixel(*b)?);
                ctx.draw_rectangle(a, b, style.pen, Brush::default());
            }
        }
    }
    Ok(())
}
