//! Prelude module for common mapcanvas types and traits
//!
//! `use mapcanvas::prelude::*;` brings in what a host embedding the canvas
//! usually needs.

pub use crate::core::{
    bounds::Bounds,
    config::{CanvasProfile, CanvasProperties, WheelZoom},
    geo::{Extent, Point},
    history::ZoomHistory,
    region::{Projection, Region},
};

pub use crate::canvas::{MapCanvas, SaveRequest, SurfaceKind};

pub use crate::input::{
    events::{CanvasEvent, EventHandled, EventKind, KeyCode, KeyEvent, KeyModifiers, MouseButtons, MouseEvent},
    handler::{BoxKind, MouseUse},
};

pub use crate::layers::graphics::{
    CoordSpace, DrawStyle, GraphicsContext, GraphicsItem, GraphicsKind, GraphicsSet, GraphicsSetId,
    ItemId, LabelAlign,
};

pub use crate::plugins::digitizer::Digitizer;

pub use crate::rendering::{
    pen::{Brush, Color, Pen},
    renderer::{MapRenderer, Overlay, RenderOutcome, RenderRequest, RenderedMap},
    surface::{DrawId, DrawSurface, Shape},
    text::TextInfo,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::{AsyncRasterizer, AsyncRenderer, RasterJob, TokioSpawner};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
