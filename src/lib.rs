//! # mapcanvas
//!
//! A buffered, retained-mode map canvas for interactive 2D geospatial viewers.
//!
//! The canvas owns a stack of offscreen draw surfaces, converts between screen
//! pixels and geographic coordinates, coalesces bursts of re-render requests
//! into a single render pass, and turns mouse and keyboard input into zoom,
//! pan, drag and query operations. Rasterizing the actual map layers is left to
//! an external [`MapRenderer`].

pub mod background;
pub mod canvas;
pub mod core;
pub mod input;
pub mod layers;
pub mod plugins;
pub mod prelude;
pub mod rendering;
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::{CanvasProfile, CanvasProperties, WheelZoom},
    geo::{Extent, Point},
    history::ZoomHistory,
    region::{Projection, Region},
};

pub use canvas::MapCanvas;

pub use background::coalescer::{CoalesceState, RenderCoalescer, UpdateFlags};

pub use input::{
    events::{CanvasEvent, EventKind, KeyCode, KeyEvent, MouseEvent},
    handler::{BoxKind, EventManager, MouseUse},
};

pub use layers::graphics::{GraphicsItem, GraphicsKind, GraphicsSet, GraphicsSetId, ItemId};

pub use plugins::digitizer::Digitizer;

pub use rendering::{
    pen::{Brush, Color, Pen},
    renderer::{MapRenderer, Overlay, RenderDone, RenderOutcome, RenderRequest, RenderedMap},
    surface::{DrawId, DrawSurface, Shape},
    text::{TextInfo, TextMetrics},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Graphics error: {0}")]
    Graphics(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Draw id {0} is reserved")]
    ReservedId(u32),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Does nothing when a logger is already installed.
#[cfg(feature = "debug")]
pub fn init_logging() {
    if env_logger::Builder::from_default_env().try_init().is_err() {
        log::debug!("logger already initialised");
    }
}
