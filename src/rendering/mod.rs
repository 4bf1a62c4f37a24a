pub mod pen;
pub mod raster;
pub mod renderer;
pub mod surface;
pub mod text;

// Re-export main types
pub use pen::{Brush, Color, Pen};
pub use renderer::{MapRenderer, Overlay, RenderDone, RenderOutcome, RenderRequest, RenderedMap};
pub use surface::{DrawId, DrawSurface, Shape};
pub use text::{MonospaceMetrics, TextInfo, TextMetrics};
