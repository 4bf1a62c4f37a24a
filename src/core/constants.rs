//! Canvas-wide magic numbers kept in one place.

/// Reserved draw id of the rendered base map image; never draggable.
pub const BASE_IMAGE_ID: u32 = 99;

/// First draw id handed out automatically by a surface.
pub const FIRST_AUTO_ID: u32 = 1000;

/// Draw id of the rubber-band box or line on the ephemeral surface.
pub const RUBBER_BAND_ID: u32 = 100;

/// Draw id of the accumulated rubber-band polyline (measurements, profiles).
pub const POLYLINE_ID: u32 = 101;

/// Number of extents kept by the zoom history.
pub const ZOOM_HISTORY_CAPACITY: usize = 10;

/// Zoom boxes must be larger than this many pixels in both directions.
pub const ZOOM_BOX_THRESHOLD: f64 = 5.0;

/// Pixel radius used to pick decorations under the cursor.
pub const DEFAULT_HIT_RADIUS: f64 = 10.0;

/// Delay merging consecutive mouse-wheel zoom steps, in milliseconds.
pub const WHEEL_UPDATE_DELAY_MS: i64 = 200;

/// Settle time after the last resize before re-rendering, in milliseconds.
pub const RESIZE_SETTLE_MS: u64 = 200;

/// Half size of the hit box recorded for a single point primitive.
pub const POINT_HIT_HALF_SIZE: f64 = 5.0;

/// Inflation applied to invalidated rectangles so pen widths are covered.
pub const REFRESH_MARGIN: f64 = 4.0;

/// Default marker size of point graphics sets, in pixels.
pub const DEFAULT_MARKER_SIZE: f64 = 5.0;

/// Tooltip shown while hovering a decoration overlay.
pub const OVERLAY_TOOLTIP: &str = "Right click to modify or remove";
