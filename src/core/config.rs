//! Canvas behaviour settings.
//!
//! [`CanvasProperties`] is an immutable snapshot handed to the canvas
//! explicitly; the canvas reads it once per frame and never reaches for global
//! settings. Presets are available through [`CanvasProfile`].

use crate::{
    core::constants::{DEFAULT_HIT_RADIUS, RESIZE_SETTLE_MS, WHEEL_UPDATE_DELAY_MS},
    rendering::pen::Color,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// How the mouse wheel zooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WheelZoom {
    /// Zoom by half the window and recenter on the cursor
    #[default]
    ZoomAndRecenter,
    /// Zoom keeping the point under the cursor fixed
    ZoomToCursor,
    /// Leave wheel events to the host
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasProperties {
    /// Re-render automatically on every update request
    pub auto_render: bool,
    /// Let the renderer align a new extent to the display aspect ratio
    pub align_extent: bool,
    /// Draw the computational region extent box
    pub show_region_box: bool,
    /// Render at the computational region resolution instead of the display one
    pub use_computational_resolution: bool,
    /// Force a real render whenever no map image is cached yet
    pub always_render: bool,
    /// Pick radius for decorations, in pixels
    pub hit_radius: f64,
    pub wheel_zoom: WheelZoom,
    /// Swap zoom in and zoom out for the wheel
    pub invert_scroll: bool,
    pub wheel_delay_ms: i64,
    pub resize_delay_ms: u64,
    /// Colour shown where nothing was rendered
    pub background: Color,
}

impl Default for CanvasProperties {
    fn default() -> Self {
        CanvasProfile::Interactive.resolve()
    }
}

impl CanvasProperties {
    /// Parses a JSON settings document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let properties: Self = serde_json::from_str(json)?;
        properties.validate()?;
        Ok(properties)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.hit_radius > 0.0) {
            return Err(MapError::Config(format!(
                "hit radius must be positive, got {}",
                self.hit_radius
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasProfile {
    /// Interactive map display with automatic re-rendering
    Interactive,
    /// Display that renders only on explicit request
    Static,
    Custom(CanvasProperties),
}

impl CanvasProfile {
    pub fn resolve(&self) -> CanvasProperties {
        match self {
            Self::Interactive => CanvasProperties {
                auto_render: true,
                align_extent: true,
                show_region_box: false,
                use_computational_resolution: false,
                always_render: false,
                hit_radius: DEFAULT_HIT_RADIUS,
                wheel_zoom: WheelZoom::ZoomAndRecenter,
                invert_scroll: false,
                wheel_delay_ms: WHEEL_UPDATE_DELAY_MS,
                resize_delay_ms: RESIZE_SETTLE_MS,
                background: Color::WHITE,
            },
            Self::Static => CanvasProperties {
                auto_render: false,
                wheel_zoom: WheelZoom::Disabled,
                ..Self::Interactive.resolve()
            },
            Self::Custom(properties) => properties.clone(),
        }
    }
}

impl Default for CanvasProfile {
    fn default() -> Self {
        Self::Interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let interactive = CanvasProfile::Interactive.resolve();
        assert!(interactive.auto_render);
        assert_eq!(interactive.hit_radius, 10.0);

        let fixed = CanvasProfile::Static.resolve();
        assert!(!fixed.auto_render);
        assert_eq!(fixed.wheel_zoom, WheelZoom::Disabled);
        assert_eq!(fixed.hit_radius, interactive.hit_radius);
    }

    #[test]
    fn test_from_json_partial() {
        let properties =
            CanvasProperties::from_json(r#"{"auto_render": false, "wheel_zoom": "zoom_to_cursor"}"#)
                .unwrap();
        assert!(!properties.auto_render);
        assert_eq!(properties.wheel_zoom, WheelZoom::ZoomToCursor);
        assert!(properties.align_extent);
    }

    #[test]
    fn test_invalid_hit_radius() {
        let err = CanvasProperties::from_json(r#"{"hit_radius": 0.0}"#).unwrap_err();
        assert!(matches!(err, MapError::Config(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let properties = CanvasProfile::Static.resolve();
        let json = properties.to_json().unwrap();
        assert_eq!(CanvasProperties::from_json(&json).unwrap(), properties);
    }
}
