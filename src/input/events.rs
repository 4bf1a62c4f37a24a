use crate::{
    core::geo::{Extent, Point},
    layers::graphics::GraphicsSetId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Mouse buttons held during a motion event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseButtons {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
}

impl MouseButtons {
    pub const NONE: MouseButtons = MouseButtons {
        left: false,
        middle: false,
        right: false,
    };
    pub const LEFT: MouseButtons = MouseButtons {
        left: true,
        middle: false,
        right: false,
    };
    pub const MIDDLE: MouseButtons = MouseButtons {
        left: false,
        middle: true,
        right: false,
    };

    pub fn any(&self) -> bool {
        self.left || self.middle || self.right
    }
}

/// Raw pointer input delivered to the canvas, positions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MouseEvent {
    /// Wheel turned; positive rotation moves away from the user
    Wheel { position: Point, rotation: i32 },
    LeftDown { position: Point, ctrl: bool },
    LeftUp { position: Point },
    DoubleClick { position: Point },
    MiddleDown { position: Point },
    MiddleUp { position: Point },
    RightDown { position: Point },
    RightUp { position: Point },
    /// Pointer moved; dragging when any button is held
    Motion { position: Point, buttons: MouseButtons },
    Enter,
    Leave,
}

impl MouseEvent {
    pub fn left_down(x: f64, y: f64) -> Self {
        MouseEvent::LeftDown {
            position: Point::new(x, y),
            ctrl: false,
        }
    }

    pub fn left_up(x: f64, y: f64) -> Self {
        MouseEvent::LeftUp {
            position: Point::new(x, y),
        }
    }

    pub fn drag(x: f64, y: f64) -> Self {
        MouseEvent::Motion {
            position: Point::new(x, y),
            buttons: MouseButtons::LEFT,
        }
    }

    pub fn moving(x: f64, y: f64) -> Self {
        MouseEvent::Motion {
            position: Point::new(x, y),
            buttons: MouseButtons::NONE,
        }
    }

    pub fn wheel(x: f64, y: f64, rotation: i32) -> Self {
        MouseEvent::Wheel {
            position: Point::new(x, y),
            rotation,
        }
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            MouseEvent::Wheel { position, .. }
            | MouseEvent::LeftDown { position, .. }
            | MouseEvent::LeftUp { position }
            | MouseEvent::DoubleClick { position }
            | MouseEvent::MiddleDown { position }
            | MouseEvent::MiddleUp { position }
            | MouseEvent::RightDown { position }
            | MouseEvent::RightUp { position }
            | MouseEvent::Motion { position, .. } => Some(*position),
            MouseEvent::Enter | MouseEvent::Leave => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, MouseEvent::Motion { buttons, .. } if buttons.any())
    }
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    Escape,
    Other(u32),
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl From<KeyCode> for KeyEvent {
    fn from(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::default(),
        }
    }
}

/// Whether the canvas consumed an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

/// Notifications emitted by the canvas; geographic positions unless noted
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Display extent changed through zoom, pan or a region command
    ZoomChanged { extent: Extent },
    /// Query click, in pixels
    MapQueried { x: f64, y: f64 },
    ZoomHistoryAvailable,
    ZoomHistoryUnavailable,
    MouseEntered,
    MouseLeftDown { x: f64, y: f64 },
    MouseLeftUp { x: f64, y: f64 },
    /// Left release in pointer mode
    MouseLeftUpPointer { x: f64, y: f64 },
    MouseRightUp { x: f64, y: f64 },
    MouseDClick { x: f64, y: f64 },
    MouseMoving { x: f64, y: f64 },
    OverlayActivated { id: u32 },
    OverlayRemoved { id: u32 },
    /// The computational region was set from a drawn rectangle
    RegionDrawn { extent: Extent },
    /// A render pass finished compositing
    MapRendered { epoch: u64 },
    RenderFailed { message: String },
    /// A graphics set failed to draw and was unregistered
    GraphicsDropped { set: GraphicsSetId },
    ImageSaved { path: PathBuf },
}

/// Discriminant of [`CanvasEvent`], used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ZoomChanged,
    MapQueried,
    ZoomHistoryAvailable,
    ZoomHistoryUnavailable,
    MouseEntered,
    MouseLeftDown,
    MouseLeftUp,
    MouseLeftUpPointer,
    MouseRightUp,
    MouseDClick,
    MouseMoving,
    OverlayActivated,
    OverlayRemoved,
    RegionDrawn,
    MapRendered,
    RenderFailed,
    GraphicsDropped,
    ImageSaved,
}

impl CanvasEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CanvasEvent::ZoomChanged { .. } => EventKind::ZoomChanged,
            CanvasEvent::MapQueried { .. } => EventKind::MapQueried,
            CanvasEvent::ZoomHistoryAvailable => EventKind::ZoomHistoryAvailable,
            CanvasEvent::ZoomHistoryUnavailable => EventKind::ZoomHistoryUnavailable,
            CanvasEvent::MouseEntered => EventKind::MouseEntered,
            CanvasEvent::MouseLeftDown { .. } => EventKind::MouseLeftDown,
            CanvasEvent::MouseLeftUp { .. } => EventKind::MouseLeftUp,
            CanvasEvent::MouseLeftUpPointer { .. } => EventKind::MouseLeftUpPointer,
            CanvasEvent::MouseRightUp { .. } => EventKind::MouseRightUp,
            CanvasEvent::MouseDClick { .. } => EventKind::MouseDClick,
            CanvasEvent::MouseMoving { .. } => EventKind::MouseMoving,
            CanvasEvent::OverlayActivated { .. } => EventKind::OverlayActivated,
            CanvasEvent::OverlayRemoved { .. } => EventKind::OverlayRemoved,
            CanvasEvent::RegionDrawn { .. } => EventKind::RegionDrawn,
            CanvasEvent::MapRendered { .. } => EventKind::MapRendered,
            CanvasEvent::RenderFailed { .. } => EventKind::RenderFailed,
            CanvasEvent::GraphicsDropped { .. } => EventKind::GraphicsDropped,
            CanvasEvent::ImageSaved { .. } => EventKind::ImageSaved,
        }
    }

    /// Position carried by mouse notifications
    pub fn position(&self) -> Option<Point> {
        match self {
            CanvasEvent::MapQueried { x, y }
            | CanvasEvent::MouseLeftDown { x, y }
            | CanvasEvent::MouseLeftUp { x, y }
            | CanvasEvent::MouseLeftUpPointer { x, y }
            | CanvasEvent::MouseRightUp { x, y }
            | CanvasEvent::MouseDClick { x, y }
            | CanvasEvent::MouseMoving { x, y } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}
