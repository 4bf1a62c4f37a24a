pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{
    CanvasEvent, EventHandled, EventKind, KeyCode, KeyEvent, KeyModifiers, MouseButtons,
    MouseEvent,
};
pub use handler::{BoxKind, EventManager, MouseState, MouseUse};
