use crate::{
    core::geo::Point,
    input::events::{CanvasEvent, EventKind},
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What the left mouse button does, chosen by the host toolbar
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseUse {
    #[default]
    Pointer,
    Pan,
    Zoom,
    Query,
    DrawRegion,
    /// Clicks append vertices to the rubber-band polyline
    Measure,
    /// Tool-specific mode; the canvas only draws the rubber band
    Tool(String),
}

/// Rubber band drawn while dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoxKind {
    #[default]
    Box,
    Line,
    None,
}

/// Transient gesture state, mutated only by the interaction dispatcher
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MouseState {
    pub use_mode: MouseUse,
    pub begin: Point,
    pub end: Point,
    pub box_kind: BoxKind,
    /// 1 zooms in, -1 zooms out, 0 pans
    pub zoom_type: i32,
}

impl MouseState {
    /// Forgets the points of the previous gesture
    pub fn start(&mut self, position: Point) {
        self.begin = position;
        self.end = position;
    }

    pub fn delta(&self) -> Point {
        self.end.subtract(&self.begin)
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&CanvasEvent) + Send + Sync>;

/// Queues canvas notifications and fans them out to listeners
#[derive(Default)]
pub struct EventManager {
    listeners: FxHashMap<EventKind, Vec<EventCallback>>,
    event_queue: VecDeque<CanvasEvent>,
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.event_queue.len())
            .finish()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: Fn(&CanvasEvent) + Send + Sync + 'static,
    {
        self.listeners.entry(kind).or_default().push(Box::new(callback));
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: CanvasEvent) {
        log::trace!("emit {:?}", event);
        self.event_queue.push_back(event);
    }

    /// Delivers queued events to their listeners and hands them back
    pub fn process_events(&mut self) -> Vec<CanvasEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(&event.kind()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    /// Clear all events from the queue
    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &CanvasEvent> {
        self.event_queue.iter()
    }
}
