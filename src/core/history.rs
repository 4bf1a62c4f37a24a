use crate::core::{constants::ZOOM_HISTORY_CAPACITY, geo::Extent};
use std::collections::VecDeque;

/// Bounded stack of previously displayed extents
#[derive(Debug, Clone)]
pub struct ZoomHistory {
    entries: VecDeque<Extent>,
    capacity: usize,
}

impl ZoomHistory {
    pub fn new() -> Self {
        Self::with_capacity(ZOOM_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    /// Seeds the stack with the initial extent, the terminal "cannot go back" state
    pub fn init(&mut self, extent: Extent) {
        self.entries.push_back(extent);
        log::debug!("ZoomHistory::init(): hist={:?}", self.entries);
    }

    /// Records a new extent; returns the oldest entry when it had to be evicted
    pub fn push(&mut self, extent: Extent) -> Option<Extent> {
        self.entries.push_back(extent);

        let removed = if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        match removed {
            Some(removed) => log::debug!(
                "ZoomHistory::push(): hist={:?}, removed={:?}",
                self.entries,
                removed
            ),
            None => log::debug!("ZoomHistory::push(): hist={:?}", self.entries),
        }

        removed
    }

    /// Drops the current extent and returns the one before it.
    ///
    /// Returns `None` without modifying the stack when there is nothing to go back to.
    pub fn back(&mut self) -> Option<Extent> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.pop_back();
        self.entries.back().copied()
    }

    /// Whether [`ZoomHistory::back`] would succeed
    pub fn is_available(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn current(&self) -> Option<Extent> {
        self.entries.back().copied()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest
    pub fn entries(&self) -> impl Iterator<Item = &Extent> {
        self.entries.iter()
    }
}

impl Default for ZoomHistory {
    fn default() -> Self {
        Self::new()
    }
}
