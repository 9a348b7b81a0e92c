//! Fixed-capacity FIFO of raw observations.

use std::collections::VecDeque;

/// Most recent observations in arrival order, oldest first.
///
/// Never holds more than `capacity` entries: pushing into a full window
/// evicts the oldest entry first.
#[derive(Clone, Debug)]
pub struct ObservationWindow {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ObservationWindow {
    /// Create an empty window. `capacity` must be at least 1; callers go
    /// through [`super::SmoothingConfig`] which enforces that.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an observation, evicting the oldest one if the window is full.
    ///
    /// Returns the evicted observation, if any.
    pub fn push(&mut self, value: String) -> Option<String> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(value);
        evicted
    }

    /// Number of observations currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no observation has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of observations held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Observations oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
