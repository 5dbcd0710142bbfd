//! Bounded diagnostic log of tension changes.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::TensionCause;

/// One tension change: requested delta, what actually applied after
/// clamping, and when (engine clock seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionEvent {
    pub delta: f32,
    pub applied: f32,
    pub cause: TensionCause,
    pub timestamp: f64,
}

/// Ring buffer: the oldest entry is evicted once capacity is reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<TensionEvent>,
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, event: TensionEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Fold a periodic event into the newest entry when the cause matches,
    /// so a fixed-rate tick does not flush older history out of the buffer
    pub fn push_coalesced(&mut self, event: TensionEvent) {
        match self.entries.back_mut() {
            Some(last) if last.cause == event.cause => {
                last.delta += event.delta;
                last.applied += event.applied;
                last.timestamp = event.timestamp;
            }
            _ => self.push(event),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TensionEvent> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TensionEvent> {
        self.entries.back()
    }
}
