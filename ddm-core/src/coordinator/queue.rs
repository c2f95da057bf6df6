//! Append-only queues with an explicit append mode.
//!
//! A [`Queue`] only stores items and remembers its [`QueueMode`]. What an
//! append *does* beyond storing is decided by the coordinator from the
//! mode, and the mode only changes when the bootstrap state machine (or
//! `reset`) says so.

use std::fmt;

/// How a queue reacts to an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// Plain append, no side effect.
    #[default]
    PassThrough,
    /// Append and hold. Used by the events queue while waiting for the gate.
    Buffering,
    /// Append and apply immediately (changes, external commands).
    Applying,
    /// Append and dispatch immediately (events).
    Dispatching,
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueMode::PassThrough => "pass-through",
            QueueMode::Buffering => "buffering",
            QueueMode::Applying => "applying",
            QueueMode::Dispatching => "dispatching",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Queue<T> {
    items: Vec<T>,
    mode: QueueMode,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            mode: QueueMode::PassThrough,
        }
    }
}

impl<T> Queue<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            mode: QueueMode::PassThrough,
        }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: QueueMode) {
        self.mode = mode;
    }

    /// Store an item and return its index.
    pub(crate) fn append(&mut self, item: T) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    pub(crate) fn prepend(&mut self, item: T) {
        self.items.insert(0, item);
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub(crate) fn take_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
