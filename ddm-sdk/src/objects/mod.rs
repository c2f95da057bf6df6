//! Data objects shared between the coordinator and its hosts.

pub mod change;
pub mod event;

pub use change::ChangeOp;
pub use event::{Event, VIEWED_PAGE};

use crate::callback::CompletionCallback;

/// An event as stored in the events queue: the event data plus the
/// optional completion callback the producer attached to it.
///
/// Handlers only ever see copies of [`Event`], so the callback can never
/// leak into a handler or the data enricher.
pub struct QueuedEvent {
    pub event: Event,
    callback: Option<CompletionCallback>,
}

impl QueuedEvent {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            callback: None,
        }
    }

    /// Attach a completion callback, invoked once dispatch has aggregated
    /// every handler's outcome.
    pub fn with_callback(
        event: Event,
        callback: impl FnOnce(crate::callback::Completion) + Send + 'static,
    ) -> Self {
        Self {
            event,
            callback: Some(Box::new(callback)),
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Take the callback out; a callback runs at most once.
    pub fn take_callback(&mut self) -> Option<CompletionCallback> {
        self.callback.take()
    }
}

impl From<Event> for QueuedEvent {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}

impl std::fmt::Debug for QueuedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedEvent")
            .field("event", &self.event)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
