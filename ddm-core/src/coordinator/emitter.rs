//! Outbox through which handlers and adapters append to the queues.
//!
//! Handlers run while the coordinator is mid-dispatch, so they cannot call
//! back into it. Instead they hold an [`EventEmitter`] and emit into a
//! shared outbox; the coordinator drains the outbox through the normal
//! interception path as soon as the current operation returns.

use ddm_sdk::{ChangeOp, QueuedEvent};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) enum Emitted {
    Event(QueuedEvent),
    Change(ChangeOp),
}

/// Cloneable handle onto a coordinator's outbox.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    outbox: Arc<Mutex<Vec<Emitted>>>,
}

impl EventEmitter {
    fn lock(&self) -> MutexGuard<'_, Vec<Emitted>> {
        self.outbox.lock()
    }

    /// Queue an event for appending to the events queue.
    pub fn emit(&self, event: impl Into<QueuedEvent>) {
        self.lock().push(Emitted::Event(event.into()));
    }

    /// Queue a change op for appending to the changes queue.
    pub fn emit_change(&self, change: ChangeOp) {
        self.lock().push(Emitted::Change(change));
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn take(&self) -> Vec<Emitted> {
        std::mem::take(&mut *self.lock())
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddm_sdk::Event;

    #[test]
    fn test_clones_share_outbox() {
        let emitter = EventEmitter::default();
        let clone = emitter.clone();
        clone.emit(Event::new("A"));
        clone.emit_change(ChangeOp::new("k", 1));
        assert_eq!(emitter.pending(), 2);

        let taken = emitter.take();
        assert!(matches!(&taken[0], Emitted::Event(q) if q.event.name == "A"));
        assert!(matches!(&taken[1], Emitted::Change(c) if c.key == "k"));
        assert_eq!(clone.pending(), 0);
    }
}
