//! Ingress message definitions.
//!
//! Everything that reaches a running coordinator from outside arrives as
//! an [`Ingress`] message and is applied in arrival order.

use ddm_sdk::{ChangeOp, QueuedEvent, RawCommand};
use serde_json::Value;

/// A host-originated operation on the coordinator.
#[derive(Debug)]
pub enum Ingress {
    /// Append to the events queue.
    Event(QueuedEvent),
    /// Append to the changes queue.
    Change(ChangeOp),
    /// Push onto the external command queue.
    Command(RawCommand),
    /// An external trigger fired (click, timer, ...). Routed to the custom
    /// event adapters registered for `trigger` and `setting`.
    Signal {
        trigger: String,
        setting: String,
        payload: Value,
    },
    /// Run the bootstrap sequence.
    Initialize,
    /// Tear down the coordinator's bookkeeping.
    Reset,
}

impl From<QueuedEvent> for Ingress {
    fn from(event: QueuedEvent) -> Self {
        Ingress::Event(event)
    }
}

impl From<ddm_sdk::Event> for Ingress {
    fn from(event: ddm_sdk::Event) -> Self {
        Ingress::Event(event.into())
    }
}

impl From<ChangeOp> for Ingress {
    fn from(change: ChangeOp) -> Self {
        Ingress::Change(change)
    }
}

impl From<RawCommand> for Ingress {
    fn from(command: RawCommand) -> Self {
        Ingress::Command(command)
    }
}
