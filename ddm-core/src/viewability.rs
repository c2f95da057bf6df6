//! Seam for an external viewability tracker.
//!
//! `view[:<key>]` subscriptions are not stored by the coordinator; they are
//! handed to the configured tracker, which is initialized at the end of
//! bootstrap.

use ddm_sdk::callback::ViewHandler;

pub trait ViewabilityTracker: Send {
    /// Start tracking. Called once per coordinator `initialize()`.
    fn initialize(&mut self);

    /// Register a handler for the elements identified by `key`.
    fn add_tracker(&mut self, key: Option<&str>, handler: ViewHandler);
}
