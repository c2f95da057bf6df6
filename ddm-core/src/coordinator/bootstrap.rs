//! `initialize` / `reset` and the gate that opens live event dispatch.
//!
//! The steps of `initialize` run in a fixed order: adapters are tracked
//! first, pre-init commands are replayed, define handlers get a first pass,
//! queued changes are applied before any event is processed, and only then
//! is the events queue switched according to whether the gate event has
//! been seen.

use super::{Coordinator, QueueMode};
use ddm_sdk::Event;
use tracing::{debug, info, warn};

/// Progress of the bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapState {
    /// `initialize` has not run (or `reset` has).
    #[default]
    Uninitialized,
    /// Initialized, but events are buffered until the gate event arrives.
    Waiting,
    /// Events dispatch as soon as they are appended.
    Active,
}

impl Coordinator {
    /// Bootstrap the coordinator.
    ///
    /// Calling this again without an intervening [`reset`](Self::reset)
    /// does nothing.
    pub fn initialize(&mut self) {
        if self.is_initialized() {
            warn!(state = ?self.bootstrap, "Coordinator already initialized, ignoring");
            return;
        }

        self.track_adapters();

        for command in self.commands.take_all() {
            self.register_external_callback(command);
        }
        self.commands.set_mode(QueueMode::Applying);

        self.fire_define();

        for change in self.state.changes.take_all() {
            self.apply_change(&change);
            self.state.changes.append(change);
        }
        self.state.changes.set_mode(QueueMode::Applying);
        self.detector.start(self.clock.now_ms());

        let gate = self.config.gate_event.clone();
        if self.state.contains_event(&gate) {
            self.open_gate();
        } else if self.force_gate_synthesis {
            let synthetic = Event::new(gate.clone())
                .with_field("source", self.config.synthetic_gate_source.as_str());
            self.state.events.prepend(synthetic.into());
            self.open_gate();
        } else {
            self.state.events.set_mode(QueueMode::Buffering);
            self.bootstrap = BootstrapState::Waiting;
            info!(gate = %gate, "Waiting for gate event");
        }

        if let Some(tracker) = self.viewability.as_mut() {
            tracker.initialize();
        }

        self.drain_emitted();
    }

    /// Switch the events queue to live dispatch and fire everything that
    /// has not fired yet, in queue order.
    pub(crate) fn open_gate(&mut self) {
        self.state.events.set_mode(QueueMode::Dispatching);
        self.bootstrap = BootstrapState::Active;
        info!(
            queued = self.state.events.len(),
            "Gate event seen, dispatching events"
        );
        self.fire_unfired_events();
    }

    /// Tear down the coordinator's own bookkeeping.
    ///
    /// The domain data and the events already in the queue are kept.
    /// Registered adapters stay registered and are tracked again by the
    /// next `initialize`. Safe to call any number of times.
    pub fn reset(&mut self) {
        self.detector.cancel();
        self.commands.clear();
        self.commands.set_mode(QueueMode::PassThrough);
        self.state.changes.clear();
        self.state.changes.set_mode(QueueMode::PassThrough);
        self.state.events.set_mode(QueueMode::PassThrough);
        self.registry.clear();
        self.viewability = None;
        self.force_gate_synthesis = false;
        self.bootstrap = BootstrapState::Uninitialized;
        self.emitter.clear();
        for adapter in &mut self.adapters {
            adapter.tracked = false;
        }
        debug!("Coordinator reset");
    }
}
