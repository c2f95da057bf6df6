//! The event/data-layer coordinator.
//!
//! A [`Coordinator`] owns the shared data and its two queues, the callback
//! registry, the change detector and the bootstrap state machine. All of it
//! runs on one logical thread: every method takes `&mut self` and runs to
//! completion, and user handlers never re-enter the coordinator directly
//! (they use an [`EventEmitter`] instead).
//!
//! The pieces live in submodules:
//!
//! - `queue`: [`Queue`] and [`QueueMode`]
//! - `registry`: [`CallbackRegistry`]
//! - `dispatch`: `beforeEvent` gate, event fan-out, completion barrier
//! - `change_detector`: define dispatch, snapshot diffing, periodic tick
//! - `bootstrap`: `initialize` / `reset`
//! - `adapters`: custom event adapters

pub mod adapters;
pub mod bootstrap;
pub mod change_detector;
pub mod dispatch;
pub mod emitter;
mod isolate;
pub mod queue;
pub mod registry;
pub mod state;

pub use adapters::{AdapterConfig, AdapterHandler, CustomEvent, Trigger};
pub use bootstrap::BootstrapState;
pub use emitter::EventEmitter;
pub use queue::{Queue, QueueMode};
pub use registry::{CallbackRegistry, SubscribeError};
pub use state::SharedState;

use crate::clock::{Clock, SystemClock};
use crate::config::CoordinatorConfig;
use crate::enrichment::{CommonDataEnricher, EventEnricher};
use crate::events::Ingress;
use crate::viewability::ViewabilityTracker;
use change_detector::ChangeDetector;
use ddm_sdk::{
    CallbackKind, ChangeOp, Command, Descriptor, Handler, QueuedEvent, RawCommand, key_path,
};
use emitter::Emitted;
use isolate::isolate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates the shared data, its queues and every registered callback.
pub struct Coordinator {
    state: SharedState,
    commands: Queue<RawCommand>,
    registry: CallbackRegistry,
    detector: ChangeDetector,
    adapters: Vec<CustomEvent>,
    enricher: Box<dyn EventEnricher>,
    viewability: Option<Box<dyn ViewabilityTracker>>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
    force_gate_synthesis: bool,
    bootstrap: BootstrapState,
    emitter: EventEmitter,
    draining: bool,
}

impl Coordinator {
    /// Create a coordinator over `data` with the default configuration.
    ///
    /// `data` may carry `events` and `changes` arrays; they become the
    /// initial queue contents. `commands` is the external command queue
    /// filled before the coordinator existed; it is replayed by
    /// [`initialize`](Self::initialize).
    pub fn new(data: Value, commands: Vec<RawCommand>) -> Self {
        Self::with_config(data, commands, CoordinatorConfig::default())
    }

    pub fn with_config(data: Value, commands: Vec<RawCommand>, config: CoordinatorConfig) -> Self {
        let state = SharedState::from_value(data);
        // Snapshot before any interception is installed.
        let detector = ChangeDetector::new(state.data.clone(), config.tick_interval);
        Self {
            state,
            commands: Queue::from_items(commands),
            registry: CallbackRegistry::default(),
            detector,
            adapters: Vec::new(),
            enricher: Box::new(CommonDataEnricher::new(config.enrich_keys.clone())),
            viewability: None,
            clock: Arc::new(SystemClock),
            force_gate_synthesis: config.force_gate_synthesis,
            config,
            bootstrap: BootstrapState::Uninitialized,
            emitter: EventEmitter::default(),
            draining: false,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the data enricher.
    pub fn with_enricher(mut self, enricher: impl EventEnricher + 'static) -> Self {
        self.enricher = Box::new(enricher);
        self
    }

    // -- Subscriptions ------------------------------------------------------

    /// Subscribe `handler` under `descriptor` (`"<kind>[:<keyPath>]"`),
    /// replaying already fired events to new event handlers.
    pub fn subscribe(&mut self, descriptor: &str, handler: Handler) -> Result<(), SubscribeError> {
        self.subscribe_with(descriptor, handler, true)
    }

    /// Like [`subscribe`](Self::subscribe), with control over replay.
    ///
    /// When the coordinator is initialized and the subscription is an event
    /// subscription with `replay_past_events`, the handler immediately
    /// receives a copy of every event that has already fired.
    pub fn subscribe_with(
        &mut self,
        descriptor: &str,
        handler: Handler,
        replay_past_events: bool,
    ) -> Result<(), SubscribeError> {
        let descriptor: Descriptor = descriptor.parse()?;
        self.subscribe_descriptor(descriptor, handler, replay_past_events)
    }

    fn subscribe_descriptor(
        &mut self,
        descriptor: Descriptor,
        handler: Handler,
        replay_past_events: bool,
    ) -> Result<(), SubscribeError> {
        let kind = descriptor.kind;
        let key = descriptor.key.clone();

        if kind == CallbackKind::View && self.viewability.is_none() {
            return Err(SubscribeError::NoViewabilityTracker);
        }
        if let Some(view_handler) = self.registry.insert(descriptor, handler)? {
            if let Some(tracker) = self.viewability.as_mut() {
                tracker.add_tracker(key.as_deref(), view_handler);
            }
            return Ok(());
        }
        debug!(%kind, key = key.as_deref().unwrap_or(""), "Subscribed");

        if kind == CallbackKind::Event && replay_past_events && self.is_initialized() {
            let index = self.registry.event.len() - 1;
            self.replay_past_events(index);
            self.drain_emitted();
        }
        Ok(())
    }

    /// Apply one external command tuple.
    ///
    /// `on` subscribes, `off` is accepted and ignored, and anything
    /// malformed is dropped without a trace.
    pub fn register_external_callback(&mut self, command: RawCommand) {
        let Ok(command) = Command::try_from(command) else {
            return;
        };
        match command {
            Command::Subscribe {
                descriptor,
                handler,
            } => {
                let shown = descriptor.to_string();
                if let Err(e) = self.subscribe_descriptor(descriptor, handler, true) {
                    warn!(descriptor = %shown, error = %e, "Rejected external subscription");
                }
            }
            Command::Unsubscribe { descriptor } => {
                debug!(%descriptor, "Unsubscribe is not supported, ignoring");
            }
        }
    }

    // -- Queue appends --------------------------------------------------------

    /// Push onto the external command queue.
    ///
    /// Before `initialize` the command is only stored; afterwards it is
    /// applied right away.
    pub fn push_command(&mut self, command: RawCommand) {
        match self.commands.mode() {
            QueueMode::PassThrough | QueueMode::Buffering => {
                self.commands.append(command);
            }
            QueueMode::Applying | QueueMode::Dispatching => {
                self.register_external_callback(command);
                self.drain_emitted();
            }
        }
    }

    /// Append to the events queue. What happens next depends on the
    /// queue's mode: stored, held for the gate event, or dispatched.
    pub fn push_event(&mut self, event: impl Into<QueuedEvent>) {
        let queued = event.into();
        match self.state.events.mode() {
            QueueMode::PassThrough => {
                self.state.events.append(queued);
            }
            QueueMode::Buffering => {
                let is_gate = queued.event.is_named(&self.config.gate_event);
                self.state.events.append(queued);
                if is_gate {
                    self.open_gate();
                }
            }
            QueueMode::Applying | QueueMode::Dispatching => {
                let index = self.state.events.append(queued);
                self.fire_event(index);
            }
        }
        self.drain_emitted();
    }

    /// Append to the changes queue, applying the change to the shared data
    /// immediately once the queue is live.
    pub fn push_change(&mut self, change: ChangeOp) {
        match self.state.changes.mode() {
            QueueMode::PassThrough | QueueMode::Buffering => {
                self.state.changes.append(change);
            }
            QueueMode::Applying | QueueMode::Dispatching => {
                self.apply_change(&change);
                self.state.changes.append(change);
            }
        }
        self.drain_emitted();
    }

    /// Apply a message received from the ingress channel.
    pub fn ingest(&mut self, message: Ingress) {
        match message {
            Ingress::Event(event) => self.push_event(event),
            Ingress::Change(change) => self.push_change(change),
            Ingress::Command(command) => self.push_command(command),
            Ingress::Signal {
                trigger,
                setting,
                payload,
            } => self.signal(&trigger, &setting, &payload),
            Ingress::Initialize => self.initialize(),
            Ingress::Reset => self.reset(),
        }
    }

    pub(crate) fn apply_change(&mut self, change: &ChangeOp) {
        if let Err(e) = key_path::set(&change.key, change.value.clone(), &mut self.state.data) {
            warn!(key = %change.key, error = %e, "Ignoring change op");
        }
    }

    /// Push everything handlers and adapters emitted through the normal
    /// append path, until the outbox stays empty.
    pub(crate) fn drain_emitted(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        loop {
            let batch = self.emitter.take();
            if batch.is_empty() {
                break;
            }
            for item in batch {
                match item {
                    Emitted::Event(event) => self.push_event(event),
                    Emitted::Change(change) => self.push_change(change),
                }
            }
        }
        self.draining = false;
    }

    // -- Settings and introspection -------------------------------------------

    /// Synthesize a gate event at `initialize` if none is queued.
    pub fn set_force_gate_synthesis(&mut self, force: bool) {
        self.force_gate_synthesis = force;
    }

    pub fn force_gate_synthesis(&self) -> bool {
        self.force_gate_synthesis
    }

    pub fn set_viewability_tracker(&mut self, tracker: impl ViewabilityTracker + 'static) {
        self.viewability = Some(Box::new(tracker));
    }

    /// A handle handlers and adapters use to append to the queues.
    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Mutable access to the domain data. Direct edits bypass the changes
    /// queue and are picked up by the next change-detector tick.
    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.state.data
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn bootstrap_state(&self) -> BootstrapState {
        self.bootstrap
    }

    pub fn is_initialized(&self) -> bool {
        self.bootstrap != BootstrapState::Uninitialized
    }

    pub fn events_mode(&self) -> QueueMode {
        self.state.events.mode()
    }

    pub fn changes_mode(&self) -> QueueMode {
        self.state.changes.mode()
    }

    pub fn commands_mode(&self) -> QueueMode {
        self.commands.mode()
    }

    /// Number of commands waiting for `initialize`.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn callback_count(&self, kind: CallbackKind) -> usize {
        self.registry.len(kind)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("bootstrap", &self.bootstrap)
            .field("events", &self.state.events.len())
            .field("events_mode", &self.state.events.mode())
            .field("changes_mode", &self.state.changes.mode())
            .field("registry", &self.registry)
            .field("adapters", &self.adapters.len())
            .finish()
    }
}
