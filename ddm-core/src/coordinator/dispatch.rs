//! Event dispatch: `beforeEvent` gate, fan-out to event handlers, and the
//! completion barrier.
//!
//! Each event handler gets its own copy of the event, enriched unless the
//! event opted out. Handler outcomes are counted by a [`CompletionBarrier`];
//! once every handler has returned or failed, the event's completion
//! callback runs with the collected results and errors.
//!
//! The barrier counts synchronous returns. A handler that hands work off
//! elsewhere is complete, as far as the barrier is concerned, as soon as it
//! returns.

use super::Coordinator;
use super::isolate::isolate;
use crate::enrichment::EventEnricher;
use ddm_sdk::callback::CompletionCallback;
use ddm_sdk::{CallbackKind, Completion, Event, HandlerError};
use serde_json::Value;
use tracing::debug;

/// Build the copy of `event` a handler receives.
pub(crate) fn handler_copy(event: &Event, enricher: &dyn EventEnricher, data: &Value) -> Event {
    let copy = event.clone();
    if copy.enrich_event_data {
        enricher.enrich(copy, data)
    } else {
        copy
    }
}

/// Counts handler outcomes and fires the completion callback once all
/// expected outcomes are in.
pub(crate) struct CompletionBarrier {
    remaining: usize,
    results: Vec<Value>,
    errors: Vec<HandlerError>,
    callback: Option<CompletionCallback>,
}

impl CompletionBarrier {
    pub(crate) fn new(expected: usize, callback: Option<CompletionCallback>) -> Self {
        Self {
            remaining: expected,
            results: Vec::new(),
            errors: Vec::new(),
            callback,
        }
    }

    /// Record one handler outcome. A handler that returns nothing adds no
    /// result but still counts.
    pub(crate) fn record(&mut self, outcome: Result<Option<Value>, HandlerError>) {
        match outcome {
            Ok(Some(result)) => self.results.push(result),
            Ok(None) => {}
            Err(e) => self.errors.push(e),
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if let Some(callback) = self.callback.take() {
                let completion = Completion::Delivered {
                    results: std::mem::take(&mut self.results),
                    errors: std::mem::take(&mut self.errors),
                };
                let _ = isolate(CallbackKind::Event, "completion", || {
                    callback(completion);
                    Ok(())
                });
            }
        }
    }
}

impl Coordinator {
    /// Dispatch the queued event at `index`.
    ///
    /// The event is marked fired afterwards even when a `beforeEvent`
    /// handler vetoed it. A vetoed event's completion callback is dropped.
    pub(crate) fn fire_event(&mut self, index: usize) {
        let now = self.clock.now_ms();
        let Some(queued) = self.state.events.get_mut(index) else {
            return;
        };
        if queued.event.timestamp.is_none() {
            queued.event.timestamp = Some(now);
        }
        let callback = queued.take_callback();
        let event = queued.event.clone();

        if self.run_before_event(&event) {
            self.deliver(&event, callback);
        } else {
            debug!(event = %event.name, "Event vetoed by beforeEvent handler");
        }

        if let Some(queued) = self.state.events.get_mut(index) {
            queued.event.has_fired = true;
        }
    }

    /// Run the `beforeEvent` handlers in order. `false` from any of them
    /// vetoes the event; a failing handler does not.
    fn run_before_event(&mut self, event: &Event) -> bool {
        for entry in self.registry.before_event.iter_mut() {
            let verdict = isolate(CallbackKind::BeforeEvent, &event.name, || {
                (entry.handler)(event)
            });
            if matches!(verdict, Ok(false)) {
                return false;
            }
        }
        true
    }

    fn deliver(&mut self, event: &Event, callback: Option<CompletionCallback>) {
        if self.registry.event.is_empty() {
            if let Some(callback) = callback {
                let _ = isolate(CallbackKind::Event, "completion", || {
                    callback(Completion::Unobserved);
                    Ok(())
                });
            }
            return;
        }

        let mut barrier = CompletionBarrier::new(self.registry.event.len(), callback);
        let enricher = self.enricher.as_ref();
        let data = &self.state.data;
        for entry in self.registry.event.iter_mut() {
            let copy = handler_copy(event, enricher, data);
            barrier.record(isolate(CallbackKind::Event, &event.name, || {
                (entry.handler)(&copy)
            }));
        }
        debug!(event = %event.name, handlers = self.registry.event.len(), "Event dispatched");
    }

    /// Fire every event in the queue that has not fired yet, in queue order.
    pub(crate) fn fire_unfired_events(&mut self) {
        let mut index = 0;
        while index < self.state.events.len() {
            let unfired = self
                .state
                .events
                .get(index)
                .is_some_and(|q| !q.event.has_fired);
            if unfired {
                self.fire_event(index);
            }
            index += 1;
        }
    }

    /// Hand a copy of every fired event to the event handler at `index`.
    pub(crate) fn replay_past_events(&mut self, index: usize) {
        let Some(entry) = self.registry.event.get_mut(index) else {
            return;
        };
        let enricher = self.enricher.as_ref();
        let data = &self.state.data;
        for queued in self.state.events.iter().filter(|q| q.event.has_fired) {
            let copy = handler_copy(&queued.event, enricher, data);
            let _ = isolate(CallbackKind::Event, &copy.name, || (entry.handler)(&copy));
        }
    }
}
