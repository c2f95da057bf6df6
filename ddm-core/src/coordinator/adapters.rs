//! Custom event adapters.
//!
//! An adapter turns something that happened into an event on the events
//! queue. Its trigger decides what it listens to:
//!
//! - `"event"`: another dispatched event whose name equals the adapter's
//!   setting. The adapter is registered as an ordinary event handler and
//!   emits through the [`EventEmitter`](super::EventEmitter).
//! - anything else: an external source the host reports through
//!   [`Coordinator::signal`], matched on trigger and setting.
//!
//! Either way the produced event goes through the normal append path.

use super::Coordinator;
use super::isolate::isolate;
use compact_str::CompactString;
use ddm_sdk::{CallbackKind, Descriptor, Event, Handler, HandlerError};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps the triggering payload to the event to append, if any.
pub type AdapterHandler = Box<dyn FnMut(&Value) -> Result<Option<Event>, HandlerError> + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fires on dispatched events named after the adapter's setting.
    Event,
    /// Fires when the host signals this trigger name.
    External(CompactString),
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        match value {
            "event" => Trigger::Event,
            other => Trigger::External(CompactString::from(other)),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Event => f.write_str("event"),
            Trigger::External(name) => f.write_str(name),
        }
    }
}

/// Declarative adapter definition.
pub struct AdapterConfig {
    pub name: CompactString,
    pub trigger: Trigger,
    /// Event name for `Trigger::Event`, selector or source key otherwise.
    pub setting: CompactString,
    pub handler: AdapterHandler,
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("setting", &self.setting)
            .finish_non_exhaustive()
    }
}

/// A registered adapter.
pub struct CustomEvent {
    pub name: CompactString,
    pub trigger: Trigger,
    pub setting: CompactString,
    handler: Arc<Mutex<AdapterHandler>>,
    pub(crate) tracked: bool,
}

impl CustomEvent {
    fn new(config: AdapterConfig) -> Self {
        Self {
            name: config.name,
            trigger: config.trigger,
            setting: config.setting,
            handler: Arc::new(Mutex::new(config.handler)),
            tracked: false,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("setting", &self.setting)
            .field("tracked", &self.tracked)
            .finish()
    }
}

fn run_adapter(
    name: &str,
    handler: &Mutex<AdapterHandler>,
    payload: &Value,
) -> Option<Event> {
    let mut handler = handler.lock();
    isolate("adapter", name, || (*handler)(payload)).ok().flatten()
}

impl Coordinator {
    /// Register adapters from declarative configuration.
    pub fn register_adapter_configs(&mut self, configs: impl IntoIterator<Item = AdapterConfig>) {
        for config in configs {
            self.push_adapter(config);
        }
    }

    /// Register one adapter.
    pub fn add_adapter<F>(
        &mut self,
        name: &str,
        trigger: impl Into<Trigger>,
        setting: &str,
        handler: F,
    ) where
        F: FnMut(&Value) -> Result<Option<Event>, HandlerError> + Send + 'static,
    {
        self.push_adapter(AdapterConfig {
            name: CompactString::from(name),
            trigger: trigger.into(),
            setting: CompactString::from(setting),
            handler: Box::new(handler),
        });
    }

    /// Adapters added after `initialize` start tracking right away.
    fn push_adapter(&mut self, config: AdapterConfig) {
        debug!(name = %config.name, trigger = %config.trigger, "Adapter registered");
        self.adapters.push(CustomEvent::new(config));
        if self.is_initialized() {
            self.track_adapters();
        }
    }

    pub fn adapters(&self) -> &[CustomEvent] {
        &self.adapters
    }

    /// Start every adapter that is not tracking yet.
    pub(crate) fn track_adapters(&mut self) {
        for index in 0..self.adapters.len() {
            if self.adapters[index].tracked {
                continue;
            }
            self.adapters[index].tracked = true;
            if self.adapters[index].trigger != Trigger::Event {
                continue;
            }

            let adapter = &self.adapters[index];
            let name = adapter.name.clone();
            let setting = adapter.setting.clone();
            let handler = Arc::clone(&adapter.handler);
            let emitter = self.emitter.clone();
            let listener = Handler::event(move |event| {
                if event.is_named(&setting) {
                    if let Some(produced) = run_adapter(&name, &handler, &event.to_value()) {
                        emitter.emit(produced);
                    }
                }
                Ok(None)
            });
            if let Err(e) = self
                .registry
                .insert(Descriptor::new(CallbackKind::Event, None), listener)
            {
                warn!(error = %e, "Failed to track adapter");
            }
        }
    }

    /// Report an external trigger. Every tracked adapter with this trigger
    /// and setting maps `payload` to an event, which is appended to the
    /// events queue.
    pub fn signal(&mut self, trigger: &str, setting: &str, payload: &Value) {
        let produced: Vec<Event> = self
            .adapters
            .iter()
            .filter(|a| {
                a.tracked
                    && matches!(&a.trigger, Trigger::External(t) if t == trigger)
                    && a.setting == setting
            })
            .filter_map(|a| run_adapter(&a.name, &a.handler, payload))
            .collect();
        if produced.is_empty() {
            debug!(trigger, setting, "Signal produced no events");
        }
        for event in produced {
            self.push_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn recorder(c: &mut Coordinator) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        c.subscribe(
            "event",
            Handler::event(move |event| {
                sink.lock().push(event.name.to_string());
                Ok(None)
            }),
        )
        .unwrap();
        seen
    }

    #[test]
    fn test_trigger_from_str() {
        assert_eq!(Trigger::from("event"), Trigger::Event);
        assert_eq!(Trigger::from("click"), Trigger::External("click".into()));
        assert_eq!(Trigger::from("click").to_string(), "click");
    }

    #[test]
    fn test_event_triggered_adapter_appends_follow_up() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        c.add_adapter("cart viewed", "event", "Viewed Page", |payload| {
            let page = payload.get("page").cloned().unwrap_or(Value::Null);
            Ok(Some(Event::new("Viewed Cart").with_field("page", page)))
        });
        let seen = recorder(&mut c);
        c.initialize();
        assert!(c.adapters()[0].is_tracked());

        c.push_event(Event::new("Viewed Page").with_field("page", "cart"));
        assert_eq!(*seen.lock(), vec!["Viewed Page", "Viewed Cart"]);
        let appended = &c.state().events().get(1).unwrap().event;
        assert_eq!(appended.field("page"), Some(&json!("cart")));
    }

    #[test]
    fn test_external_signal_needs_tracking() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        c.set_force_gate_synthesis(true);
        c.register_adapter_configs([AdapterConfig {
            name: "banner".into(),
            trigger: Trigger::from("click"),
            setting: ".banner".into(),
            handler: Box::new(|payload: &Value| {
                Ok(Some(Event::new("Clicked Banner").with_field("id", payload.clone())))
            }),
        }]);

        c.signal("click", ".banner", &json!("b1"));
        assert!(!c.state().contains_event("Clicked Banner"));

        c.initialize();
        let seen = recorder(&mut c);
        c.signal("click", ".other", &json!("b2"));
        c.signal("click", ".banner", &json!("b1"));
        assert_eq!(*seen.lock(), vec!["Viewed Page", "Clicked Banner"]);
    }

    #[test]
    fn test_failing_adapter_is_isolated() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        c.add_adapter("broken", "event", "Viewed Page", |_| {
            Err(anyhow::anyhow!("adapter failure"))
        });
        let seen = recorder(&mut c);
        c.initialize();
        c.push_event(Event::new("Viewed Page"));
        assert_eq!(*seen.lock(), vec!["Viewed Page"]);
    }

    #[test]
    fn test_panicking_adapter_keeps_firing_on_later_signals() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        let mut calls = 0;
        c.add_adapter("flaky", "click", ".banner", move |_: &Value| {
            calls += 1;
            if calls == 1 {
                panic!("first click");
            }
            Ok(Some(Event::new("Clicked Banner")))
        });
        let seen = recorder(&mut c);
        c.initialize();
        c.push_event(Event::new("Viewed Page"));

        c.signal("click", ".banner", &json!({}));
        c.signal("click", ".banner", &json!({}));
        assert_eq!(*seen.lock(), vec!["Viewed Page", "Clicked Banner"]);
    }

    #[test]
    fn test_adapters_are_tracked_again_after_reset() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        c.add_adapter("noop", "event", "Viewed Page", |_| Ok(None));
        c.initialize();
        assert_eq!(c.callback_count(CallbackKind::Event), 1);
        c.reset();
        assert!(!c.adapters()[0].is_tracked());
        c.initialize();
        assert_eq!(c.callback_count(CallbackKind::Event), 1);
    }

    #[test]
    fn test_adapter_added_after_initialize_tracks_immediately() {
        let mut c = Coordinator::new(json!({}), Vec::new()).with_clock(ManualClock::new(0));
        c.initialize();
        c.add_adapter("late", "scroll", "50%", |_| Ok(Some(Event::new("Scrolled"))));
        assert!(c.adapters()[0].is_tracked());
        c.signal("scroll", "50%", &Value::Null);
        assert!(c.state().contains_event("Scrolled"));
    }
}
