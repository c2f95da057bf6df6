//! The shared state observed by the coordinator.

use super::queue::Queue;
use ddm_sdk::{ChangeOp, Event, QueuedEvent};
use serde_json::{Map, Value};
use tracing::warn;

/// Shared domain data plus its two intercepted queues.
///
/// `data` never contains `events` or `changes`; those live in the queues.
#[derive(Debug, Default)]
pub struct SharedState {
    pub(crate) data: Value,
    pub(crate) events: Queue<QueuedEvent>,
    pub(crate) changes: Queue<ChangeOp>,
}

impl SharedState {
    /// Build the shared state from a host-provided JSON value.
    ///
    /// An `events` array becomes the initial events queue and a `changes`
    /// array of `[key, value]` pairs the initial changes queue. Entries that
    /// do not parse are dropped with a warning. Anything but an object
    /// starts as an empty object.
    pub fn from_value(value: Value) -> Self {
        let mut data = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!(kind = %json_kind(&other), "Shared data is not an object, starting empty");
                Map::new()
            }
        };

        let events = match data.remove("events") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match Event::from_value(item) {
                    Ok(event) => Some(QueuedEvent::new(event)),
                    Err(e) => {
                        warn!(error = %e, "Dropping unparseable queued event");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let changes = match data.remove("changes") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<ChangeOp>(item) {
                    Ok(change) => Some(change),
                    Err(e) => {
                        warn!(error = %e, "Dropping unparseable queued change");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            data: Value::Object(data),
            events: Queue::from_items(events),
            changes: Queue::from_items(changes),
        }
    }

    /// The domain data, without the queues.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn events(&self) -> &Queue<QueuedEvent> {
        &self.events
    }

    pub fn changes(&self) -> &Queue<ChangeOp> {
        &self.changes
    }

    /// Whether an event with `name` is anywhere in the events queue.
    pub fn contains_event(&self, name: &str) -> bool {
        self.events.iter().any(|q| q.event.is_named(name))
    }

    /// Render data and queues back into one JSON object.
    pub fn to_value(&self) -> Value {
        let mut value = self.data.clone();
        if let Value::Object(map) = &mut value {
            map.insert(
                "events".to_string(),
                Value::Array(self.events.iter().map(|q| q.event.to_value()).collect()),
            );
            map.insert(
                "changes".to_string(),
                Value::Array(
                    self.changes
                        .iter()
                        .map(|c| Value::Array(vec![Value::from(c.key.as_str()), c.value.clone()]))
                        .collect(),
                ),
            );
        }
        value
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
