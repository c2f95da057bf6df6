//! Event objects carried by the events queue.
//!
//! An [`Event`] is plain data: a name, a few well-known fields, and any
//! number of free-form fields kept in a JSON map. It serializes to the
//! same flat object shape that hosts push into `digitalData.events`:
//!
//! ```json
//! {"name":"Viewed Product","timestamp":1700000000000,"product":{"id":"42"}}
//! ```
//!
//! The completion callback is deliberately not part of `Event`; see
//! [`QueuedEvent`](crate::objects::QueuedEvent).

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the event that opens the gate for live dispatch.
pub const VIEWED_PAGE: &str = "Viewed Page";

fn default_enrich_event_data() -> bool {
    true
}

/// A single analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event name, e.g. `"Viewed Page"`.
    pub name: CompactString,

    /// Milliseconds since the Unix epoch. Assigned on first dispatch when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Set once the dispatcher has processed the event.
    #[serde(default)]
    pub has_fired: bool,

    /// Whether handler copies go through the data enricher.
    #[serde(default = "default_enrich_event_data")]
    pub enrich_event_data: bool,

    /// Every other field of the event.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    /// Create an unfired event with no extra fields.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            has_fired: false,
            enrich_event_data: true,
            fields: Map::new(),
        }
    }

    /// Builder-style helper to attach a free-form field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Opt this event out of data enrichment.
    pub fn without_enrichment(mut self) -> Self {
        self.enrich_event_data = false;
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }

    /// Render the event as a flat JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse an event out of a JSON value, as found in a host-provided
    /// `events` array.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flat_event() {
        let event = Event::from_value(json!({
            "name": "Viewed Product",
            "product": {"id": "42"},
            "enrichEventData": false
        }))
        .unwrap();

        assert_eq!(event.name, "Viewed Product");
        assert_eq!(event.timestamp, None);
        assert!(!event.has_fired);
        assert!(!event.enrich_event_data);
        assert_eq!(event.field("product"), Some(&json!({"id": "42"})));
    }

    #[test]
    fn test_enrichment_defaults_to_enabled() {
        let event = Event::from_value(json!({"name": "Clicked Button"})).unwrap();
        assert!(event.enrich_event_data);
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let event = Event::new(VIEWED_PAGE)
            .with_timestamp(10)
            .with_field("source", "test");
        assert_eq!(
            event.to_value(),
            json!({
                "name": "Viewed Page",
                "timestamp": 10,
                "hasFired": false,
                "enrichEventData": true,
                "source": "test"
            })
        );
    }
}
