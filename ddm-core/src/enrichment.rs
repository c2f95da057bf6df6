//! Event data enrichment.
//!
//! Before an event copy reaches a handler it may be augmented with derived
//! fields taken from the shared data. Only copies are enriched; the queued
//! event itself is never modified.

use compact_str::CompactString;
use ddm_sdk::Event;
use serde_json::Value;

/// Augments an event copy with data derived from the shared state.
pub trait EventEnricher: Send {
    fn enrich(&self, event: Event, data: &Value) -> Event;
}

/// Leaves events untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl EventEnricher for NoopEnricher {
    fn enrich(&self, event: Event, _data: &Value) -> Event {
        event
    }
}

/// Copies common top-level sections of the shared data (`website`, `page`,
/// `user`, ...) into the event.
///
/// A section the event does not carry is copied whole. When both sides are
/// objects, the event's own fields win and only missing fields are filled in.
#[derive(Debug, Clone)]
pub struct CommonDataEnricher {
    keys: Vec<CompactString>,
}

impl CommonDataEnricher {
    pub fn new(keys: Vec<CompactString>) -> Self {
        Self { keys }
    }
}

impl Default for CommonDataEnricher {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_ENRICH_KEYS
                .iter()
                .map(|k| CompactString::from(*k))
                .collect(),
        )
    }
}

impl EventEnricher for CommonDataEnricher {
    fn enrich(&self, mut event: Event, data: &Value) -> Event {
        for key in &self.keys {
            let Some(source) = data.get(key.as_str()) else {
                continue;
            };
            if !event.fields.contains_key(key.as_str()) {
                event.fields.insert(key.to_string(), source.clone());
                continue;
            }
            if let (Some(Value::Object(target)), Value::Object(source)) =
                (event.fields.get_mut(key.as_str()), source)
            {
                for (k, v) in source {
                    target.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        event
    }
}
