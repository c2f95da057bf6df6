//! Log sinks standing in for vendor integrations.
//!
//! The host has no outbound tracking calls; it subscribes handlers that
//! write every dispatched event and detected change to the log.

use ddm_sdk::{Event, Handler, StateChange};
use serde_json::Value;

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), Value::to_string)
}

fn log_event(event: &Event) -> Option<Value> {
    let fields = Value::Object(event.fields.clone());
    tracing::info!(
        event = %event.name,
        timestamp = ?event.timestamp,
        fields = %fields,
        "Event dispatched"
    );
    Some(Value::String(event.name.to_string()))
}

fn log_change(change: StateChange<'_>) {
    tracing::info!(
        key = change.key.unwrap_or("*"),
        old = %render(change.old),
        new = %render(change.new),
        "State changed"
    );
}

/// Event handler logging every dispatched event. Its result is the event
/// name, so completion callbacks can see the sink received it.
pub fn event_logger() -> Handler {
    Handler::event(|event| Ok(log_event(event)))
}

/// Whole-state change handler logging every detected difference.
pub fn change_logger() -> Handler {
    Handler::change(|change| {
        log_change(change);
        Ok(())
    })
}
