//! TOML file configuration structures.
//!
//! These structs directly map to the `ddm-config.toml` file format.

use ddm_core::config::{DEFAULT_ENRICH_KEYS, DEFAULT_SYNTHETIC_SOURCE, DEFAULT_TICK_INTERVAL};
use ddm_sdk::VIEWED_PAGE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub coordinator: CoordinatorSection,
    /// Initial shared data. May carry `events` and `changes` arrays.
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub adapters: Vec<AdapterSection>,
}

/// Coordinator configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSection {
    /// Change-detector tick interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Name of the event that opens live dispatch.
    #[serde(default = "default_gate_event")]
    pub gate_event: String,
    /// `source` of the synthesized gate event.
    #[serde(default = "default_synthetic_source")]
    pub synthetic_gate_source: String,
    #[serde(default)]
    pub force_gate_synthesis: bool,
    /// Shared-data keys copied into every enriched event.
    #[serde(default = "default_enrich_keys")]
    pub enrich_keys: Vec<String>,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            gate_event: default_gate_event(),
            synthetic_gate_source: default_synthetic_source(),
            force_gate_synthesis: false,
            enrich_keys: default_enrich_keys(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

fn default_gate_event() -> String {
    VIEWED_PAGE.to_string()
}

fn default_synthetic_source() -> String {
    DEFAULT_SYNTHETIC_SOURCE.to_string()
}

fn default_enrich_keys() -> Vec<String> {
    DEFAULT_ENRICH_KEYS.iter().map(|k| k.to_string()).collect()
}

/// A declarative custom event adapter.
///
/// ```toml
/// [[adapters]]
/// name = "cart viewed"
/// trigger = "event"
/// event = "Viewed Page"
/// emit = "Viewed Cart"
/// fields = { category = "cart" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSection {
    pub name: String,
    /// `"event"` or the name of an external trigger.
    pub trigger: String,
    /// Event name for `trigger = "event"`, selector otherwise.
    #[serde(alias = "event", alias = "selector")]
    pub setting: String,
    /// Name of the event the adapter appends.
    pub emit: String,
    /// Static fields set on every emitted event.
    #[serde(default)]
    pub fields: Map<String, Value>,
}
