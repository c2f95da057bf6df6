//! Runtime configuration for the coordinator.
//!
//! These types hold validated values. Loading them from a file is the
//! host's job (see the `ddm-host` crate).

use compact_str::CompactString;
use ddm_sdk::VIEWED_PAGE;
use std::time::Duration;

/// Default interval of the change-detector tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Value of the `source` field on a synthesized gate event.
pub const DEFAULT_SYNTHETIC_SOURCE: &str = "Coordinator";

/// Top-level keys of the shared data copied into events by default.
pub const DEFAULT_ENRICH_KEYS: [&str; 3] = ["website", "page", "user"];

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// How often the change detector compares snapshots.
    pub tick_interval: Duration,
    /// Name of the event that opens live dispatch.
    pub gate_event: CompactString,
    /// `source` of the gate event synthesized when forced.
    pub synthetic_gate_source: CompactString,
    /// Initial value of the force-gate-synthesis flag.
    pub force_gate_synthesis: bool,
    /// Keys the common-data enricher copies from the shared data.
    pub enrich_keys: Vec<CompactString>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            gate_event: CompactString::const_new(VIEWED_PAGE),
            synthetic_gate_source: CompactString::const_new(DEFAULT_SYNTHETIC_SOURCE),
            force_gate_synthesis: false,
            enrich_keys: DEFAULT_ENRICH_KEYS
                .iter()
                .map(|k| CompactString::from(*k))
                .collect(),
        }
    }
}
