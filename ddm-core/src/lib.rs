#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod enrichment;
pub mod events;
pub mod processors;
pub mod viewability;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoordinatorConfig;
pub use coordinator::{
    AdapterConfig, BootstrapState, Coordinator, EventEmitter, QueueMode, SubscribeError, Trigger,
};
pub use enrichment::{CommonDataEnricher, EventEnricher, NoopEnricher};
pub use events::{Ingress, IngressReceiver, IngressSender, ingress_channel};
pub use processors::CoordinatorService;
pub use viewability::ViewabilityTracker;
