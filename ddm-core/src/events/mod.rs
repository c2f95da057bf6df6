//! Ingress plumbing for a coordinator running inside an async host.
//!
//! # Flow
//!
//! 1. Host code and adapters send [`Ingress`] messages on an [`IngressSender`]
//! 2. `CoordinatorService` receives them and applies each to its coordinator
//! 3. The same service drives the change-detector tick between messages

pub mod channels;
pub mod types;

pub use channels::{DEFAULT_CHANNEL_BUFFER, IngressReceiver, IngressSender, ingress_channel};
pub use types::Ingress;
