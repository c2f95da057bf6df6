//! Async processors that host a coordinator.
//!
//! - `CoordinatorService`: receives `Ingress` messages, applies them to its
//!   coordinator and drives the change-detector tick

pub mod coordinator_service;

pub use coordinator_service::CoordinatorService;
