//! Shared objects for the digital data manager.
//!
//! This crate holds everything a host needs to talk to the coordinator
//! without depending on it: event and change objects, callback descriptors
//! and handler types, command tuples, and the key-path resolver.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod callback;
pub mod command;
pub mod key_path;
pub mod objects;

pub use callback::{
    CallbackKind, Completion, Descriptor, DescriptorError, Handler, HandlerError, StateChange,
};
pub use command::{Command, CommandArg, MalformedCommand, RawCommand};
pub use objects::{ChangeOp, Event, QueuedEvent, VIEWED_PAGE};
