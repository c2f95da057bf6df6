//! Callback kinds, subscription descriptors and handler types.
//!
//! A subscription descriptor is `"<kind>[:<keyPath>]"`, for example
//! `"define:user.id"`, `"change"` or `"event"`. The handler passed along
//! with a descriptor must be of the matching [`Handler`] variant.

use crate::objects::Event;
use compact_str::CompactString;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Any failure raised inside user-supplied handler code.
pub type HandlerError = anyhow::Error;

/// One-shot handler invoked with the value once it becomes available.
pub type DefineHandler = Box<dyn FnMut(&Value) -> Result<(), HandlerError> + Send>;
/// Handler invoked when a state diff is detected.
pub type ChangeHandler = Box<dyn FnMut(StateChange<'_>) -> Result<(), HandlerError> + Send>;
/// Handler receiving an independent (possibly enriched) copy of each event.
/// A returned value is collected into the completion results.
pub type EventHandler = Box<dyn FnMut(&Event) -> Result<Option<Value>, HandlerError> + Send>;
/// Gate run before event handlers; returning `false` vetoes delivery.
pub type BeforeEventHandler = Box<dyn FnMut(&Event) -> Result<bool, HandlerError> + Send>;
/// Handler delegated to the viewability tracker.
pub type ViewHandler = Box<dyn FnMut(&Value) -> Result<(), HandlerError> + Send>;
/// Completion callback attached to an event by its producer.
pub type CompletionCallback = Box<dyn FnOnce(Completion) + Send>;

/// The registries a subscription can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Define,
    Change,
    Event,
    BeforeEvent,
    View,
}

impl CallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Define => "define",
            CallbackKind::Change => "change",
            CallbackKind::Event => "event",
            CallbackKind::BeforeEvent => "beforeEvent",
            CallbackKind::View => "view",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while parsing a subscription descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("empty subscription descriptor")]
    Empty,

    #[error("unknown callback kind: {0}")]
    UnknownKind(String),
}

impl FromStr for CallbackKind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "define" => Ok(CallbackKind::Define),
            "change" => Ok(CallbackKind::Change),
            "event" => Ok(CallbackKind::Event),
            "beforeEvent" => Ok(CallbackKind::BeforeEvent),
            "view" => Ok(CallbackKind::View),
            "" => Err(DescriptorError::Empty),
            other => Err(DescriptorError::UnknownKind(other.to_string())),
        }
    }
}

/// A parsed `"<kind>[:<keyPath>]"` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: CallbackKind,
    /// Key path the subscription is scoped to. An empty key (`"change:"`)
    /// is the same as no key.
    pub key: Option<CompactString>,
}

impl Descriptor {
    pub fn new(kind: CallbackKind, key: Option<&str>) -> Self {
        Self {
            kind,
            key: key.filter(|k| !k.is_empty()).map(CompactString::from),
        }
    }
}

impl FromStr for Descriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, key) = match s.split_once(':') {
            Some((kind, key)) => (kind, Some(key)),
            None => (s, None),
        };
        Ok(Descriptor::new(kind.parse()?, key))
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}:{}", self.kind, key),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// What a change handler is told about a detected difference.
///
/// For key-scoped subscriptions `old`/`new` are the values at the key
/// (`None` when the key is absent). For whole-state subscriptions they are
/// the previous and current snapshots and both are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange<'a> {
    pub key: Option<&'a str>,
    pub old: Option<&'a Value>,
    pub new: Option<&'a Value>,
}

/// Argument of an event's completion callback.
#[derive(Debug)]
pub enum Completion {
    /// Every registered event handler has returned or failed.
    Delivered {
        results: Vec<Value>,
        errors: Vec<HandlerError>,
    },
    /// No event handler was registered at dispatch time.
    Unobserved,
}

/// A handler tagged with the registry it belongs to.
pub enum Handler {
    Define(DefineHandler),
    Change(ChangeHandler),
    Event(EventHandler),
    BeforeEvent(BeforeEventHandler),
    View(ViewHandler),
}

impl Handler {
    pub fn define<F>(f: F) -> Self
    where
        F: FnMut(&Value) -> Result<(), HandlerError> + Send + 'static,
    {
        Handler::Define(Box::new(f))
    }

    pub fn change<F>(f: F) -> Self
    where
        F: FnMut(StateChange<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        Handler::Change(Box::new(f))
    }

    pub fn event<F>(f: F) -> Self
    where
        F: FnMut(&Event) -> Result<Option<Value>, HandlerError> + Send + 'static,
    {
        Handler::Event(Box::new(f))
    }

    pub fn before_event<F>(f: F) -> Self
    where
        F: FnMut(&Event) -> Result<bool, HandlerError> + Send + 'static,
    {
        Handler::BeforeEvent(Box::new(f))
    }

    pub fn view<F>(f: F) -> Self
    where
        F: FnMut(&Value) -> Result<(), HandlerError> + Send + 'static,
    {
        Handler::View(Box::new(f))
    }

    pub fn kind(&self) -> CallbackKind {
        match self {
            Handler::Define(_) => CallbackKind::Define,
            Handler::Change(_) => CallbackKind::Change,
            Handler::Event(_) => CallbackKind::Event,
            Handler::BeforeEvent(_) => CallbackKind::BeforeEvent,
            Handler::View(_) => CallbackKind::View,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{}", self.kind())
    }
}
