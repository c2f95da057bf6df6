//! Callback registry: one ordered list of entries per callback kind.

use compact_str::CompactString;
use ddm_sdk::callback::{
    BeforeEventHandler, ChangeHandler, DefineHandler, EventHandler, ViewHandler,
};
use ddm_sdk::{CallbackKind, Descriptor, DescriptorError, Handler};
use thiserror::Error;

/// Errors returned by `Coordinator::subscribe`.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("descriptor targets {descriptor} callbacks but handler is a {handler} handler")]
    HandlerMismatch {
        descriptor: CallbackKind,
        handler: CallbackKind,
    },

    #[error("view subscriptions need a viewability tracker")]
    NoViewabilityTracker,
}

/// A registered handler and the key path it is scoped to.
pub struct CallbackEntry<H> {
    pub key: Option<CompactString>,
    pub handler: H,
}

impl<H> CallbackEntry<H> {
    pub fn new(key: Option<CompactString>, handler: H) -> Self {
        Self { key, handler }
    }
}

/// Registered callbacks in registration order.
///
/// `view` subscriptions never land here; they go to the viewability tracker.
#[derive(Default)]
pub struct CallbackRegistry {
    pub(crate) define: Vec<CallbackEntry<DefineHandler>>,
    pub(crate) change: Vec<CallbackEntry<ChangeHandler>>,
    pub(crate) event: Vec<CallbackEntry<EventHandler>>,
    pub(crate) before_event: Vec<CallbackEntry<BeforeEventHandler>>,
}

impl CallbackRegistry {
    /// Store `handler` under `descriptor`.
    ///
    /// Hands a `view` handler back so the caller can route it to the tracker.
    pub(crate) fn insert(
        &mut self,
        descriptor: Descriptor,
        handler: Handler,
    ) -> Result<Option<ViewHandler>, SubscribeError> {
        if descriptor.kind != handler.kind() {
            return Err(SubscribeError::HandlerMismatch {
                descriptor: descriptor.kind,
                handler: handler.kind(),
            });
        }
        let key = descriptor.key;
        match handler {
            Handler::Define(h) => self.define.push(CallbackEntry::new(key, h)),
            Handler::Change(h) => self.change.push(CallbackEntry::new(key, h)),
            Handler::Event(h) => self.event.push(CallbackEntry::new(key, h)),
            Handler::BeforeEvent(h) => self.before_event.push(CallbackEntry::new(key, h)),
            Handler::View(h) => return Ok(Some(h)),
        }
        Ok(None)
    }

    pub fn len(&self, kind: CallbackKind) -> usize {
        match kind {
            CallbackKind::Define => self.define.len(),
            CallbackKind::Change => self.change.len(),
            CallbackKind::Event => self.event.len(),
            CallbackKind::BeforeEvent => self.before_event.len(),
            CallbackKind::View => 0,
        }
    }

    /// Whether anything needs the change detector to compare snapshots.
    pub fn watches_state(&self) -> bool {
        !self.change.is_empty() || !self.define.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.define.clear();
        self.change.clear();
        self.event.clear();
        self.before_event.clear();
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("define", &self.define.len())
            .field("change", &self.change.len())
            .field("event", &self.event.len())
            .field("before_event", &self.before_event.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(s: &str) -> Descriptor {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_routes_by_kind() {
        let mut registry = CallbackRegistry::default();
        registry
            .insert(descriptor("define:user"), Handler::define(|_| Ok(())))
            .unwrap();
        registry
            .insert(descriptor("event"), Handler::event(|_| Ok(None)))
            .unwrap();
        registry
            .insert(descriptor("event"), Handler::event(|_| Ok(None)))
            .unwrap();

        assert_eq!(registry.len(CallbackKind::Define), 1);
        assert_eq!(registry.len(CallbackKind::Event), 2);
        assert_eq!(registry.len(CallbackKind::Change), 0);
        assert_eq!(registry.define[0].key.as_deref(), Some("user"));
        assert!(registry.watches_state());
    }

    #[test]
    fn test_view_handlers_are_handed_back() {
        let mut registry = CallbackRegistry::default();
        let returned = registry
            .insert(descriptor("view:.banner"), Handler::view(|_| Ok(())))
            .unwrap();
        assert!(returned.is_some());
        assert!(!registry.watches_state());
    }

    #[test]
    fn test_mismatched_handler_is_rejected() {
        let mut registry = CallbackRegistry::default();
        let result = registry.insert(descriptor("change"), Handler::event(|_| Ok(None)));
        assert!(matches!(
            result,
            Err(SubscribeError::HandlerMismatch {
                descriptor: CallbackKind::Change,
                handler: CallbackKind::Event
            })
        ));
        assert_eq!(registry.len(CallbackKind::Event), 0);
    }

    #[test]
    fn test_clear() {
        let mut registry = CallbackRegistry::default();
        registry
            .insert(descriptor("change"), Handler::change(|_| Ok(())))
            .unwrap();
        registry.clear();
        assert!(!registry.watches_state());
    }
}
