//! Define dispatch, snapshot diffing and the periodic tick.
//!
//! The detector keeps a structural copy of the domain data (the queues are
//! stored apart from it, so they never take part in the diff). Every tick
//! re-runs define dispatch and compares the live data with the snapshot;
//! on a difference the snapshot is replaced and define and change handlers
//! are notified.

use super::Coordinator;
use super::isolate::isolate;
use ddm_sdk::{CallbackKind, StateChange, key_path};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Snapshot plus the cancellable periodic timer.
#[derive(Debug)]
pub struct ChangeDetector {
    snapshot: Value,
    interval_ms: i64,
    next_due: Option<i64>,
}

impl ChangeDetector {
    pub fn new(snapshot: Value, interval: Duration) -> Self {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX).max(1);
        Self {
            snapshot,
            interval_ms,
            next_due: None,
        }
    }

    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    /// Arm the timer; the first tick is due one interval after `now_ms`.
    pub(crate) fn start(&mut self, now_ms: i64) {
        self.next_due = Some(now_ms.saturating_add(self.interval_ms));
    }

    pub(crate) fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Consume one due tick. Ticks missed by more than an interval are
    /// coalesced into the one returned here.
    pub(crate) fn take_due(&mut self, now_ms: i64) -> bool {
        match self.next_due {
            Some(due) if due <= now_ms => {
                let next = due.saturating_add(self.interval_ms);
                self.next_due = Some(if next <= now_ms {
                    now_ms.saturating_add(self.interval_ms)
                } else {
                    next
                });
                true
            }
            _ => false,
        }
    }

    /// Replace the snapshot, returning the previous one.
    pub(crate) fn observe(&mut self, current: Value) -> Value {
        std::mem::replace(&mut self.snapshot, current)
    }
}

impl Coordinator {
    /// Run one change-detector pass: define dispatch, then the diff.
    pub fn tick(&mut self) {
        self.fire_define();
        self.check_for_changes();
        self.drain_emitted();
    }

    /// Run the tick if the timer is due. Returns the number of ticks run.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut ran = 0;
        while self.detector.take_due(now) {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// Whether the periodic tick is armed.
    pub fn is_ticking(&self) -> bool {
        self.detector.is_running()
    }

    /// Fire every define handler whose value is present, removing it.
    ///
    /// A present `null`, `0` or `""` counts as available; only an absent key
    /// keeps the handler waiting.
    pub(crate) fn fire_define(&mut self) {
        let data = &self.state.data;
        self.registry.define.retain_mut(|entry| {
            let key = entry.key.as_deref().unwrap_or("");
            let Some(value) = key_path::get(key, data) else {
                return true;
            };
            let _ = isolate(CallbackKind::Define, key, || (entry.handler)(value));
            false
        });
    }

    fn check_for_changes(&mut self) {
        if !self.registry.watches_state() {
            return;
        }
        if *self.detector.snapshot() == self.state.data {
            return;
        }
        let previous = self.detector.observe(self.state.data.clone());
        debug!("State change detected");
        self.fire_define();
        self.fire_change(&previous);
    }

    fn fire_change(&mut self, previous: &Value) {
        let current = &self.state.data;
        for entry in self.registry.change.iter_mut() {
            let change = match entry.key.as_deref() {
                Some(key) => {
                    let old = key_path::get(key, previous);
                    let new = key_path::get(key, current);
                    if old == new {
                        continue;
                    }
                    StateChange {
                        key: Some(key),
                        old,
                        new,
                    }
                }
                None => StateChange {
                    key: None,
                    old: Some(previous),
                    new: Some(current),
                },
            };
            let subject = change.key.unwrap_or("");
            let _ = isolate(CallbackKind::Change, subject, || (entry.handler)(change));
        }
    }
}
