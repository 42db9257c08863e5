// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous in-process event bus with bounded history.
//!
//! Publish runs on the caller's thread: the event is stamped and appended
//! to the history ring, then type-specific handlers fire in subscription
//! order, then subscribe-all handlers. Dispatch works over a snapshot of
//! the handler list taken up front, so a handler may unsubscribe (itself
//! included) or publish re-entrantly without affecting the current pass.
//!
//! Handlers must not panic; callers that cannot guarantee that wrap them
//! with [`graceful_sync`](crate::retry::graceful_sync). Cross-thread
//! serialization of domain handlers is the orchestrator's job (it funnels
//! reader-thread events through a single-consumer queue before publishing).

use crate::clock::{Clock, SystemClock};
use crate::event::{Event, EventKind};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// An event plus the wall-clock instant it was published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: Event,
}

type Handler = Arc<dyn Fn(&EventRecord) + Send + Sync>;

struct Registered {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<Registered>>,
    all: Vec<Registered>,
    history: VecDeque<EventRecord>,
}

/// Single-process fan-out of typed events.
pub struct EventBus {
    state: Mutex<BusState>,
    max_history: usize,
    clock: Arc<dyn Clock>,
}

impl EventBus {
    /// Bus with the default history capacity and the system clock.
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    pub fn with_capacity(max_history: usize) -> Arc<Self> {
        Self::with_clock(max_history, Arc::new(SystemClock))
    }

    pub fn with_clock(max_history: usize, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(BusState::default()), max_history, clock })
    }

    /// Subscribe to events of one kind. The returned guard unsubscribes on
    /// drop.
    pub fn subscribe(
        self: &Arc<Self>,
        kind: EventKind,
        handler: impl Fn(&EventRecord) + Send + Sync + 'static,
    ) -> Subscription {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state
            .by_kind
            .entry(kind)
            .or_default()
            .push(Registered { id, handler: Arc::new(handler) });
        Subscription { bus: Arc::downgrade(self), id, kind: Some(kind) }
    }

    /// Subscribe to every event. All-handlers fire after the type-specific
    /// handlers of each published event.
    pub fn subscribe_all(
        self: &Arc<Self>,
        handler: impl Fn(&EventRecord) + Send + Sync + 'static,
    ) -> Subscription {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.all.push(Registered { id, handler: Arc::new(handler) });
        Subscription { bus: Arc::downgrade(self), id, kind: None }
    }

    /// Publish an event: record it in history, then dispatch.
    ///
    /// Returns the stamped record (also what history retains).
    pub fn publish(&self, event: Event) -> EventRecord {
        let record = EventRecord { at_ms: self.clock.epoch_ms(), event };

        // Take the handler snapshot and update history under one lock, then
        // dispatch without holding it so handlers may publish re-entrantly.
        let (typed, all) = {
            let mut state = self.state.lock();
            state.history.push_back(record.clone());
            while state.history.len() > self.max_history {
                state.history.pop_front();
            }
            let typed: Vec<Handler> = state
                .by_kind
                .get(&record.event.kind())
                .map(|regs| regs.iter().map(|r| Arc::clone(&r.handler)).collect())
                .unwrap_or_default();
            let all: Vec<Handler> =
                state.all.iter().map(|r| Arc::clone(&r.handler)).collect();
            (typed, all)
        };

        for handler in typed.iter().chain(all.iter()) {
            handler(&record);
        }
        record
    }

    /// A defensive copy of the history, optionally filtered by kind.
    pub fn history(&self, kind: Option<EventKind>) -> Vec<EventRecord> {
        let state = self.state.lock();
        match kind {
            Some(k) => state.history.iter().filter(|r| r.event.kind() == k).cloned().collect(),
            None => state.history.iter().cloned().collect(),
        }
    }

    /// Drop all handlers and history.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.by_kind.clear();
        state.all.clear();
        state.history.clear();
    }

    fn unsubscribe(&self, id: u64, kind: Option<EventKind>) {
        let mut state = self.state.lock();
        match kind {
            Some(k) => {
                if let Some(regs) = state.by_kind.get_mut(&k) {
                    regs.retain(|r| r.id != id);
                }
            }
            None => state.all.retain(|r| r.id != id),
        }
    }
}

/// Guard for a bus subscription; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    bus: Weak<EventBus>,
    id: u64,
    kind: Option<EventKind>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id, self.kind);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
