// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared across crates (behind the `test-support` feature).

use crate::bus::{EventBus, EventRecord, Subscription};
use crate::event::EventKind;
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects every event published on a bus for later assertions.
///
/// Keep the sink alive for as long as events should be captured; dropping
/// it unsubscribes.
pub struct EventSink {
    records: Arc<Mutex<Vec<EventRecord>>>,
    _sub: Subscription,
}

impl EventSink {
    pub fn attach(bus: &Arc<EventBus>) -> Self {
        let records: Arc<Mutex<Vec<EventRecord>>> = Arc::default();
        let records2 = Arc::clone(&records);
        let sub = bus.subscribe_all(move |record| records2.lock().push(record.clone()));
        Self { records, _sub: sub }
    }

    /// Snapshot of everything seen so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// The kinds seen so far, in publish order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.records.lock().iter().map(|r| r.event.kind()).collect()
    }

    /// Events of one kind.
    pub fn of_kind(&self, kind: EventKind) -> Vec<EventRecord> {
        self.records.lock().iter().filter(|r| r.event.kind() == kind).cloned().collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}
