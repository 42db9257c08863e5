// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The parsed plan: typed tickets plus the verbatim raw text.

use gf_core::{Priority, Ticket, TicketId};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// One checkbox item from the Definition of Done section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DodItem {
    pub text: String,
    pub checked: bool,
}

/// A plan file parsed into typed records.
///
/// `raw` holds the exact file bytes; every write is a textual edit against
/// it so unrelated formatting survives byte-for-byte. `tickets` preserves
/// file order.
#[derive(Debug, Clone, Default)]
pub struct ParsedPlan {
    pub overview: String,
    pub definition_of_done: Vec<DodItem>,
    pub epics: Vec<String>,
    pub tickets: IndexMap<TicketId, Ticket>,
    pub raw: String,
    /// Ids that appeared more than once, with the heading line of each
    /// repeat (first occurrence wins in `tickets`).
    pub duplicate_ids: Vec<(TicketId, usize)>,
}

impl ParsedPlan {
    pub fn ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn ticket_mut(&mut self, id: &TicketId) -> Option<&mut Ticket> {
        self.tickets.get_mut(id)
    }

    /// Ticket ids in file order.
    pub fn ticket_ids(&self) -> Vec<TicketId> {
        self.tickets.keys().cloned().collect()
    }

    /// Allocate the next id: `T<max+1>`, zero-padded to the width of the
    /// widest existing id (minimum three digits).
    pub fn next_ticket_id(&self) -> TicketId {
        let max = self.tickets.keys().map(TicketId::number).max().unwrap_or(0);
        let width = self
            .tickets
            .keys()
            .map(|id| id.as_str().len().saturating_sub(1))
            .max()
            .unwrap_or(3)
            .max(3);
        TicketId::new(format!("T{:0width$}", max + 1, width = width))
    }

    /// Carry runtime-only ticket fields over from a previous parse of the
    /// same plan (used after every reparse so in-flight state survives).
    pub fn carry_runtime_fields(&mut self, previous: &ParsedPlan) {
        for (id, old) in &previous.tickets {
            if let Some(new) = self.tickets.get_mut(id) {
                new.feedback = old.feedback.clone();
                new.assigned_worktree = old.assigned_worktree.clone();
            }
        }
    }
}

/// Input for [`PlanStore::create_ticket`](crate::store::PlanStore::create_ticket).
#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub priority: Priority,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub epic: Option<String>,
    pub dependencies: BTreeSet<TicketId>,
    pub acceptance_criteria: Vec<String>,
    pub validation_steps: Vec<String>,
    pub notes: Option<String>,
}
