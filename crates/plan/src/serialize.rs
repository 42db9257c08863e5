// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket block rendering.
//!
//! Emits the canonical field order: heading, Priority, Status, Owner
//! (always present), Epic, Scope, Acceptance Criteria, Validation Steps,
//! Dependencies, Notes. Absent optional fields are omitted; Status is
//! written in its display form (`In Progress`).

use gf_core::{Ticket, TicketId};

pub fn serialize_ticket(ticket: &Ticket) -> String {
    let mut out = String::new();

    out.push_str(&format!("### Ticket: {} {}\n", ticket.id, ticket.title));
    out.push_str(&format!("- **Priority:** {}\n", ticket.priority));
    out.push_str(&format!("- **Status:** {}\n", ticket.status));
    out.push_str(&format!("- **Owner:** {}\n", ticket.owner_display()));

    if let Some(epic) = &ticket.epic {
        out.push_str(&format!("- **Epic:** {epic}\n"));
    }
    if let Some(description) = &ticket.description {
        push_text_field(&mut out, "Scope", description);
    }
    push_list_field(&mut out, "Acceptance Criteria", &ticket.acceptance_criteria);
    push_list_field(&mut out, "Validation Steps", &ticket.validation_steps);

    if !ticket.dependencies.is_empty() {
        let deps: Vec<&str> = ticket.dependencies.iter().map(TicketId::as_str).collect();
        out.push_str(&format!("- **Dependencies:** {}\n", deps.join(", ")));
    }
    if let Some(notes) = &ticket.notes {
        push_text_field(&mut out, "Notes", notes);
    }

    out
}

/// A text field: first line inline, continuation lines as a sub-list.
fn push_text_field(out: &mut String, name: &str, text: &str) {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default();
    out.push_str(&format!("- **{name}:** {first}\n"));
    for line in lines {
        out.push_str(&format!("  - {line}\n"));
    }
}

fn push_list_field(out: &mut String, name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("- **{name}:**\n"));
    for item in items {
        out.push_str(&format!("  - {item}\n"));
    }
}

#[cfg(test)]
#[path = "serialize_tests.rs"]
mod tests;
