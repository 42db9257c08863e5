// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plan store: loads the plan file and applies surgical mutations.
//!
//! Every mutation edits the raw text of exactly one ticket block, writes
//! the whole document to `<path>.tmp`, and renames it onto the plan file
//! (atomic on POSIX). An advisory lock on the plan file guards the
//! read-modify-write section against other cooperating processes; within
//! this process the orchestrator driver already serializes writes.
//!
//! Event order per mutation: `ticket:status-changed` (status changes
//! only), then `plan:updated`.

use crate::error::{PlanError, PlanIssue};
use crate::model::{NewTicket, ParsedPlan};
use crate::parse::{parse_plan, ticket_block_span, validate_plan};
use crate::serialize::serialize_ticket;
use fs2::FileExt;
use gf_core::{Event, EventBus, Ticket, TicketId, TicketStatus};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct PlanStore {
    path: PathBuf,
    bus: Arc<EventBus>,
    plan: ParsedPlan,
}

impl PlanStore {
    /// Read and parse the plan file, publishing `plan:loaded` on success
    /// or `plan:error` on failure.
    pub fn load(path: impl Into<PathBuf>, bus: Arc<EventBus>) -> Result<Self, PlanError> {
        let path = path.into();
        let result = fs::read_to_string(&path).map_err(PlanError::from).and_then(|t| parse_plan(&t));
        match result {
            Ok(plan) => {
                bus.publish(Event::PlanLoaded { path: path.clone(), ticket_count: plan.tickets.len() });
                Ok(Self { path, bus, plan })
            }
            Err(err) => {
                bus.publish(Event::PlanError { path: path.clone(), message: err.to_string() });
                Err(err)
            }
        }
    }

    /// Re-read the plan file, carrying runtime-only ticket fields over.
    pub fn reload(&mut self) -> Result<(), PlanError> {
        let text = fs::read_to_string(&self.path)?;
        match parse_plan(&text) {
            Ok(mut plan) => {
                plan.carry_runtime_fields(&self.plan);
                self.plan = plan;
                self.bus.publish(Event::PlanLoaded {
                    path: self.path.clone(),
                    ticket_count: self.plan.tickets.len(),
                });
                Ok(())
            }
            Err(err) => {
                self.bus
                    .publish(Event::PlanError { path: self.path.clone(), message: err.to_string() });
                Err(err)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plan(&self) -> &ParsedPlan {
        &self.plan
    }

    pub fn ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.plan.ticket(id)
    }

    /// Plan-level validation issues (duplicate ids, dangling deps).
    pub fn validate(&self) -> Vec<PlanIssue> {
        validate_plan(&self.plan)
    }

    /// Record runtime-only feedback without touching the file.
    pub fn push_runtime_feedback(&mut self, id: &TicketId, text: impl Into<String>) {
        if let Some(ticket) = self.plan.ticket_mut(id) {
            ticket.feedback.push(text.into());
        }
    }

    /// Clear runtime-only feedback (retry path).
    pub fn clear_runtime_feedback(&mut self, id: &TicketId) {
        if let Some(ticket) = self.plan.ticket_mut(id) {
            ticket.feedback.clear();
        }
    }

    /// Remember which worktree a ticket is running in (runtime-only).
    pub fn set_assigned_worktree(&mut self, id: &TicketId, worktree: Option<PathBuf>) {
        if let Some(ticket) = self.plan.ticket_mut(id) {
            ticket.assigned_worktree = worktree;
        }
    }

    /// Change a ticket's status, persist, and publish. No-op when the
    /// status already matches.
    pub fn update_ticket_status(
        &mut self,
        id: &TicketId,
        status: TicketStatus,
        reason: Option<String>,
    ) -> Result<(), PlanError> {
        let previous = self.require_ticket(id)?.status;
        if previous == status {
            return Ok(());
        }

        let new_raw = self.replace_field_line(id, "Status", &status.to_string())?;
        self.persist(new_raw)?;
        self.bus.publish(Event::TicketStatusChanged {
            id: id.clone(),
            from: previous,
            to: status,
            reason,
        });
        self.bus.publish(Event::PlanUpdated { path: self.path.clone() });
        Ok(())
    }

    /// Set or clear a ticket's owner; clearing renders `Unassigned`.
    pub fn update_ticket_owner(
        &mut self,
        id: &TicketId,
        owner: Option<&str>,
    ) -> Result<(), PlanError> {
        self.require_ticket(id)?;
        let display = match owner {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => "Unassigned".to_string(),
        };

        let new_raw = self.replace_field_line(id, "Owner", &display)?;
        self.persist(new_raw)?;
        self.bus.publish(Event::PlanUpdated { path: self.path.clone() });
        Ok(())
    }

    /// Append feedback under the ticket's Notes field, creating the field
    /// if absent, and record it in the runtime feedback list.
    pub fn add_ticket_feedback(
        &mut self,
        id: &TicketId,
        text: impl Into<String>,
    ) -> Result<(), PlanError> {
        let text = text.into();
        self.require_ticket(id)?;

        let span = ticket_block_span(&self.plan.raw, id)
            .ok_or_else(|| PlanError::NoMatch { id: id.clone(), field: "Notes" })?;
        let block = &self.plan.raw[span.clone()];

        let notes_re = field_regex("Notes");
        let new_block = if let Some(caps) = notes_re.captures(block) {
            let existing = caps[2].trim();
            let merged = if existing.is_empty() {
                format!("{}{}", &caps[1], text)
            } else {
                format!("{}{existing} | {text}", &caps[1])
            };
            notes_re.replace(block, regex::NoExpand(merged.as_str())).into_owned()
        } else {
            // Append as the block's last field line, before trailing blanks.
            let trimmed_len = block.trim_end_matches('\n').len();
            let mut appended = block[..trimmed_len].to_string();
            appended.push_str(&format!("\n- **Notes:** {text}"));
            appended.push_str(&block[trimmed_len..]);
            appended
        };

        let mut new_raw = self.plan.raw.clone();
        new_raw.replace_range(span, &new_block);
        self.persist(new_raw)?;
        self.push_runtime_feedback(id, text);
        self.bus.publish(Event::PlanUpdated { path: self.path.clone() });
        Ok(())
    }

    /// Append a new ticket block at the end of the file and return its id.
    pub fn create_ticket(&mut self, new: NewTicket) -> Result<TicketId, PlanError> {
        let id = self.plan.next_ticket_id();
        let ticket = Ticket {
            id: id.clone(),
            title: new.title,
            description: new.description,
            notes: new.notes,
            priority: new.priority,
            status: TicketStatus::Todo,
            owner: new.owner,
            epic: new.epic,
            dependencies: new.dependencies,
            acceptance_criteria: new.acceptance_criteria,
            validation_steps: new.validation_steps,
            feedback: Vec::new(),
            assigned_worktree: None,
        };

        let mut new_raw = self.plan.raw.clone();
        if !new_raw.is_empty() && !new_raw.ends_with('\n') {
            new_raw.push('\n');
        }
        new_raw.push('\n');
        new_raw.push_str(&serialize_ticket(&ticket));

        self.persist(new_raw)?;
        self.bus.publish(Event::PlanUpdated { path: self.path.clone() });
        Ok(id)
    }

    fn require_ticket(&self, id: &TicketId) -> Result<&Ticket, PlanError> {
        self.plan.ticket(id).ok_or_else(|| PlanError::TicketNotFound(id.clone()))
    }

    /// Replace the value of one `- **Field:** value` line inside the
    /// ticket's block, returning the edited document.
    fn replace_field_line(
        &self,
        id: &TicketId,
        field: &'static str,
        value: &str,
    ) -> Result<String, PlanError> {
        let span = ticket_block_span(&self.plan.raw, id)
            .ok_or_else(|| PlanError::NoMatch { id: id.clone(), field })?;
        let block = &self.plan.raw[span.clone()];

        let re = field_regex(field);
        let caps = re.captures(block).ok_or_else(|| PlanError::NoMatch { id: id.clone(), field })?;
        let replacement = format!("{}{value}", &caps[1]);
        let new_block = re.replace(block, regex::NoExpand(replacement.as_str())).into_owned();

        let mut new_raw = self.plan.raw.clone();
        new_raw.replace_range(span, &new_block);
        Ok(new_raw)
    }

    /// Write `<path>.tmp` and rename it onto the plan file, then reparse
    /// the new text (runtime fields carried over). Nothing is written when
    /// parsing of the edited text fails.
    fn persist(&mut self, new_raw: String) -> Result<(), PlanError> {
        let mut plan = parse_plan(&new_raw)?;
        plan.carry_runtime_fields(&self.plan);

        // Advisory lock for the read-modify-write section; released on drop.
        let lock = fs::OpenOptions::new().read(true).open(&self.path)?;
        lock.lock_exclusive()?;

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &new_raw)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        let _ = fs2::FileExt::unlock(&lock);

        self.plan = plan;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// `(?m)^(- **Field:** )(value)$` with the prefix captured for reuse.
fn field_regex(field: &str) -> Regex {
    #[allow(clippy::expect_used)] // static pattern apart from the escaped field name
    Regex::new(&format!(r"(?m)^(-\s*\*\*{}:\*\*\s*)(.*)$", regex::escape(field)))
        .expect("constant regex pattern is valid")
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
