// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ticket data model.
//!
//! A ticket is one unit of work from the plan file: id, priority, pipeline
//! status, dependencies on other tickets, and the acceptance/validation
//! text the orchestrator uses to judge an agent's work. `feedback` and
//! `assigned_worktree` exist only at runtime and are never serialized back
//! to the plan.

use crate::id::TicketId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Scheduling priority. `P0` is the most urgent and sorts first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    P0,
    #[default]
    P1,
    P2,
}

crate::simple_display! {
    Priority {
        P0 => "P0",
        P1 => "P1",
        P2 => "P2",
    }
}

impl FromStr for Priority {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "P0" => Ok(Priority::P0),
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            other => Err(UnknownValue { field: "Priority", value: other.to_string() }),
        }
    }
}

/// Position of a ticket in the review/QA pipeline.
///
/// The plan file accepts both `InProgress` and `In Progress` on read; the
/// display (and serialized) form is always the spaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Todo,
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    Review,
    #[serde(rename = "QA")]
    Qa,
    Done,
    Failed,
}

crate::simple_display! {
    TicketStatus {
        Todo => "Todo",
        InProgress => "In Progress",
        Review => "Review",
        Qa => "QA",
        Done => "Done",
        Failed => "Failed",
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Todo" => Ok(TicketStatus::Todo),
            "InProgress" | "In Progress" => Ok(TicketStatus::InProgress),
            "Review" => Ok(TicketStatus::Review),
            "QA" | "Qa" => Ok(TicketStatus::Qa),
            "Done" => Ok(TicketStatus::Done),
            "Failed" => Ok(TicketStatus::Failed),
            other => Err(UnknownValue { field: "Status", value: other.to_string() }),
        }
    }
}

impl TicketStatus {
    /// Sort rank for display: `Failed` first (it demands attention), then
    /// the pipeline order.
    pub fn display_rank(self) -> u8 {
        match self {
            TicketStatus::Failed => 0,
            TicketStatus::Todo => 1,
            TicketStatus::InProgress => 2,
            TicketStatus::Review => 3,
            TicketStatus::Qa => 4,
            TicketStatus::Done => 5,
        }
    }

    /// `Done` is the only state a ticket never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Done)
    }
}

/// A field value the plan file does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} value: {value:?}")]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

/// One unit of work from the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub priority: Priority,
    pub status: TicketStatus,
    /// `None` is semantically the same as the literal "Unassigned".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<TicketId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_steps: Vec<String>,
    /// Runtime-only: feedback notes accumulated this session.
    #[serde(skip)]
    pub feedback: Vec<String>,
    /// Runtime-only: worktree assigned by the allocator while in flight.
    #[serde(skip)]
    pub assigned_worktree: Option<PathBuf>,
}

impl Ticket {
    /// Owner for display, with absence rendered as "Unassigned".
    pub fn owner_display(&self) -> &str {
        self.owner.as_deref().unwrap_or("Unassigned")
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} {}] {}", self.id, self.priority, self.status, self.title)
    }
}

crate::builder! {
    pub struct TicketBuilder => Ticket {
        into {
            id: TicketId = TicketId::new("T001"),
            title: String = "Test ticket",
        }
        set {
            priority: Priority = Priority::P1,
            status: TicketStatus = TicketStatus::Todo,
            dependencies: BTreeSet<TicketId> = BTreeSet::new(),
            acceptance_criteria: Vec<String> = Vec::new(),
            validation_steps: Vec<String> = Vec::new(),
            feedback: Vec<String> = Vec::new(),
        }
        option {
            description: String,
            notes: String,
            owner: String,
            epic: String,
            assigned_worktree: PathBuf,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TicketBuilder {
    /// Add a single dependency (convenience over `dependencies`).
    pub fn depends_on(mut self, id: impl Into<TicketId>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    /// Add a single validation step (convenience over `validation_steps`).
    pub fn validation_step(mut self, step: impl Into<String>) -> Self {
        self.validation_steps.push(step.into());
        self
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
