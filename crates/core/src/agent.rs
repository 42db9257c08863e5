// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent records: the orchestrator-side view of a child agent process.
//!
//! The process handle itself lives in the agent manager; everything else
//! (status, metrics, last observed action) is carried here so the UI and
//! the orchestrator can inspect agents without touching the process table.

use crate::id::{AgentId, TicketId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a spawned agent was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Implementation,
    Review,
    #[serde(rename = "qa")]
    Qa,
    Refine,
    Plan,
}

crate::simple_display! {
    AgentKind {
        Implementation => "implementation",
        Review => "review",
        Qa => "qa",
        Refine => "refine",
        Plan => "plan",
    }
}

/// Lifecycle state of an agent.
///
/// `Starting` becomes `Working` on the first stdout byte. `Blocked` may
/// return to `Working` if the driver resumes the agent; the terminal states
/// are `Complete` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Starting,
    Working,
    Validating,
    Blocked,
    Complete,
    Failed,
}

crate::simple_display! {
    AgentStatus {
        Idle => "idle",
        Starting => "starting",
        Working => "working",
        Validating => "validating",
        Blocked => "blocked",
        Complete => "complete",
        Failed => "failed",
    }
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Complete | AgentStatus::Failed)
    }

    /// States that count against the concurrency cap.
    pub fn is_live(self) -> bool {
        matches!(self, AgentStatus::Starting | AgentStatus::Working | AgentStatus::Validating)
    }
}

/// Orchestrator-side record of one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub ticket_id: TicketId,
    pub working_directory: PathBuf,
    pub started_at_ms: u64,
    pub tokens_used: u64,
    pub cost: f64,
    /// 0–100, derived from recognized tool-call frames.
    pub progress: u8,
    /// Most recent chunk of output, for the UI's activity line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

impl AgentRecord {
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        ticket_id: TicketId,
        working_directory: PathBuf,
        started_at_ms: u64,
    ) -> Self {
        Self {
            id,
            kind,
            status: AgentStatus::Starting,
            ticket_id,
            working_directory,
            started_at_ms,
            tokens_used: 0,
            cost: 0.0,
            progress: 0,
            last_action: None,
        }
    }
}

crate::builder! {
    pub struct AgentRecordBuilder => AgentRecord {
        into {
            id: AgentId = AgentId::new("agent-0"),
            ticket_id: TicketId = TicketId::new("T001"),
            working_directory: PathBuf = PathBuf::from("/tmp"),
        }
        set {
            kind: AgentKind = AgentKind::Implementation,
            status: AgentStatus = AgentStatus::Starting,
            started_at_ms: u64 = 0,
            tokens_used: u64 = 0,
            cost: f64 = 0.0,
            progress: u8 = 0,
        }
        option {
            last_action: String,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
