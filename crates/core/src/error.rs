// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator error taxonomy.
//!
//! Domain errors (caller bugs) surface to the operation's caller and are
//! never auto-retried; network-class errors and agent crashes are the
//! retryable class consumed by [`with_retry`](crate::retry::with_retry);
//! malformed output is a warning, not a failure.

use crate::id::{AgentId, TicketId};
use crate::ticket::TicketStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Message fragments that mark an otherwise-untyped error as transient.
const RETRYABLE_MARKERS: &[&str] = &[
    "timeout",
    "econnreset",
    "econnrefused",
    "enotfound",
    "429",
    "500",
    "502",
    "503",
    "504",
    "socket hang up",
    "connection reset",
    "temporarily unavailable",
];

/// Render an id list as `T001, T002`.
fn join_ids(ids: &[TicketId]) -> String {
    ids.iter().map(TicketId::as_str).collect::<Vec<_>>().join(", ")
}

fn join_statuses(statuses: &[TicketStatus]) -> String {
    statuses.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum OrchError {
    /// An agent process exited non-zero.
    #[error("agent {agent_id} crashed with exit code {exit_code}")]
    AgentCrash { agent_id: AgentId, ticket_id: Option<TicketId>, exit_code: i32 },

    /// A network-class failure from an external collaborator.
    #[error("network error: {message}")]
    Network { message: String, retryable: bool },

    /// Agent output had no recognizable framing (warning-level).
    #[error("agent {agent_id} produced unrecognized output: {preview}")]
    MalformedOutput { agent_id: AgentId, preview: String },

    /// The plan file could not be parsed.
    #[error("plan parse error in {}{}: {message}", .path.display(), .line.map(|l| format!(":{l}")).unwrap_or_default())]
    PlanParse { path: PathBuf, line: Option<usize>, message: String },

    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    /// The ticket has unfinished dependencies.
    #[error("ticket {id} is not ready (blocked by {})", join_ids(.blockers))]
    TicketNotReady { id: TicketId, blockers: Vec<TicketId> },

    /// The agent pool is full.
    #[error("max concurrency reached ({limit} agents)")]
    Concurrency { limit: usize },

    /// A status change outside the pipeline table.
    #[error("invalid transition {from} -> {to} (valid targets: {})", join_statuses(.valid_targets))]
    Transition { from: TicketStatus, to: TicketStatus, valid_targets: Vec<TicketStatus> },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle: {}", join_ids(.cycle))]
    Cycle { cycle: Vec<TicketId> },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything that does not fit a dedicated variant.
    #[error("{message}{}", .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Internal { message: String, context: Option<String> },
}

impl OrchError {
    pub fn internal(message: impl Into<String>) -> Self {
        OrchError::Internal { message: message.into(), context: None }
    }

    pub fn internal_with(message: impl Into<String>, context: impl Into<String>) -> Self {
        OrchError::Internal { message: message.into(), context: Some(context.into()) }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Typed: retryable networks and agent crashes. Untyped: the display
    /// string contains a known transient marker (case-insensitive).
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchError::Network { retryable, .. } => *retryable,
            OrchError::AgentCrash { .. } => true,
            other => message_is_retryable(&other.to_string()),
        }
    }
}

/// Scan an arbitrary error message for transient-failure markers.
pub fn message_is_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
