// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Gaffer orchestrator.
//!
//! Everything the components tell each other travels as one of these
//! variants over the [`EventBus`](crate::bus::EventBus). Serializes with
//! `{"type": "domain:name", ...fields}` format; the bus stamps a timestamp
//! around the event at publish time.

use crate::agent::AgentKind;
use crate::id::{AgentId, TicketId};
use crate::ticket::TicketStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Severity of a [`Event::LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

/// Events published on the orchestrator bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- plan --
    #[serde(rename = "plan:loaded")]
    PlanLoaded { path: PathBuf, ticket_count: usize },

    #[serde(rename = "plan:updated")]
    PlanUpdated { path: PathBuf },

    #[serde(rename = "plan:error")]
    PlanError { path: PathBuf, message: String },

    // -- ticket --
    #[serde(rename = "ticket:status-changed")]
    TicketStatusChanged {
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "ticket:assigned")]
    TicketAssigned { id: TicketId, agent_id: AgentId },

    #[serde(rename = "ticket:unassigned")]
    TicketUnassigned { id: TicketId },

    /// The current ready set, published at start and after plan changes.
    #[serde(rename = "tickets:ready")]
    TicketsReady { ids: Vec<TicketId> },

    // -- agent --
    #[serde(rename = "agent:spawned")]
    AgentSpawned { agent_id: AgentId, ticket_id: TicketId, kind: AgentKind },

    #[serde(rename = "agent:progress")]
    AgentProgress {
        agent_id: AgentId,
        /// The newly arrived output text.
        last_action: String,
        /// 0–100, monotonic until reset on re-assignment.
        progress: u8,
        tokens_used: u64,
        cost: f64,
    },

    #[serde(rename = "agent:completed")]
    AgentCompleted { agent_id: AgentId, ticket_id: TicketId },

    #[serde(rename = "agent:failed")]
    AgentFailed {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<TicketId>,
        error: String,
    },

    #[serde(rename = "agent:blocked")]
    AgentBlocked {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<TicketId>,
        reason: String,
    },

    #[serde(rename = "agent:stopped")]
    AgentStopped { agent_id: AgentId },

    /// A user asked for the agent to be stopped; the manager answers with
    /// `agent:stopped` once the process is down.
    #[serde(rename = "agent:stop-request")]
    AgentStopRequest { agent_id: AgentId },

    // -- log --
    #[serde(rename = "log:entry")]
    LogEntry {
        level: LogLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_id: Option<AgentId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<TicketId>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        data: HashMap<String, String>,
    },
}

/// Fieldless discriminant of [`Event`], used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PlanLoaded,
    PlanUpdated,
    PlanError,
    TicketStatusChanged,
    TicketAssigned,
    TicketUnassigned,
    TicketsReady,
    AgentSpawned,
    AgentProgress,
    AgentCompleted,
    AgentFailed,
    AgentBlocked,
    AgentStopped,
    AgentStopRequest,
    LogEntry,
}

crate::simple_display! {
    EventKind {
        PlanLoaded => "plan:loaded",
        PlanUpdated => "plan:updated",
        PlanError => "plan:error",
        TicketStatusChanged => "ticket:status-changed",
        TicketAssigned => "ticket:assigned",
        TicketUnassigned => "ticket:unassigned",
        TicketsReady => "tickets:ready",
        AgentSpawned => "agent:spawned",
        AgentProgress => "agent:progress",
        AgentCompleted => "agent:completed",
        AgentFailed => "agent:failed",
        AgentBlocked => "agent:blocked",
        AgentStopped => "agent:stopped",
        AgentStopRequest => "agent:stop-request",
        LogEntry => "log:entry",
    }
}

impl Event {
    /// The discriminant tag, matching the serialized `type` field.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PlanLoaded { .. } => EventKind::PlanLoaded,
            Event::PlanUpdated { .. } => EventKind::PlanUpdated,
            Event::PlanError { .. } => EventKind::PlanError,
            Event::TicketStatusChanged { .. } => EventKind::TicketStatusChanged,
            Event::TicketAssigned { .. } => EventKind::TicketAssigned,
            Event::TicketUnassigned { .. } => EventKind::TicketUnassigned,
            Event::TicketsReady { .. } => EventKind::TicketsReady,
            Event::AgentSpawned { .. } => EventKind::AgentSpawned,
            Event::AgentProgress { .. } => EventKind::AgentProgress,
            Event::AgentCompleted { .. } => EventKind::AgentCompleted,
            Event::AgentFailed { .. } => EventKind::AgentFailed,
            Event::AgentBlocked { .. } => EventKind::AgentBlocked,
            Event::AgentStopped { .. } => EventKind::AgentStopped,
            Event::AgentStopRequest { .. } => EventKind::AgentStopRequest,
            Event::LogEntry { .. } => EventKind::LogEntry,
        }
    }

    /// Shorthand for a bare [`Event::LogEntry`].
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Event::LogEntry {
            level,
            message: message.into(),
            agent_id: None,
            ticket_id: None,
            data: HashMap::new(),
        }
    }

    /// A log entry scoped to an agent (and optionally its ticket).
    pub fn agent_log(
        level: LogLevel,
        message: impl Into<String>,
        agent_id: AgentId,
        ticket_id: Option<TicketId>,
    ) -> Self {
        Event::LogEntry {
            level,
            message: message.into(),
            agent_id: Some(agent_id),
            ticket_id,
            data: HashMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
