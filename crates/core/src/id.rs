// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket and agent identifiers.
//!
//! TicketId is the plan-file form `T<digits>` (e.g. `T001`); the raw string
//! is preserved so zero-padding survives a round-trip through the plan.
//! AgentId is a process-local `agent-<n>` counter value, opaque to consumers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Identifier of a ticket within a plan, matching `T\d+`.
///
/// Ordering is numeric on the digit suffix so `T2 < T010`; ties (differing
/// padding of the same number) fall back to string order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wrap a string that is already known to be a valid ticket id.
    ///
    /// The parser produces ids via regex capture, so no re-validation
    /// happens here; use [`TicketId::parse`] for untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse and validate an id of the form `T<digits>`.
    pub fn parse(s: &str) -> Result<Self, InvalidTicketId> {
        let digits = s.strip_prefix('T').ok_or_else(|| InvalidTicketId(s.to_string()))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTicketId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Numeric value of the digit suffix.
    pub fn number(&self) -> u64 {
        self.0[1..].parse().unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error for a string that does not match `T\d+`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ticket id: {0:?} (expected T<digits>)")]
pub struct InvalidTicketId(pub String);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TicketId {
    type Err = InvalidTicketId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for TicketId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TicketId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TicketId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Ord for TicketId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number().cmp(&other.number()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for TicketId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Unique identifier for an agent instance, formatted `agent-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

static NEXT_AGENT: AtomicU64 = AtomicU64::new(1);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate the next process-local agent id.
    pub fn next() -> Self {
        let n = NEXT_AGENT.fetch_add(1, AtomicOrdering::Relaxed);
        Self(format!("agent-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
