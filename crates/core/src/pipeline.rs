// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ticket status pipeline: a pure transition table.
//!
//! Nothing here touches state; the orchestrator consults these functions
//! and the plan store persists whatever they decide.

use crate::error::OrchError;
use crate::ticket::TicketStatus;
use serde::{Deserialize, Serialize};

/// How a pipeline stage advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// The orchestrator advances the stage on its own.
    Automatic,
    /// The stage runs, but a human confirms the result.
    Approval,
    /// The stage is skipped entirely; a human drives it outside the tool.
    Manual,
}

crate::simple_display! {
    StageMode {
        Automatic => "automatic",
        Approval => "approval",
        Manual => "manual",
    }
}

/// Per-stage automation policy (`[automation.review] mode = "..."`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePolicy {
    pub mode: StageMode,
}

impl Default for StagePolicy {
    fn default() -> Self {
        Self { mode: StageMode::Automatic }
    }
}

/// Automation settings for ticket progression and the review/QA stages.
///
/// `ticket_progression` governs whether `tick()` assigns ready tickets on
/// its own; the per-stage policies govern how far `next_status` advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    #[serde(alias = "ticketProgression")]
    pub ticket_progression: StageMode,
    pub review: StagePolicy,
    pub qa: StagePolicy,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            ticket_progression: StageMode::Manual,
            review: StagePolicy::default(),
            qa: StagePolicy::default(),
        }
    }
}

/// Valid forward transitions out of `from`.
pub fn valid_targets(from: TicketStatus) -> &'static [TicketStatus] {
    use TicketStatus::*;
    match from {
        Todo => &[InProgress],
        InProgress => &[Review, Qa, Done, Failed],
        Review => &[Qa, Done, Todo],
        Qa => &[Done, Todo],
        Done => &[],
        Failed => &[Todo],
    }
}

/// Whether `from -> to` appears in the transition table.
pub fn is_valid_transition(from: TicketStatus, to: TicketStatus) -> bool {
    valid_targets(from).contains(&to)
}

/// Fail with a [`OrchError::Transition`] naming the permitted targets when
/// `from -> to` is not in the table.
pub fn assert_valid_transition(from: TicketStatus, to: TicketStatus) -> Result<(), OrchError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(OrchError::Transition { from, to, valid_targets: valid_targets(from).to_vec() })
    }
}

/// The forward target for `current` under the given automation config.
///
/// A manual review or QA stage is skipped: the pipeline jumps past it to
/// the next non-manual stage (or straight to `Done`).
pub fn next_status(current: TicketStatus, automation: &AutomationConfig) -> Option<TicketStatus> {
    use TicketStatus::*;
    match current {
        Todo => Some(InProgress),
        InProgress => {
            if automation.review.mode != StageMode::Manual {
                Some(Review)
            } else if automation.qa.mode != StageMode::Manual {
                Some(Qa)
            } else {
                Some(Done)
            }
        }
        Review => {
            if automation.qa.mode != StageMode::Manual {
                Some(Qa)
            } else {
                Some(Done)
            }
        }
        Qa => Some(Done),
        Failed => Some(Todo),
        Done => None,
    }
}

/// The backward target for `current`: rejection from Review/QA and retry
/// from Failed all land back at `Todo`.
pub fn previous_status(current: TicketStatus) -> Option<TicketStatus> {
    use TicketStatus::*;
    match current {
        Review | Qa | Failed => Some(Todo),
        _ => None,
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
