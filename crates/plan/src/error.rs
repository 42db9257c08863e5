// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan parsing and persistence errors.

use gf_core::{OrchError, TicketId};
use std::path::Path;
use thiserror::Error;

/// Failures from parsing or mutating the plan file.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A surgical edit found nothing to replace; the file was not written.
    #[error("ticket {id}: no textual match for {field} field")]
    NoMatch { id: TicketId, field: &'static str },

    #[error("ticket {0} not found in plan")]
    TicketNotFound(TicketId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlanError {
    /// Lift into the orchestrator taxonomy, attaching the plan path.
    pub fn into_orch(self, path: &Path) -> OrchError {
        match self {
            PlanError::Parse { line, message } => {
                OrchError::PlanParse { path: path.to_path_buf(), line: Some(line), message }
            }
            PlanError::NoMatch { .. } => OrchError::PlanParse {
                path: path.to_path_buf(),
                line: None,
                message: self.to_string(),
            },
            PlanError::TicketNotFound(id) => OrchError::TicketNotFound(id),
            PlanError::Io(e) => OrchError::Io(e),
        }
    }
}

/// A non-fatal problem found by plan-level validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanIssue {
    /// 1-based line of the offending ticket heading, when known.
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
