// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worktree seam.
//!
//! Real worktree policy (git worktrees, epic grouping strategy) lives
//! outside the core; the orchestrator only needs a directory per ticket.
//! [`DirWorktrees`] is the plain-directory implementation used by the CLI
//! and the tests.

use async_trait::async_trait;
use gf_core::{OrchError, Ticket, TicketId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Allocates an isolated working directory per ticket.
#[async_trait]
pub trait WorktreeAllocator: Send + Sync {
    async fn allocate(&self, ticket: &Ticket) -> Result<PathBuf, OrchError>;
    async fn release(&self, ticket_id: &TicketId) -> Result<(), OrchError>;
}

/// Per-ticket subdirectories under a base dir, grouped by epic when the
/// ticket has one. Releasing leaves the directory on disk for inspection.
pub struct DirWorktrees {
    base: PathBuf,
    allocated: Arc<Mutex<HashMap<TicketId, PathBuf>>>,
}

impl DirWorktrees {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into(), allocated: Arc::default() }
    }

    /// The directory currently allocated to a ticket, if any.
    pub fn path_of(&self, ticket_id: &TicketId) -> Option<PathBuf> {
        self.allocated.lock().get(ticket_id).cloned()
    }
}

#[async_trait]
impl WorktreeAllocator for DirWorktrees {
    async fn allocate(&self, ticket: &Ticket) -> Result<PathBuf, OrchError> {
        let mut path = self.base.clone();
        if let Some(epic) = &ticket.epic {
            path.push(epic);
        }
        path.push(format!("wt-{}", ticket.id));

        tokio::fs::create_dir_all(&path).await?;
        self.allocated.lock().insert(ticket.id.clone(), path.clone());
        tracing::debug!(ticket = %ticket.id, path = %path.display(), "worktree allocated");
        Ok(path)
    }

    async fn release(&self, ticket_id: &TicketId) -> Result<(), OrchError> {
        if self.allocated.lock().remove(ticket_id).is_some() {
            tracing::debug!(ticket = %ticket_id, "worktree released");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
