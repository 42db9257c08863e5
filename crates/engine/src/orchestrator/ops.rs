// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator operations exposed to the UI: assignment, pipeline
//! movement, retry/reject, the automatic tick, and plan reload.

use super::Orchestrator;
use crate::agent::SpawnRequest;
use crate::prompts;
use gf_core::pipeline::{next_status, StageMode};
use gf_core::{AgentId, AgentKind, Event, LogLevel, OrchError, TicketId, TicketStatus};

impl Orchestrator {
    /// Start an implementation agent on a ready Todo ticket.
    ///
    /// The worktree is allocated and the agent spawned before the status
    /// write; any failure along the way rolls the earlier steps back so
    /// the ticket stays Todo.
    pub async fn assign_ticket(&self, id: &TicketId) -> Result<AgentId, OrchError> {
        if !self.is_running() {
            return Err(OrchError::internal("orchestrator is not running"));
        }

        let ticket =
            self.ticket(id).ok_or_else(|| OrchError::TicketNotFound(id.clone()))?;
        if ticket.status != TicketStatus::Todo {
            return Err(OrchError::TicketNotReady { id: id.clone(), blockers: Vec::new() });
        }
        let blockers = self.get_blocked_by(id);
        if !blockers.is_empty() {
            return Err(OrchError::TicketNotReady { id: id.clone(), blockers });
        }

        let worktree = self.worktrees.allocate(&ticket).await?;
        let request = SpawnRequest {
            ticket_id: id.clone(),
            kind: AgentKind::Implementation,
            working_directory: worktree.clone(),
            prompt: prompts::implementation_prompt(&ticket),
            model: self.config.agent_model.clone(),
        };

        let agent_id = match self.agents.spawn(request).await {
            Ok(agent_id) => agent_id,
            Err(err) => {
                let _ = self.worktrees.release(id).await;
                return Err(err);
            }
        };

        let persisted = self.with_store(|store| {
            store.set_assigned_worktree(id, Some(worktree.clone()));
            store.update_ticket_status(
                id,
                TicketStatus::InProgress,
                Some(format!("assigned to {agent_id}")),
            )
        });
        if let Err(err) = persisted {
            // Roll back: the spawn succeeded but the write did not.
            self.agents.stop(&agent_id, true);
            let _ = self.worktrees.release(id).await;
            self.with_store(|store| {
                store.set_assigned_worktree(id, None);
                Ok(())
            })
            .ok();
            return Err(err);
        }

        self.graph.lock().update_ticket_status(id, TicketStatus::InProgress);
        self.state.lock().assignments.insert(agent_id.clone(), id.clone());
        self.bus
            .publish(Event::TicketAssigned { id: id.clone(), agent_id: agent_id.clone() });
        self.publish_ready();
        Ok(agent_id)
    }

    /// Move a ticket forward along the pipeline, spawning the review/QA
    /// agent when that stage is automated.
    pub async fn advance_ticket(&self, id: &TicketId) -> Result<(), OrchError> {
        let ticket =
            self.ticket(id).ok_or_else(|| OrchError::TicketNotFound(id.clone()))?;
        let Some(next) = next_status(ticket.status, &self.config.automation) else {
            return Ok(());
        };

        self.persist_status(id, next, Some(format!("advanced from {}", ticket.status)))?;

        match next {
            TicketStatus::Review if self.config.automation.review.mode == StageMode::Automatic => {
                self.spawn_stage_agent(id, AgentKind::Review).await;
            }
            TicketStatus::Qa if self.config.automation.qa.mode == StageMode::Automatic => {
                self.spawn_stage_agent(id, AgentKind::Qa).await;
            }
            TicketStatus::Done => {
                self.finish_ticket(id).await;
            }
            _ => {}
        }

        self.publish_ready();
        Ok(())
    }

    /// Send a Review/QA ticket back to Todo with feedback.
    pub async fn reject_ticket(
        &self,
        id: &TicketId,
        feedback: impl Into<String>,
    ) -> Result<(), OrchError> {
        let ticket =
            self.ticket(id).ok_or_else(|| OrchError::TicketNotFound(id.clone()))?;
        if !matches!(ticket.status, TicketStatus::Review | TicketStatus::Qa) {
            return Err(OrchError::internal_with(
                format!("cannot reject ticket {id}"),
                format!("status is {}, rejection needs Review or QA", ticket.status),
            ));
        }

        let feedback = feedback.into();
        self.with_store(|store| store.add_ticket_feedback(id, feedback.clone()))?;
        self.persist_status(id, TicketStatus::Todo, Some("rejected".to_string()))?;
        self.publish_ready();
        Ok(())
    }

    /// Put a Failed ticket back in the queue, clearing session feedback.
    pub async fn retry_ticket(&self, id: &TicketId) -> Result<(), OrchError> {
        let ticket =
            self.ticket(id).ok_or_else(|| OrchError::TicketNotFound(id.clone()))?;
        if ticket.status != TicketStatus::Failed {
            return Err(OrchError::internal_with(
                format!("cannot retry ticket {id}"),
                format!("status is {}, retry needs Failed", ticket.status),
            ));
        }

        self.with_store(|store| {
            store.clear_runtime_feedback(id);
            Ok(())
        })?;
        self.persist_status(id, TicketStatus::Todo, Some("retry".to_string()))?;
        self.publish_ready();
        Ok(())
    }

    /// In automatic mode, assign ready tickets until the pool is full.
    /// No-op in manual/approval mode or when stopped.
    pub async fn tick(&self) {
        if !self.is_running()
            || self.config.automation.ticket_progression != StageMode::Automatic
        {
            return;
        }

        loop {
            if self.agents.live_count() >= self.config.max_agents {
                break;
            }
            let next = self.get_ready_tickets().into_iter().next();
            let Some(id) = next else { break };
            match self.assign_ticket(&id).await {
                Ok(agent_id) => {
                    tracing::debug!(ticket = %id, agent = %agent_id, "tick assigned ticket");
                }
                Err(err) => {
                    tracing::warn!(ticket = %id, error = %err, "tick could not assign");
                    break;
                }
            }
        }
    }

    /// Re-parse the plan file and rebuild the graph, preserving in-flight
    /// agent records and runtime ticket state.
    pub fn reload_plan(&self) -> Result<(), OrchError> {
        self.with_store(|store| store.reload())?;
        {
            let mut graph = self.graph.lock();
            let tickets: Vec<_> = self
                .store
                .lock()
                .as_ref()
                .map(|s| s.plan().tickets.values().cloned().collect())
                .unwrap_or_default();
            graph.build(tickets);
        }
        self.publish_ready();
        Ok(())
    }

    // ----- internal helpers ----------------------------------------------

    /// Persist a status change and mirror it into the graph.
    pub(super) fn persist_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
        reason: Option<String>,
    ) -> Result<(), OrchError> {
        self.with_store(|store| store.update_ticket_status(id, status, reason))?;
        self.graph.lock().update_ticket_status(id, status);
        Ok(())
    }

    /// Spawn the specialized agent for an automated Review/QA stage. A
    /// spawn failure is logged but does not move the ticket; it waits in
    /// the stage for a human.
    pub(super) async fn spawn_stage_agent(&self, id: &TicketId, kind: AgentKind) {
        let Some(ticket) = self.ticket(id) else { return };
        let Some(worktree) = ticket.assigned_worktree.clone() else {
            tracing::warn!(ticket = %id, "no worktree for stage agent");
            return;
        };

        let prompt = match kind {
            AgentKind::Qa => prompts::qa_prompt(&ticket),
            _ => prompts::review_prompt(&ticket),
        };
        let request = SpawnRequest {
            ticket_id: id.clone(),
            kind,
            working_directory: worktree,
            prompt,
            model: self.config.agent_model.clone(),
        };

        match self.agents.spawn(request).await {
            Ok(agent_id) => {
                self.state.lock().assignments.insert(agent_id.clone(), id.clone());
                self.bus.publish(Event::TicketAssigned { id: id.clone(), agent_id });
            }
            Err(err) => {
                tracing::warn!(ticket = %id, error = %err, "could not spawn {kind} agent");
                self.bus.publish(Event::log(
                    LogLevel::Warn,
                    format!("could not spawn {kind} agent for {id}: {err}"),
                ));
            }
        }
    }

    /// A ticket reached Done: release its worktree and clear bookkeeping.
    pub(super) async fn finish_ticket(&self, id: &TicketId) {
        let _ = self.worktrees.release(id).await;
        self.with_store(|store| {
            store.set_assigned_worktree(id, None);
            Ok(())
        })
        .ok();
        self.state.lock().attempts.remove(id);
        self.bus.publish(Event::TicketUnassigned { id: id.clone() });
    }
}
