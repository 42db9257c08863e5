// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-outcome handlers, dispatched one at a time by the driver loop.

use super::Orchestrator;
use gf_core::{AgentId, AgentStatus, Event, LogLevel, OrchError, TicketId, TicketStatus};

impl Orchestrator {
    /// An agent reported completion: validate its work, then advance or
    /// fail the ticket.
    pub async fn handle_agent_complete(&self, agent_id: &AgentId) -> Result<(), OrchError> {
        let Some(ticket_id) = self.ticket_for_agent(agent_id) else {
            self.drop_unknown(agent_id, "completion");
            return Ok(());
        };
        let ticket = self
            .ticket(&ticket_id)
            .ok_or_else(|| OrchError::TicketNotFound(ticket_id.clone()))?;

        // Validating is agent-record state only; there is no dedicated
        // event, observers see agent:completed then ticket:status-changed.
        self.agents.set_status(agent_id, AgentStatus::Validating);
        let worktree = match ticket.assigned_worktree.clone() {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let report = self.validator.run(&ticket.validation_steps, &worktree).await;
        self.agents.set_status(agent_id, AgentStatus::Complete);
        self.state.lock().assignments.remove(agent_id);

        if report.passed {
            tracing::info!(ticket = %ticket_id, agent = %agent_id, "validation passed");
            self.advance_ticket(&ticket_id).await
        } else {
            let summary = format!("validation failed: {}", report.failure_summary());
            tracing::warn!(ticket = %ticket_id, agent = %agent_id, %summary, "validation failed");
            self.fail_ticket(&ticket_id, summary).await
        }
    }

    /// An agent died or finished without the completion frame.
    pub async fn handle_agent_failed(
        &self,
        agent_id: &AgentId,
        error: Option<String>,
    ) -> Result<(), OrchError> {
        let Some(ticket_id) = self.ticket_for_agent(agent_id) else {
            self.drop_unknown(agent_id, "failure");
            return Ok(());
        };
        self.state.lock().assignments.remove(agent_id);

        let feedback = error.unwrap_or_else(|| "agent failed".to_string());
        self.fail_ticket(&ticket_id, format!("agent {agent_id}: {feedback}")).await
    }

    /// An agent asked for help. The ticket stays InProgress; the reason
    /// lands in its feedback and the log.
    pub async fn handle_agent_blocked(
        &self,
        agent_id: &AgentId,
        reason: String,
    ) -> Result<(), OrchError> {
        let Some(ticket_id) = self.ticket_for_agent(agent_id) else {
            self.drop_unknown(agent_id, "block");
            return Ok(());
        };

        self.with_store(|store| store.add_ticket_feedback(&ticket_id, reason.clone()))?;
        self.bus.publish(Event::agent_log(
            LogLevel::Warn,
            format!("agent {agent_id} blocked on {ticket_id}: {reason}"),
            agent_id.clone(),
            Some(ticket_id),
        ));
        Ok(())
    }

    /// Mark a ticket Failed with feedback; auto-retry when configured.
    pub(super) async fn fail_ticket(
        &self,
        id: &TicketId,
        feedback: String,
    ) -> Result<(), OrchError> {
        self.with_store(|store| store.add_ticket_feedback(id, feedback.clone()))?;
        self.persist_status(id, TicketStatus::Failed, Some(feedback))?;
        self.bus.publish(Event::TicketUnassigned { id: id.clone() });

        if self.config.error_recovery.auto_retry_failed {
            let attempt = {
                let mut state = self.state.lock();
                let attempt = state.attempts.entry(id.clone()).or_insert(0);
                *attempt += 1;
                *attempt
            };
            if attempt <= self.config.error_recovery.max_retries {
                // Unlike a user retry, the feedback is kept so the next
                // attempt sees what went wrong.
                tracing::info!(ticket = %id, attempt, "auto-retrying failed ticket");
                self.persist_status(id, TicketStatus::Todo, Some("auto-retry".to_string()))?;
                self.publish_ready();
                return Ok(());
            }
            tracing::warn!(ticket = %id, attempt, "auto-retry budget exhausted");
        }

        let _ = self.worktrees.release(id).await;
        self.publish_ready();
        Ok(())
    }

    fn drop_unknown(&self, agent_id: &AgentId, context: &str) {
        tracing::warn!(agent = %agent_id, "dropping {context} event for unknown agent");
        self.bus.publish(Event::agent_log(
            LogLevel::Warn,
            format!("dropping {context} event for unknown agent {agent_id}"),
            agent_id.clone(),
            None,
        ));
    }
}
