// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: the single driver that turns user intent and agent
//! outcomes into ticket transitions and plan writes.
//!
//! All domain state (plan cache, graph, assignment table) is mutated from
//! the driver only. Agent readers feed their findings into an mpsc queue;
//! [`Orchestrator::run`] is the queue's single consumer: it publishes
//! each event on the bus and then dispatches the matching handler, which
//! gives handlers one-at-a-time semantics without any lock held across
//! suspension.

mod handlers;
mod ops;

use crate::agent::{AgentLauncher, AgentManager};
use crate::graph::DependencyGraph;
use crate::validation::ValidationRunner;
use crate::worktree::WorktreeAllocator;
use gf_core::{
    AgentId, Event, EventBus, OrchConfig, OrchError, Ticket, TicketId,
};
use gf_plan::PlanStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};

/// Driver-owned bookkeeping.
#[derive(Default)]
struct DriverState {
    running: bool,
    /// Agent -> ticket for in-flight work (invariant I4: one agent per
    /// InProgress ticket).
    assignments: HashMap<AgentId, TicketId>,
    /// Auto-retry attempts per ticket.
    attempts: HashMap<TicketId, u32>,
}

pub struct Orchestrator {
    config: OrchConfig,
    bus: Arc<EventBus>,
    agents: AgentManager,
    worktrees: Arc<dyn WorktreeAllocator>,
    validator: ValidationRunner,
    store: Mutex<Option<PlanStore>>,
    graph: Mutex<DependencyGraph>,
    state: Mutex<DriverState>,
    event_rx: AsyncMutex<mpsc::Receiver<Event>>,
    shutdown: Notify,
}

impl Orchestrator {
    pub fn new(
        config: OrchConfig,
        bus: Arc<EventBus>,
        worktrees: Arc<dyn WorktreeAllocator>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let launcher = AgentLauncher {
            program: config.agent_program.clone(),
            args: config.agent_args.clone(),
            model: config.agent_model.clone(),
        };
        let agents =
            AgentManager::new(launcher, config.max_agents, Arc::clone(&bus), event_tx);

        Self {
            config,
            bus,
            agents,
            worktrees,
            validator: ValidationRunner::default(),
            store: Mutex::new(None),
            graph: Mutex::new(DependencyGraph::new()),
            state: Mutex::new(DriverState::default()),
            event_rx: AsyncMutex::new(event_rx),
            shutdown: Notify::new(),
        }
    }

    pub fn config(&self) -> &OrchConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn agents(&self) -> &AgentManager {
        &self.agents
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Load and validate the plan, then mark the orchestrator running.
    /// A second call while running is a no-op.
    ///
    /// Startup is fatal on: parse errors, duplicate ids, dangling
    /// dependencies, and dependency cycles. Each failure publishes
    /// `plan:error` before returning.
    pub fn start(&self) -> Result<(), OrchError> {
        if self.state.lock().running {
            return Ok(());
        }

        let path = self.config.plan_file.clone();
        let store = PlanStore::load(&path, Arc::clone(&self.bus))
            .map_err(|e| e.into_orch(&path))?;

        let issues = store.validate();
        if !issues.is_empty() {
            let message = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::error!(%message, "plan validation failed");
            self.bus.publish(Event::PlanError { path: path.clone(), message: message.clone() });
            return Err(OrchError::PlanParse { path, line: None, message });
        }

        let mut graph = DependencyGraph::new();
        graph.build(store.plan().tickets.values().cloned());

        let cycles = graph.detect_cycles();
        if let Some(cycle) = cycles.into_iter().next() {
            let err = OrchError::Cycle { cycle };
            tracing::error!(error = %err, "refusing to start");
            self.bus.publish(Event::PlanError { path, message: err.to_string() });
            return Err(err);
        }

        let ready = graph.ready_ids();
        *self.store.lock() = Some(store);
        *self.graph.lock() = graph;
        self.state.lock().running = true;

        self.bus.publish(Event::TicketsReady { ids: ready });
        tracing::info!("orchestrator started");
        Ok(())
    }

    /// Stop the driver: mark not-running, stop all agents, and ignore any
    /// further agent events. Idempotent.
    pub fn stop(&self) {
        let was_running = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.running, false)
        };
        if !was_running {
            return;
        }
        self.agents.stop_all(false);
        self.shutdown.notify_waiters();
        tracing::info!("orchestrator stopped");
    }

    /// Consume agent events until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let mut rx = self.event_rx.lock().await;
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => self.process_event(event).await,
                        None => break,
                    }
                }
                _ = self.shutdown.notified() => break,
            }
        }
    }

    /// Process every queued agent event, then return. Lets callers (and
    /// tests) drive the event loop deterministically.
    pub async fn drain_pending(&self) {
        loop {
            let event = { self.event_rx.lock().await.try_recv().ok() };
            match event {
                Some(event) => self.process_event(event).await,
                None => break,
            }
        }
    }

    /// Publish one reader event on the bus, then dispatch its handler.
    async fn process_event(&self, event: Event) {
        if !self.state.lock().running {
            // Late events after stop() are dropped silently.
            return;
        }

        self.bus.publish(event.clone());

        match event {
            Event::AgentCompleted { agent_id, .. } => {
                if let Err(err) = self.handle_agent_complete(&agent_id).await {
                    self.log_handler_error("agent completion", &agent_id, err);
                }
            }
            Event::AgentFailed { agent_id, error, .. } => {
                if let Err(err) = self.handle_agent_failed(&agent_id, Some(error)).await {
                    self.log_handler_error("agent failure", &agent_id, err);
                }
            }
            Event::AgentBlocked { agent_id, reason, .. } => {
                if let Err(err) = self.handle_agent_blocked(&agent_id, reason).await {
                    self.log_handler_error("agent block", &agent_id, err);
                }
            }
            // Progress and log events are informational; publishing them
            // on the bus was the whole job.
            _ => {}
        }
    }

    fn log_handler_error(&self, context: &str, agent_id: &AgentId, err: OrchError) {
        tracing::error!(agent = %agent_id, error = %err, "{context} handler failed");
        self.bus.publish(Event::agent_log(
            gf_core::LogLevel::Error,
            format!("{context} handler failed: {err}"),
            agent_id.clone(),
            None,
        ));
    }

    // ----- read-side accessors -------------------------------------------

    /// Ready tickets in scheduling order (priority, then id).
    pub fn get_ready_tickets(&self) -> Vec<TicketId> {
        self.graph.lock().ready_ids()
    }

    /// Unfinished dependencies of a ticket.
    pub fn get_blocked_by(&self, id: &TicketId) -> Vec<TicketId> {
        self.graph.lock().blocked_by(id)
    }

    pub fn detect_circular_dependencies(&self) -> Vec<Vec<TicketId>> {
        self.graph.lock().detect_cycles()
    }

    /// A snapshot of one ticket from the plan cache.
    pub fn ticket(&self, id: &TicketId) -> Option<Ticket> {
        self.store.lock().as_ref().and_then(|s| s.ticket(id).cloned())
    }

    /// All tickets in file order.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.store
            .lock()
            .as_ref()
            .map(|s| s.plan().tickets.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolve the ticket an agent is (or was) working.
    fn ticket_for_agent(&self, agent_id: &AgentId) -> Option<TicketId> {
        self.state
            .lock()
            .assignments
            .get(agent_id)
            .cloned()
            .or_else(|| self.agents.ticket_of(agent_id))
    }

    /// Run a closure against the loaded store.
    fn with_store<R>(
        &self,
        f: impl FnOnce(&mut PlanStore) -> Result<R, gf_plan::PlanError>,
    ) -> Result<R, OrchError> {
        let mut guard = self.store.lock();
        let store = guard
            .as_mut()
            .ok_or_else(|| OrchError::internal("orchestrator is not started"))?;
        let path = store.path().to_path_buf();
        f(store).map_err(|e| e.into_orch(&path))
    }

    /// Publish the current ready set (after any change that can unblock
    /// or block tickets).
    fn publish_ready(&self) {
        let ids = self.graph.lock().ready_ids();
        self.bus.publish(Event::TicketsReady { ids });
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
