// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent manager: child-process lifecycle and output classification.
//!
//! The manager exclusively owns process handles; the orchestrator holds
//! only agent ids. Reader tasks consume stdout concurrently with the
//! driver but never touch domain state; everything they learn travels
//! through the manager's event channel, whose single consumer is the
//! orchestrator's run loop. Events published directly on the bus
//! (`agent:spawned`, `agent:stop-request`, `agent:stopped`) happen on the
//! caller's thread, which is the driver.

pub mod scanner;

pub use scanner::{OutputScanner, ScanFinding};

use gf_core::{
    AgentId, AgentKind, AgentRecord, AgentStatus, Clock, Event, EventBus, LogLevel, OrchError,
    SystemClock, TicketId,
};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long a cooperative stop waits before escalating to SIGKILL.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// How the agent child process is launched.
#[derive(Debug, Clone)]
pub struct AgentLauncher {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the prompt.
    pub args: Vec<String>,
    /// Model passed as `--model <name>` when set.
    pub model: Option<String>,
}

impl AgentLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), model: None }
    }

    fn command(&self, request: &SpawnRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(model) = request.model.as_deref().or(self.model.as_deref()) {
            cmd.arg("--model").arg(model);
        }
        cmd.arg(&request.prompt);
        cmd.current_dir(&request.working_directory);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// One agent to spawn.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub ticket_id: TicketId,
    pub kind: AgentKind,
    pub working_directory: PathBuf,
    pub prompt: String,
    /// Overrides the launcher's default model.
    pub model: Option<String>,
}

struct AgentEntry {
    record: AgentRecord,
    pid: Option<i32>,
    stopping: bool,
    exited: bool,
    output: Arc<Mutex<String>>,
    reader: Option<JoinHandle<()>>,
}

type AgentTable = Arc<Mutex<HashMap<AgentId, AgentEntry>>>;

pub struct AgentManager {
    launcher: AgentLauncher,
    max_agents: usize,
    stop_grace: Duration,
    bus: Arc<EventBus>,
    event_tx: mpsc::Sender<Event>,
    clock: Arc<dyn Clock>,
    agents: AgentTable,
}

impl AgentManager {
    pub fn new(
        launcher: AgentLauncher,
        max_agents: usize,
        bus: Arc<EventBus>,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            launcher,
            max_agents,
            stop_grace: DEFAULT_STOP_GRACE,
            bus,
            event_tx,
            clock: Arc::new(SystemClock),
            agents: Arc::default(),
        }
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_agents(&self) -> usize {
        self.max_agents
    }

    /// Agents currently counting against the concurrency cap.
    pub fn live_count(&self) -> usize {
        self.agents.lock().values().filter(|e| e.record.status.is_live()).count()
    }

    pub fn record(&self, agent_id: &AgentId) -> Option<AgentRecord> {
        self.agents.lock().get(agent_id).map(|e| e.record.clone())
    }

    pub fn records(&self) -> Vec<AgentRecord> {
        self.agents.lock().values().map(|e| e.record.clone()).collect()
    }

    /// Snapshot of an agent's accumulated output.
    pub fn output_of(&self, agent_id: &AgentId) -> Option<String> {
        self.agents.lock().get(agent_id).map(|e| e.output.lock().clone())
    }

    /// The ticket an agent was spawned for.
    pub fn ticket_of(&self, agent_id: &AgentId) -> Option<TicketId> {
        self.agents.lock().get(agent_id).map(|e| e.record.ticket_id.clone())
    }

    /// Mark an agent's record (e.g. `Validating` while the orchestrator
    /// runs validation). In-memory only.
    pub fn set_status(&self, agent_id: &AgentId, status: AgentStatus) {
        if let Some(entry) = self.agents.lock().get_mut(agent_id) {
            entry.record.status = status;
        }
    }

    /// Launch an agent for a ticket.
    ///
    /// Publishes `agent:spawned` before the process starts. Fails with
    /// [`OrchError::Concurrency`] at the cap; on a spawn failure the agent
    /// record is removed again and `agent:failed` is published.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<AgentId, OrchError> {
        let agent_id = {
            let mut agents = self.agents.lock();
            let live = agents.values().filter(|e| e.record.status.is_live()).count();
            if live >= self.max_agents {
                return Err(OrchError::Concurrency { limit: self.max_agents });
            }
            let agent_id = AgentId::next();
            let record = AgentRecord::new(
                agent_id.clone(),
                request.kind,
                request.ticket_id.clone(),
                request.working_directory.clone(),
                self.clock.epoch_ms(),
            );
            agents.insert(
                agent_id.clone(),
                AgentEntry {
                    record,
                    pid: None,
                    stopping: false,
                    exited: false,
                    output: Arc::default(),
                    reader: None,
                },
            );
            agent_id
        };

        self.bus.publish(Event::AgentSpawned {
            agent_id: agent_id.clone(),
            ticket_id: request.ticket_id.clone(),
            kind: request.kind,
        });

        let child = match self.launcher.command(&request).spawn() {
            Ok(child) => child,
            Err(err) => {
                self.agents.lock().remove(&agent_id);
                self.bus.publish(Event::AgentFailed {
                    agent_id: agent_id.clone(),
                    ticket_id: Some(request.ticket_id.clone()),
                    error: format!("spawn failed: {err}"),
                });
                return Err(OrchError::Io(err));
            }
        };

        let pid = child.id().map(|p| p as i32);
        let output = {
            let mut agents = self.agents.lock();
            #[allow(clippy::expect_used)] // inserted above, nothing removes it concurrently
            let entry = agents.get_mut(&agent_id).expect("agent entry just inserted");
            entry.pid = pid;
            Arc::clone(&entry.output)
        };

        let reader = tokio::spawn(read_agent(
            Arc::clone(&self.agents),
            agent_id.clone(),
            request.ticket_id.clone(),
            child,
            self.event_tx.clone(),
            output,
        ));
        if let Some(entry) = self.agents.lock().get_mut(&agent_id) {
            entry.reader = Some(reader);
        }

        tracing::info!(agent = %agent_id, ticket = %request.ticket_id, "agent spawned");
        Ok(agent_id)
    }

    /// Stop one agent: cooperative SIGTERM, SIGKILL after the grace
    /// period (or immediately when `force` is set). Unknown or already
    /// finished agents return quietly.
    pub fn stop(&self, agent_id: &AgentId, force: bool) {
        let pid = {
            let mut agents = self.agents.lock();
            let Some(entry) = agents.get_mut(agent_id) else { return };
            if entry.exited || entry.record.status.is_terminal() {
                return;
            }
            entry.stopping = true;
            entry.record.status = AgentStatus::Failed;
            entry.pid
        };

        self.bus.publish(Event::AgentStopRequest { agent_id: agent_id.clone() });

        if let Some(pid) = pid {
            let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
            if let Err(err) = signal::kill(Pid::from_raw(pid), signal) {
                tracing::warn!(agent = %agent_id, %err, "failed to signal agent");
            }
            if !force {
                // Escalate if the process ignores SIGTERM.
                let agents = Arc::clone(&self.agents);
                let agent_id = agent_id.clone();
                let grace = self.stop_grace;
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    let lingering = agents
                        .lock()
                        .get(&agent_id)
                        .filter(|e| !e.exited)
                        .and_then(|e| e.pid);
                    if let Some(pid) = lingering {
                        tracing::warn!(agent = %agent_id, "grace expired, sending SIGKILL");
                        let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
                    }
                });
            }
        }

        self.bus.publish(Event::AgentStopped { agent_id: agent_id.clone() });
        tracing::info!(agent = %agent_id, force, "agent stopped");
    }

    /// Stop every live agent.
    pub fn stop_all(&self, force: bool) {
        let ids: Vec<AgentId> = self
            .agents
            .lock()
            .iter()
            .filter(|(_, e)| !e.exited && !e.record.status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            self.stop(&id, force);
        }
    }

    /// Wait for an agent's reader to finish and return the final output.
    /// Returns `None` for unknown agents.
    pub async fn wait(&self, agent_id: &AgentId) -> Option<String> {
        let reader = self.agents.lock().get_mut(agent_id).and_then(|e| e.reader.take());
        if let Some(reader) = reader {
            let _ = reader.await;
        }
        self.output_of(agent_id)
    }
}

/// Reader task: stream stdout, classify, report exit.
async fn read_agent(
    agents: AgentTable,
    agent_id: AgentId,
    ticket_id: TicketId,
    mut child: Child,
    event_tx: mpsc::Sender<Event>,
    output: Arc<Mutex<String>>,
) {
    let mut scanner = OutputScanner::new();

    // Stderr is captured alongside stdout but never classified.
    if let Some(mut stderr) = child.stderr.take() {
        let output = Arc::clone(&output);
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            while let Ok(n) = stderr.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                output.lock().push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        });
    }

    if let Some(mut stdout) = child.stdout.take() {
        let mut buf = [0u8; 4096];
        loop {
            let n = match stdout.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
            output.lock().push_str(&chunk);
            let findings = scanner.push(&chunk);

            {
                let mut agents = agents.lock();
                if let Some(entry) = agents.get_mut(&agent_id) {
                    if entry.record.status == AgentStatus::Starting {
                        entry.record.status = AgentStatus::Working;
                    }
                    entry.record.progress = scanner.progress();
                    entry.record.tokens_used = scanner.tokens_used();
                    entry.record.cost = scanner.cost();
                    entry.record.last_action =
                        chunk.lines().rev().find(|l| !l.trim().is_empty()).map(str::to_string);
                }
            }

            let _ = event_tx
                .send(Event::AgentProgress {
                    agent_id: agent_id.clone(),
                    last_action: chunk,
                    progress: scanner.progress(),
                    tokens_used: scanner.tokens_used(),
                    cost: scanner.cost(),
                })
                .await;

            for finding in findings {
                match finding {
                    ScanFinding::Completed { ticket_id: marked } => {
                        if let Some(entry) = agents.lock().get_mut(&agent_id) {
                            entry.record.status = AgentStatus::Complete;
                            entry.record.progress = 100;
                        }
                        let _ = event_tx
                            .send(Event::AgentCompleted {
                                agent_id: agent_id.clone(),
                                ticket_id: marked,
                            })
                            .await;
                    }
                    ScanFinding::Blocked { ticket_id: marked, reason } => {
                        if let Some(entry) = agents.lock().get_mut(&agent_id) {
                            entry.record.status = AgentStatus::Blocked;
                        }
                        let _ = event_tx
                            .send(Event::AgentBlocked {
                                agent_id: agent_id.clone(),
                                ticket_id: Some(marked),
                                reason,
                            })
                            .await;
                    }
                }
            }
        }
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(err) => {
            tracing::warn!(agent = %agent_id, %err, "failed to reap agent process");
            None
        }
    };

    // Decide the terminal event. Completion and blocked markers stand;
    // a driver-initiated stop already published agent:stopped.
    let send_failed = {
        let mut agents = agents.lock();
        match agents.get_mut(&agent_id) {
            None => false,
            Some(entry) => {
                entry.exited = true;
                entry.pid = None;
                if entry.stopping || scanner.completed() {
                    false
                } else if entry.record.status == AgentStatus::Blocked {
                    // Blocked is not terminal; the driver resumes or stops it.
                    false
                } else {
                    entry.record.status = AgentStatus::Failed;
                    true
                }
            }
        }
    };

    if send_failed {
        let error = match exit_code {
            Some(0) => "exited without completion marker".to_string(),
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        };

        if let Some(code) = exit_code.filter(|c| *c != 0) {
            let crash = OrchError::AgentCrash {
                agent_id: agent_id.clone(),
                ticket_id: Some(ticket_id.clone()),
                exit_code: code,
            };
            tracing::error!(error = %crash, "agent crashed");
            if !scanner.saw_any_frame() {
                let malformed = OrchError::MalformedOutput {
                    agent_id: agent_id.clone(),
                    preview: scanner.preview(),
                };
                tracing::warn!(error = %malformed, "unrecognized agent output");
                let _ = event_tx
                    .send(Event::agent_log(
                        LogLevel::Warn,
                        malformed.to_string(),
                        agent_id.clone(),
                        Some(ticket_id.clone()),
                    ))
                    .await;
            }
        }

        let _ = event_tx
            .send(Event::AgentFailed {
                agent_id: agent_id.clone(),
                ticket_id: Some(ticket_id),
                error,
            })
            .await;
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
