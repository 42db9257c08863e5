// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The validation runner: extract shell commands from a ticket's
//! validation steps and execute them in the ticket's worktree.
//!
//! Steps run sequentially and all of them always run, even after a
//! failure, so the author sees every broken step at once. Validation
//! failures are data (a report), never errors; only the surrounding
//! orchestration decides what a failed report means.

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::process::Command;

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_millis(60_000);

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:bash|sh|shell)?\s*(.+?)```").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BACKTICK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("constant regex pattern is valid"));

/// First tokens that mark a bare line as an executable command.
const KNOWN_PREFIXES: &[&str] = &["bun", "npm", "node", "pnpm", "yarn", "sh", "bash"];

/// Extract the command from one raw validation-step string.
///
/// Tried in order: fenced code block, single-backtick span, raw line with
/// a known executable prefix. Steps matching none are prose and yield
/// `None`.
pub fn extract_command(step: &str) -> Option<String> {
    if let Some(caps) = FENCED_BLOCK.captures(step) {
        let body = caps[1].trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }

    if let Some(caps) = BACKTICK_SPAN.captures(step) {
        let span = caps[1].trim();
        if !span.is_empty() {
            return Some(span.to_string());
        }
    }

    let line = step.trim();
    let first = line.split_whitespace().next()?;
    if KNOWN_PREFIXES.contains(&first) || line.starts_with("./") {
        return Some(line.to_string());
    }

    None
}

/// Outcome of one executed validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// The raw step text the command was extracted from.
    pub step: String,
    pub command: String,
    pub passed: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// Aggregate result of a ticket's validation steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when every executed step passed (vacuously true for none).
    pub passed: bool,
    pub steps: Vec<StepResult>,
    pub total_duration_ms: u64,
}

impl ValidationReport {
    /// One-line summary of the failing steps, for feedback notes.
    pub fn failure_summary(&self) -> String {
        let failures: Vec<String> = self
            .steps
            .iter()
            .filter(|s| !s.passed)
            .map(|s| {
                if s.timed_out {
                    format!("`{}` timed out", s.command)
                } else {
                    format!("`{}` exited {}", s.command, s.exit_code)
                }
            })
            .collect();
        failures.join("; ")
    }
}

/// Executes validation steps with a per-step timeout.
#[derive(Debug, Clone)]
pub struct ValidationRunner {
    pub step_timeout: Duration,
}

impl Default for ValidationRunner {
    fn default() -> Self {
        Self { step_timeout: DEFAULT_STEP_TIMEOUT }
    }
}

impl ValidationRunner {
    pub fn new(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }

    /// Run every extractable command among `steps` in `cwd`.
    pub async fn run(&self, steps: &[String], cwd: &Path) -> ValidationReport {
        let started = Instant::now();
        let mut results = Vec::new();

        for step in steps {
            let Some(command) = extract_command(step) else {
                tracing::debug!(step = %step, "skipping prose validation step");
                continue;
            };
            results.push(self.run_step(step, &command, cwd).await);
        }

        ValidationReport {
            passed: results.iter().all(|r| r.passed),
            steps: results,
            total_duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn run_step(&self, step: &str, command: &str, cwd: &Path) -> StepResult {
        let started = Instant::now();
        tracing::debug!(command, cwd = %cwd.display(), "running validation step");

        let mut process = Command::new("sh");
        process
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match process.spawn() {
            Ok(child) => child,
            Err(err) => {
                return StepResult {
                    step: step.to_string(),
                    command: command.to_string(),
                    passed: false,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: err.to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: false,
                };
            }
        };

        // The timeout races process completion; dropping the in-flight
        // wait_with_output kills the child (kill_on_drop).
        match tokio::time::timeout(self.step_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(-1);
                StepResult {
                    step: step.to_string(),
                    command: command.to_string(),
                    passed: exit_code == 0,
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: false,
                }
            }
            Ok(Err(err)) => StepResult {
                step: step.to_string(),
                command: command.to_string(),
                passed: false,
                exit_code: -1,
                stdout: String::new(),
                stderr: err.to_string(),
                duration_ms: started.elapsed().as_millis() as u64,
                timed_out: false,
            },
            Err(_) => StepResult {
                step: step.to_string(),
                command: command.to_string(),
                passed: false,
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("Command timed out after {}ms", self.step_timeout.as_millis()),
                duration_ms: started.elapsed().as_millis() as u64,
                timed_out: true,
            },
        }
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
