// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! Loaded from a TOML table; every field has a default so an empty file is
//! a valid config. Unknown keys are tolerated and warned about, never
//! fatal. The camelCase aliases accept configs written for the original
//! tool.

use crate::error::OrchError;
use crate::pipeline::AutomationConfig;
use crate::retry::BackoffPolicy;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Error-recovery settings (`[error_recovery]`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    #[serde(alias = "maxRetries")]
    pub max_retries: u32,
    #[serde(alias = "initialBackoffMs")]
    pub initial_backoff_ms: u64,
    #[serde(alias = "maxBackoffMs")]
    pub max_backoff_ms: u64,
    #[serde(alias = "backoffMultiplier")]
    pub backoff_multiplier: f64,
    /// Automatically send Failed tickets back to Todo for another attempt.
    #[serde(alias = "autoRetryFailed")]
    pub auto_retry_failed: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            max_retries: backoff.max_retries,
            initial_backoff_ms: backoff.initial_ms,
            max_backoff_ms: backoff.max_ms,
            backoff_multiplier: backoff.multiplier,
            auto_retry_failed: false,
        }
    }
}

impl RecoveryConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_ms: self.initial_backoff_ms,
            multiplier: self.backoff_multiplier,
            max_ms: self.max_backoff_ms,
            max_retries: self.max_retries,
        }
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchConfig {
    /// Concurrency cap for live agents. Must be at least 1.
    #[serde(alias = "maxAgents")]
    pub max_agents: usize,
    /// Model name passed through to the agent command line.
    #[serde(alias = "agentModel")]
    pub agent_model: Option<String>,
    /// Path of the Markdown plan.
    #[serde(alias = "planFile")]
    pub plan_file: PathBuf,
    /// Program spawned as the agent child process.
    #[serde(alias = "agentProgram")]
    pub agent_program: String,
    /// Arguments placed before the prompt on the agent command line.
    #[serde(alias = "agentArgs")]
    pub agent_args: Vec<String>,
    pub automation: AutomationConfig,
    #[serde(alias = "errorRecovery")]
    pub error_recovery: RecoveryConfig,
}

impl Default for OrchConfig {
    fn default() -> Self {
        Self {
            max_agents: 3,
            agent_model: None,
            plan_file: PathBuf::from("plan.md"),
            agent_program: "claude".to_string(),
            agent_args: vec!["--print".to_string()],
            automation: AutomationConfig::default(),
            error_recovery: RecoveryConfig::default(),
        }
    }
}

impl OrchConfig {
    /// Parse a TOML document, warning once per unknown key.
    pub fn from_toml_str(text: &str) -> Result<Self, OrchError> {
        let value: toml::Value = toml::from_str(text)
            .map_err(|e| OrchError::internal_with("invalid config", e.to_string()))?;
        warn_unknown_keys(&value);

        let config: OrchConfig = toml::from_str(text)
            .map_err(|e| OrchError::internal_with("invalid config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OrchError> {
        if self.max_agents == 0 {
            return Err(OrchError::internal("max_agents must be at least 1"));
        }
        if self.agent_program.is_empty() {
            return Err(OrchError::internal("agent_program must not be empty"));
        }
        Ok(())
    }
}

fn known(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn warn_table(table: &toml::value::Table, path: &str, keys: &BTreeSet<String>) {
    for key in table.keys() {
        if !keys.contains(key.as_str()) {
            tracing::warn!(key = %format!("{path}{key}"), "ignoring unknown config key");
        }
    }
}

fn warn_unknown_keys(value: &toml::Value) {
    let Some(root) = value.as_table() else { return };
    warn_table(
        root,
        "",
        &known(&[
            "max_agents",
            "maxAgents",
            "agent_model",
            "agentModel",
            "plan_file",
            "planFile",
            "agent_program",
            "agentProgram",
            "agent_args",
            "agentArgs",
            "automation",
            "error_recovery",
            "errorRecovery",
        ]),
    );

    if let Some(automation) = root.get("automation").and_then(|v| v.as_table()) {
        warn_table(
            automation,
            "automation.",
            &known(&["ticket_progression", "ticketProgression", "review", "qa"]),
        );
        for stage in ["review", "qa"] {
            if let Some(policy) = automation.get(stage).and_then(|v| v.as_table()) {
                warn_table(policy, &format!("automation.{stage}."), &known(&["mode"]));
            }
        }
    }

    for recovery_key in ["error_recovery", "errorRecovery"] {
        if let Some(recovery) = root.get(recovery_key).and_then(|v| v.as_table()) {
            warn_table(
                recovery,
                &format!("{recovery_key}."),
                &known(&[
                    "max_retries",
                    "maxRetries",
                    "initial_backoff_ms",
                    "initialBackoffMs",
                    "max_backoff_ms",
                    "maxBackoffMs",
                    "backoff_multiplier",
                    "backoffMultiplier",
                    "auto_retry_failed",
                    "autoRetryFailed",
                ]),
            );
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
