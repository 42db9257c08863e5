// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use gf_core::{Event, EventBus, EventKind, OrchConfig};
use gf_engine::{DependencyGraph, DirWorktrees, Orchestrator};
use gf_plan::{parse_plan, validate_plan};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Load the TOML config, or defaults when no file is given or present.
pub fn load_config(path: Option<&Path>) -> Result<OrchConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(OrchConfig::from_toml_str(&text)?)
        }
        None => {
            let default = Path::new("gaffer.toml");
            if default.is_file() {
                let text = std::fs::read_to_string(default).context("reading gaffer.toml")?;
                Ok(OrchConfig::from_toml_str(&text)?)
            } else {
                Ok(OrchConfig::default())
            }
        }
    }
}

fn plan_path(config: &OrchConfig, plan: Option<PathBuf>) -> PathBuf {
    plan.unwrap_or_else(|| config.plan_file.clone())
}

fn load_graph(path: &Path) -> Result<(gf_plan::ParsedPlan, DependencyGraph)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    let plan = parse_plan(&text).with_context(|| format!("parsing {}", path.display()))?;
    let mut graph = DependencyGraph::new();
    graph.build(plan.tickets.values().cloned());
    Ok((plan, graph))
}

/// `gaffer check`: parse, validate, detect cycles.
pub fn check(config: OrchConfig, plan: Option<PathBuf>) -> Result<()> {
    let path = plan_path(&config, plan);
    let (plan, graph) = load_graph(&path)?;

    let mut problems = 0usize;
    for issue in validate_plan(&plan) {
        println!("issue: {issue}");
        problems += 1;
    }
    for cycle in graph.detect_cycles() {
        let path: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
        println!("cycle: {}", path.join(" -> "));
        problems += 1;
    }

    if problems > 0 {
        bail!("{problems} problem(s) in {}", path.display());
    }

    println!(
        "{}: {} tickets, {} ready",
        path.display(),
        plan.tickets.len(),
        graph.ready().len()
    );
    Ok(())
}

/// `gaffer ready`: the ready set in scheduling order.
pub fn ready(config: OrchConfig, plan: Option<PathBuf>) -> Result<()> {
    let path = plan_path(&config, plan);
    let (_, graph) = load_graph(&path)?;
    for ticket in graph.ready() {
        println!("{} {} {}", ticket.id, ticket.priority, ticket.title);
    }
    Ok(())
}

/// `gaffer run`: start the orchestrator and drive it until ctrl-c.
pub async fn run(mut config: OrchConfig, plan: Option<PathBuf>, tick_interval: u64) -> Result<()> {
    if let Some(plan) = plan {
        config.plan_file = plan;
    }

    let bus = EventBus::new();
    let worktree_base = config
        .plan_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".gaffer/worktrees");
    let worktrees = Arc::new(DirWorktrees::new(worktree_base));

    // Mirror noteworthy events to stdout; the TUI subscribes the same way.
    let _console = bus.subscribe_all(|record| match &record.event {
        Event::TicketStatusChanged { id, from, to, .. } => {
            println!("[{}] {id}: {from} -> {to}", record.at_ms);
        }
        Event::TicketsReady { ids } => {
            let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            println!("[{}] ready: [{}]", record.at_ms, ids.join(", "));
        }
        Event::LogEntry { level, message, .. } => {
            println!("[{}] {level}: {message}", record.at_ms);
        }
        event if event.kind() == EventKind::AgentProgress => {}
        event => {
            println!("[{}] {}", record.at_ms, event.kind());
        }
    });

    let orchestrator = Arc::new(Orchestrator::new(config, bus, worktrees));
    orchestrator.start().map_err(|e| anyhow::anyhow!(e))?;

    let driver = Arc::clone(&orchestrator);
    let run_loop = tokio::spawn(async move { driver.run().await });

    let ticker = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(tick_interval.max(1)));
            loop {
                interval.tick().await;
                orchestrator.tick().await;
            }
        })
    };

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("interrupt received, shutting down");
    ticker.abort();
    orchestrator.stop();
    let _ = run_loop.await;
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
