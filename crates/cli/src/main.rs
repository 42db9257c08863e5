// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer: drive a Markdown ticket plan with agent subprocesses.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gaffer", version, about = "Local ticket orchestrator")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append orchestrator logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate a plan: issues, cycles, ready set.
    Check {
        /// Plan file (defaults to the configured plan_file).
        plan: Option<PathBuf>,
    },
    /// Print the ready tickets in scheduling order.
    Ready {
        plan: Option<PathBuf>,
    },
    /// Run the orchestrator until interrupted.
    Run {
        plan: Option<PathBuf>,
        /// Seconds between automatic scheduling ticks.
        #[arg(long, default_value_t = 5)]
        tick_interval: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_file.as_deref())?;
    let config = commands::load_config(cli.config.as_deref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Command::Check { plan } => commands::check(config, plan),
            Command::Ready { plan } => commands::ready(config, plan),
            Command::Run { plan, tick_interval } => {
                commands::run(config, plan, tick_interval).await
            }
        }
    })
}
