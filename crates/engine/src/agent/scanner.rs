// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of agent stdout.
//!
//! The accumulated buffer is rescanned on every chunk so framed markers
//! that straddle chunk boundaries are still recognized. Completion and
//! blocked findings are emitted once each; tool-call frames drive the
//! progress heuristic.

use gf_core::TicketId;
use regex::Regex;
use std::sync::LazyLock;

/// Preview length for malformed-output warnings.
pub const PREVIEW_LEN: usize = 500;

/// Rough per-token cost used for the rolling estimate.
const COST_PER_TOKEN: f64 = 0.000_015;

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
static COMPLETE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"===\s*TICKET\s+(T\d+)\s+COMPLETE\s*===").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BLOCKED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"===\s*TICKET\s+(T\d+)\s+BLOCKED:\s*(.*?)\s*===")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static TOOL_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Using\s+\S+\s+tool|<invoke\s+name=""#).expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static TOKENS_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tokens\s*used[:=]?\s*(\d+)").expect("constant regex pattern is valid")
});

/// A framed finding surfaced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFinding {
    Completed { ticket_id: TicketId },
    Blocked { ticket_id: TicketId, reason: String },
}

/// Incremental scanner over one agent's stdout.
#[derive(Debug, Default)]
pub struct OutputScanner {
    buffer: String,
    completed: bool,
    blocked_reported: bool,
    tool_calls: usize,
    tokens_used: u64,
}

impl OutputScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return any newly recognized findings.
    pub fn push(&mut self, chunk: &str) -> Vec<ScanFinding> {
        self.buffer.push_str(chunk);
        let mut findings = Vec::new();

        self.tool_calls = TOOL_FRAME.find_iter(&self.buffer).count();
        if let Some(tokens) = TOKENS_FRAME
            .captures_iter(&self.buffer)
            .filter_map(|c| c[1].parse::<u64>().ok())
            .max()
        {
            self.tokens_used = tokens;
        }

        if !self.completed {
            if let Some(caps) = COMPLETE_MARKER.captures(&self.buffer) {
                self.completed = true;
                findings.push(ScanFinding::Completed { ticket_id: TicketId::new(&caps[1]) });
            }
        }

        if !self.blocked_reported && !self.completed {
            if let Some(caps) = BLOCKED_MARKER.captures(&self.buffer) {
                self.blocked_reported = true;
                findings.push(ScanFinding::Blocked {
                    ticket_id: TicketId::new(&caps[1]),
                    reason: caps[2].to_string(),
                });
            }
        }

        findings
    }

    /// `min(100, 10 * tool_calls)`, snapped to 100 once completed.
    pub fn progress(&self) -> u8 {
        if self.completed {
            return 100;
        }
        (self.tool_calls.saturating_mul(10)).min(100) as u8
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    /// Rolling cost estimate from the reported token count.
    pub fn cost(&self) -> f64 {
        self.tokens_used as f64 * COST_PER_TOKEN
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn blocked(&self) -> bool {
        self.blocked_reported
    }

    /// Whether any framing at all was recognized.
    pub fn saw_any_frame(&self) -> bool {
        self.completed || self.blocked_reported || self.tool_calls > 0 || self.tokens_used > 0
    }

    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// First `PREVIEW_LEN` characters, for malformed-output warnings.
    pub fn preview(&self) -> String {
        self.buffer.chars().take(PREVIEW_LEN).collect()
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
