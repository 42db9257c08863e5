// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented plan parsing.
//!
//! A ticket block starts at `### Ticket: T<n> <title>` and runs until the
//! next ticket heading or a top-level `## <n>.` section heading. Fields
//! are `- **Name:** value` lines; an indented `-` sub-list following a
//! field replaces its inline value. Everything outside the modeled grammar
//! is carried in the raw text and never touched.

use crate::error::{PlanError, PlanIssue};
use crate::model::{DodItem, ParsedPlan};
use gf_core::{Priority, Ticket, TicketId, TicketStatus};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
pub(crate) static TICKET_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s*Ticket:\s*(T\d+)\s+(.+)$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s*\d+\.").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*\*\*([^:*]+):\*\*\s*(.*)$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static SUBLIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{2,}-\s+(.*)$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static TICKET_ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T\d+$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static DOD_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*\[([ xX])\]\s*(.*)$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s+(.*)$").expect("constant regex pattern is valid"));

/// One field inside a ticket block: inline value plus any sub-list items.
struct RawField {
    name: String,
    inline: String,
    items: Vec<String>,
}

/// Parse a whole plan document. The raw text is retained verbatim.
pub fn parse_plan(text: &str) -> Result<ParsedPlan, PlanError> {
    let lines: Vec<&str> = text.lines().collect();

    let mut plan = ParsedPlan { raw: text.to_string(), ..ParsedPlan::default() };

    plan.overview = section_body(&lines, "Overview").join("\n").trim().to_string();
    plan.definition_of_done = section_body(&lines, "Definition of Done")
        .iter()
        .filter_map(|line| {
            DOD_ITEM.captures(line.trim()).map(|c| DodItem {
                checked: !c[1].trim().is_empty(),
                text: c[2].trim().to_string(),
            })
        })
        .collect();
    plan.epics = section_body(&lines, "Epics")
        .iter()
        .filter_map(|line| {
            let trimmed = line.trim();
            if DOD_ITEM.is_match(trimmed) {
                return None;
            }
            BULLET_ITEM.captures(trimmed).map(|c| c[1].trim().to_string())
        })
        .collect();

    for (heading_line, block) in ticket_blocks(&lines) {
        let ticket = parse_ticket_block(heading_line, block)?;
        if plan.tickets.contains_key(&ticket.id) {
            plan.duplicate_ids.push((ticket.id.clone(), heading_line + 1));
        } else {
            plan.tickets.insert(ticket.id.clone(), ticket);
        }
    }

    Ok(plan)
}

/// Plan-level validation: duplicate ids and dangling dependency edges.
/// Cycle detection lives in the dependency graph.
pub fn validate_plan(plan: &ParsedPlan) -> Vec<PlanIssue> {
    let mut issues = Vec::new();

    for (id, line) in &plan.duplicate_ids {
        issues.push(PlanIssue { line: Some(*line), message: format!("duplicate ticket id {id}") });
    }

    for ticket in plan.tickets.values() {
        for dep in &ticket.dependencies {
            if !plan.tickets.contains_key(dep) {
                issues.push(PlanIssue {
                    line: None,
                    message: format!("ticket {} depends on unknown ticket {dep}", ticket.id),
                });
            }
        }
    }

    issues
}

/// `(heading_index, block_lines)` for each ticket, where `block_lines`
/// includes the heading and runs to the next heading/section boundary.
/// Indices are 0-based.
fn ticket_blocks<'a>(lines: &'a [&'a str]) -> Vec<(usize, &'a [&'a str])> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let is_ticket = TICKET_HEADING.is_match(line);
        let is_section = SECTION_HEADING.is_match(line);
        if let Some(s) = start {
            if is_ticket || is_section {
                blocks.push((s, &lines[s..i]));
                start = None;
            }
        }
        if is_ticket {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        blocks.push((s, &lines[s..]));
    }
    blocks
}

/// Gather the fields of one block, attaching sub-list items to the most
/// recent field line.
fn collect_fields(block: &[&str]) -> Vec<RawField> {
    let mut fields: Vec<RawField> = Vec::new();

    for line in block.iter().skip(1) {
        if let Some(caps) = FIELD_LINE.captures(line) {
            fields.push(RawField {
                name: caps[1].trim().to_string(),
                inline: caps[2].trim().to_string(),
                items: Vec::new(),
            });
        } else if let Some(caps) = SUBLIST_ITEM.captures(line) {
            if let Some(last) = fields.last_mut() {
                last.items.push(caps[1].trim().to_string());
            }
        }
    }
    fields
}

/// A list-valued field: sub-list items when present, else the inline value
/// as a single entry.
fn list_values(field: &RawField) -> Vec<String> {
    if !field.items.is_empty() {
        field.items.clone()
    } else if !field.inline.is_empty() {
        vec![field.inline.clone()]
    } else {
        Vec::new()
    }
}

fn parse_ticket_block(heading_index: usize, block: &[&str]) -> Result<Ticket, PlanError> {
    let heading_line = heading_index + 1; // 1-based for error reporting

    #[allow(clippy::expect_used)] // ticket_blocks only yields matching headings
    let caps = TICKET_HEADING.captures(block[0]).expect("block starts with a ticket heading");
    let id = TicketId::new(&caps[1]);
    let title = caps[2].trim().to_string();

    let mut priority: Option<Priority> = None;
    let mut status: Option<TicketStatus> = None;
    let mut description = None;
    let mut notes = None;
    let mut owner = None;
    let mut epic = None;
    let mut dependencies = BTreeSet::new();
    let mut acceptance_criteria = Vec::new();
    let mut validation_steps = Vec::new();

    for field in collect_fields(block) {
        match field.name.as_str() {
            "Priority" => {
                priority = Some(field.inline.parse().map_err(|e| PlanError::Parse {
                    line: heading_line,
                    message: format!("ticket {id}: {e}"),
                })?);
            }
            "Status" => {
                status = Some(field.inline.parse().map_err(|e| PlanError::Parse {
                    line: heading_line,
                    message: format!("ticket {id}: {e}"),
                })?);
            }
            "Owner" => {
                let value = field.inline;
                if !value.is_empty() && value != "Unassigned" {
                    owner = Some(value);
                }
            }
            "Scope" => {
                let joined = join_text(&field);
                if !joined.is_empty() {
                    description = Some(joined);
                }
            }
            "Notes" => {
                let joined = join_text(&field);
                if !joined.is_empty() {
                    notes = Some(joined);
                }
            }
            "Epic" => {
                if !field.inline.is_empty() {
                    epic = Some(field.inline);
                }
            }
            "Acceptance Criteria" => acceptance_criteria = list_values(&field),
            "Validation Steps" => validation_steps = list_values(&field),
            "Dependencies" => {
                // Comma-separated; tokens that are not ticket ids are dropped.
                for source in list_values(&field) {
                    for token in source.split(',') {
                        let token = token.trim();
                        if TICKET_ID_TOKEN.is_match(token) {
                            dependencies.insert(TicketId::new(token));
                        } else if !token.is_empty() {
                            tracing::debug!(ticket = %id, token, "dropping non-id dependency token");
                        }
                    }
                }
            }
            other => {
                tracing::debug!(ticket = %id, field = other, "ignoring unknown ticket field");
            }
        }
    }

    let priority = priority.ok_or_else(|| PlanError::Parse {
        line: heading_line,
        message: format!("ticket {id}: missing required Priority field"),
    })?;
    let status = status.ok_or_else(|| PlanError::Parse {
        line: heading_line,
        message: format!("ticket {id}: missing required Status field"),
    })?;

    Ok(Ticket {
        id,
        title,
        description,
        notes,
        priority,
        status,
        owner,
        epic,
        dependencies,
        acceptance_criteria,
        validation_steps,
        feedback: Vec::new(),
        assigned_worktree: None,
    })
}

/// Inline value plus sub-list items joined as continuation lines.
fn join_text(field: &RawField) -> String {
    let mut parts = Vec::new();
    if !field.inline.is_empty() {
        parts.push(field.inline.clone());
    }
    parts.extend(field.items.iter().cloned());
    parts.join("\n")
}

/// Lines between a `## <n>. <name>` heading and the next `## <n>.` heading.
fn section_body<'a>(lines: &'a [&'a str], name: &str) -> Vec<&'a str> {
    #[allow(clippy::expect_used)] // the pattern is static apart from the escaped name
    let heading = Regex::new(&format!(r"^##\s*\d+\.\s*{}\s*$", regex::escape(name)))
        .expect("constant regex pattern is valid");

    let start = match lines.iter().position(|l| heading.is_match(l)) {
        Some(i) => i + 1,
        None => return Vec::new(),
    };
    let end = lines[start..]
        .iter()
        .position(|l| SECTION_HEADING.is_match(l))
        .map(|offset| start + offset)
        .unwrap_or(lines.len());
    lines[start..end].to_vec()
}

/// Byte span of a ticket's block in `raw` (heading line through the line
/// before the next heading/section), for surgical edits.
pub(crate) fn ticket_block_span(raw: &str, id: &TicketId) -> Option<std::ops::Range<usize>> {
    let mut offset = 0;
    let mut start: Option<usize> = None;

    for line in raw.split_inclusive('\n') {
        let trimmed = line.strip_suffix('\n').unwrap_or(line);
        if let Some(s) = start {
            if TICKET_HEADING.is_match(trimmed) || SECTION_HEADING.is_match(trimmed) {
                return Some(s..offset);
            }
        } else if let Some(caps) = TICKET_HEADING.captures(trimmed) {
            if &caps[1] == id.as_str() {
                start = Some(offset);
            }
        }
        offset += line.len();
    }
    start.map(|s| s..raw.len())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
