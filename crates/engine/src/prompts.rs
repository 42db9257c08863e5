// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction for agent child processes.
//!
//! Every prompt ends with the framing contract: the child must print the
//! `=== TICKET <id> COMPLETE ===` marker on success, or the BLOCKED
//! marker with a reason when it needs help. Anything else it prints is
//! treated as progress text.

use gf_core::Ticket;
use std::fmt::Write;

fn push_context(prompt: &mut String, ticket: &Ticket) {
    let _ = writeln!(prompt, "Ticket {}: {}", ticket.id, ticket.title);
    if let Some(description) = &ticket.description {
        let _ = writeln!(prompt, "\nScope:\n{description}");
    }
    if !ticket.acceptance_criteria.is_empty() {
        let _ = writeln!(prompt, "\nAcceptance criteria:");
        for criterion in &ticket.acceptance_criteria {
            let _ = writeln!(prompt, "- {criterion}");
        }
    }
    if !ticket.feedback.is_empty() {
        let _ = writeln!(prompt, "\nFeedback from previous attempts:");
        for note in &ticket.feedback {
            let _ = writeln!(prompt, "- {note}");
        }
    }
}

fn push_framing(prompt: &mut String, ticket: &Ticket) {
    let _ = writeln!(
        prompt,
        "\nWhen the work is finished, print exactly:\n=== TICKET {} COMPLETE ===",
        ticket.id
    );
    let _ = writeln!(
        prompt,
        "If you cannot continue, print exactly:\n=== TICKET {} BLOCKED: <reason> ===",
        ticket.id
    );
}

/// Prompt for the implementation agent working a Todo ticket.
pub fn implementation_prompt(ticket: &Ticket) -> String {
    let mut prompt = String::from("Implement the following ticket in the current directory.\n\n");
    push_context(&mut prompt, ticket);
    if !ticket.validation_steps.is_empty() {
        let _ = writeln!(&mut prompt, "\nYour work will be validated with:");
        for step in &ticket.validation_steps {
            let _ = writeln!(&mut prompt, "- {step}");
        }
    }
    push_framing(&mut prompt, ticket);
    prompt
}

/// Prompt for the review agent examining completed work.
pub fn review_prompt(ticket: &Ticket) -> String {
    let mut prompt = String::from(
        "Review the implementation of the following ticket in the current directory. \
         Check the acceptance criteria and look for defects.\n\n",
    );
    push_context(&mut prompt, ticket);
    push_framing(&mut prompt, ticket);
    prompt
}

/// Prompt for the QA agent exercising completed work.
pub fn qa_prompt(ticket: &Ticket) -> String {
    let mut prompt = String::from(
        "Exercise the implementation of the following ticket in the current directory \
         as a user would, and verify the acceptance criteria hold end to end.\n\n",
    );
    push_context(&mut prompt, ticket);
    push_framing(&mut prompt, ticket);
    prompt
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
