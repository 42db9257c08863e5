// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ticket::TicketStatus::*;
use yare::parameterized;

fn automation(review: StageMode, qa: StageMode) -> AutomationConfig {
    AutomationConfig {
        ticket_progression: StageMode::Automatic,
        review: StagePolicy { mode: review },
        qa: StagePolicy { mode: qa },
    }
}

#[parameterized(
    todo_to_in_progress = { Todo, InProgress, true },
    todo_to_done = { Todo, Done, false },
    todo_to_review = { Todo, Review, false },
    in_progress_to_review = { InProgress, Review, true },
    in_progress_to_qa = { InProgress, Qa, true },
    in_progress_to_done = { InProgress, Done, true },
    in_progress_to_failed = { InProgress, Failed, true },
    in_progress_to_todo = { InProgress, Todo, false },
    review_to_qa = { Review, Qa, true },
    review_to_done = { Review, Done, true },
    review_to_todo = { Review, Todo, true },
    review_to_failed = { Review, Failed, false },
    qa_to_done = { Qa, Done, true },
    qa_to_todo = { Qa, Todo, true },
    qa_to_review = { Qa, Review, false },
    done_to_todo = { Done, Todo, false },
    done_to_done = { Done, Done, false },
    failed_to_todo = { Failed, Todo, true },
    failed_to_in_progress = { Failed, InProgress, false },
)]
fn transition_table(from: TicketStatus, to: TicketStatus, expected: bool) {
    assert_eq!(is_valid_transition(from, to), expected);
}

#[test]
fn assert_valid_passes_for_table_entries() {
    for from in [Todo, InProgress, Review, Qa, Done, Failed] {
        for to in valid_targets(from) {
            assert_valid_transition(from, *to).unwrap();
        }
    }
}

#[test]
fn assert_invalid_names_permitted_targets() {
    let err = assert_valid_transition(Done, Todo).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Done"), "message should name the source: {msg}");
    match err {
        crate::error::OrchError::Transition { valid_targets, .. } => {
            assert!(valid_targets.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = assert_valid_transition(Review, Failed).unwrap_err();
    match err {
        crate::error::OrchError::Transition { valid_targets, .. } => {
            assert_eq!(valid_targets, vec![Qa, Done, Todo]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[parameterized(
    all_automatic = { StageMode::Automatic, StageMode::Automatic, InProgress, Some(Review) },
    review_manual = { StageMode::Manual, StageMode::Automatic, InProgress, Some(Qa) },
    both_manual = { StageMode::Manual, StageMode::Manual, InProgress, Some(Done) },
    review_approval = { StageMode::Approval, StageMode::Manual, InProgress, Some(Review) },
    from_review_qa_auto = { StageMode::Automatic, StageMode::Automatic, Review, Some(Qa) },
    from_review_qa_manual = { StageMode::Automatic, StageMode::Manual, Review, Some(Done) },
    from_qa = { StageMode::Automatic, StageMode::Automatic, Qa, Some(Done) },
    from_failed = { StageMode::Automatic, StageMode::Automatic, Failed, Some(Todo) },
    from_done = { StageMode::Automatic, StageMode::Automatic, Done, None },
    from_todo = { StageMode::Automatic, StageMode::Automatic, Todo, Some(InProgress) },
)]
fn next_status_honors_stage_modes(
    review: StageMode,
    qa: StageMode,
    from: TicketStatus,
    expected: Option<TicketStatus>,
) {
    assert_eq!(next_status(from, &automation(review, qa)), expected);
}

#[parameterized(
    review = { Review, Some(Todo) },
    qa = { Qa, Some(Todo) },
    failed = { Failed, Some(Todo) },
    todo = { Todo, None },
    in_progress = { InProgress, None },
    done = { Done, None },
)]
fn previous_status_rolls_back_to_todo(from: TicketStatus, expected: Option<TicketStatus>) {
    assert_eq!(previous_status(from), expected);
}

#[test]
fn next_status_target_is_always_a_valid_transition() {
    let modes = [StageMode::Automatic, StageMode::Approval, StageMode::Manual];
    for review in modes {
        for qa in modes {
            let cfg = automation(review, qa);
            for from in [Todo, InProgress, Review, Qa, Done, Failed] {
                if let Some(to) = next_status(from, &cfg) {
                    assert!(
                        is_valid_transition(from, to),
                        "next_status produced invalid {from} -> {to}"
                    );
                }
            }
        }
    }
}

#[test]
fn default_automation_is_manual_progression() {
    let cfg = AutomationConfig::default();
    assert_eq!(cfg.ticket_progression, StageMode::Manual);
    assert_eq!(cfg.review.mode, StageMode::Automatic);
}
