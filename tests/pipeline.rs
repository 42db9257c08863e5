// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline scenarios: validation failure, review/QA automation, reject
//! and retry.

use crate::prelude::*;

#[tokio::test]
async fn failing_validation_marks_the_ticket_failed() {
    let s = ScenarioBuilder::new()
        .ticket_with_validation("T001", "P1", "Todo", &[], "exit 1")
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;

    assert_eq!(s.status_of("T001"), TicketStatus::Failed);
    let ticket = s.orch.ticket(&"T001".into()).unwrap();
    assert!(
        ticket.feedback.iter().any(|f| f.contains("exit 1")),
        "feedback should name the failing command: {:?}",
        ticket.feedback
    );
    assert!(s.on_disk().contains("- **Status:** Failed"));
}

#[tokio::test]
async fn automated_review_and_qa_carry_a_ticket_to_done() {
    let s = ScenarioBuilder::new()
        .max_agents(3)
        .automation(AutomationConfig {
            ticket_progression: StageMode::Manual,
            review: StagePolicy { mode: StageMode::Automatic },
            qa: StagePolicy { mode: StageMode::Automatic },
        })
        .ticket("T001", "P1", "Todo", &[])
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;

    assert_eq!(s.status_of("T001"), TicketStatus::Done);

    // One agent per stage: implementation, review, QA.
    let kinds: Vec<_> = s.orch.agents().records().into_iter().map(|r| r.kind).collect();
    assert_eq!(kinds.len(), 3, "agent kinds: {kinds:?}");
    assert!(kinds.contains(&gf_core::AgentKind::Implementation));
    assert!(kinds.contains(&gf_core::AgentKind::Review));
    assert!(kinds.contains(&gf_core::AgentKind::Qa));

    // The ticket passed through every pipeline stage on disk and on the bus.
    let transitions: Vec<(TicketStatus, TicketStatus)> = s
        .sink
        .of_kind(EventKind::TicketStatusChanged)
        .iter()
        .map(|r| match &r.event {
            Event::TicketStatusChanged { from, to, .. } => (*from, *to),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (TicketStatus::Todo, TicketStatus::InProgress),
            (TicketStatus::InProgress, TicketStatus::Review),
            (TicketStatus::Review, TicketStatus::Qa),
            (TicketStatus::Qa, TicketStatus::Done),
        ]
    );
}

#[tokio::test]
async fn approval_review_waits_for_a_human() {
    let s = ScenarioBuilder::new()
        .automation(AutomationConfig {
            ticket_progression: StageMode::Manual,
            review: StagePolicy { mode: StageMode::Approval },
            qa: StagePolicy { mode: StageMode::Manual },
        })
        .ticket("T001", "P1", "Todo", &[])
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;

    // The ticket sits in Review; no review agent was spawned.
    assert_eq!(s.status_of("T001"), TicketStatus::Review);
    assert_eq!(s.orch.agents().records().len(), 1);

    // A human approves: advance moves it on (QA is manual, so Done).
    s.orch.advance_ticket(&"T001".into()).await.unwrap();
    assert_eq!(s.status_of("T001"), TicketStatus::Done);
}

#[tokio::test]
async fn rejected_ticket_returns_to_todo_with_feedback() {
    let s = ScenarioBuilder::new()
        .automation(AutomationConfig {
            ticket_progression: StageMode::Manual,
            review: StagePolicy { mode: StageMode::Approval },
            qa: StagePolicy { mode: StageMode::Manual },
        })
        .ticket("T001", "P1", "Todo", &[])
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;
    assert_eq!(s.status_of("T001"), TicketStatus::Review);

    s.orch.reject_ticket(&"T001".into(), "edge cases unhandled").await.unwrap();
    assert_eq!(s.status_of("T001"), TicketStatus::Todo);
    assert!(s.orch.get_ready_tickets().contains(&"T001".into()));
    assert!(s.on_disk().contains("edge cases unhandled"));
}

#[tokio::test]
async fn retry_clears_feedback_and_requeues() {
    let s = ScenarioBuilder::new()
        .ticket_with_validation("T001", "P1", "Todo", &[], "exit 1")
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;
    assert_eq!(s.status_of("T001"), TicketStatus::Failed);

    s.orch.retry_ticket(&"T001".into()).await.unwrap();
    assert_eq!(s.status_of("T001"), TicketStatus::Todo);
    assert!(s.orch.ticket(&"T001".into()).unwrap().feedback.is_empty());
    assert_eq!(s.orch.get_ready_tickets(), ids(&["T001"]));
}

#[tokio::test]
async fn done_tickets_never_transition_again() {
    let s = ScenarioBuilder::new().ticket("T001", "P1", "Todo", &[]).build();
    s.orch.start().unwrap();
    s.work("T001").await;
    assert_eq!(s.status_of("T001"), TicketStatus::Done);

    // Advancing a Done ticket is a no-op; assigning it is an error.
    s.orch.advance_ticket(&"T001".into()).await.unwrap();
    assert_eq!(s.status_of("T001"), TicketStatus::Done);
    assert!(s.orch.assign_ticket(&"T001".into()).await.is_err());
}
