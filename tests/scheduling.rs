// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling scenarios: the linear chain, the diamond, priority
//! ordering, and the concurrency cap.

use crate::prelude::*;

#[tokio::test]
async fn linear_chain_completes_in_dependency_order() {
    let s = ScenarioBuilder::new()
        .ticket("T001", "P1", "Todo", &[])
        .ticket("T002", "P1", "Todo", &["T001"])
        .build();
    s.orch.start().unwrap();

    assert_eq!(s.orch.get_ready_tickets(), ids(&["T001"]));
    assert_eq!(s.orch.get_blocked_by(&"T002".into()), ids(&["T001"]));

    let agent_id = s.orch.assign_ticket(&"T001".into()).await.unwrap();
    assert!(!agent_id.as_str().is_empty());
    assert_eq!(s.status_of("T001"), TicketStatus::InProgress);
    assert!(s.on_disk().contains("- **Status:** In Progress"));

    s.settle().await;

    assert_eq!(s.status_of("T001"), TicketStatus::Done);
    assert_eq!(s.orch.get_ready_tickets(), ids(&["T002"]));
}

#[tokio::test]
async fn diamond_dependencies_unblock_in_waves() {
    let s = ScenarioBuilder::new()
        .max_agents(3)
        .ticket("T001", "P1", "Todo", &[])
        .ticket("T002", "P1", "Todo", &["T001"])
        .ticket("T003", "P1", "Todo", &["T001"])
        .ticket("T004", "P1", "Todo", &["T002", "T003"])
        .build();
    s.orch.start().unwrap();

    assert_eq!(s.orch.get_ready_tickets(), ids(&["T001"]));
    s.work("T001").await;

    // Both middle tickets become ready; the order is stable per run.
    assert_eq!(s.orch.get_ready_tickets(), ids(&["T002", "T003"]));
    assert_eq!(s.orch.get_blocked_by(&"T004".into()), ids(&["T002", "T003"]));

    s.work("T002").await;
    s.work("T003").await;
    assert_eq!(s.orch.get_ready_tickets(), ids(&["T004"]));

    s.work("T004").await;
    assert_eq!(s.status_of("T004"), TicketStatus::Done);
    assert!(s.orch.get_ready_tickets().is_empty());
}

#[tokio::test]
async fn ready_set_orders_by_priority_then_id() {
    let s = ScenarioBuilder::new()
        .ticket("T001", "P2", "Todo", &[])
        .ticket("T002", "P0", "Todo", &[])
        .ticket("T003", "P1", "Todo", &[])
        .build();
    s.orch.start().unwrap();
    assert_eq!(s.orch.get_ready_tickets(), ids(&["T002", "T003", "T001"]));
}

#[tokio::test]
async fn agent_pool_rejects_work_beyond_the_cap() {
    let s = ScenarioBuilder::new()
        .script("sleep 30")
        .max_agents(2)
        .ticket("T001", "P0", "Todo", &[])
        .ticket("T002", "P0", "Todo", &[])
        .ticket("T003", "P0", "Todo", &[])
        .build();
    s.orch.start().unwrap();

    s.orch.assign_ticket(&"T001".into()).await.unwrap();
    s.orch.assign_ticket(&"T002".into()).await.unwrap();
    let err = s.orch.assign_ticket(&"T003".into()).await.unwrap_err();
    assert!(err.to_string().contains("max concurrency"));

    s.orch.stop();
}

#[tokio::test]
async fn ready_set_events_track_progress() {
    let s = ScenarioBuilder::new()
        .ticket("T001", "P1", "Todo", &[])
        .ticket("T002", "P1", "Todo", &["T001"])
        .build();
    s.orch.start().unwrap();
    s.work("T001").await;

    let ready_events = s.sink.of_kind(EventKind::TicketsReady);
    assert!(ready_events.len() >= 2);
    match &ready_events.last().unwrap().event {
        Event::TicketsReady { ids: ready } => assert_eq!(ready, &ids(&["T002"])),
        other => panic!("unexpected event: {other:?}"),
    }
}
