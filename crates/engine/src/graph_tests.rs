// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_core::{Priority, Ticket};

fn ticket(id: &str, priority: Priority, status: TicketStatus, deps: &[&str]) -> Ticket {
    let mut builder = Ticket::builder().id(id).title(format!("Ticket {id}")).priority(priority);
    builder = builder.status(status);
    for dep in deps {
        builder = builder.depends_on(*dep);
    }
    builder.build()
}

fn todo(id: &str, priority: Priority, deps: &[&str]) -> Ticket {
    ticket(id, priority, TicketStatus::Todo, deps)
}

fn graph(tickets: Vec<Ticket>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph.build(tickets);
    graph
}

fn ids(tickets: &[&Ticket]) -> Vec<String> {
    tickets.iter().map(|t| t.id.to_string()).collect()
}

#[test]
fn ready_requires_all_dependencies_done() {
    let g = graph(vec![
        ticket("T001", Priority::P1, TicketStatus::Done, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T002"]),
    ]);
    assert_eq!(ids(&g.ready()), vec!["T002"]);
    assert_eq!(g.blocked_by(&"T003".into()), vec![TicketId::new("T002")]);
    assert!(g.blocked_by(&"T002".into()).is_empty());
}

#[test]
fn ready_sorts_by_priority_then_id() {
    let g = graph(vec![
        todo("T001", Priority::P2, &[]),
        todo("T002", Priority::P0, &[]),
        todo("T003", Priority::P1, &[]),
        todo("T004", Priority::P0, &[]),
    ]);
    assert_eq!(ids(&g.ready()), vec!["T002", "T004", "T003", "T001"]);
}

#[test]
fn non_todo_tickets_are_never_ready() {
    let g = graph(vec![
        ticket("T001", Priority::P0, TicketStatus::InProgress, &[]),
        ticket("T002", Priority::P0, TicketStatus::Failed, &[]),
        ticket("T003", Priority::P0, TicketStatus::Done, &[]),
        todo("T004", Priority::P2, &[]),
    ]);
    assert_eq!(ids(&g.ready()), vec!["T004"]);
}

#[test]
fn diamond_unblocks_in_waves() {
    let mut g = graph(vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T001"]),
        todo("T004", Priority::P1, &["T002", "T003"]),
    ]);
    assert_eq!(ids(&g.ready()), vec!["T001"]);
    assert_eq!(
        g.blocked_by(&"T004".into()),
        vec![TicketId::new("T002"), TicketId::new("T003")]
    );

    g.update_ticket_status(&"T001".into(), TicketStatus::Done);
    assert_eq!(ids(&g.ready()), vec!["T002", "T003"]);

    g.update_ticket_status(&"T002".into(), TicketStatus::Done);
    g.update_ticket_status(&"T003".into(), TicketStatus::Done);
    assert_eq!(ids(&g.ready()), vec!["T004"]);
    assert!(g.blocked_by(&"T004".into()).is_empty());
}

#[test]
fn dependencies_and_dependents_are_sorted() {
    let g = graph(vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T010", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T010", "T002"]),
    ]);
    assert_eq!(g.dependencies(&"T003".into()), vec![TicketId::new("T002"), TicketId::new("T010")]);
    assert_eq!(g.dependents(&"T001".into()), vec![TicketId::new("T002"), TicketId::new("T010")]);
    assert!(g.dependents(&"T003".into()).is_empty());
}

#[test]
fn unknown_dependency_does_not_block_readiness() {
    // The graph tolerates dangling edges; validate_plan reports them.
    let g = graph(vec![todo("T001", Priority::P1, &["T999"])]);
    assert_eq!(ids(&g.ready()), vec!["T001"]);
    assert!(g.blocked_by(&"T001".into()).is_empty());
    assert!(g.detect_cycles().is_empty());
    assert_eq!(g.topological_order().unwrap(), vec![TicketId::new("T001")]);
}

#[test]
fn acyclic_graph_has_no_cycles() {
    let g = graph(vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T001", "T002"]),
    ]);
    assert!(g.detect_cycles().is_empty());
}

#[test]
fn two_node_cycle_is_detected() {
    let g = graph(vec![
        todo("T001", Priority::P1, &["T002"]),
        todo("T002", Priority::P1, &["T001"]),
    ]);
    let cycles = g.detect_cycles();
    assert_eq!(cycles.len(), 1);
    let mut cycle = cycles[0].clone();
    cycle.sort();
    assert_eq!(cycle, vec![TicketId::new("T001"), TicketId::new("T002")]);
}

#[test]
fn independent_cycles_are_both_reported() {
    let g = graph(vec![
        todo("T001", Priority::P1, &["T002"]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T004"]),
        todo("T004", Priority::P1, &["T003"]),
        todo("T005", Priority::P1, &[]),
    ]);
    assert_eq!(g.detect_cycles().len(), 2);
}

#[test]
fn self_cycle_is_detected() {
    let g = graph(vec![todo("T001", Priority::P1, &["T001"])]);
    let cycles = g.detect_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0], vec![TicketId::new("T001")]);
}

#[test]
fn topological_order_lists_dependents_before_prerequisites() {
    let g = graph(vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T002"]),
    ]);
    let order = g.topological_order().unwrap();
    assert_eq!(order.len(), 3);
    let pos = |id: &str| order.iter().position(|t| t == id).unwrap();
    // Edge u -> v (u depends on v) places u first.
    assert!(pos("T002") < pos("T001"));
    assert!(pos("T003") < pos("T002"));
}

#[test]
fn topological_order_is_deterministic() {
    let tickets = vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
        todo("T003", Priority::P1, &["T001"]),
        todo("T004", Priority::P1, &["T002", "T003"]),
    ];
    let first = graph(tickets.clone()).topological_order().unwrap();
    let second = graph(tickets).topological_order().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn topological_order_fails_on_cycle() {
    let g = graph(vec![
        todo("T001", Priority::P1, &["T002"]),
        todo("T002", Priority::P1, &["T001"]),
    ]);
    let err = g.topological_order().unwrap_err();
    assert!(matches!(err, OrchError::Cycle { .. }));
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn rebuild_replaces_previous_contents() {
    let mut g = graph(vec![todo("T001", Priority::P1, &[]), todo("T002", Priority::P1, &["T001"])]);
    g.build(vec![todo("T010", Priority::P0, &[])]);
    assert_eq!(g.len(), 1);
    assert!(g.ticket(&"T001".into()).is_none());
    assert_eq!(ids(&g.ready()), vec!["T010"]);
}

#[test]
fn update_status_does_not_alter_edges() {
    let mut g = graph(vec![
        todo("T001", Priority::P1, &[]),
        todo("T002", Priority::P1, &["T001"]),
    ]);
    g.update_ticket_status(&"T001".into(), TicketStatus::Done);
    assert_eq!(g.dependencies(&"T002".into()), vec![TicketId::new("T001")]);
    assert_eq!(g.dependents(&"T001".into()), vec![TicketId::new("T002")]);
}
