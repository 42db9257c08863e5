// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn concurrency_message_names_max_concurrency() {
    let err = OrchError::Concurrency { limit: 2 };
    assert!(err.to_string().contains("max concurrency"));
}

#[test]
fn not_ready_lists_blockers() {
    let err = OrchError::TicketNotReady {
        id: TicketId::new("T004"),
        blockers: vec![TicketId::new("T002"), TicketId::new("T003")],
    };
    let msg = err.to_string();
    assert!(msg.contains("T004"));
    assert!(msg.contains("T002, T003"));
}

#[test]
fn transition_error_names_valid_targets() {
    let err = OrchError::Transition {
        from: TicketStatus::Review,
        to: TicketStatus::Failed,
        valid_targets: vec![TicketStatus::Qa, TicketStatus::Done, TicketStatus::Todo],
    };
    let msg = err.to_string();
    assert!(msg.contains("Review -> Failed"));
    assert!(msg.contains("QA, Done, Todo"));
}

#[test]
fn plan_parse_error_includes_line_when_known() {
    let err = OrchError::PlanParse {
        path: "/plans/backlog.md".into(),
        line: Some(17),
        message: "unknown Status value".to_string(),
    };
    assert!(err.to_string().contains("backlog.md:17"));

    let err =
        OrchError::PlanParse { path: "/p.md".into(), line: None, message: "empty".to_string() };
    assert!(!err.to_string().contains(":17"));
}

#[test]
fn network_retryable_flag_wins() {
    assert!(OrchError::Network { message: "boom".into(), retryable: true }.is_retryable());
    assert!(!OrchError::Network { message: "boom".into(), retryable: false }.is_retryable());
}

#[test]
fn agent_crash_is_retryable() {
    let err = OrchError::AgentCrash {
        agent_id: AgentId::new("agent-1"),
        ticket_id: None,
        exit_code: 1,
    };
    assert!(err.is_retryable());
}

#[parameterized(
    timeout = { "Request Timeout after 30s", true },
    econnreset = { "read ECONNRESET", true },
    http_503 = { "upstream returned 503", true },
    hang_up = { "socket hang up", true },
    temporarily = { "service temporarily unavailable", true },
    plain = { "boom", false },
    not_found = { "no such file", false },
)]
fn message_marker_scan(message: &str, retryable: bool) {
    assert_eq!(message_is_retryable(message), retryable);
    assert_eq!(OrchError::internal(message).is_retryable(), retryable);
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: OrchError = io.into();
    assert!(matches!(err, OrchError::Io(_)));
}
