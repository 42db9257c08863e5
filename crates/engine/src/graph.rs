// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ticket dependency graph.
//!
//! Nodes are ticket ids, edges run from a ticket to each prerequisite.
//! The graph stores ids only (never object pointers) plus a cached view
//! of the ticket records, rebuilt whenever the plan is (re)loaded. Edges
//! naming unknown tickets are tolerated here (traversal skips them); the
//! plan store surfaces them through validation.

use gf_core::{OrchError, Ticket, TicketId, TicketStatus};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    tickets: BTreeMap<TicketId, Ticket>,
    deps: BTreeMap<TicketId, BTreeSet<TicketId>>,
    dependents: BTreeMap<TicketId, BTreeSet<TicketId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and rebuild both adjacency maps from a ticket snapshot.
    pub fn build(&mut self, tickets: impl IntoIterator<Item = Ticket>) {
        self.tickets.clear();
        self.deps.clear();
        self.dependents.clear();

        for ticket in tickets {
            let id = ticket.id.clone();
            self.deps.insert(id.clone(), ticket.dependencies.iter().cloned().collect());
            for dep in &ticket.dependencies {
                self.dependents.entry(dep.clone()).or_default().insert(id.clone());
            }
            self.dependents.entry(id.clone()).or_default();
            self.tickets.insert(id, ticket);
        }
    }

    pub fn ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Direct dependencies of `id`, id-sorted.
    pub fn dependencies(&self, id: &TicketId) -> Vec<TicketId> {
        self.deps.get(id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// Tickets that depend on `id`, id-sorted.
    pub fn dependents(&self, id: &TicketId) -> Vec<TicketId> {
        self.dependents.get(id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// Todo tickets whose every (known) dependency is Done, sorted by
    /// priority ascending then id.
    pub fn ready(&self) -> Vec<&Ticket> {
        let mut ready: Vec<&Ticket> = self
            .tickets
            .values()
            .filter(|t| t.status == TicketStatus::Todo)
            .filter(|t| {
                t.dependencies
                    .iter()
                    .filter_map(|dep| self.tickets.get(dep))
                    .all(|dep| dep.status == TicketStatus::Done)
            })
            .collect();
        ready.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        ready
    }

    /// Ids of the Todo tickets in [`ready`](Self::ready) order.
    pub fn ready_ids(&self) -> Vec<TicketId> {
        self.ready().iter().map(|t| t.id.clone()).collect()
    }

    /// Dependencies of `id` that are not yet Done, id-sorted.
    pub fn blocked_by(&self, id: &TicketId) -> Vec<TicketId> {
        self.deps
            .get(id)
            .map(|deps| {
                deps.iter()
                    .filter(|dep| {
                        self.tickets.get(*dep).is_some_and(|t| t.status != TicketStatus::Done)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mutate the cached ticket record; edges are untouched. The plan
    /// store is the source of truth; this mirrors what it just persisted.
    pub fn update_ticket_status(&mut self, id: &TicketId, status: TicketStatus) {
        if let Some(ticket) = self.tickets.get_mut(id) {
            ticket.status = status;
        }
    }

    /// Three-color DFS cycle detection. Each independent cycle is emitted
    /// once as the id path around it.
    pub fn detect_cycles(&self) -> Vec<Vec<TicketId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: BTreeMap<&TicketId, Color> =
            self.tickets.keys().map(|id| (id, Color::White)).collect();
        let mut parent: BTreeMap<&TicketId, &TicketId> = BTreeMap::new();
        let mut cycles = Vec::new();

        // Iterative DFS; the explicit stack carries (node, next-edge cursor).
        for root in self.tickets.keys() {
            if color[root] != Color::White {
                continue;
            }
            let mut stack: Vec<(&TicketId, Vec<&TicketId>, usize)> = Vec::new();
            color.insert(root, Color::Gray);
            stack.push((root, self.edge_targets(root), 0));

            while let Some((node, edges, cursor)) = stack.pop() {
                if cursor < edges.len() {
                    let next = edges[cursor];
                    stack.push((node, edges, cursor + 1));
                    match color[next] {
                        Color::White => {
                            parent.insert(next, node);
                            color.insert(next, Color::Gray);
                            stack.push((next, self.edge_targets(next), 0));
                        }
                        Color::Gray => {
                            // Walk parents from `node` back to `next`.
                            let mut cycle = vec![next.clone()];
                            let mut cursor_node = node;
                            while cursor_node != next {
                                cycle.push(cursor_node.clone());
                                match parent.get(cursor_node) {
                                    Some(p) => cursor_node = *p,
                                    None => break,
                                }
                            }
                            cycle[1..].reverse();
                            cycles.push(cycle);
                        }
                        Color::Black => {}
                    }
                } else {
                    color.insert(node, Color::Black);
                }
            }
        }

        cycles
    }

    /// Kahn's algorithm over the dependency adjacency. Fails with
    /// [`OrchError::Cycle`] when the graph is cyclic; otherwise every
    /// ticket appears exactly once and, for every edge `u -> v` (u depends
    /// on v), `u` precedes `v`.
    pub fn topological_order(&self) -> Result<Vec<TicketId>, OrchError> {
        // In-degree of v = number of known tickets that depend on v.
        let mut in_degree: BTreeMap<&TicketId, usize> = BTreeMap::new();
        for id in self.tickets.keys() {
            in_degree.entry(id).or_insert(0);
        }
        for id in self.tickets.keys() {
            for dep in self.edge_targets(id) {
                if let Some(degree) = in_degree.get_mut(dep) {
                    *degree += 1;
                }
            }
        }

        // Id-ordered frontier for deterministic output.
        let mut frontier: BTreeSet<&TicketId> =
            in_degree.iter().filter(|(_, d)| **d == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.tickets.len());

        while let Some(id) = frontier.pop_first() {
            order.push(id.clone());
            for dep in self.edge_targets(id) {
                let Some(degree) = in_degree.get_mut(dep) else { continue };
                *degree -= 1;
                if *degree == 0 {
                    frontier.insert(dep);
                }
            }
        }

        if order.len() < self.tickets.len() {
            let cycle = self.detect_cycles().into_iter().next().unwrap_or_default();
            return Err(OrchError::Cycle { cycle });
        }
        Ok(order)
    }

    /// Dependency edges of `id` that resolve to known tickets.
    fn edge_targets(&self, id: &TicketId) -> Vec<&TicketId> {
        self.deps
            .get(id)
            .map(|deps| deps.iter().filter(|d| self.tickets.contains_key(*d)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
