//! Data-driven transition tables
//!
//! Each machine declares its edges as a static table. An edge names the
//! authority allowed to fire it and a guard tag the machine evaluates.
//! Pairs missing from the table are invalid transitions.

use crate::authority::Authority;
use hrflow_types::WorkflowStatus;
use serde::Serialize;

/// One permitted edge of a state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Transition<S, G> {
    pub from: S,
    pub to: S,
    pub authority: Authority,
    pub guard: G,
}

impl<S, G> Transition<S, G> {
    pub const fn new(from: S, to: S, authority: Authority, guard: G) -> Self {
        Self {
            from,
            to,
            authority,
            guard,
        }
    }
}

/// All edges of one machine
#[derive(Debug)]
pub struct TransitionTable<S: 'static, G: 'static> {
    edges: &'static [Transition<S, G>],
}

impl<S: WorkflowStatus, G: Copy + std::fmt::Debug> TransitionTable<S, G> {
    pub const fn new(edges: &'static [Transition<S, G>]) -> Self {
        Self { edges }
    }

    /// Look up the edge `from -> to`
    pub fn find(&self, from: S, to: S) -> Option<&Transition<S, G>> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    pub fn contains(&self, from: S, to: S) -> bool {
        self.find(from, to).is_some()
    }

    /// States reachable in one step from `from`
    pub fn targets_from(&self, from: S) -> Vec<S> {
        self.edges
            .iter()
            .filter(|e| e.from == from)
            .map(|e| e.to)
            .collect()
    }

    pub fn edges(&self) -> &'static [Transition<S, G>] {
        self.edges
    }

    /// Every `(from, to)` combination that is not an edge
    pub fn absent_pairs(&self) -> Vec<(S, S)> {
        let mut absent = Vec::new();
        for &from in S::ALL {
            for &to in S::ALL {
                if !self.contains(from, to) {
                    absent.push((from, to));
                }
            }
        }
        absent
    }

    /// Human-readable table, one edge per line
    pub fn describe(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|e| {
                format!(
                    "{:<12} -> {:<12} by {:<32} guard {:?}",
                    e.from.as_str(),
                    e.to.as_str(),
                    e.authority.to_string(),
                    e.guard
                )
            })
            .collect()
    }
}
