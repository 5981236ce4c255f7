//! Audit log: append-only record of every committed change
//!
//! Entries are never edited or removed, including when the entity they
//! describe is deleted. Sequence numbers are assigned at append time and
//! give a total order across all entities.

use hrflow_types::{AuditEntry, EntityRef, PendingAuditEntry, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<AuditEntry>,
    /// Positions in `entries`, per entity
    by_entity: HashMap<EntityRef, Vec<usize>>,
}

#[derive(Debug, Default)]
pub struct AuditLog {
    state: RwLock<LogState>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return it with its sequence number
    pub fn append(&self, pending: PendingAuditEntry) -> AuditEntry {
        let mut state = self.state.write();
        let sequence = state.entries.len() as u64 + 1;
        let entry = pending.finalize(sequence);

        tracing::trace!(
            sequence = sequence,
            entity = %entry.entity_ref(),
            to = %entry.to_state,
            actor = %entry.actor_id,
            "Audit entry appended"
        );

        let position = state.entries.len();
        state
            .by_entity
            .entry(entry.entity_ref())
            .or_default()
            .push(position);
        state.entries.push(entry.clone());
        entry
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Entries for one entity, oldest first
    pub fn entries_for(&self, entity: &EntityRef) -> Vec<AuditEntry> {
        let state = self.state.read();
        state
            .by_entity
            .get(entity)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|&p| state.entries.get(p).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entries written by one actor, oldest first
    pub fn entries_by_actor(&self, actor_id: &UserId) -> Vec<AuditEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| &e.actor_id == actor_id)
            .cloned()
            .collect()
    }

    /// Most recent entry for an entity
    pub fn latest_for(&self, entity: &EntityRef) -> Option<AuditEntry> {
        let state = self.state.read();
        state
            .by_entity
            .get(entity)
            .and_then(|positions| positions.last())
            .and_then(|&p| state.entries.get(p).cloned())
    }

    pub fn all(&self) -> Vec<AuditEntry> {
        self.state.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
