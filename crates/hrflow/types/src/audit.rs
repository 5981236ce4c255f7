//! Audit entries: the record of who did what and when

use crate::{EntityRef, EntityType, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed change. Immutable once written.
///
/// `from_state` is `None` for creations. Mutations that keep the status
/// (assignment, comments, rating, document drafts) record the same value
/// in `from_state` and `to_state`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 1
    pub sequence: u64,
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor_id: UserId,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AuditEntry {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    pub fn is_status_change(&self) -> bool {
        self.from_state.as_deref() != Some(self.to_state.as_str())
    }
}

/// An audit entry before the log assigns its sequence number
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAuditEntry {
    pub entity: EntityRef,
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl PendingAuditEntry {
    pub fn new(
        entity: EntityRef,
        from_state: Option<&str>,
        to_state: &str,
        actor_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entity,
            from_state: from_state.map(str::to_string),
            to_state: to_state.to_string(),
            actor_id,
            timestamp,
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    pub fn finalize(self, sequence: u64) -> AuditEntry {
        AuditEntry {
            sequence,
            entity_type: self.entity.entity_type,
            entity_id: self.entity.entity_id,
            from_state: self.from_state,
            to_state: self.to_state,
            actor_id: self.actor_id,
            timestamp: self.timestamp,
            note: self.note,
        }
    }
}
