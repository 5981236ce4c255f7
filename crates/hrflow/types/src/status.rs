//! Shared behaviour of the per-entity status enums

use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display};

/// A named state in one of the entity state machines
pub trait WorkflowStatus: Copy + Eq + Debug + Display + Send + Sync + 'static {
    /// Every state of the machine, in declaration order
    const ALL: &'static [Self];

    /// Canonical upper-case name (`"SUBMITTED"`, `"IN_PROGRESS"`, ...)
    fn as_str(self) -> &'static str;

    /// No transition leaves a terminal state
    fn is_terminal(self) -> bool;
}

/// Implemented by every entity that goes through the orchestrator
pub trait Versioned {
    /// Optimistic-concurrency stamp. Starts at 1, +1 per committed change.
    fn version(&self) -> u64;

    /// Key the entity is stored under
    fn key(&self) -> String;

    /// Record a committed change: bump the version and `updated_at`
    fn touch(&mut self, at: DateTime<Utc>);
}
