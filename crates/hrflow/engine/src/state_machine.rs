//! The contract every entity state machine fulfils
//!
//! A machine owns a static transition table and the entity-specific
//! pieces the orchestrator cannot know: who owns an entity, how a guard
//! tag is evaluated, what fields change when an edge fires and which
//! ledger effects ride along with the commit. The orchestrator runs the
//! same check-then-commit algorithm for all of them.

use crate::transition_table::{Transition, TransitionTable};
use chrono::{DateTime, Utc};
use hrflow_types::{
    Actor, Entity, EntityType, GuardFailure, UserId, Versioned, WorkflowResult, WorkflowStatus,
};
use std::fmt::Debug;

pub trait StateMachine: Send + Sync {
    /// Entity record driven by this machine
    type Entity: Versioned + Clone + Into<Entity> + Send + Sync;
    /// Status enum of the entity
    type Status: WorkflowStatus;
    /// Guard tag attached to each edge
    type Guard: Copy + Debug + Send + Sync + 'static;
    /// Caller-supplied transition input
    type Payload;

    const ENTITY_TYPE: EntityType;

    fn table(&self) -> &'static TransitionTable<Self::Status, Self::Guard>;

    fn status_of(entity: &Self::Entity) -> Self::Status;

    /// Employee the entity belongs to
    fn owner_of(entity: &Self::Entity) -> &UserId;

    /// Evaluate the edge's business precondition. Must not mutate anything.
    fn check_guard(
        &self,
        entity: &Self::Entity,
        edge: &Transition<Self::Status, Self::Guard>,
        actor: &Actor,
        payload: &Self::Payload,
        now: DateTime<Utc>,
    ) -> Result<(), GuardFailure>;

    /// Apply the edge to a working copy of the entity, including the new
    /// status. Returns the note recorded in the audit entry, if any.
    fn apply(
        &self,
        entity: &mut Self::Entity,
        edge: &Transition<Self::Status, Self::Guard>,
        actor: &Actor,
        payload: &Self::Payload,
        now: DateTime<Utc>,
    ) -> Option<String>;

    /// Side effects that must land atomically with the entity write.
    /// Runs while the entity's write lock is held; an error aborts the
    /// commit.
    fn commit_effects(&self, _before: &Self::Entity, _after: &Self::Entity) -> WorkflowResult<()> {
        Ok(())
    }
}
