//! External collaborators consumed by the engine
//!
//! The engine never authenticates, stores files or sends mail itself.
//! It asks these seams and keeps going.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hrflow_types::{
    Actor, Entity, EntityRef, SubmittedDocuments, UserId, WorkflowError, WorkflowResult,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ── Actor resolution ─────────────────────────────────────────────────

/// Maps a session token to the acting principal
pub trait ActorResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Actor>;
}

/// Token table held in memory
#[derive(Debug, Default)]
pub struct StaticActorResolver {
    sessions: DashMap<String, Actor>,
}

impl StaticActorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, token: impl Into<String>, actor: Actor) -> Self {
        self.sessions.insert(token.into(), actor);
        self
    }

    pub fn insert(&self, token: impl Into<String>, actor: Actor) {
        self.sessions.insert(token.into(), actor);
    }
}

impl ActorResolver for StaticActorResolver {
    fn resolve(&self, token: &str) -> Option<Actor> {
        self.sessions.get(token).map(|a| a.clone())
    }
}

/// Resolve a session token, failing with `Forbidden` for unknown tokens
pub fn resolve_actor(resolver: &dyn ActorResolver, token: &str) -> WorkflowResult<Actor> {
    resolver
        .resolve(token)
        .ok_or_else(|| WorkflowError::forbidden("unknown or expired session"))
}

// ── Document completeness ────────────────────────────────────────────

pub trait DocumentChecker: Send + Sync {
    /// Names of required slots that are missing. Empty means complete.
    fn missing(&self, documents: &SubmittedDocuments) -> Vec<String>;

    fn is_complete(&self, documents: &SubmittedDocuments) -> bool {
        self.missing(documents).is_empty()
    }
}

/// Government ID, at least one address, and the employment fields
#[derive(Clone, Copy, Debug, Default)]
pub struct RequiredDocumentsChecker;

impl DocumentChecker for RequiredDocumentsChecker {
    fn missing(&self, documents: &SubmittedDocuments) -> Vec<String> {
        documents
            .missing_slots()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

// ── Identity verification ────────────────────────────────────────────

pub trait IdentityVerifier: Send + Sync {
    /// Whether the verification step for `employee_id` succeeded
    fn verify(&self, employee_id: &UserId, token: &str) -> bool;
}

/// Accepts any non-empty token; verification happened upstream
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustedTokenVerifier;

impl IdentityVerifier for TrustedTokenVerifier {
    fn verify(&self, _employee_id: &UserId, token: &str) -> bool {
        !token.trim().is_empty()
    }
}

/// One expected token per employee
#[derive(Debug, Default)]
pub struct StaticIdentityVerifier {
    tokens: DashMap<UserId, String>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, employee_id: UserId, token: impl Into<String>) -> Self {
        self.tokens.insert(employee_id, token.into());
        self
    }
}

impl IdentityVerifier for StaticIdentityVerifier {
    fn verify(&self, employee_id: &UserId, token: &str) -> bool {
        self.tokens
            .get(employee_id)
            .map_or(false, |expected| expected.as_str() == token)
    }
}

// ── Notification ─────────────────────────────────────────────────────

/// What happened, handed to the notifier after commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub entity: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    /// Stable event name, e.g. `leave.approved`
    pub fn name(&self) -> String {
        format!(
            "{}.{}",
            self.entity.entity_type,
            self.to_state.to_ascii_lowercase()
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget hook. A failure is logged and never rolls back.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &TransitionEvent, entity: &Entity) -> Result<(), NotifyError>;
}

/// Emits each event as a log line
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &TransitionEvent, _entity: &Entity) -> Result<(), NotifyError> {
        tracing::info!(
            event = %event.name(),
            entity = %event.entity,
            actor = %event.actor_id,
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: RwLock<Vec<TransitionEvent>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records and then reports failure
    pub fn failing() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.read().clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.name()).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: &TransitionEvent, _entity: &Entity) -> Result<(), NotifyError> {
        self.events.write().push(event.clone());
        if self.fail {
            return Err(NotifyError("mail relay unavailable".into()));
        }
        Ok(())
    }
}
