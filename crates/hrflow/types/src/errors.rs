//! Error types for workflow operations
//!
//! Every failure is returned, never panicked, and leaves entity and
//! ledger state exactly as it was before the call.

use crate::{BalanceKey, EntityRef, EntityType, LeaveType, UserId};
use serde::{Deserialize, Serialize};

/// Errors that can occur in workflow operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid transition for {entity_type}: {from} -> {to}")]
    InvalidTransition {
        entity_type: EntityType,
        from: String,
        to: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Guard failed: {0}")]
    GuardFailed(#[from] GuardFailure),

    #[error("Stale state for {entity}: expected version {expected}, found {actual}")]
    StaleState {
        entity: EntityRef,
        expected: u64,
        actual: u64,
    },

    #[error("Not found: {0}")]
    NotFound(EntityRef),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WorkflowError::Forbidden(_) => ErrorKind::Forbidden,
            WorkflowError::GuardFailed(_) => ErrorKind::GuardFailed,
            WorkflowError::StaleState { .. } => ErrorKind::StaleState,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        WorkflowError::Forbidden(reason.into())
    }

    /// The business precondition that failed, if this is a guard failure
    pub fn guard_failure(&self) -> Option<&GuardFailure> {
        match self {
            WorkflowError::GuardFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Flat error classification exposed to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTransition,
    Forbidden,
    GuardFailed,
    StaleState,
    NotFound,
}

impl ErrorKind {
    /// `Forbidden` and `NotFound` will fail the same way on retry
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Forbidden | ErrorKind::NotFound)
    }

    /// Only a concurrency conflict is resolved by re-reading the entity
    pub fn reload_and_resubmit(self) -> bool {
        matches!(self, ErrorKind::StaleState)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::GuardFailed => "guard_failed",
            ErrorKind::StaleState => "stale_state",
            ErrorKind::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// A business precondition that was not met
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardFailure {
    #[error("identity verification has not succeeded")]
    IdentityNotVerified,

    #[error("required documents missing: {}", .0.join(", "))]
    MissingDocuments(Vec<String>),

    #[error("a review comment is required to reject")]
    MissingReviewComment,

    #[error("credential must be at least {min_length} characters")]
    CredentialTooShort { min_length: usize },

    #[error("employee {0} has already been invited")]
    AlreadyInvited(String),

    #[error("end date {end} is before start date {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("insufficient {leave_type} balance: requested {requested} day(s), {available} available")]
    InsufficientBalance {
        leave_type: LeaveType,
        requested: u32,
        available: u32,
    },

    #[error("{0} leave is not available to this employee")]
    IneligibleLeaveType(LeaveType),

    #[error("a rejection reason is required")]
    MissingRejectionReason,

    #[error("leave that has started can no longer be cancelled")]
    LeaveAlreadyStarted,

    #[error("entitlement {requested} for {key} is below current usage {used}")]
    EntitlementBelowUsage {
        key: BalanceKey,
        requested: u32,
        used: u32,
    },

    #[error("ledger for {key} cannot {operation} {days} day(s)")]
    LedgerUnderflow {
        key: BalanceKey,
        operation: &'static str,
        days: u32,
    },

    #[error("a ticket must be assigned before it is resolved")]
    TicketUnassigned,

    #[error("a resolution is required to close a ticket")]
    MissingResolution,

    #[error("a ticket can only be rated once it is resolved")]
    TicketNotResolved,

    #[error("ticket has already been rated")]
    AlreadyRated,

    #[error("rating must be between 1 and {max}")]
    RatingOutOfRange { max: u8 },

    #[error("comment text must not be empty")]
    EmptyComment,

    #[error("{0} is closed to further changes")]
    EntityClosed(EntityRef),

    #[error("{field} must not be empty")]
    MissingField { field: &'static str },

    #[error("employee {0} has been deleted")]
    EmployeeDeleted(UserId),
}

/// Structured error body returned to callers: `{ kind, message }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&WorkflowError> for ErrorBody {
    fn from(err: &WorkflowError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<WorkflowError> for ErrorBody {
    fn from(err: WorkflowError) -> Self {
        ErrorBody::from(&err)
    }
}
