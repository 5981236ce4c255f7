//! HR workflow engine
//!
//! Drives onboarding records, leave requests and support tickets through
//! their state machines. Every change is checked against the actor's
//! authority, the entity's current state and the edge's business guard,
//! then committed with optimistic concurrency together with its ledger
//! effect and audit entry.
//!
//! # Architecture
//!
//! The [`WorkflowOrchestrator`] composes:
//!
//! - [`TransitionTable`]: static per-machine edge lists
//! - [`OnboardingMachine`], [`LeaveMachine`], [`TicketMachine`]: the
//!   [`StateMachine`] implementations
//! - [`EntityStore`]: versioned compare-and-swap storage
//! - [`LeaveLedger`]: per `(employee, type, year)` balance rows
//! - [`AuditLog`]: append-only record of who did what and when
//!
//! # Example
//!
//! ```rust
//! use hrflow_engine::{EngineConfig, WorkflowOrchestrator};
//! use hrflow_types::*;
//! use chrono::NaiveDate;
//!
//! let engine = WorkflowOrchestrator::new(EngineConfig::default()).unwrap();
//! let employee = Actor::employee("emp-1");
//!
//! let leave = engine
//!     .submit_leave(
//!         &employee,
//!         &NewLeaveRequest::new(
//!             LeaveType::Annual,
//!             NaiveDate::from_ymd_opt(2030, 6, 3).unwrap(),
//!             NaiveDate::from_ymd_opt(2030, 6, 7).unwrap(),
//!         ),
//!     )
//!     .unwrap();
//! assert_eq!(leave.number_of_days, 5);
//!
//! let approved = engine
//!     .transition_leave(&leave.id, &Actor::hr("hr-1"), &LeaveTransitionRequest::to(LeaveStatus::Approved))
//!     .unwrap();
//! assert_eq!(approved.status, LeaveStatus::Approved);
//! assert_eq!(engine.leave_balance(&employee.id, LeaveType::Annual, 2030).available(), 15);
//! ```

#![deny(unsafe_code)]

pub mod audit_log;
pub mod authority;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod leave;
pub mod ledger;
pub mod onboarding;
pub mod orchestrator;
pub mod state_machine;
pub mod store;
pub mod ticket;
pub mod transition_table;

pub use audit_log::AuditLog;
pub use authority::{check_leave_eligibility, require, Authority};
pub use clock::{Clock, FixedClock, SystemClock};
pub use collaborators::{
    resolve_actor, ActorResolver, DocumentChecker, IdentityVerifier, LogNotifier, MemoryNotifier,
    NotifyError, Notifier, RequiredDocumentsChecker, StaticActorResolver, StaticIdentityVerifier,
    TransitionEvent, TrustedTokenVerifier,
};
pub use config::{
    ConfigError, EngineConfig, LeavePolicyConfig, LoggingConfig, OnboardingConfig, TicketConfig,
};
pub use leave::{LeaveGuard, LeaveMachine, LEAVE_TRANSITIONS};
pub use ledger::{LeaveLedger, LedgerError, LedgerResult};
pub use onboarding::{OnboardingGuard, OnboardingMachine, ONBOARDING_TRANSITIONS};
pub use orchestrator::{DeletionSummary, OrchestratorBuilder, WorkflowOrchestrator};
pub use state_machine::StateMachine;
pub use store::EntityStore;
pub use ticket::{TicketGuard, TicketMachine, TICKET_TRANSITIONS};
pub use transition_table::{Transition, TransitionTable};
