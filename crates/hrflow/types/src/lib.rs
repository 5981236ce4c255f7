//! Domain types for the HR workflow engine
//!
//! Three long-lived entities move through small, named state machines
//! under the control of different actors:
//!
//! - **OnboardingRecord**: an employee's progress from invitation to
//!   active employment.
//! - **LeaveRequest**: a single request for time off, backed by a
//!   per-employee leave balance.
//! - **Ticket**: a support ticket from creation to closure, including
//!   assignment, comments and a one-time rating.
//!
//! Every committed change produces an immutable [`AuditEntry`].
//!
//! # Design Principles
//!
//! 1. The actor is always explicit. There is no ambient "current user".
//! 2. Status is never written directly; it moves only through a guarded
//!    transition.
//! 3. Every entity carries a version stamp for optimistic concurrency.

#![deny(unsafe_code)]

mod actor;
mod audit;
mod entity;
mod errors;
mod ids;
mod leave;
mod onboarding;
mod requests;
mod status;
mod ticket;

pub use actor::*;
pub use audit::*;
pub use entity::*;
pub use errors::*;
pub use ids::*;
pub use leave::*;
pub use onboarding::*;
pub use requests::*;
pub use status::*;
pub use ticket::*;
