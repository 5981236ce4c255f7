//! Helpdesk ticket state machine
//!
//! ```text
//! OPEN -> IN_PROGRESS -> RESOLVED -> CLOSED
//!   |          ^  |          |
//!   |          |  |          |
//!   |          +--|----------+ (reopen)
//!   v             v
//! CANCELLED <-----+
//! ```
//!
//! Assignment, comments and ratings change a ticket without changing
//! its status; they are validated here and committed by the
//! orchestrator like any other change.

use crate::authority::{require, Authority};
use crate::state_machine::StateMachine;
use crate::transition_table::{Transition, TransitionTable};
use chrono::{DateTime, Utc};
use hrflow_types::{
    Actor, Capability, CommentRequest, EntityRef, EntityType, GuardFailure, NewTicket,
    RatingRequest, Ticket, TicketComment, TicketId, TicketStatus, TicketTransitionRequest, UserId,
    WorkflowError, WorkflowResult, WorkflowStatus,
};
use serde::Serialize;

use TicketStatus::*;

/// Precondition attached to a ticket edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketGuard {
    /// Picking the ticket up assigns it to the acting staff member if unassigned
    StartWork,
    /// Requires an assignee
    Resolve,
    /// Requires a non-empty resolution
    Close,
    Reopen,
    Cancel,
}

pub static TICKET_TRANSITIONS: TransitionTable<TicketStatus, TicketGuard> = TransitionTable::new(&[
    Transition::new(
        Open,
        InProgress,
        Authority::Capability(Capability::ManageTickets),
        TicketGuard::StartWork,
    ),
    Transition::new(
        Open,
        Cancelled,
        Authority::OwnerOr(Capability::ManageTickets),
        TicketGuard::Cancel,
    ),
    Transition::new(
        InProgress,
        Resolved,
        Authority::Capability(Capability::ManageTickets),
        TicketGuard::Resolve,
    ),
    Transition::new(
        InProgress,
        Cancelled,
        Authority::OwnerOr(Capability::ManageTickets),
        TicketGuard::Cancel,
    ),
    Transition::new(
        Resolved,
        Closed,
        Authority::Capability(Capability::ManageTickets),
        TicketGuard::Close,
    ),
    Transition::new(
        Resolved,
        InProgress,
        Authority::Capability(Capability::ManageTickets),
        TicketGuard::Reopen,
    ),
]);

pub struct TicketMachine {
    max_rating: u8,
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn ensure_open(ticket: &Ticket) -> WorkflowResult<()> {
    if ticket.status.is_terminal() {
        return Err(GuardFailure::EntityClosed(EntityRef::ticket(ticket.id.0.clone())).into());
    }
    Ok(())
}

impl TicketMachine {
    pub fn new(max_rating: u8) -> Self {
        Self { max_rating }
    }

    pub fn max_rating(&self) -> u8 {
        self.max_rating
    }

    /// Build a new OPEN ticket. Staff may file on behalf of an employee.
    pub fn open_ticket(
        &self,
        actor: &Actor,
        request: &NewTicket,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Ticket> {
        let employee_id = request
            .employee_id
            .clone()
            .unwrap_or_else(|| actor.id.clone());
        if !actor.owns(&employee_id) {
            require(actor, Capability::ManageTickets)?;
        }
        let subject = non_blank(Some(request.subject.as_str()))
            .ok_or(GuardFailure::MissingField { field: "subject" })?;
        let description = non_blank(Some(request.description.as_str()))
            .ok_or(GuardFailure::MissingField { field: "description" })?;

        Ok(Ticket {
            id: TicketId::generate(),
            employee_id,
            category: request.category,
            priority: request.priority,
            subject,
            description,
            status: Open,
            assigned_to: None,
            resolution: None,
            rating: None,
            feedback: None,
            comments: Vec::new(),
            created_by: actor.id.clone(),
            created_at: now,
            resolved_at: None,
            closed_at: None,
            version: 1,
            updated_at: now,
        })
    }

    /// Hand the ticket to a staff member
    pub fn assign(&self, ticket: &Ticket, actor: &Actor, assignee: &UserId) -> WorkflowResult<Ticket> {
        require(actor, Capability::ManageTickets)?;
        ensure_open(ticket)?;
        let mut next = ticket.clone();
        next.assigned_to = Some(assignee.clone());
        Ok(next)
    }

    /// Append to the comment thread
    pub fn comment(
        &self,
        ticket: &Ticket,
        actor: &Actor,
        request: &CommentRequest,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Ticket> {
        Authority::OwnerOr(Capability::ManageTickets).authorize(actor, &ticket.employee_id)?;
        if request.is_internal {
            require(actor, Capability::PostInternalComment)?;
        }
        ensure_open(ticket)?;
        let text = non_blank(Some(request.text.as_str())).ok_or(GuardFailure::EmptyComment)?;

        let mut next = ticket.clone();
        next.comments.push(TicketComment {
            author_id: actor.id.clone(),
            text,
            is_internal: request.is_internal,
            created_at: now,
        });
        Ok(next)
    }

    /// Record the owner's satisfaction rating. A ticket is rated at most once.
    pub fn rate(&self, ticket: &Ticket, actor: &Actor, request: &RatingRequest) -> WorkflowResult<Ticket> {
        if !actor.owns(&ticket.employee_id) {
            return Err(WorkflowError::forbidden("only the ticket owner may rate it"));
        }
        if ticket.is_rated() {
            return Err(GuardFailure::AlreadyRated.into());
        }
        if ticket.status != Resolved {
            return Err(GuardFailure::TicketNotResolved.into());
        }
        if !(1..=self.max_rating).contains(&request.rating) {
            return Err(GuardFailure::RatingOutOfRange {
                max: self.max_rating,
            }
            .into());
        }

        let mut next = ticket.clone();
        next.rating = Some(request.rating);
        next.feedback = non_blank(request.feedback.as_deref());
        Ok(next)
    }
}

impl StateMachine for TicketMachine {
    type Entity = Ticket;
    type Status = TicketStatus;
    type Guard = TicketGuard;
    type Payload = TicketTransitionRequest;

    const ENTITY_TYPE: EntityType = EntityType::Ticket;

    fn table(&self) -> &'static TransitionTable<TicketStatus, TicketGuard> {
        &TICKET_TRANSITIONS
    }

    fn status_of(entity: &Ticket) -> TicketStatus {
        entity.status
    }

    fn owner_of(entity: &Ticket) -> &UserId {
        &entity.employee_id
    }

    fn check_guard(
        &self,
        ticket: &Ticket,
        edge: &Transition<TicketStatus, TicketGuard>,
        _actor: &Actor,
        request: &TicketTransitionRequest,
        _now: DateTime<Utc>,
    ) -> Result<(), GuardFailure> {
        match edge.guard {
            TicketGuard::Resolve if ticket.assigned_to.is_none() => Err(GuardFailure::TicketUnassigned),
            TicketGuard::Close => {
                if ticket.has_resolution() || non_blank(request.resolution.as_deref()).is_some() {
                    Ok(())
                } else {
                    Err(GuardFailure::MissingResolution)
                }
            }
            _ => Ok(()),
        }
    }

    fn apply(
        &self,
        ticket: &mut Ticket,
        edge: &Transition<TicketStatus, TicketGuard>,
        actor: &Actor,
        request: &TicketTransitionRequest,
        now: DateTime<Utc>,
    ) -> Option<String> {
        ticket.status = edge.to;
        let resolution = non_blank(request.resolution.as_deref());
        match edge.guard {
            TicketGuard::StartWork => {
                if ticket.assigned_to.is_none() {
                    ticket.assigned_to = Some(actor.id.clone());
                }
                None
            }
            TicketGuard::Resolve => {
                if resolution.is_some() {
                    ticket.resolution = resolution.clone();
                }
                ticket.resolved_at = Some(now);
                resolution
            }
            TicketGuard::Close => {
                if resolution.is_some() {
                    ticket.resolution = resolution.clone();
                }
                ticket.closed_at = Some(now);
                resolution
            }
            TicketGuard::Reopen => {
                ticket.resolved_at = None;
                None
            }
            TicketGuard::Cancel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrflow_types::{TicketCategory, TicketPriority};

    fn machine() -> TicketMachine {
        TicketMachine::new(5)
    }

    fn new_ticket() -> NewTicket {
        NewTicket::new(TicketCategory::Payroll, "Missing overtime", "March overtime not paid")
    }

    fn ticket(status: TicketStatus) -> Ticket {
        let mut t = machine()
            .open_ticket(&Actor::employee("emp-1"), &new_ticket(), Utc::now())
            .unwrap();
        t.status = status;
        t
    }

    #[test]
    fn test_open_ticket_defaults() {
        let t = ticket(Open);
        assert_eq!(t.employee_id, UserId::new("emp-1"));
        assert_eq!(t.priority, TicketPriority::Medium);
        assert_eq!(t.version, 1);
        assert!(t.assigned_to.is_none());
    }

    #[test]
    fn test_open_on_behalf_requires_staff() {
        let m = machine();
        let req = new_ticket().on_behalf_of(UserId::new("emp-2"));
        let err = m.open_ticket(&Actor::employee("emp-1"), &req, Utc::now()).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let t = m.open_ticket(&Actor::hr("hr-1"), &req, Utc::now()).unwrap();
        assert_eq!(t.employee_id, UserId::new("emp-2"));
        assert_eq!(t.created_by, UserId::new("hr-1"));
    }

    #[test]
    fn test_open_requires_subject() {
        let req = NewTicket::new(TicketCategory::Other, "  ", "body");
        let err = machine()
            .open_ticket(&Actor::employee("emp-1"), &req, Utc::now())
            .unwrap_err();
        assert_eq!(
            err.guard_failure(),
            Some(&GuardFailure::MissingField { field: "subject" })
        );
    }

    #[test]
    fn test_resolve_requires_assignee() {
        let m = machine();
        let t = ticket(InProgress);
        let edge = TICKET_TRANSITIONS.find(InProgress, Resolved).unwrap();
        let req = TicketTransitionRequest::to(Resolved);
        assert_eq!(
            m.check_guard(&t, edge, &Actor::hr("hr-1"), &req, Utc::now()),
            Err(GuardFailure::TicketUnassigned)
        );
    }

    #[test]
    fn test_close_requires_resolution() {
        let m = machine();
        let mut t = ticket(Resolved);
        let edge = TICKET_TRANSITIONS.find(Resolved, Closed).unwrap();
        let hr = Actor::hr("hr-1");

        let bare = TicketTransitionRequest::to(Closed);
        assert_eq!(
            m.check_guard(&t, edge, &hr, &bare, Utc::now()),
            Err(GuardFailure::MissingResolution)
        );

        let with = TicketTransitionRequest::to(Closed).with_resolution("Paid in April run");
        assert!(m.check_guard(&t, edge, &hr, &with, Utc::now()).is_ok());

        t.resolution = Some("Paid".into());
        assert!(m.check_guard(&t, edge, &hr, &bare, Utc::now()).is_ok());
    }

    #[test]
    fn test_start_work_auto_assigns() {
        let m = machine();
        let mut t = ticket(Open);
        let edge = TICKET_TRANSITIONS.find(Open, InProgress).unwrap();
        m.apply(&mut t, edge, &Actor::hr("hr-1"), &TicketTransitionRequest::to(InProgress), Utc::now());
        assert_eq!(t.status, InProgress);
        assert_eq!(t.assigned_to, Some(UserId::new("hr-1")));
    }

    #[test]
    fn test_internal_comment_needs_staff() {
        let m = machine();
        let t = ticket(Open);
        let emp = Actor::employee("emp-1");

        let err = m
            .comment(&t, &emp, &CommentRequest::internal("note"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let next = m
            .comment(&t, &Actor::hr("hr-1"), &CommentRequest::internal("check payroll batch"), Utc::now())
            .unwrap();
        assert!(next.comments[0].is_internal);
        assert_eq!(next.employee_view().comments.len(), 0);
    }

    #[test]
    fn test_comment_on_closed_ticket() {
        let t = ticket(Closed);
        let err = machine()
            .comment(&t, &Actor::employee("emp-1"), &CommentRequest::public("hello?"), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err.guard_failure(),
            Some(GuardFailure::EntityClosed(_))
        ));
    }

    #[test]
    fn test_rating_rules() {
        let m = machine();
        let emp = Actor::employee("emp-1");

        let open = ticket(InProgress);
        assert_eq!(
            m.rate(&open, &emp, &RatingRequest::new(4)).unwrap_err().guard_failure(),
            Some(&GuardFailure::TicketNotResolved)
        );

        let resolved = ticket(Resolved);
        assert!(matches!(
            m.rate(&resolved, &Actor::employee("emp-2"), &RatingRequest::new(4)),
            Err(WorkflowError::Forbidden(_))
        ));
        assert_eq!(
            m.rate(&resolved, &emp, &RatingRequest::new(6)).unwrap_err().guard_failure(),
            Some(&GuardFailure::RatingOutOfRange { max: 5 })
        );

        let rated = m
            .rate(&resolved, &emp, &RatingRequest::new(4).with_feedback("quick"))
            .unwrap();
        assert_eq!(rated.rating, Some(4));
        assert_eq!(
            m.rate(&rated, &emp, &RatingRequest::new(5)).unwrap_err().guard_failure(),
            Some(&GuardFailure::AlreadyRated)
        );
    }
}
