//! Leave request state machine and its ledger effects
//!
//! ```text
//! PENDING -> APPROVED -> CANCELLED (owner, before start date)
//!    |
//!    +-----> REJECTED
//!    +-----> CANCELLED (owner)
//! ```
//!
//! Submission reserves the requested days. Approval turns the
//! reservation into consumption, rejection and withdrawal release it,
//! and cancelling an approved request restores the consumed days.

use crate::authority::{check_leave_eligibility, Authority};
use crate::ledger::{LeaveLedger, LedgerResult};
use crate::state_machine::StateMachine;
use crate::transition_table::{Transition, TransitionTable};
use chrono::{DateTime, Utc};
use hrflow_types::{
    inclusive_days, Actor, Capability, EntityType, GuardFailure, LeaveBalance, LeaveRequest,
    LeaveRequestId, LeaveStatus, LeaveTransitionRequest, NewLeaveRequest, UserId, WorkflowResult,
};
use serde::Serialize;

use LeaveStatus::*;

/// Precondition attached to a leave edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveGuard {
    Approval,
    RejectionReasonRequired,
    Withdrawal,
    /// Approved leave can only be cancelled before it starts
    CancelBeforeStart,
}

pub static LEAVE_TRANSITIONS: TransitionTable<LeaveStatus, LeaveGuard> = TransitionTable::new(&[
    Transition::new(
        Pending,
        Approved,
        Authority::Capability(Capability::DecideLeave),
        LeaveGuard::Approval,
    ),
    Transition::new(
        Pending,
        Rejected,
        Authority::Capability(Capability::DecideLeave),
        LeaveGuard::RejectionReasonRequired,
    ),
    Transition::new(Pending, Cancelled, Authority::Owner, LeaveGuard::Withdrawal),
    Transition::new(Approved, Cancelled, Authority::Owner, LeaveGuard::CancelBeforeStart),
]);

pub struct LeaveMachine {
    ledger: LeaveLedger,
}

impl LeaveMachine {
    pub fn new(ledger: LeaveLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &LeaveLedger {
        &self.ledger
    }

    /// Validate a new request and reserve its days.
    ///
    /// On success the reservation is already held; the caller must
    /// either store the returned request or release it.
    pub fn open_request(
        &self,
        actor: &Actor,
        request: &NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> WorkflowResult<LeaveRequest> {
        let number_of_days = inclusive_days(request.start_date, request.end_date).ok_or(
            GuardFailure::InvalidDateRange {
                start: request.start_date,
                end: request.end_date,
            },
        )?;
        check_leave_eligibility(actor, request.leave_type)?;

        let leave = LeaveRequest {
            id: LeaveRequestId::generate(),
            employee_id: actor.id.clone(),
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            number_of_days,
            status: Pending,
            reason: request
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            approver_id: None,
            rejection_reason: None,
            created_at: now,
            decided_at: None,
            cancelled_at: None,
            version: 1,
            updated_at: now,
        };

        self.ledger.reserve(&leave.balance_key(), number_of_days)?;
        Ok(leave)
    }

    /// Undo the reservation taken by [`open_request`](Self::open_request)
    /// for a request that was never stored.
    pub fn abandon_request(&self, leave: &LeaveRequest) -> LedgerResult<LeaveBalance> {
        self.ledger.release(&leave.balance_key(), leave.number_of_days)
    }
}

impl StateMachine for LeaveMachine {
    type Entity = LeaveRequest;
    type Status = LeaveStatus;
    type Guard = LeaveGuard;
    type Payload = LeaveTransitionRequest;

    const ENTITY_TYPE: EntityType = EntityType::Leave;

    fn table(&self) -> &'static TransitionTable<LeaveStatus, LeaveGuard> {
        &LEAVE_TRANSITIONS
    }

    fn status_of(entity: &LeaveRequest) -> LeaveStatus {
        entity.status
    }

    fn owner_of(entity: &LeaveRequest) -> &UserId {
        &entity.employee_id
    }

    fn check_guard(
        &self,
        leave: &LeaveRequest,
        edge: &Transition<LeaveStatus, LeaveGuard>,
        _actor: &Actor,
        request: &LeaveTransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<(), GuardFailure> {
        match edge.guard {
            LeaveGuard::RejectionReasonRequired => {
                let has_reason = request
                    .rejection_reason
                    .as_deref()
                    .map_or(false, |r| !r.trim().is_empty());
                if has_reason {
                    Ok(())
                } else {
                    Err(GuardFailure::MissingRejectionReason)
                }
            }
            LeaveGuard::CancelBeforeStart => {
                if leave.start_date > now.date_naive() {
                    Ok(())
                } else {
                    Err(GuardFailure::LeaveAlreadyStarted)
                }
            }
            LeaveGuard::Approval | LeaveGuard::Withdrawal => Ok(()),
        }
    }

    fn apply(
        &self,
        leave: &mut LeaveRequest,
        edge: &Transition<LeaveStatus, LeaveGuard>,
        actor: &Actor,
        request: &LeaveTransitionRequest,
        now: DateTime<Utc>,
    ) -> Option<String> {
        leave.status = edge.to;
        match edge.guard {
            LeaveGuard::Approval => {
                leave.approver_id = Some(actor.id.clone());
                leave.decided_at = Some(now);
                None
            }
            LeaveGuard::RejectionReasonRequired => {
                let reason = request
                    .rejection_reason
                    .as_deref()
                    .map(|r| r.trim().to_string());
                leave.approver_id = Some(actor.id.clone());
                leave.decided_at = Some(now);
                leave.rejection_reason = reason.clone();
                reason
            }
            LeaveGuard::Withdrawal | LeaveGuard::CancelBeforeStart => {
                leave.cancelled_at = Some(now);
                None
            }
        }
    }

    fn commit_effects(&self, before: &LeaveRequest, after: &LeaveRequest) -> WorkflowResult<()> {
        let key = before.balance_key();
        let days = before.number_of_days;
        match (before.status, after.status) {
            (Pending, Approved) => self.ledger.consume(&key, days)?,
            (Pending, Rejected) | (Pending, Cancelled) => self.ledger.release(&key, days)?,
            (Approved, Cancelled) => self.ledger.restore(&key, days)?,
            _ => return Ok(()),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use hrflow_types::{BalanceKey, Gender, LeaveType, WorkflowError};
    use std::collections::BTreeMap;

    fn machine() -> LeaveMachine {
        let policy = BTreeMap::from([(LeaveType::Annual, 20), (LeaveType::Maternity, 90)]);
        LeaveMachine::new(LeaveLedger::new(policy))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn annual_key() -> BalanceKey {
        BalanceKey::new(UserId::new("emp-1"), LeaveType::Annual, 2025)
    }

    #[test]
    fn test_open_request_reserves_days() {
        let m = machine();
        let req = NewLeaveRequest::new(LeaveType::Annual, date(2025, 6, 2), date(2025, 6, 6));
        let leave = m.open_request(&Actor::employee("emp-1"), &req, now()).unwrap();

        assert_eq!(leave.number_of_days, 5);
        assert_eq!(leave.status, Pending);
        assert_eq!(m.ledger().balance(&annual_key()).reserved, 5);
        assert_eq!(m.ledger().available(&annual_key()), 15);
    }

    #[test]
    fn test_open_request_rejects_reversed_dates() {
        let m = machine();
        let req = NewLeaveRequest::new(LeaveType::Annual, date(2025, 6, 6), date(2025, 6, 2));
        let err = m.open_request(&Actor::employee("emp-1"), &req, now()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::GuardFailed(GuardFailure::InvalidDateRange { .. })
        ));
        assert_eq!(m.ledger().balance(&annual_key()).reserved, 0);
    }

    #[test]
    fn test_open_request_checks_eligibility() {
        let m = machine();
        let req = NewLeaveRequest::new(LeaveType::Maternity, date(2025, 6, 2), date(2025, 6, 6));

        let err = m
            .open_request(&Actor::employee("emp-1").with_gender(Gender::Male), &req, now())
            .unwrap_err();
        assert_eq!(
            err.guard_failure(),
            Some(&GuardFailure::IneligibleLeaveType(LeaveType::Maternity))
        );

        let ok = m.open_request(&Actor::employee("emp-2").with_gender(Gender::Female), &req, now());
        assert!(ok.is_ok());
    }

    #[test]
    fn test_insufficient_balance() {
        let m = machine();
        let req = NewLeaveRequest::new(LeaveType::Annual, date(2025, 6, 1), date(2025, 6, 21));
        let err = m.open_request(&Actor::employee("emp-1"), &req, now()).unwrap_err();
        assert_eq!(
            err.guard_failure(),
            Some(&GuardFailure::InsufficientBalance {
                leave_type: LeaveType::Annual,
                requested: 21,
                available: 20,
            })
        );
    }

    #[test]
    fn test_commit_effects_follow_edges() {
        let m = machine();
        let req = NewLeaveRequest::new(LeaveType::Annual, date(2025, 6, 2), date(2025, 6, 6));
        let pending = m.open_request(&Actor::employee("emp-1"), &req, now()).unwrap();

        let mut approved = pending.clone();
        approved.status = Approved;
        m.commit_effects(&pending, &approved).unwrap();
        let row = m.ledger().balance(&annual_key());
        assert_eq!((row.reserved, row.consumed), (0, 5));

        let mut cancelled = approved.clone();
        cancelled.status = Cancelled;
        m.commit_effects(&approved, &cancelled).unwrap();
        let row = m.ledger().balance(&annual_key());
        assert_eq!((row.reserved, row.consumed), (0, 0));
        assert_eq!(m.ledger().available(&annual_key()), 20);
    }

    #[test]
    fn test_cancel_before_start_guard() {
        let m = machine();
        let mut leave = m
            .open_request(
                &Actor::employee("emp-1"),
                &NewLeaveRequest::new(LeaveType::Annual, date(2025, 3, 1), date(2025, 3, 3)),
                now(),
            )
            .unwrap();
        leave.status = Approved;
        let edge = LEAVE_TRANSITIONS.find(Approved, Cancelled).unwrap();
        let req = LeaveTransitionRequest::to(Cancelled);

        assert_eq!(
            m.check_guard(&leave, edge, &Actor::employee("emp-1"), &req, now()),
            Err(GuardFailure::LeaveAlreadyStarted)
        );

        leave.start_date = date(2025, 3, 2);
        assert!(m
            .check_guard(&leave, edge, &Actor::employee("emp-1"), &req, now())
            .is_ok());
    }

    #[test]
    fn test_rejection_requires_reason() {
        let m = machine();
        let leave = m
            .open_request(
                &Actor::employee("emp-1"),
                &NewLeaveRequest::new(LeaveType::Annual, date(2025, 6, 2), date(2025, 6, 3)),
                now(),
            )
            .unwrap();
        let edge = LEAVE_TRANSITIONS.find(Pending, Rejected).unwrap();
        let req = LeaveTransitionRequest::to(Rejected).with_rejection_reason("  ");
        assert_eq!(
            m.check_guard(&leave, edge, &Actor::hr("hr-1"), &req, now()),
            Err(GuardFailure::MissingRejectionReason)
        );
    }
}
