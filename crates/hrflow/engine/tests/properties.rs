//! Property tests: edges outside the tables never move an entity, and the
//! ledger never lets `reserved + consumed` exceed `entitlement`.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use hrflow_engine::*;
use hrflow_types::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine() -> WorkflowOrchestrator {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap());
    WorkflowOrchestrator::builder(EngineConfig::default())
        .with_clock(Arc::new(clock))
        .with_notifier(Arc::new(MemoryNotifier::new()))
        .build()
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn owner() -> Actor {
    Actor::employee("emp-1")
}

fn staff() -> Actor {
    Actor::admin("admin-1")
}

fn onboarding_in(engine: &WorkflowOrchestrator, status: OnboardingStatus) -> OnboardingRecord {
    use OnboardingStatus::*;
    let emp = owner();
    let step = |to: OnboardingStatus, actor: &Actor, request: OnboardingTransitionRequest| {
        let record = engine.transition_onboarding(&emp.id, actor, &request).unwrap();
        assert_eq!(record.status, to);
        record
    };
    let documents = SubmittedDocuments::default()
        .with_government_id(DocumentRef::new("id-1"))
        .with_address(Address::new(AddressKind::Permanent, "1 Quay", "Cork", "T12", "IE"))
        .with_employment(EmploymentDetails {
            job_title: "Clerk".into(),
            department: "Ops".into(),
            start_date: date(2025, 2, 1),
            manager_id: None,
        });

    let mut record = engine.invite_employee(&staff(), &emp.id).unwrap();
    if status == Invited {
        return record;
    }
    record = step(Pending, &emp, OnboardingTransitionRequest::to(Pending).with_verification_token("ok"));
    if status == Pending {
        return record;
    }
    record = step(Submitted, &emp, OnboardingTransitionRequest::to(Submitted).with_documents(documents));
    match status {
        Submitted => record,
        Rejected => step(Rejected, &staff(), OnboardingTransitionRequest::to(Rejected).with_comments("redo")),
        Approved => step(Approved, &staff(), OnboardingTransitionRequest::to(Approved)),
        Completed => {
            step(Approved, &staff(), OnboardingTransitionRequest::to(Approved));
            step(
                Completed,
                &emp,
                OnboardingTransitionRequest::to(Completed).with_credential("long-enough-secret"),
            )
        }
        Invited | Pending => unreachable!(),
    }
}

fn leave_in(engine: &WorkflowOrchestrator, status: LeaveStatus) -> LeaveRequest {
    let emp = owner();
    let leave = engine
        .submit_leave(
            &emp,
            &NewLeaveRequest::new(LeaveType::Annual, date(2025, 9, 1), date(2025, 9, 3)),
        )
        .unwrap();
    let step = |to: LeaveStatus, actor: &Actor, request: LeaveTransitionRequest| {
        engine.transition_leave(&leave.id, actor, &request).map(|l| {
            assert_eq!(l.status, to);
            l
        })
    };
    match status {
        LeaveStatus::Pending => leave,
        LeaveStatus::Approved => step(LeaveStatus::Approved, &staff(), LeaveTransitionRequest::to(LeaveStatus::Approved)).unwrap(),
        LeaveStatus::Rejected => step(
            LeaveStatus::Rejected,
            &staff(),
            LeaveTransitionRequest::to(LeaveStatus::Rejected).with_rejection_reason("cover"),
        )
        .unwrap(),
        LeaveStatus::Cancelled => step(LeaveStatus::Cancelled, &emp, LeaveTransitionRequest::to(LeaveStatus::Cancelled)).unwrap(),
    }
}

fn ticket_in(engine: &WorkflowOrchestrator, status: TicketStatus) -> Ticket {
    use TicketStatus::*;
    let ticket = engine
        .open_ticket(&owner(), &NewTicket::new(TicketCategory::Leave, "Carry over", "Can I carry days?"))
        .unwrap();
    let step = |to: TicketStatus| {
        let request = TicketTransitionRequest::to(to).with_resolution("answered");
        engine.transition_ticket(&ticket.id, &staff(), &request).unwrap()
    };
    match status {
        Open => ticket,
        Cancelled => step(Cancelled),
        InProgress => step(InProgress),
        Resolved => {
            step(InProgress);
            step(Resolved)
        }
        Closed => {
            step(InProgress);
            step(Resolved);
            step(Closed)
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum LedgerOp {
    Reserve(u32),
    Release(u32),
    Consume(u32),
    Restore(u32),
    SetEntitlement(u32),
}

fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        3 => (1u32..8).prop_map(LedgerOp::Reserve),
        1 => (1u32..8).prop_map(LedgerOp::Release),
        2 => (1u32..8).prop_map(LedgerOp::Consume),
        1 => (1u32..8).prop_map(LedgerOp::Restore),
        1 => (0u32..25).prop_map(LedgerOp::SetEntitlement),
    ]
}

#[derive(Clone, Copy, Debug)]
enum LeaveOp {
    /// Submit a request starting `offset` days after 2025-02-01, lasting `days`
    Submit { offset: i64, days: i64 },
    Approve(usize),
    Reject(usize),
    Cancel(usize),
}

fn arb_leave_op() -> impl Strategy<Value = LeaveOp> {
    prop_oneof![
        3 => (0i64..200, 1i64..9).prop_map(|(offset, days)| LeaveOp::Submit { offset, days }),
        2 => (0usize..16).prop_map(LeaveOp::Approve),
        1 => (0usize..16).prop_map(LeaveOp::Reject),
        1 => (0usize..16).prop_map(LeaveOp::Cancel),
    ]
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Edges missing from the onboarding table fail and change nothing.
    #[test]
    fn onboarding_absent_edges_rejected(
        (from, to) in prop::sample::select(ONBOARDING_TRANSITIONS.absent_pairs())
    ) {
        let engine = engine();
        let before = onboarding_in(&engine, from);
        let audit_len = engine.audit_log().len();

        for actor in [owner(), staff()] {
            let err = engine
                .transition_onboarding(&before.employee_id, &actor, &OnboardingTransitionRequest::to(to))
                .unwrap_err();
            let is_invalid = matches!(err, WorkflowError::InvalidTransition { .. });
            prop_assert!(is_invalid);
        }
        prop_assert_eq!(engine.onboarding_record(&before.employee_id).unwrap(), before);
        prop_assert_eq!(engine.audit_log().len(), audit_len);
    }

    /// Edges missing from the leave table fail and leave entity and ledger untouched.
    #[test]
    fn leave_absent_edges_rejected(
        (from, to) in prop::sample::select(LEAVE_TRANSITIONS.absent_pairs())
    ) {
        let engine = engine();
        let before = leave_in(&engine, from);
        let balance = engine.leave_balance(&before.employee_id, LeaveType::Annual, 2025);

        for actor in [owner(), staff()] {
            let request = LeaveTransitionRequest::to(to).with_rejection_reason("any");
            let err = engine.transition_leave(&before.id, &actor, &request).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }
        prop_assert_eq!(engine.leave_request(&before.id).unwrap(), before.clone());
        prop_assert_eq!(
            engine.leave_balance(&before.employee_id, LeaveType::Annual, 2025),
            balance
        );
    }

    /// Edges missing from the ticket table fail and change nothing.
    #[test]
    fn ticket_absent_edges_rejected(
        (from, to) in prop::sample::select(TICKET_TRANSITIONS.absent_pairs())
    ) {
        let engine = engine();
        let before = ticket_in(&engine, from);

        for actor in [owner(), staff()] {
            let err = engine
                .transition_ticket(&before.id, &actor, &TicketTransitionRequest::to(to))
                .unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }
        prop_assert_eq!(engine.get_ticket(&before.id, &staff()).unwrap(), before);
    }

    /// Any sequence of ledger operations keeps the row within its entitlement,
    /// and a refused operation leaves the row exactly as it was.
    #[test]
    fn ledger_never_overdraws(ops in prop::collection::vec(arb_ledger_op(), 1..60)) {
        let ledger = LeaveLedger::new(BTreeMap::from([(LeaveType::Annual, 12)]));
        let key = BalanceKey::new(UserId::new("emp-1"), LeaveType::Annual, 2025);

        for op in ops {
            let before = ledger.balance(&key);
            let result = match op {
                LedgerOp::Reserve(d) => ledger.reserve(&key, d),
                LedgerOp::Release(d) => ledger.release(&key, d),
                LedgerOp::Consume(d) => ledger.consume(&key, d),
                LedgerOp::Restore(d) => ledger.restore(&key, d),
                LedgerOp::SetEntitlement(d) => ledger.set_entitlement(&key, d),
            };
            let after = ledger.balance(&key);
            prop_assert!(after.reserved + after.consumed <= after.entitlement, "{:?} broke {:?}", op, after);
            prop_assert_eq!(after.available(), after.entitlement - after.reserved - after.consumed);
            if result.is_err() {
                prop_assert_eq!(after, before);
            }
        }
    }

    /// Driving leave requests through the engine keeps the ledger equal to
    /// the sum of pending and approved requests.
    #[test]
    fn engine_ledger_matches_requests(ops in prop::collection::vec(arb_leave_op(), 1..40)) {
        let engine = engine();
        let emp = owner();
        let mut submitted: Vec<LeaveRequestId> = Vec::new();

        for op in ops {
            match op {
                LeaveOp::Submit { offset, days } => {
                    let start = date(2025, 2, 1) + Duration::days(offset);
                    let end = start + Duration::days(days - 1);
                    if let Ok(leave) = engine.submit_leave(&emp, &NewLeaveRequest::new(LeaveType::Annual, start, end)) {
                        submitted.push(leave.id);
                    }
                }
                _ if submitted.is_empty() => {}
                LeaveOp::Approve(i) => {
                    let id = &submitted[i % submitted.len()];
                    let _ = engine.transition_leave(id, &staff(), &LeaveTransitionRequest::to(LeaveStatus::Approved));
                }
                LeaveOp::Reject(i) => {
                    let id = &submitted[i % submitted.len()];
                    let request = LeaveTransitionRequest::to(LeaveStatus::Rejected).with_rejection_reason("busy");
                    let _ = engine.transition_leave(id, &staff(), &request);
                }
                LeaveOp::Cancel(i) => {
                    let id = &submitted[i % submitted.len()];
                    let _ = engine.transition_leave(id, &emp, &LeaveTransitionRequest::to(LeaveStatus::Cancelled));
                }
            }

            let requests = engine.leave_requests_for(&emp.id);
            let in_year = |s: LeaveStatus| -> u32 {
                requests
                    .iter()
                    .filter(|l| l.status == s && l.ledger_year() == 2025)
                    .map(|l| l.number_of_days)
                    .sum()
            };
            let balance = engine.leave_balance(&emp.id, LeaveType::Annual, 2025);
            prop_assert_eq!(balance.reserved, in_year(LeaveStatus::Pending));
            prop_assert_eq!(balance.consumed, in_year(LeaveStatus::Approved));
            prop_assert!(balance.reserved + balance.consumed <= balance.entitlement);
        }
    }
}
