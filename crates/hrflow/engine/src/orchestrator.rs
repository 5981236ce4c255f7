//! Workflow Orchestrator: the single mutation path for every entity
//!
//! Every status change goes through one algorithm, parameterized by the
//! owning machine's transition table:
//! 1. Load the entity and remember its version
//! 2. Look up `(current, target)` in the table
//! 3. Check the edge's authority, then its guard
//! 4. Apply the change to a working copy
//! 5. Commit against the remembered version, running ledger effects and
//!    the audit append under the same entry lock
//! 6. Notify, after commit, without affecting the outcome
//!
//! Field mutations that keep the status (ticket assignment, comments,
//! ratings, draft onboarding documents) follow the same load/commit/audit
//! path without a table lookup.

use crate::authority::{require, Authority};
use crate::audit_log::AuditLog;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    DocumentChecker, IdentityVerifier, LogNotifier, Notifier, RequiredDocumentsChecker,
    TransitionEvent, TrustedTokenVerifier,
};
use crate::config::{ConfigError, EngineConfig};
use crate::leave::LeaveMachine;
use crate::ledger::LeaveLedger;
use crate::onboarding::OnboardingMachine;
use crate::state_machine::StateMachine;
use crate::store::EntityStore;
use crate::ticket::TicketMachine;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use hrflow_types::*;
use serde::Serialize;
use std::sync::Arc;

/// What `delete_employee` removed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub employee_id: UserId,
    /// Whether an onboarding record existed
    pub onboarding_record: bool,
    /// Leave requests removed, in any status
    pub leave_requests: usize,
    /// Tickets removed, in any status
    pub tickets: usize,
    /// Ledger rows removed across all leave types and years
    pub balances: usize,
}

/// Assembles an orchestrator with its collaborators
pub struct OrchestratorBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    identity: Arc<dyn IdentityVerifier>,
    documents: Arc<dyn DocumentChecker>,
}

impl OrchestratorBuilder {
    /// Time source for timestamps and date guards
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receives an event after every committed change
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Confirms verification tokens on `INVITED -> PENDING`
    pub fn with_identity_verifier(mut self, identity: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = identity;
        self
    }

    /// Decides whether submitted onboarding documents are complete
    pub fn with_document_checker(mut self, documents: Arc<dyn DocumentChecker>) -> Self {
        self.documents = documents;
        self
    }

    /// Validate the configuration and assemble the engine
    pub fn build(self) -> Result<WorkflowOrchestrator, ConfigError> {
        self.config.validate()?;
        let policy = self.config.leave.entitlements()?;

        Ok(WorkflowOrchestrator {
            onboarding: OnboardingMachine::new(
                self.documents,
                self.identity,
                self.config.onboarding.min_credential_length,
            ),
            leave: LeaveMachine::new(LeaveLedger::new(policy)),
            tickets: TicketMachine::new(self.config.tickets.max_rating),
            onboarding_records: EntityStore::new(EntityType::Onboarding),
            leave_requests: EntityStore::new(EntityType::Leave),
            ticket_store: EntityStore::new(EntityType::Ticket),
            audit: AuditLog::new(),
            deleted_employees: DashSet::new(),
            notifier: self.notifier,
            clock: self.clock,
            config: self.config,
        })
    }
}

/// The workflow engine. `Send + Sync`; share it behind an `Arc`.
pub struct WorkflowOrchestrator {
    config: EngineConfig,
    onboarding: OnboardingMachine,
    leave: LeaveMachine,
    tickets: TicketMachine,
    onboarding_records: EntityStore<OnboardingRecord>,
    leave_requests: EntityStore<LeaveRequest>,
    ticket_store: EntityStore<Ticket>,
    audit: AuditLog,
    /// Employees removed by `delete_employee`; nothing new may be created
    /// for them
    deleted_employees: DashSet<UserId>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

fn rejected(entity: &EntityRef, to: &str, actor: &Actor, err: WorkflowError) -> WorkflowError {
    tracing::debug!(
        entity = %entity,
        to = to,
        actor = %actor.id,
        kind = %err.kind(),
        error = %err,
        "Change rejected"
    );
    err
}

fn check_expected_version(
    entity: &EntityRef,
    expected: Option<u64>,
    actual: u64,
) -> WorkflowResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(WorkflowError::StaleState {
            entity: entity.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

impl WorkflowOrchestrator {
    /// Start from the default collaborators: system clock, log notifier,
    /// trusting identity verifier, required-documents checker
    pub fn builder(config: EngineConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            identity: Arc::new(TrustedTokenVerifier),
            documents: Arc::new(RequiredDocumentsChecker),
        }
    }

    /// An orchestrator with the default collaborators
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// The validated configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Onboarding ───────────────────────────────────────────────────

    /// Create the onboarding record for a new hire
    pub fn invite_employee(
        &self,
        actor: &Actor,
        employee_id: &UserId,
    ) -> WorkflowResult<OnboardingRecord> {
        let entity = EntityRef::onboarding(employee_id.as_str());
        let to = OnboardingStatus::Invited.as_str();
        self.check_invite(actor, employee_id)
            .map_err(|err| rejected(&entity, to, actor, err))?;
        let now = self.clock.now();
        let record = OnboardingRecord::invited(employee_id.clone(), actor.id.clone(), now);
        self.insert_created(&self.onboarding_records, record, employee_id, to, actor, now)
    }

    fn check_invite(&self, actor: &Actor, employee_id: &UserId) -> WorkflowResult<()> {
        require(actor, Capability::InviteEmployee)?;
        if self.onboarding_records.contains(employee_id.as_str()) {
            return Err(GuardFailure::AlreadyInvited(employee_id.0.clone()).into());
        }
        Ok(())
    }

    /// Save draft documents without submitting them
    pub fn save_onboarding_documents(
        &self,
        actor: &Actor,
        employee_id: &UserId,
        documents: SubmittedDocuments,
        expected_version: Option<u64>,
    ) -> WorkflowResult<OnboardingRecord> {
        self.apply_mutation(
            &self.onboarding_records,
            employee_id.as_str(),
            actor,
            expected_version,
            |r| r.status.as_str(),
            |record, _now| {
                Authority::Owner.authorize(actor, &record.employee_id)?;
                if !OnboardingMachine::accepts_document_edits(record.status) {
                    return Err(
                        GuardFailure::EntityClosed(EntityRef::onboarding(record.employee_id.as_str()))
                            .into(),
                    );
                }
                let mut next = record.clone();
                next.submitted_documents = documents;
                Ok((next, Some("documents saved".to_string())))
            },
        )
    }

    /// Move an onboarding record along one edge of its table
    pub fn transition_onboarding(
        &self,
        employee_id: &UserId,
        actor: &Actor,
        request: &OnboardingTransitionRequest,
    ) -> WorkflowResult<OnboardingRecord> {
        self.apply_transition(
            &self.onboarding,
            &self.onboarding_records,
            employee_id.as_str(),
            request.to,
            actor,
            request,
            request.expected_version,
        )
    }

    /// Current onboarding record of an employee
    pub fn onboarding_record(&self, employee_id: &UserId) -> WorkflowResult<OnboardingRecord> {
        self.onboarding_records.get(employee_id.as_str())
    }

    // ── Leave ────────────────────────────────────────────────────────

    /// Create a PENDING leave request, reserving its days
    pub fn submit_leave(
        &self,
        actor: &Actor,
        request: &NewLeaveRequest,
    ) -> WorkflowResult<LeaveRequest> {
        let now = self.clock.now();
        let leave = self
            .ensure_not_deleted(&actor.id)
            .and_then(|()| self.leave.open_request(actor, request, now))
            .map_err(|err| {
                rejected(
                    &EntityRef::new(EntityType::Leave, "new"),
                    LeaveStatus::Pending.as_str(),
                    actor,
                    err,
                )
            })?;

        self.store_reserved_leave(actor, leave, now)
    }

    /// Store a request whose days are already reserved. If it cannot be
    /// stored, the reservation is released.
    fn store_reserved_leave(
        &self,
        actor: &Actor,
        leave: LeaveRequest,
        now: DateTime<Utc>,
    ) -> WorkflowResult<LeaveRequest> {
        let owner = leave.employee_id.clone();
        let stored = self.insert_created(
            &self.leave_requests,
            leave.clone(),
            &owner,
            LeaveStatus::Pending.as_str(),
            actor,
            now,
        );
        if stored.is_err() {
            if let Err(err) = self.leave.abandon_request(&leave) {
                if self.deleted_employees.contains(&owner) {
                    // the ledger row went with the employee
                    tracing::debug!(leave_id = %leave.id, error = %err, "Reservation already removed");
                } else {
                    tracing::error!(
                        leave_id = %leave.id,
                        error = %err,
                        "Failed to release abandoned reservation"
                    );
                }
            }
        }
        stored
    }

    /// Approve, reject or cancel a leave request
    pub fn transition_leave(
        &self,
        leave_id: &LeaveRequestId,
        actor: &Actor,
        request: &LeaveTransitionRequest,
    ) -> WorkflowResult<LeaveRequest> {
        self.apply_transition(
            &self.leave,
            &self.leave_requests,
            &leave_id.0,
            request.to,
            actor,
            request,
            request.expected_version,
        )
    }

    /// One leave request by id
    pub fn leave_request(&self, leave_id: &LeaveRequestId) -> WorkflowResult<LeaveRequest> {
        self.leave_requests.get(&leave_id.0)
    }

    /// All leave requests of one employee, oldest first
    pub fn leave_requests_for(&self, employee_id: &UserId) -> Vec<LeaveRequest> {
        let mut requests = self.leave_requests.filter(|l| &l.employee_id == employee_id);
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        requests
    }

    /// Balance row for `(employee, leave type, year)`, seeded from policy
    /// when the ledger has none
    pub fn leave_balance(&self, employee_id: &UserId, leave_type: LeaveType, year: i32) -> LeaveBalance {
        self.leave
            .ledger()
            .balance(&BalanceKey::new(employee_id.clone(), leave_type, year))
    }

    /// Override the entitlement of one balance row
    pub fn set_entitlement(
        &self,
        actor: &Actor,
        employee_id: &UserId,
        leave_type: LeaveType,
        year: i32,
        days: u32,
    ) -> WorkflowResult<LeaveBalance> {
        require(actor, Capability::ManageEntitlements)?;
        self.ensure_not_deleted(employee_id)?;
        let key = BalanceKey::new(employee_id.clone(), leave_type, year);
        let balance = self.leave.ledger().set_entitlement(&key, days)?;
        tracing::info!(
            balance = %key,
            entitlement = days,
            actor = %actor.id,
            "Entitlement updated"
        );
        Ok(balance)
    }

    // ── Tickets ──────────────────────────────────────────────────────

    /// Open a ticket for the actor, or on an employee's behalf
    pub fn open_ticket(&self, actor: &Actor, request: &NewTicket) -> WorkflowResult<Ticket> {
        let now = self.clock.now();
        let ticket = self.tickets.open_ticket(actor, request, now).map_err(|err| {
            rejected(
                &EntityRef::new(EntityType::Ticket, "new"),
                TicketStatus::Open.as_str(),
                actor,
                err,
            )
        })?;
        let owner = ticket.employee_id.clone();
        self.insert_created(
            &self.ticket_store,
            ticket,
            &owner,
            TicketStatus::Open.as_str(),
            actor,
            now,
        )
    }

    /// Move a ticket along one edge of its table
    pub fn transition_ticket(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        request: &TicketTransitionRequest,
    ) -> WorkflowResult<Ticket> {
        self.apply_transition(
            &self.tickets,
            &self.ticket_store,
            &ticket_id.0,
            request.to,
            actor,
            request,
            request.expected_version,
        )
    }

    /// Hand a ticket to a staff member; the status is unchanged
    pub fn assign_ticket(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        assignee: &UserId,
        expected_version: Option<u64>,
    ) -> WorkflowResult<Ticket> {
        self.apply_mutation(
            &self.ticket_store,
            &ticket_id.0,
            actor,
            expected_version,
            |t| t.status.as_str(),
            |ticket, _now| {
                let next = self.tickets.assign(ticket, actor, assignee)?;
                Ok((next, Some(format!("assigned to {}", assignee))))
            },
        )
    }

    /// Append a comment; internal comments are staff-only
    pub fn comment_on_ticket(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        request: &CommentRequest,
    ) -> WorkflowResult<Ticket> {
        self.apply_mutation(
            &self.ticket_store,
            &ticket_id.0,
            actor,
            request.expected_version,
            |t| t.status.as_str(),
            |ticket, now| {
                let next = self.tickets.comment(ticket, actor, request, now)?;
                let note = if request.is_internal {
                    "internal comment"
                } else {
                    "comment"
                };
                Ok((next, Some(note.to_string())))
            },
        )
    }

    /// Record the owner's satisfaction rating on a resolved ticket
    pub fn rate_ticket(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        request: &RatingRequest,
    ) -> WorkflowResult<Ticket> {
        self.apply_mutation(
            &self.ticket_store,
            &ticket_id.0,
            actor,
            request.expected_version,
            |t| t.status.as_str(),
            |ticket, _now| {
                let next = self.tickets.rate(ticket, actor, request)?;
                Ok((next, Some(format!("rated {}", request.rating))))
            },
        )
    }

    /// A ticket as the actor may see it: staff get the full record, the
    /// owner gets it without internal comments.
    pub fn get_ticket(&self, ticket_id: &TicketId, actor: &Actor) -> WorkflowResult<Ticket> {
        let ticket = self.ticket_store.get(&ticket_id.0)?;
        if actor.can(Capability::ManageTickets) {
            Ok(ticket)
        } else if actor.owns(&ticket.employee_id) {
            Ok(ticket.employee_view())
        } else {
            Err(WorkflowError::forbidden(format!(
                "{} may not view ticket {}",
                actor.id,
                ticket_id.short()
            )))
        }
    }

    /// One employee's tickets, oldest first, under the same visibility rules
    pub fn tickets_for(&self, actor: &Actor, employee_id: &UserId) -> WorkflowResult<Vec<Ticket>> {
        let staff = actor.can(Capability::ManageTickets);
        if !staff && !actor.owns(employee_id) {
            return Err(WorkflowError::forbidden(format!(
                "{} may not list tickets of {}",
                actor.id, employee_id
            )));
        }
        let mut tickets = self.ticket_store.filter(|t| &t.employee_id == employee_id);
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        if !staff {
            tickets = tickets.iter().map(Ticket::employee_view).collect();
        }
        Ok(tickets)
    }

    // ── Employees ────────────────────────────────────────────────────

    /// Remove an employee and everything that belongs to them.
    /// Audit history is kept. The id stays retired: later attempts to
    /// create records for it fail with `EmployeeDeleted`.
    pub fn delete_employee(
        &self,
        actor: &Actor,
        employee_id: &UserId,
    ) -> WorkflowResult<DeletionSummary> {
        let entity = EntityRef::onboarding(employee_id.as_str());
        require(actor, Capability::DeleteEmployee)
            .map_err(|err| rejected(&entity, "DELETED", actor, err))?;
        let not_found = || rejected(&entity, "DELETED", actor, WorkflowError::NotFound(entity.clone()));

        // Retired before the cascade; creation checks this under its entry lock
        if !self.deleted_employees.insert(employee_id.clone()) {
            return Err(not_found());
        }

        let record = self.onboarding_records.remove(employee_id.as_str());
        let leaves = self.leave_requests.remove_where(|l| &l.employee_id == employee_id);
        let tickets = self.ticket_store.remove_where(|t| &t.employee_id == employee_id);
        let balances = self.leave.ledger().remove_employee(employee_id);

        if record.is_none() && leaves.is_empty() && tickets.is_empty() && balances == 0 {
            self.deleted_employees.remove(employee_id);
            return Err(not_found());
        }

        let summary = DeletionSummary {
            employee_id: employee_id.clone(),
            onboarding_record: record.is_some(),
            leave_requests: leaves.len(),
            tickets: tickets.len(),
            balances,
        };
        let note = format!(
            "removed {} leave request(s), {} ticket(s), {} balance row(s)",
            summary.leave_requests, summary.tickets, summary.balances
        );
        self.audit.append(
            PendingAuditEntry::new(
                entity.clone(),
                record.as_ref().map(|r| r.status.as_str()),
                "DELETED",
                actor.id.clone(),
                self.clock.now(),
            )
            .with_note(Some(note)),
        );

        tracing::info!(
            employee = %employee_id,
            actor = %actor.id,
            leave_requests = summary.leave_requests,
            tickets = summary.tickets,
            "Employee deleted"
        );
        Ok(summary)
    }

    // ── Audit ────────────────────────────────────────────────────────

    /// Audit entries of one entity, oldest first
    pub fn audit_trail(&self, entity: &EntityRef) -> Vec<AuditEntry> {
        self.audit.entries_for(entity)
    }

    /// Audit entries written on behalf of one actor, oldest first
    pub fn audit_by_actor(&self, actor_id: &UserId) -> Vec<AuditEntry> {
        self.audit.entries_by_actor(actor_id)
    }

    /// The whole append-only log
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Dispatch a tagged command to the typed operation
    pub fn execute(&self, actor: &Actor, command: TransitionCommand) -> WorkflowResult<Entity> {
        match command {
            TransitionCommand::InviteEmployee { employee_id } => {
                self.invite_employee(actor, &employee_id).map(Entity::from)
            }
            TransitionCommand::SaveOnboardingDocuments {
                employee_id,
                documents,
            } => self
                .save_onboarding_documents(actor, &employee_id, documents, None)
                .map(Entity::from),
            TransitionCommand::TransitionOnboarding {
                employee_id,
                request,
            } => self
                .transition_onboarding(&employee_id, actor, &request)
                .map(Entity::from),
            TransitionCommand::SubmitLeave { request } => {
                self.submit_leave(actor, &request).map(Entity::from)
            }
            TransitionCommand::TransitionLeave { leave_id, request } => self
                .transition_leave(&leave_id, actor, &request)
                .map(Entity::from),
            TransitionCommand::OpenTicket { ticket } => {
                self.open_ticket(actor, &ticket).map(Entity::from)
            }
            TransitionCommand::TransitionTicket { ticket_id, request } => self
                .transition_ticket(&ticket_id, actor, &request)
                .map(Entity::from),
            TransitionCommand::AssignTicket {
                ticket_id,
                assignee,
            } => self
                .assign_ticket(&ticket_id, actor, &assignee, None)
                .map(Entity::from),
            TransitionCommand::CommentOnTicket { ticket_id, comment } => self
                .comment_on_ticket(&ticket_id, actor, &comment)
                .map(Entity::from),
            TransitionCommand::RateTicket { ticket_id, rating } => self
                .rate_ticket(&ticket_id, actor, &rating)
                .map(Entity::from),
        }
    }

    // ── Shared algorithm ─────────────────────────────────────────────

    /// Fire one edge of `machine` on the entity stored under `key`
    #[allow(clippy::too_many_arguments)]
    fn apply_transition<M: StateMachine>(
        &self,
        machine: &M,
        store: &EntityStore<M::Entity>,
        key: &str,
        to: M::Status,
        actor: &Actor,
        payload: &M::Payload,
        expected_version: Option<u64>,
    ) -> WorkflowResult<M::Entity> {
        let entity = EntityRef::new(M::ENTITY_TYPE, key);
        self.try_transition(machine, store, &entity, to, actor, payload, expected_version)
            .map_err(|err| rejected(&entity, to.as_str(), actor, err))
    }

    #[allow(clippy::too_many_arguments)]
    fn try_transition<M: StateMachine>(
        &self,
        machine: &M,
        store: &EntityStore<M::Entity>,
        entity: &EntityRef,
        to: M::Status,
        actor: &Actor,
        payload: &M::Payload,
        expected_version: Option<u64>,
    ) -> WorkflowResult<M::Entity> {
        let now = self.clock.now();
        let current = store.get(&entity.entity_id)?;
        let read_version = current.version();
        check_expected_version(entity, expected_version, read_version)?;

        let from = M::status_of(&current);
        let edge = machine
            .table()
            .find(from, to)
            .ok_or_else(|| WorkflowError::InvalidTransition {
                entity_type: M::ENTITY_TYPE,
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })?;
        edge.authority.authorize(actor, M::owner_of(&current))?;
        machine.check_guard(&current, edge, actor, payload, now)?;

        let mut next = current.clone();
        let note = machine.apply(&mut next, edge, actor, payload, now);
        next.touch(now);
        let pending = PendingAuditEntry::new(
            entity.clone(),
            Some(from.as_str()),
            to.as_str(),
            actor.id.clone(),
            now,
        )
        .with_note(note);

        let committed = store.commit(&entity.entity_id, read_version, |stored| {
            machine.commit_effects(stored, &next)?;
            self.audit.append(pending);
            Ok(next)
        })?;

        tracing::info!(
            entity = %entity,
            from = %from,
            to = %to,
            actor = %actor.id,
            version = committed.version(),
            "Transition committed"
        );

        self.notify(
            TransitionEvent {
                entity: entity.clone(),
                from_state: Some(from.as_str().to_string()),
                to_state: to.as_str().to_string(),
                actor_id: actor.id.clone(),
                occurred_at: now,
            },
            committed.clone().into(),
        );
        Ok(committed)
    }

    /// Commit a change that keeps the entity's status. `change` validates
    /// against the loaded snapshot and returns the new value plus an
    /// audit note.
    fn apply_mutation<E, F>(
        &self,
        store: &EntityStore<E>,
        key: &str,
        actor: &Actor,
        expected_version: Option<u64>,
        status_of: fn(&E) -> &'static str,
        change: F,
    ) -> WorkflowResult<E>
    where
        E: Versioned + Clone,
        F: FnOnce(&E, DateTime<Utc>) -> WorkflowResult<(E, Option<String>)>,
    {
        let entity = EntityRef::new(store.entity_type(), key);
        let result = (|| -> WorkflowResult<E> {
            let now = self.clock.now();
            let current = store.get(key)?;
            let read_version = current.version();
            check_expected_version(&entity, expected_version, read_version)?;

            let (mut next, note) = change(&current, now)?;
            next.touch(now);
            let state = status_of(&current);
            let pending =
                PendingAuditEntry::new(entity.clone(), Some(state), state, actor.id.clone(), now)
                    .with_note(note);

            let committed = store.commit(key, read_version, |_| {
                self.audit.append(pending);
                Ok(next)
            })?;
            tracing::info!(
                entity = %entity,
                state = state,
                actor = %actor.id,
                version = committed.version(),
                "Change committed"
            );
            Ok(committed)
        })();

        result.map_err(|err| rejected(&entity, "-", actor, err))
    }

    /// Store a freshly created entity and record its creation. A key
    /// collision means someone else created it first: `StaleState`
    /// against version 0. Creation for a deleted `owner` is refused under
    /// the entry lock.
    #[allow(clippy::too_many_arguments)]
    fn insert_created<E>(
        &self,
        store: &EntityStore<E>,
        created: E,
        owner: &UserId,
        state: &'static str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<E>
    where
        E: Versioned + Clone + Into<Entity>,
    {
        let entity = EntityRef::new(store.entity_type(), created.key());
        let inserted = store
            .insert_with(created.clone(), |_| {
                self.ensure_not_deleted(owner)?;
                self.audit.append(PendingAuditEntry::new(
                    entity.clone(),
                    None,
                    state,
                    actor.id.clone(),
                    now,
                ));
                Ok(())
            })
            .map_err(|err| rejected(&entity, state, actor, err))?;

        if !inserted {
            let actual = store.get(&entity.entity_id).map_or(0, |e| e.version());
            return Err(rejected(
                &entity,
                state,
                actor,
                WorkflowError::StaleState {
                    entity: entity.clone(),
                    expected: 0,
                    actual,
                },
            ));
        }

        tracing::info!(
            entity = %entity,
            to = state,
            actor = %actor.id,
            "Entity created"
        );
        self.notify(
            TransitionEvent {
                entity,
                from_state: None,
                to_state: state.to_string(),
                actor_id: actor.id.clone(),
                occurred_at: now,
            },
            created.clone().into(),
        );
        Ok(created)
    }

    fn ensure_not_deleted(&self, employee_id: &UserId) -> WorkflowResult<()> {
        if self.deleted_employees.contains(employee_id) {
            return Err(GuardFailure::EmployeeDeleted(employee_id.clone()).into());
        }
        Ok(())
    }

    fn notify(&self, event: TransitionEvent, entity: Entity) {
        if let Err(err) = self.notifier.notify(&event, &entity) {
            tracing::warn!(
                event = %event.name(),
                entity = %event.entity,
                error = %err,
                "Notifier failed; transition stands"
            );
        }
    }
}
