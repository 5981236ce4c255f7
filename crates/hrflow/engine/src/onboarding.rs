//! Onboarding state machine
//!
//! ```text
//! INVITED -> PENDING -> SUBMITTED -> APPROVED -> COMPLETED
//!               ^           |
//!               |           v
//!               +------ REJECTED
//! ```

use crate::authority::Authority;
use crate::collaborators::{DocumentChecker, IdentityVerifier};
use crate::state_machine::StateMachine;
use crate::transition_table::{Transition, TransitionTable};
use chrono::{DateTime, Utc};
use hrflow_types::{
    Actor, Capability, EntityType, GuardFailure, OnboardingRecord, OnboardingStatus,
    OnboardingTransitionRequest, UserId,
};
use serde::Serialize;
use std::sync::Arc;

use OnboardingStatus::*;

/// Precondition attached to an onboarding edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingGuard {
    /// The identity verifier accepts the employee's token
    IdentityVerified,
    /// Every mandatory document slot is filled
    DocumentsComplete,
    /// Approval carries no extra precondition
    Review,
    /// Rejection must say why
    ReviewCommentRequired,
    /// Reopen after rejection; documents are kept
    Resubmission,
    /// A credential of the configured minimum length is supplied
    CredentialProvided,
}

pub static ONBOARDING_TRANSITIONS: TransitionTable<OnboardingStatus, OnboardingGuard> =
    TransitionTable::new(&[
        Transition::new(Invited, Pending, Authority::Owner, OnboardingGuard::IdentityVerified),
        Transition::new(Pending, Submitted, Authority::Owner, OnboardingGuard::DocumentsComplete),
        Transition::new(
            Submitted,
            Approved,
            Authority::Capability(Capability::ReviewOnboarding),
            OnboardingGuard::Review,
        ),
        Transition::new(
            Submitted,
            Rejected,
            Authority::Capability(Capability::ReviewOnboarding),
            OnboardingGuard::ReviewCommentRequired,
        ),
        Transition::new(Rejected, Pending, Authority::Owner, OnboardingGuard::Resubmission),
        Transition::new(Approved, Completed, Authority::Owner, OnboardingGuard::CredentialProvided),
    ]);

pub struct OnboardingMachine {
    documents: Arc<dyn DocumentChecker>,
    identity: Arc<dyn IdentityVerifier>,
    min_credential_length: usize,
}

impl OnboardingMachine {
    pub fn new(
        documents: Arc<dyn DocumentChecker>,
        identity: Arc<dyn IdentityVerifier>,
        min_credential_length: usize,
    ) -> Self {
        Self {
            documents,
            identity,
            min_credential_length,
        }
    }

    pub fn min_credential_length(&self) -> usize {
        self.min_credential_length
    }

    /// Draft documents can only be saved while the record is `PENDING`
    pub fn accepts_document_edits(status: OnboardingStatus) -> bool {
        status == Pending
    }
}

fn non_blank(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl StateMachine for OnboardingMachine {
    type Entity = OnboardingRecord;
    type Status = OnboardingStatus;
    type Guard = OnboardingGuard;
    type Payload = OnboardingTransitionRequest;

    const ENTITY_TYPE: EntityType = EntityType::Onboarding;

    fn table(&self) -> &'static TransitionTable<OnboardingStatus, OnboardingGuard> {
        &ONBOARDING_TRANSITIONS
    }

    fn status_of(entity: &OnboardingRecord) -> OnboardingStatus {
        entity.status
    }

    fn owner_of(entity: &OnboardingRecord) -> &UserId {
        &entity.employee_id
    }

    fn check_guard(
        &self,
        record: &OnboardingRecord,
        edge: &Transition<OnboardingStatus, OnboardingGuard>,
        _actor: &Actor,
        request: &OnboardingTransitionRequest,
        _now: DateTime<Utc>,
    ) -> Result<(), GuardFailure> {
        match edge.guard {
            OnboardingGuard::IdentityVerified => {
                let token = request.verification_token.as_deref().unwrap_or_default();
                if self.identity.verify(&record.employee_id, token) {
                    Ok(())
                } else {
                    Err(GuardFailure::IdentityNotVerified)
                }
            }
            OnboardingGuard::DocumentsComplete => {
                let documents = request
                    .documents
                    .as_ref()
                    .unwrap_or(&record.submitted_documents);
                let missing = self.documents.missing(documents);
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(GuardFailure::MissingDocuments(missing))
                }
            }
            OnboardingGuard::ReviewCommentRequired => match non_blank(&request.comments) {
                Some(_) => Ok(()),
                None => Err(GuardFailure::MissingReviewComment),
            },
            OnboardingGuard::CredentialProvided => {
                let length = request
                    .credential
                    .as_deref()
                    .map_or(0, |c| c.chars().count());
                if length >= self.min_credential_length {
                    Ok(())
                } else {
                    Err(GuardFailure::CredentialTooShort {
                        min_length: self.min_credential_length,
                    })
                }
            }
            OnboardingGuard::Review | OnboardingGuard::Resubmission => Ok(()),
        }
    }

    fn apply(
        &self,
        record: &mut OnboardingRecord,
        edge: &Transition<OnboardingStatus, OnboardingGuard>,
        actor: &Actor,
        request: &OnboardingTransitionRequest,
        now: DateTime<Utc>,
    ) -> Option<String> {
        record.status = edge.to;
        match edge.guard {
            OnboardingGuard::IdentityVerified => None,
            OnboardingGuard::DocumentsComplete => {
                if let Some(documents) = &request.documents {
                    record.submitted_documents = documents.clone();
                }
                record.submitted_at = Some(now);
                None
            }
            OnboardingGuard::Review | OnboardingGuard::ReviewCommentRequired => {
                let comments = non_blank(&request.comments);
                record.reviewer_id = Some(actor.id.clone());
                record.reviewed_at = Some(now);
                record.review_comments = comments.clone();
                comments
            }
            OnboardingGuard::Resubmission => {
                record.reviewer_id = None;
                None
            }
            OnboardingGuard::CredentialProvided => {
                // Only the fact that a credential was set is recorded.
                record.reviewer_id = None;
                record.credential_set_at = Some(now);
                record.completed_at = Some(now);
                None
            }
        }
    }
}
