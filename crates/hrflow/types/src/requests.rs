//! Request bodies accepted by the engine

use crate::{
    LeaveRequestId, LeaveStatus, LeaveType, OnboardingStatus, SubmittedDocuments, TicketCategory,
    TicketId, TicketPriority, TicketStatus, UserId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `POST /onboarding/{id}/transition`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnboardingTransitionRequest {
    pub to: OnboardingStatus,
    /// Review comment. Required when rejecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Replaces the draft documents on submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<SubmittedDocuments>,
    /// Token confirmed by the identity verification collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    /// Account credential chosen on completion. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl OnboardingTransitionRequest {
    pub fn to(status: OnboardingStatus) -> Self {
        Self {
            to: status,
            comments: None,
            documents: None,
            verification_token: None,
            credential: None,
            expected_version: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn with_documents(mut self, documents: SubmittedDocuments) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_verification_token(mut self, token: impl Into<String>) -> Self {
        self.verification_token = Some(token.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Body for submitting a new leave request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeaveRequest {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl NewLeaveRequest {
    pub fn new(leave_type: LeaveType, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            leave_type,
            start_date,
            end_date,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// `POST /leaves/{id}/transition`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveTransitionRequest {
    pub to: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl LeaveTransitionRequest {
    pub fn to(status: LeaveStatus) -> Self {
        Self {
            to: status,
            rejection_reason: None,
            expected_version: None,
        }
    }

    pub fn with_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Body for opening a ticket. `employee_id` is set when staff open a
/// ticket on an employee's behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<UserId>,
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    pub subject: String,
    pub description: String,
}

impl NewTicket {
    pub fn new(
        category: TicketCategory,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            employee_id: None,
            category,
            priority: TicketPriority::default(),
            subject: subject.into(),
            description: description.into(),
        }
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn on_behalf_of(mut self, employee_id: UserId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }
}

/// `POST /tickets/{id}/transition`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTransitionRequest {
    pub to: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl TicketTransitionRequest {
    pub fn to(status: TicketStatus) -> Self {
        Self {
            to: status,
            resolution: None,
            expected_version: None,
        }
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// `POST /tickets/{id}/comments`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRequest {
    pub text: String,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl CommentRequest {
    pub fn public(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_internal: false,
            expected_version: None,
        }
    }

    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_internal: true,
            expected_version: None,
        }
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// `POST /tickets/{id}/rating`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl RatingRequest {
    pub fn new(rating: u8) -> Self {
        Self {
            rating,
            feedback: None,
            expected_version: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// A single engine operation, tagged by entity type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionCommand {
    InviteEmployee {
        employee_id: UserId,
    },
    SaveOnboardingDocuments {
        employee_id: UserId,
        documents: SubmittedDocuments,
    },
    TransitionOnboarding {
        employee_id: UserId,
        #[serde(flatten)]
        request: OnboardingTransitionRequest,
    },
    SubmitLeave {
        #[serde(flatten)]
        request: NewLeaveRequest,
    },
    TransitionLeave {
        leave_id: LeaveRequestId,
        #[serde(flatten)]
        request: LeaveTransitionRequest,
    },
    OpenTicket {
        #[serde(flatten)]
        ticket: NewTicket,
    },
    TransitionTicket {
        ticket_id: TicketId,
        #[serde(flatten)]
        request: TicketTransitionRequest,
    },
    AssignTicket {
        ticket_id: TicketId,
        assignee: UserId,
    },
    CommentOnTicket {
        ticket_id: TicketId,
        #[serde(flatten)]
        comment: CommentRequest,
    },
    RateTicket {
        ticket_id: TicketId,
        #[serde(flatten)]
        rating: RatingRequest,
    },
}
