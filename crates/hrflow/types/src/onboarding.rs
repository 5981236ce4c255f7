//! Onboarding records: one per employee, from invitation to active employment

use crate::{UserId, Versioned, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Onboarding lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    Invited,
    Pending,
    Submitted,
    Approved,
    Rejected,
    Completed,
}

impl WorkflowStatus for OnboardingStatus {
    const ALL: &'static [Self] = &[
        OnboardingStatus::Invited,
        OnboardingStatus::Pending,
        OnboardingStatus::Submitted,
        OnboardingStatus::Approved,
        OnboardingStatus::Rejected,
        OnboardingStatus::Completed,
    ];

    fn as_str(self) -> &'static str {
        match self {
            OnboardingStatus::Invited => "INVITED",
            OnboardingStatus::Pending => "PENDING",
            OnboardingStatus::Submitted => "SUBMITTED",
            OnboardingStatus::Approved => "APPROVED",
            OnboardingStatus::Rejected => "REJECTED",
            OnboardingStatus::Completed => "COMPLETED",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, OnboardingStatus::Completed)
    }
}

impl OnboardingStatus {
    /// States in which a reviewer is on record
    pub fn is_reviewed(self) -> bool {
        matches!(self, OnboardingStatus::Approved | OnboardingStatus::Rejected)
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a file held by the external document store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl DocumentRef {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            file_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Permanent,
    Current,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub kind: AddressKind,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    pub fn new(
        kind: AddressKind,
        line1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line1: line1.into(),
            line2: None,
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }
}

/// Employment fields the employee confirms during onboarding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentDetails {
    pub job_title: String,
    pub department: String,
    pub start_date: chrono::NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<UserId>,
}

/// Documents attached to an onboarding record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocuments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub government_id: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment: Option<EmploymentDetails>,
}

impl SubmittedDocuments {
    pub fn with_government_id(mut self, doc: DocumentRef) -> Self {
        self.government_id = Some(doc);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_employment(mut self, employment: EmploymentDetails) -> Self {
        self.employment = Some(employment);
        self
    }

    /// Names of the required slots that are still empty
    pub fn missing_slots(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self
            .government_id
            .as_ref()
            .map_or(true, |d| d.document_id.trim().is_empty())
        {
            missing.push("government_id");
        }
        if self.addresses.is_empty() {
            missing.push("address");
        }
        match &self.employment {
            Some(e) if !e.job_title.trim().is_empty() && !e.department.trim().is_empty() => {}
            _ => missing.push("employment"),
        }
        missing
    }
}

/// An employee's onboarding progress
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub employee_id: UserId,
    pub status: OnboardingStatus,
    pub submitted_documents: SubmittedDocuments,
    pub invited_by: UserId,
    pub invited_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Set if and only if the status is `APPROVED` or `REJECTED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_set_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingRecord {
    /// A freshly invited employee
    pub fn invited(employee_id: UserId, invited_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            employee_id,
            status: OnboardingStatus::Invited,
            submitted_documents: SubmittedDocuments::default(),
            invited_by,
            invited_at: now,
            submitted_at: None,
            reviewed_at: None,
            reviewer_id: None,
            review_comments: None,
            credential_set_at: None,
            completed_at: None,
            version: 1,
            updated_at: now,
        }
    }
}

impl Versioned for OnboardingRecord {
    fn version(&self) -> u64 {
        self.version
    }

    fn key(&self) -> String {
        self.employee_id.0.clone()
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }
}
