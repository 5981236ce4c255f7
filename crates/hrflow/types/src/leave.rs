//! Leave requests and leave balances

use crate::{Gender, LeaveRequestId, UserId, Versioned, WorkflowStatus};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Leave Type ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Maternity,
    Paternity,
}

impl LeaveType {
    pub const ALL: &'static [LeaveType] = &[
        LeaveType::Annual,
        LeaveType::Sick,
        LeaveType::Casual,
        LeaveType::Maternity,
        LeaveType::Paternity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Casual => "casual",
            LeaveType::Maternity => "maternity",
            LeaveType::Paternity => "paternity",
        }
    }

    /// Gender restriction for this leave type, if any
    pub fn required_gender(self) -> Option<Gender> {
        match self {
            LeaveType::Maternity => Some(Gender::Female),
            LeaveType::Paternity => Some(Gender::Male),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeaveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown leave type '{}'", s))
    }
}

// ── Leave Status ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl WorkflowStatus for LeaveStatus {
    const ALL: &'static [Self] = &[
        LeaveStatus::Pending,
        LeaveStatus::Approved,
        LeaveStatus::Rejected,
        LeaveStatus::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive length of a date span in days. `None` when `end < start`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Option<u32> {
    let span = (end - start).num_days();
    if span < 0 {
        return None;
    }
    u32::try_from(span + 1).ok()
}

// ── Leave Request ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub employee_id: UserId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive span length, fixed at creation
    pub number_of_days: u32,
    pub status: LeaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// The ledger year this request is charged to
    pub fn ledger_year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id.clone(), self.leave_type, self.ledger_year())
    }

    /// Whether `numberOfDays` is currently held against the balance
    pub fn holds_reservation(&self) -> bool {
        self.status == LeaveStatus::Pending
    }
}

impl Versioned for LeaveRequest {
    fn version(&self) -> u64 {
        self.version
    }

    fn key(&self) -> String {
        self.id.0.clone()
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }
}

// ── Leave Balance ────────────────────────────────────────────────────

/// Ledger key: one balance row per employee, leave type and year
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub employee_id: UserId,
    pub leave_type: LeaveType,
    pub year: i32,
}

impl BalanceKey {
    pub fn new(employee_id: UserId, leave_type: LeaveType, year: i32) -> Self {
        Self {
            employee_id,
            leave_type,
            year,
        }
    }
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.employee_id, self.leave_type, self.year)
    }
}

/// Entitlement and usage for one [`BalanceKey`]
///
/// `available = entitlement - consumed - reserved` and never goes negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub employee_id: UserId,
    pub leave_type: LeaveType,
    pub year: i32,
    pub entitlement: u32,
    pub consumed: u32,
    pub reserved: u32,
}

impl LeaveBalance {
    pub fn new(key: BalanceKey, entitlement: u32) -> Self {
        Self {
            employee_id: key.employee_id,
            leave_type: key.leave_type,
            year: key.year,
            entitlement,
            consumed: 0,
            reserved: 0,
        }
    }

    pub fn available(&self) -> u32 {
        self.entitlement
            .saturating_sub(self.consumed)
            .saturating_sub(self.reserved)
    }

    pub fn used(&self) -> u32 {
        self.consumed + self.reserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inclusive_days() {
        assert_eq!(inclusive_days(date(2025, 3, 3), date(2025, 3, 3)), Some(1));
        assert_eq!(inclusive_days(date(2025, 3, 3), date(2025, 3, 7)), Some(5));
        assert_eq!(inclusive_days(date(2025, 2, 27), date(2025, 3, 2)), Some(4));
        assert_eq!(inclusive_days(date(2025, 3, 7), date(2025, 3, 3)), None);
    }

    #[test]
    fn test_leave_type_parsing() {
        assert_eq!("annual".parse::<LeaveType>().unwrap(), LeaveType::Annual);
        assert_eq!(" Sick ".parse::<LeaveType>().unwrap(), LeaveType::Sick);
        assert!("sabbatical".parse::<LeaveType>().is_err());
    }

    #[test]
    fn test_gender_restrictions() {
        assert_eq!(LeaveType::Maternity.required_gender(), Some(Gender::Female));
        assert_eq!(LeaveType::Paternity.required_gender(), Some(Gender::Male));
        assert_eq!(LeaveType::Annual.required_gender(), None);
    }

    #[test]
    fn test_balance_available() {
        let key = BalanceKey::new(UserId::new("emp-1"), LeaveType::Annual, 2025);
        let mut balance = LeaveBalance::new(key, 10);
        balance.reserved = 3;
        balance.consumed = 2;
        assert_eq!(balance.available(), 5);
        assert_eq!(balance.used(), 5);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(!LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
    }
}
