//! Leave balance ledger
//!
//! One row per `(employee, leave type, year)`. Every operation runs its
//! check-and-mutate under that row's write guard, so two requests racing
//! for the same balance are linearised. A row is seeded from the
//! configured entitlement policy by the first operation that succeeds on
//! it; a refused operation never creates one.
//!
//! The ledger assumes at-most-once invocation per transition; the
//! orchestrator's version check is what makes replays harmless.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hrflow_types::{BalanceKey, GuardFailure, LeaveBalance, LeaveType, UserId, WorkflowError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance for {key}: requested {requested}, available {available}")]
    InsufficientBalance {
        key: BalanceKey,
        requested: u32,
        available: u32,
    },

    #[error("cannot {operation} {days} day(s) on {key}")]
    Underflow {
        key: BalanceKey,
        operation: &'static str,
        days: u32,
    },

    #[error("entitlement {requested} for {key} is below usage {used}")]
    EntitlementBelowUsage {
        key: BalanceKey,
        requested: u32,
        used: u32,
    },
}

impl From<LedgerError> for GuardFailure {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                key,
                requested,
                available,
            } => GuardFailure::InsufficientBalance {
                leave_type: key.leave_type,
                requested,
                available,
            },
            LedgerError::Underflow {
                key,
                operation,
                days,
            } => GuardFailure::LedgerUnderflow {
                key,
                operation,
                days,
            },
            LedgerError::EntitlementBelowUsage {
                key,
                requested,
                used,
            } => GuardFailure::EntitlementBelowUsage {
                key,
                requested,
                used,
            },
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        WorkflowError::GuardFailed(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug)]
pub struct LeaveLedger {
    balances: DashMap<BalanceKey, LeaveBalance>,
    /// Entitlement granted to a row on first use
    policy: BTreeMap<LeaveType, u32>,
}

impl LeaveLedger {
    pub fn new(policy: BTreeMap<LeaveType, u32>) -> Self {
        Self {
            balances: DashMap::new(),
            policy,
        }
    }

    pub fn default_entitlement(&self, leave_type: LeaveType) -> u32 {
        self.policy.get(&leave_type).copied().unwrap_or(0)
    }

    /// Run `change` on a working copy of the row under its write guard.
    /// The row is written back (or created from policy) only on success.
    fn update<F>(&self, key: &BalanceKey, change: F) -> LedgerResult<LeaveBalance>
    where
        F: FnOnce(&mut LeaveBalance) -> LedgerResult<()>,
    {
        match self.balances.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let mut row = slot.get().clone();
                change(&mut row)?;
                slot.insert(row.clone());
                Ok(row)
            }
            Entry::Vacant(slot) => {
                let mut row =
                    LeaveBalance::new(key.clone(), self.default_entitlement(key.leave_type));
                change(&mut row)?;
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    /// Hold `days` against the balance. Fails without mutating when
    /// fewer than `days` are available.
    pub fn reserve(&self, key: &BalanceKey, days: u32) -> LedgerResult<LeaveBalance> {
        let row = self.update(key, |row| {
            let available = row.available();
            if days > available {
                return Err(LedgerError::InsufficientBalance {
                    key: key.clone(),
                    requested: days,
                    available,
                });
            }
            row.reserved += days;
            Ok(())
        })?;
        tracing::debug!(key = %key, days, available = row.available(), "Leave reserved");
        Ok(row)
    }

    /// Drop a reservation without consuming it
    pub fn release(&self, key: &BalanceKey, days: u32) -> LedgerResult<LeaveBalance> {
        let row = self.update(key, |row| {
            if row.reserved < days {
                return Err(underflow(key, "release", days));
            }
            row.reserved -= days;
            Ok(())
        })?;
        tracing::debug!(key = %key, days, available = row.available(), "Leave released");
        Ok(row)
    }

    /// Convert a reservation into consumption
    pub fn consume(&self, key: &BalanceKey, days: u32) -> LedgerResult<LeaveBalance> {
        let row = self.update(key, |row| {
            if row.reserved < days {
                return Err(underflow(key, "consume", days));
            }
            row.reserved -= days;
            row.consumed += days;
            Ok(())
        })?;
        tracing::debug!(key = %key, days, available = row.available(), "Leave consumed");
        Ok(row)
    }

    /// Give back consumed days (an approved leave was cancelled)
    pub fn restore(&self, key: &BalanceKey, days: u32) -> LedgerResult<LeaveBalance> {
        let row = self.update(key, |row| {
            if row.consumed < days {
                return Err(underflow(key, "restore", days));
            }
            row.consumed -= days;
            Ok(())
        })?;
        tracing::debug!(key = %key, days, available = row.available(), "Leave restored");
        Ok(row)
    }

    /// Override the entitlement of one row. It may not drop below what is
    /// already consumed or reserved.
    pub fn set_entitlement(&self, key: &BalanceKey, days: u32) -> LedgerResult<LeaveBalance> {
        self.update(key, |row| {
            let used = row.used();
            if days < used {
                return Err(LedgerError::EntitlementBelowUsage {
                    key: key.clone(),
                    requested: days,
                    used,
                });
            }
            row.entitlement = days;
            Ok(())
        })
    }

    // ── Query methods ────────────────────────────────────────────────

    pub fn available(&self, key: &BalanceKey) -> u32 {
        self.balance(key).available()
    }

    /// Snapshot of a row. Untouched rows report the policy entitlement.
    pub fn balance(&self, key: &BalanceKey) -> LeaveBalance {
        self.balances
            .get(key)
            .map(|row| row.clone())
            .unwrap_or_else(|| {
                LeaveBalance::new(key.clone(), self.default_entitlement(key.leave_type))
            })
    }

    pub fn balances_for(&self, employee_id: &UserId) -> Vec<LeaveBalance> {
        let mut rows: Vec<LeaveBalance> = self
            .balances
            .iter()
            .filter(|row| &row.employee_id == employee_id)
            .map(|row| row.clone())
            .collect();
        rows.sort_by(|a, b| (a.year, a.leave_type).cmp(&(b.year, b.leave_type)));
        rows
    }

    /// Drop every row of an employee. Returns how many were removed.
    pub fn remove_employee(&self, employee_id: &UserId) -> usize {
        let before = self.balances.len();
        self.balances.retain(|key, _| &key.employee_id != employee_id);
        before - self.balances.len()
    }
}

fn underflow(key: &BalanceKey, operation: &'static str, days: u32) -> LedgerError {
    LedgerError::Underflow {
        key: key.clone(),
        operation,
        days,
    }
}
