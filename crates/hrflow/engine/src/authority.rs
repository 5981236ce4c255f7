//! Role model: who may fire a transition edge
//!
//! An edge names an [`Authority`]. Capability checks follow the role
//! privilege order; ownership checks compare the actor with the entity's
//! employee and ignore the role.

use hrflow_types::{Actor, Capability, GuardFailure, LeaveType, UserId, WorkflowError, WorkflowResult};
use serde::Serialize;

/// Permission required to traverse an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Only the employee the entity belongs to
    Owner,
    /// Any actor whose role grants the capability
    Capability(Capability),
    /// The owner, or any actor whose role grants the capability
    OwnerOr(Capability),
}

impl Authority {
    pub fn permits(self, actor: &Actor, owner: &UserId) -> bool {
        match self {
            Authority::Owner => actor.owns(owner),
            Authority::Capability(cap) => actor.can(cap),
            Authority::OwnerOr(cap) => actor.owns(owner) || actor.can(cap),
        }
    }

    /// Fails with `Forbidden` when the actor lacks this authority
    pub fn authorize(self, actor: &Actor, owner: &UserId) -> WorkflowResult<()> {
        if self.permits(actor, owner) {
            return Ok(());
        }
        let reason = match self {
            Authority::Owner => format!("{} does not own this record", actor.id),
            Authority::Capability(cap) => {
                format!("role {} lacks capability {}", actor.role, cap)
            }
            Authority::OwnerOr(cap) => format!(
                "{} is not the owner and role {} lacks capability {}",
                actor.id, actor.role, cap
            ),
        };
        Err(WorkflowError::Forbidden(reason))
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authority::Owner => f.write_str("owner"),
            Authority::Capability(cap) => write!(f, "{}", cap),
            Authority::OwnerOr(cap) => write!(f, "owner | {}", cap),
        }
    }
}

/// Require a capability outside of a transition table
pub fn require(actor: &Actor, capability: Capability) -> WorkflowResult<()> {
    Authority::Capability(capability).authorize(actor, &actor.id)
}

/// Leave-type eligibility, checked when a request is created
pub fn check_leave_eligibility(actor: &Actor, leave_type: LeaveType) -> Result<(), GuardFailure> {
    match leave_type.required_gender() {
        None => Ok(()),
        Some(required) if actor.gender == Some(required) => Ok(()),
        Some(_) => Err(GuardFailure::IneligibleLeaveType(leave_type)),
    }
}
