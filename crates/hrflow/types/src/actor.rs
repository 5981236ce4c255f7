//! Roles, capabilities and the acting principal
//!
//! Roles form a privilege order (`Admin` ⊇ `Hr` ⊇ `Employee`) for
//! administrative transitions. Ownership is a separate axis: an actor
//! owns an entity when its id matches the entity's employee, whatever
//! its role.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Platform role of an actor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Hr,
    Admin,
}

impl Role {
    /// Position in the privilege order (higher grants more)
    pub fn rank(self) -> u8 {
        match self {
            Role::Employee => 0,
            Role::Hr => 1,
            Role::Admin => 2,
        }
    }

    /// Whether this role includes every grant of `other`
    pub fn includes(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    /// HR or admin
    pub fn is_staff(self) -> bool {
        self.includes(Role::Hr)
    }

    pub fn grants(self, capability: Capability) -> bool {
        capability.minimum_role().rank() <= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::Hr => "HR",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative capabilities, granted by role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    InviteEmployee,
    ReviewOnboarding,
    DecideLeave,
    ManageTickets,
    PostInternalComment,
    ManageEntitlements,
    DeleteEmployee,
}

impl Capability {
    pub fn minimum_role(self) -> Role {
        match self {
            Capability::DeleteEmployee => Role::Admin,
            Capability::InviteEmployee
            | Capability::ReviewOnboarding
            | Capability::DecideLeave
            | Capability::ManageTickets
            | Capability::PostInternalComment
            | Capability::ManageEntitlements => Role::Hr,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::InviteEmployee => "invite_employee",
            Capability::ReviewOnboarding => "review_onboarding",
            Capability::DecideLeave => "decide_leave",
            Capability::ManageTickets => "manage_tickets",
            Capability::PostInternalComment => "post_internal_comment",
            Capability::ManageEntitlements => "manage_entitlements",
            Capability::DeleteEmployee => "delete_employee",
        };
        f.write_str(name)
    }
}

/// Gender as recorded on the employee profile. Only consulted for
/// leave-type eligibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

/// Who is performing an action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            role,
            gender: None,
        }
    }

    pub fn employee(id: impl Into<String>) -> Self {
        Self::new(id, Role::Employee)
    }

    pub fn hr(id: impl Into<String>) -> Self {
        Self::new(id, Role::Hr)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn owns(&self, owner: &UserId) -> bool {
        &self.id == owner
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}
