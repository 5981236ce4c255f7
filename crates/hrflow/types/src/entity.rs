//! Entity references and the tagged entity variant

use crate::{LeaveRequest, OnboardingRecord, Ticket, Versioned};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Onboarding,
    Leave,
    Ticket,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Onboarding => "onboarding",
            EntityType::Leave => "leave",
            EntityType::Ticket => "ticket",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-tagged pointer to an entity
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn onboarding(employee_id: impl Into<String>) -> Self {
        Self::new(EntityType::Onboarding, employee_id)
    }

    pub fn leave(id: impl Into<String>) -> Self {
        Self::new(EntityType::Leave, id)
    }

    pub fn ticket(id: impl Into<String>) -> Self {
        Self::new(EntityType::Ticket, id)
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// Any of the three workflow entities
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity", rename_all = "snake_case")]
pub enum Entity {
    Onboarding(OnboardingRecord),
    Leave(LeaveRequest),
    Ticket(Ticket),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Onboarding(_) => EntityType::Onboarding,
            Entity::Leave(_) => EntityType::Leave,
            Entity::Ticket(_) => EntityType::Ticket,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type(), self.key())
    }

    pub fn status_name(&self) -> &'static str {
        use crate::WorkflowStatus;
        match self {
            Entity::Onboarding(r) => r.status.as_str(),
            Entity::Leave(l) => l.status.as_str(),
            Entity::Ticket(t) => t.status.as_str(),
        }
    }
}

impl Versioned for Entity {
    fn version(&self) -> u64 {
        match self {
            Entity::Onboarding(r) => r.version(),
            Entity::Leave(l) => l.version(),
            Entity::Ticket(t) => t.version(),
        }
    }

    fn key(&self) -> String {
        match self {
            Entity::Onboarding(r) => r.key(),
            Entity::Leave(l) => l.key(),
            Entity::Ticket(t) => t.key(),
        }
    }

    fn touch(&mut self, at: chrono::DateTime<chrono::Utc>) {
        match self {
            Entity::Onboarding(r) => r.touch(at),
            Entity::Leave(l) => l.touch(at),
            Entity::Ticket(t) => t.touch(at),
        }
    }
}

impl From<OnboardingRecord> for Entity {
    fn from(record: OnboardingRecord) -> Self {
        Entity::Onboarding(record)
    }
}

impl From<LeaveRequest> for Entity {
    fn from(request: LeaveRequest) -> Self {
        Entity::Leave(request)
    }
}

impl From<Ticket> for Entity {
    fn from(ticket: Ticket) -> Self {
        Entity::Ticket(ticket)
    }
}
