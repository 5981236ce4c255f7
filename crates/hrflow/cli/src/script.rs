//! Replaying command scripts against an in-memory engine
//!
//! A script names a set of sessions, optional entitlement overrides and a
//! list of steps. Each step runs one [`TransitionCommand`] as the actor
//! behind its session. A step may bind the created entity's id to an
//! alias; later steps refer to it as `"@alias"` anywhere a string is
//! expected.

use anyhow::{bail, Context};
use hrflow_engine::{resolve_actor, StaticActorResolver, WorkflowOrchestrator};
use hrflow_types::{
    Actor, AuditEntry, Entity, ErrorBody, LeaveType, TransitionCommand, UserId, Versioned,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Session token -> actor
    #[serde(default)]
    pub actors: BTreeMap<String, Actor>,
    #[serde(default)]
    pub entitlements: Vec<EntitlementOverride>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct EntitlementOverride {
    /// Session performing the change
    pub session: String,
    pub employee_id: UserId,
    pub leave_type: LeaveType,
    pub year: i32,
    pub days: u32,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub session: String,
    pub command: Value,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Result of one step as printed by `hrflow run`
#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub session: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub audit: Vec<AuditEntry>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn run(self, engine: &WorkflowOrchestrator) -> anyhow::Result<Report> {
        let resolver = StaticActorResolver::new();
        for (token, actor) in self.actors {
            resolver.insert(token, actor);
        }

        for seed in &self.entitlements {
            let actor = resolve_actor(&resolver, &seed.session)?;
            engine
                .set_entitlement(&actor, &seed.employee_id, seed.leave_type, seed.year, seed.days)
                .with_context(|| format!("setting entitlement for {}", seed.employee_id))?;
        }

        let mut aliases: BTreeMap<String, String> = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.into_iter().enumerate() {
            let number = index + 1;
            let command = substitute_aliases(step.command, &aliases)
                .with_context(|| format!("step {number}"))?;
            let command: TransitionCommand = serde_json::from_value(command)
                .with_context(|| format!("step {number}: invalid command"))?;

            let result = resolve_actor(&resolver, &step.session)
                .and_then(|actor| engine.execute(&actor, command));

            let outcome = match result {
                Ok(entity) => {
                    if let Some(alias) = step.alias {
                        aliases.insert(alias, entity.key());
                    }
                    tracing::debug!(step = number, entity = %entity.entity_ref(), "Step applied");
                    StepOutcome {
                        step: number,
                        session: step.session,
                        entity: Some(entity),
                        error: None,
                    }
                }
                Err(err) => {
                    tracing::debug!(step = number, error = %err, "Step refused");
                    StepOutcome {
                        step: number,
                        session: step.session,
                        entity: None,
                        error: Some(ErrorBody::from(err)),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(Report {
            steps: outcomes,
            audit: engine.audit_log().all(),
        })
    }
}

/// Replace every `"@alias"` string with the id bound to that alias
fn substitute_aliases(value: Value, aliases: &BTreeMap<String, String>) -> anyhow::Result<Value> {
    Ok(match value {
        Value::String(s) => match s.strip_prefix('@') {
            Some(name) => match aliases.get(name) {
                Some(id) => Value::String(id.clone()),
                None => bail!("unknown alias @{name}"),
            },
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| substitute_aliases(v, aliases))
                .collect::<anyhow::Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| Ok((k, substitute_aliases(v, aliases)?)))
                .collect::<anyhow::Result<_>>()?,
        ),
        other => other,
    })
}
