// Role-based authorization for workflow edges and milestone operations

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use super::status::{TransitionEdge, WorkflowStatus};

/// User roles of the monitoring office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// LGU implementing unit that owns and executes the project
    ImplementingUnit,
    /// External implementing unit (contractor side)
    ExternalImplementingUnit,
    /// Monitoring and evaluation secretariat
    Secretariat,
    /// Read-only executive viewer
    Executive,
    SystemAdministrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ImplementingUnit => "implementing_unit",
            Role::ExternalImplementingUnit => "external_implementing_unit",
            Role::Secretariat => "secretariat",
            Role::Executive => "executive",
            Role::SystemAdministrator => "system_administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Convenience constructor with a fresh identity.
    pub fn with_role(role: Role) -> Self {
        Self::new(Uuid::new_v4(), role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Transition(TransitionEdge),
    ManageMilestones,
    ValidateMilestone,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Transition(edge) => write!(f, "perform {edge}"),
            Permission::ManageMilestones => f.write_str("manage milestones"),
            Permission::ValidateMilestone => f.write_str("validate milestones"),
        }
    }
}

/// Authorization check consumed by the service. Which role may take which
/// edge is policy input, not part of the workflow itself.
#[cfg_attr(test, automock)]
pub trait AuthorizationPolicy: Send + Sync {
    fn can_perform(&self, actor: &Actor, permission: &Permission) -> bool;
}

/// Table-driven policy mapping each permission to the roles holding it.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    grants: HashMap<Permission, HashSet<Role>>,
}

impl RolePolicy {
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    pub fn grant(mut self, permission: Permission, roles: &[Role]) -> Self {
        self.grants
            .entry(permission)
            .or_default()
            .extend(roles.iter().copied());
        self
    }

    fn grant_edge(self, from: WorkflowStatus, to: WorkflowStatus, roles: &[Role]) -> Self {
        self.grant(Permission::Transition(TransitionEdge::new(from, to)), roles)
    }

    /// Replace the roles for a permission entirely.
    pub fn set(&mut self, permission: Permission, roles: impl IntoIterator<Item = Role>) {
        self.grants.insert(permission, roles.into_iter().collect());
    }

    pub fn roles_for(&self, permission: &Permission) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .grants
            .get(permission)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default();
        roles.sort_by_key(|role| role.as_str());
        roles
    }

    /// Apply overrides keyed by `"from->to"`, `"manage_milestones"` or
    /// `"validate_milestones"`.
    pub fn with_overrides(mut self, overrides: &HashMap<String, Vec<Role>>) -> Result<Self, String> {
        for (key, roles) in overrides {
            let permission = match key.as_str() {
                "manage_milestones" => Permission::ManageMilestones,
                "validate_milestones" => Permission::ValidateMilestone,
                edge => {
                    let edge: TransitionEdge = edge.parse()?;
                    if !edge.is_legal() {
                        return Err(format!("'{edge}' is not a legal workflow transition"));
                    }
                    Permission::Transition(edge)
                }
            };
            self.set(permission, roles.iter().copied());
        }
        Ok(self)
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        use Role::*;
        use WorkflowStatus::*;

        let mut policy = RolePolicy::empty()
            .grant_edge(Draft, Submitted, &[ImplementingUnit])
            .grant_edge(Submitted, SecretariatApproved, &[Secretariat])
            .grant_edge(Submitted, Draft, &[Secretariat])
            .grant_edge(SecretariatApproved, Ongoing, &[ImplementingUnit, Secretariat])
            .grant_edge(
                Ongoing,
                CompiledForSecretariat,
                &[ImplementingUnit, ExternalImplementingUnit],
            )
            .grant_edge(Ongoing, Completed, &[Secretariat])
            .grant_edge(Ongoing, Cancelled, &[Secretariat])
            .grant_edge(CompiledForSecretariat, ValidatedBySecretariat, &[Secretariat])
            .grant_edge(CompiledForSecretariat, Ongoing, &[Secretariat])
            .grant_edge(ValidatedBySecretariat, Completed, &[Secretariat])
            .grant(
                Permission::ManageMilestones,
                &[ImplementingUnit, ExternalImplementingUnit],
            )
            .grant(Permission::ValidateMilestone, &[Secretariat]);

        for from in WorkflowStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            policy = policy.grant_edge(*from, Cancelled, &[SystemAdministrator]);
        }
        policy
    }
}

impl AuthorizationPolicy for RolePolicy {
    fn can_perform(&self, actor: &Actor, permission: &Permission) -> bool {
        self.grants
            .get(permission)
            .is_some_and(|roles| roles.contains(&actor.role))
    }
}
