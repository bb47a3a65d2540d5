use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::policy::{Actor, AuthorizationPolicy, Permission};
use super::status::{TransitionEdge, WorkflowStatus};
use crate::error::{MonitorError, Result};
use crate::project::Project;

/// Outcome of an applied transition, kept for the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub project_id: Uuid,
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn edge(&self) -> TransitionEdge {
        TransitionEdge::new(self.from, self.to)
    }
}

/// Validates and applies workflow transitions.
///
/// The engine only touches workflow fields. Progress belongs to the
/// aggregator and persistence to the service.
#[derive(Clone)]
pub struct WorkflowEngine {
    policy: Arc<dyn AuthorizationPolicy>,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<dyn AuthorizationPolicy> {
        &self.policy
    }

    /// Check that `actor` may move `project` to `target` without changing it.
    pub fn check_transition(
        &self,
        project: &Project,
        target: WorkflowStatus,
        actor: &Actor,
    ) -> Result<TransitionEdge> {
        let edge = TransitionEdge::new(project.workflow_status, target);
        if !edge.is_legal() {
            warn!(
                project_id = %project.id,
                from = %edge.from,
                to = %edge.to,
                "Rejected illegal workflow transition"
            );
            return Err(MonitorError::InvalidTransition {
                from: edge.from,
                to: edge.to,
            });
        }

        let permission = Permission::Transition(edge);
        if !self.policy.can_perform(actor, &permission) {
            warn!(
                project_id = %project.id,
                actor_id = %actor.id,
                role = %actor.role,
                edge = %edge,
                "Rejected unauthorized workflow transition"
            );
            return Err(MonitorError::Unauthorized {
                actor_id: actor.id,
                role: actor.role,
                permission,
            });
        }
        Ok(edge)
    }

    /// Apply a transition in place. On error `project` is left untouched.
    pub fn apply_transition(
        &self,
        project: &mut Project,
        target: WorkflowStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TransitionRecord> {
        let edge = self.check_transition(project, target, actor)?;

        match (edge.from, edge.to) {
            (WorkflowStatus::Draft, WorkflowStatus::Submitted) => {
                project.submitted_at = Some(now);
            }
            (WorkflowStatus::Submitted, WorkflowStatus::SecretariatApproved) => {
                project.approved_at = Some(now);
                project.approved_by = Some(actor.id);
            }
            (WorkflowStatus::Submitted, WorkflowStatus::Draft) => {
                project.submitted_at = None;
            }
            (WorkflowStatus::CompiledForSecretariat, WorkflowStatus::ValidatedBySecretariat) => {
                project.validated_at = Some(now);
            }
            _ => {}
        }
        project.workflow_status = target;

        info!(
            project_id = %project.id,
            from = %edge.from,
            to = %edge.to,
            actor_id = %actor.id,
            "Workflow transition applied: {}",
            edge.label()
        );

        Ok(TransitionRecord {
            project_id: project.id,
            from: edge.from,
            to: edge.to,
            actor_id: actor.id,
            at: now,
        })
    }
}
