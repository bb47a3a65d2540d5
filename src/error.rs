use thiserror::Error;
use uuid::Uuid;

use crate::progress::Percent;
use crate::workflow::{Permission, Role, WorkflowStatus};

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced by the project monitoring core.
///
/// Every variant except `ConcurrencyConflict` and `Storage` is raised before
/// anything is persisted, so a failed operation leaves the project untouched.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid workflow transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    #[error("actor {actor_id} ({role}) is not allowed to {permission}")]
    Unauthorized {
        actor_id: Uuid,
        role: Role,
        permission: Permission,
    },

    #[error("milestone weights for project {project_id} total {total}%, expected 100.00%")]
    InconsistentWeights { project_id: Uuid, total: Percent },

    #[error("milestone {milestone_id} cannot depend on {depends_on}: dependency cycle")]
    CyclicDependency { milestone_id: Uuid, depends_on: Uuid },

    #[error("reorder list does not match the project's milestones (expected {expected}, got {received})")]
    OrderMismatch { expected: usize, received: usize },

    #[error("milestone {milestone_id} is a dependency of {} other milestone(s)", dependents.len())]
    DependencyViolation {
        milestone_id: Uuid,
        dependents: Vec<Uuid>,
    },

    #[error("project {project_id} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrencyConflict {
        project_id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("milestone {milestone_id} not found in project {project_id}")]
    MilestoneNotFound { project_id: Uuid, milestone_id: Uuid },

    #[error("cannot {operation} while project is {status}")]
    ProjectLocked {
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error("invalid milestone weight: {reason}")]
    InvalidWeight { reason: String },

    #[error("milestone weights would total {total}%, exceeding 100.00%")]
    WeightLimitExceeded { total: Percent },

    #[error("invalid dependency: {reason}")]
    InvalidDependency { reason: String },

    #[error("invalid milestone: {reason}")]
    InvalidMilestone { reason: String },

    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("milestone {0} must be completed before it can be validated")]
    NotCompleted(Uuid),

    #[error("storage error: {0}")]
    Storage(String),
}

impl MonitorError {
    /// Blocking errors abort the operation; the rest are advisory.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, MonitorError::InconsistentWeights { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MonitorError::ConcurrencyConflict { .. })
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        MonitorError::Storage(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for MonitorError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        MonitorError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Storage(format!("serialization failed: {err}"))
    }
}
