use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::milestones::MilestoneStore;
use crate::progress::Percent;
use crate::workflow::WorkflowStatus;

/// A monitored project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub workflow_status: WorkflowStatus,
    /// Written only by the progress aggregator.
    pub automated_progress: Percent,
    #[serde(default)]
    pub last_progress_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    /// Bumped on every milestone mutation.
    #[serde(default)]
    pub milestone_revision: u64,
    /// Milestone revision covered by the stored progress value.
    #[serde(default)]
    pub progress_revision: Option<u64>,
}

impl Project {
    pub fn new(name: impl Into<String>, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_by,
            created_at: now,
            workflow_status: WorkflowStatus::Draft,
            automated_progress: Percent::ZERO,
            last_progress_update: None,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
            validated_at: None,
            milestone_revision: 0,
            progress_revision: None,
        }
    }

    /// Whether the stored progress was computed from the current milestones.
    pub fn progress_is_current(&self) -> bool {
        self.progress_revision == Some(self.milestone_revision)
    }
}

/// A project together with the milestones it owns and its concurrency token.
///
/// The aggregate is the unit of persistence: it is loaded, mutated in memory
/// and saved back with an optimistic version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub project: Project,
    #[serde(default)]
    pub milestones: MilestoneStore,
    #[serde(default)]
    pub version: u64,
}

impl ProjectAggregate {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            milestones: MilestoneStore::new(),
            version: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.project.id
    }

    pub fn status(&self) -> WorkflowStatus {
        self.project.workflow_status
    }

    pub(crate) fn touch_milestones(&mut self) {
        self.project.milestone_revision = self.project.milestone_revision.wrapping_add(1);
    }
}
