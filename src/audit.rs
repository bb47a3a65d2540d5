// Activity log for committed project mutations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::progress::Percent;
use crate::workflow::{TransitionRecord, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ActivityAction {
    ProjectCreated,
    WorkflowTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
    MilestoneCreated {
        milestone_id: Uuid,
    },
    MilestoneUpdated {
        milestone_id: Uuid,
    },
    MilestoneValidated {
        milestone_id: Uuid,
    },
    MilestoneDeleted {
        milestone_id: Uuid,
    },
    MilestonesReordered,
    ProgressRecomputed {
        from: Percent,
        to: Percent,
    },
    DelaysDetected {
        milestone_ids: Vec<Uuid>,
    },
}

impl ActivityAction {
    pub fn name(&self) -> &'static str {
        match self {
            ActivityAction::ProjectCreated => "project_created",
            ActivityAction::WorkflowTransition { .. } => "workflow_transition",
            ActivityAction::MilestoneCreated { .. } => "milestone_created",
            ActivityAction::MilestoneUpdated { .. } => "milestone_updated",
            ActivityAction::MilestoneValidated { .. } => "milestone_validated",
            ActivityAction::MilestoneDeleted { .. } => "milestone_deleted",
            ActivityAction::MilestonesReordered => "milestones_reordered",
            ActivityAction::ProgressRecomputed { .. } => "progress_recomputed",
            ActivityAction::DelaysDetected { .. } => "delays_detected",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a project's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    /// `None` for system-initiated changes such as delay detection.
    pub actor_id: Option<Uuid>,
    pub action: ActivityAction,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        project_id: Uuid,
        actor_id: Option<Uuid>,
        action: ActivityAction,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            actor_id,
            action,
            description: description.into(),
            at,
        }
    }
}

impl From<&TransitionRecord> for ActivityRecord {
    fn from(record: &TransitionRecord) -> Self {
        ActivityRecord::new(
            record.project_id,
            Some(record.actor_id),
            ActivityAction::WorkflowTransition {
                from: record.from,
                to: record.to,
            },
            format!("Workflow status changed from {} to {}", record.from, record.to),
            record.at,
        )
    }
}

/// Destination for activity records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: ActivityRecord) -> Result<()>;
}

/// Keeps records in memory, mainly for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().await.clone()
    }

    pub async fn for_project(&self, project_id: Uuid) -> Vec<ActivityRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryActivityLog {
    async fn record(&self, record: ActivityRecord) -> Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Emits each record as a structured tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: ActivityRecord) -> Result<()> {
        info!(
            target: "project_monitor::activity",
            activity_id = %record.id,
            project_id = %record.project_id,
            actor_id = ?record.actor_id,
            action = %record.action,
            at = %record.at,
            "{}",
            record.description
        );
        Ok(())
    }
}
