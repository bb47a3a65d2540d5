use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::progress::Percent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delayed,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Delayed => "delayed",
        }
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(MilestoneStatus::Pending),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "completed" => Ok(MilestoneStatus::Completed),
            "delayed" => Ok(MilestoneStatus::Delayed),
            other => Err(format!("unknown milestone status '{other}'")),
        }
    }
}

/// A weighted unit of work owned by exactly one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weight: Percent,
    #[serde(default)]
    pub status: MilestoneStatus,
    pub order: u32,
    #[serde(default)]
    pub depends_on: Option<Uuid>,
    #[serde(default)]
    pub planned_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub validated_by: Option<Uuid>,
    #[serde(default)]
    pub validation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validation_comments: Option<String>,
}

impl Milestone {
    /// Only completed milestones confirmed by a reviewer count toward progress.
    pub fn counts_toward_progress(&self) -> bool {
        self.status == MilestoneStatus::Completed && self.validated_by.is_some()
    }

    pub fn is_validated(&self) -> bool {
        self.validated_by.is_some()
    }

    /// Overdue when unfinished past its planned end date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != MilestoneStatus::Completed
            && self.planned_end_date.is_some_and(|end| end < today)
    }

    pub(crate) fn clear_validation(&mut self) {
        self.validated_by = None;
        self.validation_date = None;
        self.validation_comments = None;
    }
}

/// Input for creating a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weight: Percent,
    #[serde(default)]
    pub depends_on: Option<Uuid>,
    #[serde(default)]
    pub planned_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_end_date: Option<NaiveDate>,
}

impl NewMilestone {
    pub fn new(title: impl Into<String>, weight: Percent) -> Self {
        Self {
            title: title.into(),
            description: None,
            weight,
            depends_on: None,
            planned_start_date: None,
            planned_end_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, milestone_id: Uuid) -> Self {
        self.depends_on = Some(milestone_id);
        self
    }

    pub fn planned(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.planned_start_date = Some(start);
        self.planned_end_date = Some(end);
        self
    }
}
