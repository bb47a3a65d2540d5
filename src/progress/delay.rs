use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::percent::Percent;
use crate::milestones::{MilestoneStatus, MilestoneStore};

/// How badly a project is behind schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelaySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for DelaySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelaySeverity::Low => "low",
            DelaySeverity::Medium => "medium",
            DelaySeverity::High => "high",
            DelaySeverity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Day and weight thresholds for each severity level. A level is reached
/// when either its day or its weight threshold is met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayThresholds {
    pub critical_days: i64,
    pub critical_weight: Percent,
    pub high_days: i64,
    pub high_weight: Percent,
    pub medium_days: i64,
    pub medium_weight: Percent,
}

impl Default for DelayThresholds {
    fn default() -> Self {
        Self {
            critical_days: 30,
            critical_weight: Percent::whole(50),
            high_days: 14,
            high_weight: Percent::whole(30),
            medium_days: 7,
            medium_weight: Percent::whole(15),
        }
    }
}

impl DelayThresholds {
    pub fn classify(&self, max_days_overdue: i64, overdue_weight: Percent) -> DelaySeverity {
        if max_days_overdue >= self.critical_days || overdue_weight >= self.critical_weight {
            DelaySeverity::Critical
        } else if max_days_overdue >= self.high_days || overdue_weight >= self.high_weight {
            DelaySeverity::High
        } else if max_days_overdue >= self.medium_days || overdue_weight >= self.medium_weight {
            DelaySeverity::Medium
        } else {
            DelaySeverity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueMilestone {
    pub id: Uuid,
    pub title: String,
    pub planned_end_date: NaiveDate,
    pub days_overdue: i64,
    pub weight: Percent,
    pub status: MilestoneStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayReport {
    pub project_id: Uuid,
    pub assessed_on: NaiveDate,
    /// Sorted by planned end date, earliest first.
    pub overdue: Vec<OverdueMilestone>,
    pub max_days_overdue: i64,
    pub overdue_weight: Percent,
    /// `None` when nothing is overdue.
    pub severity: Option<DelaySeverity>,
    /// Milestones newly flagged as delayed by this assessment.
    #[serde(default)]
    pub newly_delayed: Vec<Uuid>,
}

impl DelayReport {
    pub fn is_delayed(&self) -> bool {
        !self.overdue.is_empty()
    }

    pub fn first_overdue_date(&self) -> Option<NaiveDate> {
        self.overdue.first().map(|m| m.planned_end_date)
    }
}

/// Find unfinished milestones past their planned end date.
pub fn assess_delays(
    project_id: Uuid,
    milestones: &MilestoneStore,
    today: NaiveDate,
    thresholds: &DelayThresholds,
) -> DelayReport {
    let mut overdue: Vec<OverdueMilestone> = milestones
        .overdue(today)
        .into_iter()
        .filter_map(|m| {
            let end = m.planned_end_date?;
            Some(OverdueMilestone {
                id: m.id,
                title: m.title.clone(),
                planned_end_date: end,
                days_overdue: (today - end).num_days(),
                weight: m.weight,
                status: m.status,
            })
        })
        .collect();
    overdue.sort_by_key(|m| m.planned_end_date);

    let max_days_overdue = overdue.iter().map(|m| m.days_overdue).max().unwrap_or(0);
    let overdue_weight: Percent = overdue.iter().map(|m| m.weight).sum();
    let severity = (!overdue.is_empty()).then(|| thresholds.classify(max_days_overdue, overdue_weight));

    DelayReport {
        project_id,
        assessed_on: today,
        overdue,
        max_days_overdue,
        overdue_weight,
        severity,
        newly_delayed: Vec::new(),
    }
}
