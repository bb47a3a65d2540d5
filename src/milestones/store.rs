use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use super::graph::DependencyGraph;
use super::types::{Milestone, MilestoneStatus, NewMilestone};
use crate::error::{MonitorError, Result};
use crate::progress::Percent;
use crate::workflow::WorkflowStatus;

/// Ordered milestones of a single project.
///
/// The collection is always sorted by `order`, and orders are dense and
/// 1-based. Callers apply mutations to a cloned store and commit the whole
/// aggregate afterwards, so a rejected mutation never leaves partial state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Milestone>", into = "Vec<Milestone>")]
pub struct MilestoneStore {
    milestones: Vec<Milestone>,
}

impl From<Vec<Milestone>> for MilestoneStore {
    fn from(milestones: Vec<Milestone>) -> Self {
        Self::from_milestones(milestones)
    }
}

impl From<MilestoneStore> for Vec<Milestone> {
    fn from(store: MilestoneStore) -> Self {
        store.milestones
    }
}

impl MilestoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted rows, normalizing the order sequence.
    pub fn from_milestones(mut milestones: Vec<Milestone>) -> Self {
        milestones.sort_by_key(|m| m.order);
        let mut store = Self { milestones };
        store.renumber();
        store
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter()
    }

    pub fn as_slice(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.milestones.iter().map(|m| m.id).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, project_id: Uuid, id: Uuid) -> Result<&mut Milestone> {
        self.milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MonitorError::MilestoneNotFound {
                project_id,
                milestone_id: id,
            })
    }

    fn require(&self, project_id: Uuid, id: Uuid) -> Result<&Milestone> {
        self.get(id).ok_or(MonitorError::MilestoneNotFound {
            project_id,
            milestone_id: id,
        })
    }

    pub fn total_weight(&self) -> Percent {
        self.milestones.iter().map(|m| m.weight).sum()
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for milestone in &self.milestones {
            graph.add_node(milestone.id);
        }
        for milestone in &self.milestones {
            if let Some(dependency) = milestone.depends_on {
                // Persisted edges were checked on insertion; a cycle here means
                // the rows were edited outside the store, so the edge is skipped.
                if graph.insert_edge(milestone.id, dependency).is_err() {
                    tracing::warn!(
                        milestone_id = %milestone.id,
                        depends_on = %dependency,
                        "Ignoring cyclic dependency found in stored milestones"
                    );
                }
            }
        }
        graph
    }

    pub fn add(
        &mut self,
        project_id: Uuid,
        status: WorkflowStatus,
        new: NewMilestone,
    ) -> Result<&Milestone> {
        if !status.accepts_milestone_changes() {
            return Err(MonitorError::ProjectLocked {
                status,
                operation: "add milestones",
            });
        }
        if new.title.trim().is_empty() {
            return Err(MonitorError::InvalidMilestone {
                reason: "title must not be empty".to_string(),
            });
        }
        check_weight(new.weight)?;
        let total = self.total_weight().saturating_add(new.weight);
        if total > Percent::HUNDRED {
            return Err(MonitorError::WeightLimitExceeded { total });
        }
        if let Some(dependency) = new.depends_on {
            if self.get(dependency).is_none() {
                return Err(MonitorError::InvalidDependency {
                    reason: format!("milestone {dependency} is not part of project {project_id}"),
                });
            }
        }
        check_schedule(new.planned_start_date, new.planned_end_date)?;

        let order = u32::try_from(self.milestones.len() + 1).unwrap_or(u32::MAX);
        let milestone = Milestone {
            id: Uuid::new_v4(),
            project_id,
            title: new.title,
            description: new.description,
            weight: new.weight,
            status: MilestoneStatus::Pending,
            order,
            depends_on: new.depends_on,
            planned_start_date: new.planned_start_date,
            planned_end_date: new.planned_end_date,
            actual_start_date: None,
            actual_end_date: None,
            validated_by: None,
            validation_date: None,
            validation_comments: None,
        };

        info!(
            project_id = %project_id,
            milestone_id = %milestone.id,
            weight = %milestone.weight,
            order = milestone.order,
            "Milestone added"
        );
        let index = self.milestones.len();
        self.milestones.push(milestone);
        Ok(&self.milestones[index])
    }

    /// Change a milestone's weight, returning the previous weight.
    pub fn update_weight(
        &mut self,
        project_id: Uuid,
        status: WorkflowStatus,
        id: Uuid,
        weight: Percent,
    ) -> Result<Percent> {
        if !status.accepts_milestone_changes() {
            return Err(MonitorError::ProjectLocked {
                status,
                operation: "change milestone weights",
            });
        }
        check_weight(weight)?;
        let previous = self.require(project_id, id)?.weight;
        let total = self
            .total_weight()
            .saturating_sub(previous)
            .saturating_add(weight);
        if total > Percent::HUNDRED {
            return Err(MonitorError::WeightLimitExceeded { total });
        }

        self.get_mut(project_id, id)?.weight = weight;
        debug!(milestone_id = %id, from = %previous, to = %weight, "Milestone weight updated");
        Ok(previous)
    }

    /// Move a milestone to a new status, returning the previous one.
    ///
    /// Entering `in_progress` or `completed` records actual dates; leaving
    /// `completed` clears the completion date and any validation.
    pub fn set_status(
        &mut self,
        project_id: Uuid,
        workflow: WorkflowStatus,
        id: Uuid,
        status: MilestoneStatus,
        today: NaiveDate,
    ) -> Result<MilestoneStatus> {
        if workflow.is_terminal() {
            return Err(MonitorError::ProjectLocked {
                status: workflow,
                operation: "update milestone status",
            });
        }
        let milestone = self.get_mut(project_id, id)?;
        let previous = milestone.status;
        if previous == status {
            return Ok(previous);
        }

        match status {
            MilestoneStatus::InProgress => {
                milestone.actual_start_date.get_or_insert(today);
            }
            MilestoneStatus::Completed => {
                milestone.actual_start_date.get_or_insert(today);
                milestone.actual_end_date = Some(today);
            }
            MilestoneStatus::Pending | MilestoneStatus::Delayed => {}
        }
        if previous == MilestoneStatus::Completed {
            milestone.actual_end_date = None;
            milestone.clear_validation();
        }
        milestone.status = status;

        info!(
            project_id = %project_id,
            milestone_id = %id,
            from = %previous,
            to = %status,
            "Milestone status changed"
        );
        Ok(previous)
    }

    /// Record reviewer confirmation of a completed milestone.
    pub fn validate(
        &mut self,
        project_id: Uuid,
        id: Uuid,
        validator: Uuid,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Milestone> {
        let milestone = self.get_mut(project_id, id)?;
        if milestone.status != MilestoneStatus::Completed {
            return Err(MonitorError::NotCompleted(id));
        }
        milestone.validated_by = Some(validator);
        milestone.validation_date = Some(now);
        milestone.validation_comments = comments;

        info!(project_id = %project_id, milestone_id = %id, validator = %validator, "Milestone validated");
        Ok(&*milestone)
    }

    /// Set or clear `depends_on`. Cycles are rejected before anything changes.
    pub fn set_dependency(
        &mut self,
        project_id: Uuid,
        id: Uuid,
        depends_on: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        let current = self.require(project_id, id)?.depends_on;
        if let Some(dependency) = depends_on {
            if dependency == id {
                return Err(MonitorError::CyclicDependency {
                    milestone_id: id,
                    depends_on: dependency,
                });
            }
            if self.get(dependency).is_none() {
                return Err(MonitorError::InvalidDependency {
                    reason: format!("milestone {dependency} is not part of project {project_id}"),
                });
            }
            let mut graph = self.dependency_graph();
            graph.clear_dependencies(id);
            if let Err(cycle) = graph.insert_edge(id, dependency) {
                debug!(milestone_id = %id, cycle = ?cycle, "Rejected cyclic dependency");
                return Err(MonitorError::CyclicDependency {
                    milestone_id: id,
                    depends_on: dependency,
                });
            }
        }

        self.get_mut(project_id, id)?.depends_on = depends_on;
        Ok(current)
    }

    pub fn update_schedule(
        &mut self,
        project_id: Uuid,
        id: Uuid,
        planned_start_date: Option<NaiveDate>,
        planned_end_date: Option<NaiveDate>,
    ) -> Result<&Milestone> {
        check_schedule(planned_start_date, planned_end_date)?;
        let milestone = self.get_mut(project_id, id)?;
        milestone.planned_start_date = planned_start_date;
        milestone.planned_end_date = planned_end_date;
        Ok(&*milestone)
    }

    /// Apply a new order. `ordered_ids` must be a permutation of the current
    /// milestone set.
    pub fn reorder(&mut self, ordered_ids: &[Uuid]) -> Result<()> {
        let mismatch = || MonitorError::OrderMismatch {
            expected: self.milestones.len(),
            received: ordered_ids.len(),
        };
        if ordered_ids.len() != self.milestones.len() {
            return Err(mismatch());
        }
        let unique: HashSet<Uuid> = ordered_ids.iter().copied().collect();
        if unique.len() != ordered_ids.len() || self.milestones.iter().any(|m| !unique.contains(&m.id)) {
            return Err(mismatch());
        }

        for milestone in &mut self.milestones {
            if let Some(position) = ordered_ids.iter().position(|id| *id == milestone.id) {
                milestone.order = u32::try_from(position + 1).unwrap_or(u32::MAX);
            }
        }
        self.milestones.sort_by_key(|m| m.order);
        Ok(())
    }

    /// Delete a milestone. Only allowed while planning, and never for a
    /// milestone that others depend on.
    pub fn remove(&mut self, project_id: Uuid, status: WorkflowStatus, id: Uuid) -> Result<Milestone> {
        if status != WorkflowStatus::Draft {
            return Err(MonitorError::ProjectLocked {
                status,
                operation: "delete milestones",
            });
        }
        self.require(project_id, id)?;
        let dependents: Vec<Uuid> = self
            .milestones
            .iter()
            .filter(|m| m.depends_on == Some(id))
            .map(|m| m.id)
            .collect();
        if !dependents.is_empty() {
            return Err(MonitorError::DependencyViolation {
                milestone_id: id,
                dependents,
            });
        }

        let position = self
            .milestones
            .iter()
            .position(|m| m.id == id)
            .ok_or(MonitorError::MilestoneNotFound {
                project_id,
                milestone_id: id,
            })?;
        let removed = self.milestones.remove(position);
        self.renumber();
        info!(project_id = %project_id, milestone_id = %id, "Milestone deleted");
        Ok(removed)
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<&Milestone> {
        self.milestones.iter().filter(|m| m.is_overdue(today)).collect()
    }

    /// Flag overdue milestones as delayed. Returns the ids that changed.
    pub fn mark_delayed(&mut self, today: NaiveDate) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for milestone in &mut self.milestones {
            if milestone.is_overdue(today) && milestone.status != MilestoneStatus::Delayed {
                milestone.status = MilestoneStatus::Delayed;
                changed.push(milestone.id);
            }
        }
        changed
    }

    fn renumber(&mut self) {
        for (index, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.order = u32::try_from(index + 1).unwrap_or(u32::MAX);
        }
    }
}

fn check_weight(weight: Percent) -> Result<()> {
    if weight.is_valid_weight() {
        Ok(())
    } else {
        Err(MonitorError::InvalidWeight {
            reason: format!("{weight}% is outside 0.00..=100.00"),
        })
    }
}

fn check_schedule(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(MonitorError::InvalidSchedule {
            reason: format!("planned end {end} is before planned start {start}"),
        }),
        _ => Ok(()),
    }
}
