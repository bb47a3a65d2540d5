use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::percent::Percent;
use crate::error::{MonitorError, Result};
use crate::milestones::MilestoneStore;
use crate::project::ProjectAggregate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSettings {
    /// Treat unbalanced weights as a hard error once milestones start
    /// counting toward progress.
    #[serde(default)]
    pub strict_weights: bool,
}

/// Advisory conditions noticed while computing progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProgressWarning {
    InconsistentWeights { total: Percent },
}

/// Pure progress figures for a set of milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressComputation {
    pub progress: Percent,
    /// Raw sum before clamping.
    pub applied_weight: Percent,
    pub total_weight: Percent,
    pub counted_milestones: usize,
    pub warnings: Vec<ProgressWarning>,
}

impl ProgressComputation {
    pub fn remaining_weight(&self) -> Percent {
        self.total_weight.saturating_sub(self.applied_weight)
    }
}

/// Weighted sum of completed-and-validated milestones, clamped to [0, 100].
/// Weights are never re-normalized.
pub fn compute_progress(milestones: &MilestoneStore) -> ProgressComputation {
    let counted: Vec<Percent> = milestones
        .iter()
        .filter(|m| m.counts_toward_progress())
        .map(|m| m.weight)
        .collect();
    let applied_weight: Percent = counted.iter().sum();
    let total_weight = milestones.total_weight();

    let mut warnings = Vec::new();
    if !milestones.is_empty() && total_weight != Percent::HUNDRED {
        warnings.push(ProgressWarning::InconsistentWeights {
            total: total_weight,
        });
    }

    ProgressComputation {
        progress: applied_weight.clamped(),
        applied_weight,
        total_weight,
        counted_milestones: counted.len(),
        warnings,
    }
}

/// Result of a recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressOutcome {
    pub project_id: Uuid,
    pub previous: Percent,
    pub progress: Percent,
    /// False when the stored value was already current and nothing was written.
    pub written: bool,
    pub last_progress_update: Option<DateTime<Utc>>,
    pub computation: ProgressComputation,
}

impl ProgressOutcome {
    pub fn warnings(&self) -> &[ProgressWarning] {
        &self.computation.warnings
    }

    pub fn changed_value(&self) -> bool {
        self.previous != self.progress
    }
}

/// Sole writer of a project's `automated_progress`.
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    settings: ProgressSettings,
}

impl ProgressAggregator {
    pub fn new(settings: ProgressSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    /// Recompute progress in place.
    ///
    /// When the stored value already reflects the current milestone revision
    /// and equals the computed value this is a no-op: neither the value nor
    /// `last_progress_update` changes.
    pub fn recompute(&self, aggregate: &mut ProjectAggregate, now: DateTime<Utc>) -> Result<ProgressOutcome> {
        let project_id = aggregate.id();
        let computation = compute_progress(&aggregate.milestones);

        for warning in &computation.warnings {
            let ProgressWarning::InconsistentWeights { total } = warning;
            warn!(
                project_id = %project_id,
                total_weight = %total,
                "Milestone weights do not total 100%; reporting raw weighted sum"
            );
            if self.settings.strict_weights && computation.counted_milestones > 0 {
                return Err(MonitorError::InconsistentWeights {
                    project_id,
                    total: *total,
                });
            }
        }

        let project = &mut aggregate.project;
        let previous = project.automated_progress;
        if project.progress_is_current() && previous == computation.progress {
            debug!(project_id = %project_id, progress = %previous, "Progress already current");
            return Ok(ProgressOutcome {
                project_id,
                previous,
                progress: previous,
                written: false,
                last_progress_update: project.last_progress_update,
                computation,
            });
        }

        project.automated_progress = computation.progress;
        project.last_progress_update = Some(now);
        project.progress_revision = Some(project.milestone_revision);

        info!(
            project_id = %project_id,
            from = %previous,
            to = %computation.progress,
            counted_milestones = computation.counted_milestones,
            "Automated progress recomputed"
        );

        Ok(ProgressOutcome {
            project_id,
            previous,
            progress: computation.progress,
            written: true,
            last_progress_update: project.last_progress_update,
            computation,
        })
    }
}
