// Project service: serializes writers per project and commits each change
// and its activity records as one versioned save.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::audit::{ActivityAction, ActivityRecord, AuditSink};
use crate::config::ProjectMonitorConfig;
use crate::error::{MonitorError, Result};
use crate::milestones::{Milestone, MilestoneStatus, NewMilestone};
use crate::observability::{monitor_metrics, OperationTimer};
use crate::progress::{
    assess_delays, DelayReport, DelayThresholds, Percent, ProgressAggregator, ProgressOutcome,
    ProgressSettings,
};
use crate::project::{Project, ProjectAggregate};
use crate::repository::ProjectRepository;
use crate::telemetry::{create_operation_span, generate_correlation_id};
use crate::workflow::{
    Actor, AuthorizationPolicy, Permission, TransitionRecord, WorkflowEngine, WorkflowStatus,
};

/// Result of a committed mutation.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// Aggregate as persisted, including the new version.
    pub aggregate: ProjectAggregate,
    pub value: T,
    /// Present when the mutation recomputed progress.
    pub progress: Option<ProgressOutcome>,
}

impl<T> Committed<T> {
    pub fn project(&self) -> &Project {
        &self.aggregate.project
    }

    pub fn version(&self) -> u64 {
        self.aggregate.version
    }
}

struct Staged<T> {
    value: T,
    progress: Option<ProgressOutcome>,
    activity: Vec<ActivityRecord>,
    /// `false` when the stage left the aggregate as loaded.
    changed: bool,
}

struct MilestoneEdit<T> {
    value: T,
    action: ActivityAction,
    description: String,
    affects_progress: bool,
    changed: bool,
}

type LockTable = StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>;

/// Holds one project's writer lock. Dropping the last holder removes the
/// project's entry from the table.
struct ProjectGuard<'a> {
    locks: &'a LockTable,
    project_id: Uuid,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProjectGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.project_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.project_id);
        }
    }
}

pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    engine: WorkflowEngine,
    aggregator: ProgressAggregator,
    audit: Arc<dyn AuditSink>,
    delay_thresholds: DelayThresholds,
    locks: LockTable,
}

impl std::fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectService")
            .field("engine", &self.engine)
            .field("aggregator", &self.aggregator)
            .field("delay_thresholds", &self.delay_thresholds)
            .finish_non_exhaustive()
    }
}

impl ProjectService {
    pub fn new(
        repository: Arc<dyn ProjectRepository>,
        policy: Arc<dyn AuthorizationPolicy>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            repository,
            engine: WorkflowEngine::new(policy),
            aggregator: ProgressAggregator::default(),
            audit,
            delay_thresholds: DelayThresholds::default(),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Build a service using the configured role policy, progress settings
    /// and delay thresholds.
    pub fn from_config(
        config: &ProjectMonitorConfig,
        repository: Arc<dyn ProjectRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> anyhow::Result<Self> {
        let policy = config.role_policy()?;
        Ok(Self::new(repository, Arc::new(policy), audit)
            .with_progress_settings(config.progress.clone())
            .with_delay_thresholds(config.delays.clone()))
    }

    pub fn with_progress_settings(mut self, settings: ProgressSettings) -> Self {
        self.aggregator = ProgressAggregator::new(settings);
        self
    }

    pub fn with_delay_thresholds(mut self, thresholds: DelayThresholds) -> Self {
        self.delay_thresholds = thresholds;
        self
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    // --- reads -------------------------------------------------------------

    pub async fn project(&self, project_id: Uuid) -> Result<ProjectAggregate> {
        self.load_aggregate(project_id).await
    }

    /// Stored progress. Does not wait for in-flight writers.
    pub async fn progress(&self, project_id: Uuid) -> Result<Percent> {
        Ok(self.load_aggregate(project_id).await?.project.automated_progress)
    }

    pub async fn list_projects(&self) -> Result<Vec<Uuid>> {
        self.repository.list().await
    }

    /// Durable activity log of a project, oldest first.
    pub async fn activity(&self, project_id: Uuid) -> Result<Vec<ActivityRecord>> {
        self.repository.activity(project_id).await
    }

    // --- workflow ----------------------------------------------------------

    pub async fn create_project(&self, name: impl Into<String>, actor: &Actor) -> Result<ProjectAggregate> {
        let now = Utc::now();
        let mut aggregate = ProjectAggregate::new(Project::new(name, actor.id, now));
        let created = ActivityRecord::new(
            aggregate.id(),
            Some(actor.id),
            ActivityAction::ProjectCreated,
            format!("Project '{}' created", aggregate.project.name),
            now,
        );
        aggregate.version = self
            .repository
            .insert(&aggregate, std::slice::from_ref(&created))
            .await?;

        info!(project_id = %aggregate.id(), actor_id = %actor.id, "Project created");
        self.publish(vec![created]).await;
        Ok(aggregate)
    }

    pub async fn apply_transition(
        &self,
        project_id: Uuid,
        target: WorkflowStatus,
        actor: &Actor,
    ) -> Result<Committed<TransitionRecord>> {
        self.commit(project_id, "apply_transition", |aggregate, now| {
            let record = self
                .engine
                .apply_transition(&mut aggregate.project, target, actor, now)
                .inspect_err(|_| monitor_metrics().record_rejected_transition())?;
            monitor_metrics().record_transition();
            Ok(Staged {
                activity: vec![ActivityRecord::from(&record)],
                value: record,
                progress: None,
                changed: true,
            })
        })
        .await
    }

    // --- progress ----------------------------------------------------------

    /// Recompute and persist progress. A version conflict is retried once
    /// against a fresh read.
    pub async fn recompute_progress(&self, project_id: Uuid) -> Result<ProgressOutcome> {
        let timer = OperationTimer::new("recompute_progress");
        let _guard = self.lock_project(project_id).await;

        let mut retried = false;
        loop {
            let mut aggregate = self.load_aggregate(project_id).await?;
            let expected = aggregate.version;
            let now = Utc::now();
            let outcome = self.aggregator.recompute(&mut aggregate, now)?;
            record_progress_metrics(&outcome);
            if !outcome.written {
                timer.finish();
                return Ok(outcome);
            }

            let record = progress_record(&outcome, None, now);
            match self.repository.save(&aggregate, expected, std::slice::from_ref(&record)).await {
                Ok(_) => {
                    self.publish(vec![record]).await;
                    timer.finish();
                    return Ok(outcome);
                }
                Err(err) if err.is_conflict() && !retried => {
                    monitor_metrics().record_conflict();
                    warn!(project_id = %project_id, error = %err, "Retrying progress recompute after conflict");
                    retried = true;
                }
                Err(err) => {
                    if err.is_conflict() {
                        monitor_metrics().record_conflict();
                    }
                    return Err(err);
                }
            }
        }
    }

    // --- milestones --------------------------------------------------------

    pub async fn add_milestone(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone: NewMilestone,
    ) -> Result<Committed<Milestone>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "add_milestone", move |aggregate, _| {
            let status = aggregate.status();
            let created = aggregate.milestones.add(project_id, status, milestone)?.clone();
            Ok(MilestoneEdit {
                action: ActivityAction::MilestoneCreated { milestone_id: created.id },
                description: format!("Milestone '{}' created with weight {}%", created.title, created.weight),
                value: created,
                affects_progress: true,
                changed: true,
            })
        })
        .await
    }

    /// Returns the previous weight.
    pub async fn update_milestone_weight(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
        weight: Percent,
    ) -> Result<Committed<Percent>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "update_milestone_weight", move |aggregate, _| {
            let status = aggregate.status();
            let previous = aggregate.milestones.update_weight(project_id, status, milestone_id, weight)?;
            Ok(MilestoneEdit {
                value: previous,
                action: ActivityAction::MilestoneUpdated { milestone_id },
                description: format!("Milestone weight changed from {previous}% to {weight}%"),
                affects_progress: true,
                changed: previous != weight,
            })
        })
        .await
    }

    /// Returns the previous status.
    pub async fn set_milestone_status(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
        status: MilestoneStatus,
    ) -> Result<Committed<MilestoneStatus>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "set_milestone_status", move |aggregate, now| {
            let workflow = aggregate.status();
            let previous =
                aggregate
                    .milestones
                    .set_status(project_id, workflow, milestone_id, status, now.date_naive())?;
            Ok(MilestoneEdit {
                value: previous,
                action: ActivityAction::MilestoneUpdated { milestone_id },
                description: format!("Milestone status changed from {previous} to {status}"),
                affects_progress: previous == MilestoneStatus::Completed || status == MilestoneStatus::Completed,
                changed: previous != status,
            })
        })
        .await
    }

    pub async fn validate_milestone(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
        comments: Option<String>,
    ) -> Result<Committed<Milestone>> {
        let validator = actor.id;
        self.edit_milestones(project_id, actor, Permission::ValidateMilestone, "validate_milestone", move |aggregate, now| {
            ensure_open(aggregate, "validate milestones")?;
            let validated = aggregate
                .milestones
                .validate(project_id, milestone_id, validator, comments, now)?
                .clone();
            Ok(MilestoneEdit {
                action: ActivityAction::MilestoneValidated { milestone_id },
                description: format!("Milestone '{}' validated", validated.title),
                value: validated,
                affects_progress: true,
                changed: true,
            })
        })
        .await
    }

    /// Set or clear a dependency. Returns the previous one.
    pub async fn set_dependency(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
        depends_on: Option<Uuid>,
    ) -> Result<Committed<Option<Uuid>>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "set_dependency", move |aggregate, _| {
            ensure_open(aggregate, "change milestone dependencies")?;
            let previous = aggregate.milestones.set_dependency(project_id, milestone_id, depends_on)?;
            let description = match depends_on {
                Some(dependency) => format!("Milestone now depends on {dependency}"),
                None => "Milestone dependency cleared".to_string(),
            };
            Ok(MilestoneEdit {
                value: previous,
                action: ActivityAction::MilestoneUpdated { milestone_id },
                description,
                affects_progress: false,
                changed: previous != depends_on,
            })
        })
        .await
    }

    pub async fn update_schedule(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
        planned_start_date: Option<NaiveDate>,
        planned_end_date: Option<NaiveDate>,
    ) -> Result<Committed<Milestone>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "update_schedule", move |aggregate, _| {
            ensure_open(aggregate, "change milestone schedules")?;
            let updated = aggregate
                .milestones
                .update_schedule(project_id, milestone_id, planned_start_date, planned_end_date)?
                .clone();
            Ok(MilestoneEdit {
                action: ActivityAction::MilestoneUpdated { milestone_id },
                description: format!("Milestone '{}' schedule updated", updated.title),
                value: updated,
                affects_progress: false,
                changed: true,
            })
        })
        .await
    }

    pub async fn reorder(&self, project_id: Uuid, actor: &Actor, ordered_ids: &[Uuid]) -> Result<Committed<()>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "reorder", |aggregate, _| {
            ensure_open(aggregate, "reorder milestones")?;
            aggregate.milestones.reorder(ordered_ids)?;
            Ok(MilestoneEdit {
                value: (),
                action: ActivityAction::MilestonesReordered,
                description: format!("{} milestones reordered", ordered_ids.len()),
                affects_progress: false,
                changed: true,
            })
        })
        .await
    }

    /// Returns the deleted milestone.
    pub async fn delete_milestone(
        &self,
        project_id: Uuid,
        actor: &Actor,
        milestone_id: Uuid,
    ) -> Result<Committed<Milestone>> {
        self.edit_milestones(project_id, actor, Permission::ManageMilestones, "delete_milestone", move |aggregate, _| {
            let status = aggregate.status();
            let removed = aggregate.milestones.remove(project_id, status, milestone_id)?;
            Ok(MilestoneEdit {
                action: ActivityAction::MilestoneDeleted { milestone_id },
                description: format!("Milestone '{}' deleted", removed.title),
                value: removed,
                affects_progress: true,
                changed: true,
            })
        })
        .await
    }

    // --- delays ------------------------------------------------------------

    /// Mark overdue milestones as delayed and report how far behind the
    /// project is. Closed projects are assessed but not modified.
    pub async fn refresh_delays(&self, project_id: Uuid, today: NaiveDate) -> Result<DelayReport> {
        let _guard = self.lock_project(project_id).await;

        let mut aggregate = self.load_aggregate(project_id).await?;
        let expected = aggregate.version;
        let newly_delayed = if aggregate.status().is_terminal() {
            Vec::new()
        } else {
            aggregate.milestones.mark_delayed(today)
        };

        let mut report = assess_delays(project_id, &aggregate.milestones, today, &self.delay_thresholds);
        if newly_delayed.is_empty() {
            return Ok(report);
        }

        let record = ActivityRecord::new(
            project_id,
            None,
            ActivityAction::DelaysDetected {
                milestone_ids: newly_delayed.clone(),
            },
            format!("{} milestone(s) marked as delayed", newly_delayed.len()),
            Utc::now(),
        );
        self.repository
            .save(&aggregate, expected, std::slice::from_ref(&record))
            .await
            .inspect_err(|err| {
                if err.is_conflict() {
                    monitor_metrics().record_conflict();
                }
            })?;
        monitor_metrics().record_delays(newly_delayed.len());
        warn!(
            project_id = %project_id,
            delayed = newly_delayed.len(),
            severity = ?report.severity,
            max_days_overdue = report.max_days_overdue,
            "Milestones marked as delayed"
        );

        self.publish(vec![record]).await;
        report.newly_delayed = newly_delayed;
        Ok(report)
    }

    /// Run delay detection across every stored project.
    pub async fn refresh_all_delays(&self, today: NaiveDate) -> Result<Vec<DelayReport>> {
        let mut reports = Vec::new();
        for project_id in self.repository.list().await? {
            reports.push(self.refresh_delays(project_id, today).await?);
        }
        Ok(reports)
    }

    // --- internals ---------------------------------------------------------

    async fn lock_project(&self, project_id: Uuid) -> ProjectGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(project_id)
            .or_default()
            .clone();
        let mut guard = ProjectGuard {
            locks: &self.locks,
            project_id,
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    async fn load_aggregate(&self, project_id: Uuid) -> Result<ProjectAggregate> {
        self.repository
            .load(project_id)
            .await?
            .ok_or(MonitorError::ProjectNotFound(project_id))
    }

    fn authorize(&self, actor: &Actor, permission: Permission) -> Result<()> {
        if self.engine.policy().can_perform(actor, &permission) {
            return Ok(());
        }
        warn!(actor_id = %actor.id, role = %actor.role, permission = %permission, "Rejected unauthorized operation");
        Err(MonitorError::Unauthorized {
            actor_id: actor.id,
            role: actor.role,
            permission,
        })
    }

    /// Load, stage a change on the loaded copy, then save it together with
    /// its activity under the version read. A stage that changed nothing
    /// skips the save. Holds the project lock throughout.
    async fn commit<T, F>(&self, project_id: Uuid, operation: &'static str, stage: F) -> Result<Committed<T>>
    where
        F: FnOnce(&mut ProjectAggregate, DateTime<Utc>) -> Result<Staged<T>> + Send,
        T: Send,
    {
        let span = create_operation_span(operation, project_id, &generate_correlation_id());
        async move {
            let timer = OperationTimer::new(operation);
            let _guard = self.lock_project(project_id).await;

            let mut aggregate = self.load_aggregate(project_id).await?;
            let expected = aggregate.version;
            let now = Utc::now();
            let staged = stage(&mut aggregate, now)?;

            if staged.changed {
                aggregate.version = self
                    .repository
                    .save(&aggregate, expected, &staged.activity)
                    .await
                    .inspect_err(|err| {
                        if err.is_conflict() {
                            monitor_metrics().record_conflict();
                        }
                    })?;
                self.publish(staged.activity).await;
            } else {
                debug!(project_id = %project_id, operation, "Nothing changed, skipping save");
            }

            timer.finish();
            Ok::<_, MonitorError>(Committed {
                aggregate,
                value: staged.value,
                progress: staged.progress,
            })
        }
        .instrument(span)
        .await
    }

    async fn edit_milestones<T, F>(
        &self,
        project_id: Uuid,
        actor: &Actor,
        permission: Permission,
        operation: &'static str,
        edit: F,
    ) -> Result<Committed<T>>
    where
        F: FnOnce(&mut ProjectAggregate, DateTime<Utc>) -> Result<MilestoneEdit<T>> + Send,
        T: Send,
    {
        self.authorize(actor, permission)?;
        let actor_id = actor.id;

        self.commit(project_id, operation, move |aggregate, now| {
            let MilestoneEdit {
                value,
                action,
                description,
                affects_progress,
                changed,
            } = edit(aggregate, now)?;
            if !changed {
                return Ok(Staged {
                    value,
                    progress: None,
                    activity: Vec::new(),
                    changed,
                });
            }
            monitor_metrics().record_milestone_mutation();

            let mut activity = vec![ActivityRecord::new(project_id, Some(actor_id), action, description, now)];
            let progress = if affects_progress {
                aggregate.touch_milestones();
                let outcome = self.aggregator.recompute(aggregate, now)?;
                record_progress_metrics(&outcome);
                if outcome.changed_value() {
                    activity.push(progress_record(&outcome, Some(actor_id), now));
                }
                Some(outcome)
            } else {
                None
            };

            Ok(Staged {
                value,
                progress,
                activity,
                changed,
            })
        })
        .await
    }

    /// Forward committed records to the sink. The repository already holds
    /// them, so a sink failure is only logged.
    async fn publish(&self, activity: Vec<ActivityRecord>) {
        for record in activity {
            let project_id = record.project_id;
            let action = record.action.name();
            if let Err(err) = self.audit.record(record).await {
                error!(project_id = %project_id, action, error = %err, "Failed to publish activity record");
            }
        }
    }
}

fn ensure_open(aggregate: &ProjectAggregate, operation: &'static str) -> Result<()> {
    let status = aggregate.status();
    if status.is_terminal() {
        return Err(MonitorError::ProjectLocked { status, operation });
    }
    Ok(())
}

fn progress_record(outcome: &ProgressOutcome, actor_id: Option<Uuid>, at: DateTime<Utc>) -> ActivityRecord {
    ActivityRecord::new(
        outcome.project_id,
        actor_id,
        ActivityAction::ProgressRecomputed {
            from: outcome.previous,
            to: outcome.progress,
        },
        format!("Automated progress updated from {}% to {}%", outcome.previous, outcome.progress),
        at,
    )
}

fn record_progress_metrics(outcome: &ProgressOutcome) {
    let metrics = monitor_metrics();
    metrics.record_recompute(outcome.written);
    if !outcome.warnings().is_empty() {
        metrics.record_weight_warning();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{InMemoryActivityLog, MockAuditSink};
    use crate::repository::InMemoryProjectRepository;
    use crate::workflow::policy::MockAuthorizationPolicy;
    use crate::workflow::{Role, RolePolicy};

    fn service_with(policy: Arc<dyn AuthorizationPolicy>, audit: Arc<dyn AuditSink>) -> ProjectService {
        ProjectService::new(Arc::new(InMemoryProjectRepository::new()), policy, audit)
    }

    #[tokio::test]
    async fn test_denied_milestone_change_never_loads_project() {
        let mut policy = MockAuthorizationPolicy::new();
        policy
            .expect_can_perform()
            .withf(|_, permission| *permission == Permission::ManageMilestones)
            .times(1)
            .return_const(false);
        let service = service_with(Arc::new(policy), Arc::new(InMemoryActivityLog::new()));

        let err = service
            .add_milestone(
                Uuid::new_v4(),
                &Actor::with_role(Role::Executive),
                NewMilestone::new("Survey", Percent::whole(10)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Unauthorized { role: Role::Executive, .. }));
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_durable_activity() {
        let mut sink = MockAuditSink::new();
        sink.expect_record()
            .times(2)
            .returning(|_| Err(MonitorError::Storage("audit table unavailable".into())));
        let service = service_with(Arc::new(RolePolicy::default()), Arc::new(sink));
        let unit = Actor::with_role(Role::ImplementingUnit);

        let project = service.create_project("Multi-purpose hall", &unit).await.unwrap();
        let committed = service
            .apply_transition(project.id(), WorkflowStatus::Submitted, &unit)
            .await
            .unwrap();

        assert_eq!(committed.project().workflow_status, WorkflowStatus::Submitted);
        let stored = service.project(project.id()).await.unwrap();
        assert_eq!(stored.version, committed.version());

        let actions: Vec<ActivityAction> = service
            .activity(project.id())
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                ActivityAction::ProjectCreated,
                ActivityAction::WorkflowTransition {
                    from: WorkflowStatus::Draft,
                    to: WorkflowStatus::Submitted,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_project_locks_are_released() {
        let service = service_with(Arc::new(RolePolicy::default()), Arc::new(InMemoryActivityLog::new()));
        let unit = Actor::with_role(Role::ImplementingUnit);
        let lock_count = |service: &ProjectService| service.locks.lock().unwrap().len();

        for _ in 0..3 {
            let err = service.recompute_progress(Uuid::new_v4()).await.unwrap_err();
            assert!(matches!(err, MonitorError::ProjectNotFound(_)));
        }
        assert_eq!(lock_count(&service), 0);

        let project = service.create_project("Evacuation center", &unit).await.unwrap();
        service
            .add_milestone(project.id(), &unit, NewMilestone::new("Roofing", Percent::whole(40)))
            .await
            .unwrap();
        service
            .refresh_delays(project.id(), Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(lock_count(&service), 0);

        let held = service.lock_project(project.id()).await;
        assert_eq!(lock_count(&service), 1);
        drop(held);
        assert_eq!(lock_count(&service), 0);
    }

    #[tokio::test]
    async fn test_transition_writes_one_activity_record() {
        let mut sink = MockAuditSink::new();
        sink.expect_record()
            .withf(|record| matches!(record.action, ActivityAction::ProjectCreated))
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_record()
            .withf(|record| {
                record.action
                    == ActivityAction::WorkflowTransition {
                        from: WorkflowStatus::Draft,
                        to: WorkflowStatus::Submitted,
                    }
            })
            .times(1)
            .returning(|_| Ok(()));
        let service = service_with(Arc::new(RolePolicy::default()), Arc::new(sink));
        let unit = Actor::with_role(Role::ImplementingUnit);

        let project = service.create_project("Seawall", &unit).await.unwrap();
        service
            .apply_transition(project.id(), WorkflowStatus::Submitted, &unit)
            .await
            .unwrap();
    }
}
