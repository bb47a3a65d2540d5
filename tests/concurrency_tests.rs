//! Integration tests for concurrent writers and optimistic version checks

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use project_monitor::{
    ActivityRecord, Actor, InMemoryActivityLog, InMemoryProjectRepository, MilestoneStatus, MonitorError,
    NewMilestone, Project, ProjectAggregate, ProjectRepository, ProjectService, Result, Role,
    RolePolicy, WorkflowStatus,
};

mod fixtures;
use fixtures::{harness, pct};

/// Repository that lets another writer sneak in right before a save.
struct InterferingRepository {
    inner: InMemoryProjectRepository,
    interferences: AtomicUsize,
}

impl InterferingRepository {
    fn new(interferences: usize) -> Self {
        Self {
            inner: InMemoryProjectRepository::new(),
            interferences: AtomicUsize::new(interferences),
        }
    }
}

#[async_trait]
impl ProjectRepository for InterferingRepository {
    async fn insert(&self, aggregate: &ProjectAggregate, activity: &[ActivityRecord]) -> Result<u64> {
        self.inner.insert(aggregate, activity).await
    }

    async fn load(&self, project_id: Uuid) -> Result<Option<ProjectAggregate>> {
        self.inner.load(project_id).await
    }

    async fn save(
        &self,
        aggregate: &ProjectAggregate,
        expected_version: u64,
        activity: &[ActivityRecord],
    ) -> Result<u64> {
        let interfere = self
            .interferences
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if interfere {
            if let Some(current) = self.inner.load(aggregate.id()).await? {
                self.inner.save(&current, current.version, &[]).await?;
            }
        }
        self.inner.save(aggregate, expected_version, activity).await
    }

    async fn list(&self) -> Result<Vec<Uuid>> {
        self.inner.list().await
    }

    async fn activity(&self, project_id: Uuid) -> Result<Vec<ActivityRecord>> {
        self.inner.activity(project_id).await
    }
}

/// Ongoing project with one validated 40% milestone whose progress has not
/// been computed yet.
fn stale_aggregate() -> ProjectAggregate {
    let now = Utc::now();
    let mut aggregate = ProjectAggregate::new(Project::new("Seeded project", Uuid::new_v4(), now));
    aggregate.project.workflow_status = WorkflowStatus::Ongoing;
    let project_id = aggregate.id();

    let done = aggregate
        .milestones
        .add(project_id, WorkflowStatus::Ongoing, NewMilestone::new("Done", pct(40)))
        .unwrap()
        .id;
    aggregate
        .milestones
        .add(project_id, WorkflowStatus::Ongoing, NewMilestone::new("Open", pct(60)))
        .unwrap();
    aggregate
        .milestones
        .set_status(project_id, WorkflowStatus::Ongoing, done, MilestoneStatus::Completed, now.date_naive())
        .unwrap();
    aggregate
        .milestones
        .validate(project_id, done, Uuid::new_v4(), None, now)
        .unwrap();
    aggregate
}

fn service_over(repository: Arc<InterferingRepository>) -> ProjectService {
    ProjectService::new(
        repository,
        Arc::new(RolePolicy::default()),
        Arc::new(InMemoryActivityLog::new()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_milestone_additions_are_serialized() {
    let h = harness();
    let id = h.ongoing_project("Concurrent edits").await;

    let mut handles = Vec::new();
    for n in 0..10 {
        let service = h.service.clone();
        let unit = h.unit.clone();
        handles.push(tokio::spawn(async move {
            service
                .add_milestone(id, &unit, NewMilestone::new(format!("Stage {n}"), pct(10)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = h.service.project(id).await.unwrap();
    assert_eq!(stored.milestones.len(), 10);
    assert_eq!(stored.milestones.total_weight(), pct(100));
    let orders: Vec<u32> = stored.milestones.iter().map(|m| m.order).collect();
    assert_eq!(orders, (1..=10).collect::<Vec<u32>>());
    // insert, three transitions, ten additions
    assert_eq!(stored.version, 14);
}

#[tokio::test]
async fn test_recompute_retries_once_after_conflict() {
    let repository = Arc::new(InterferingRepository::new(1));
    let aggregate = stale_aggregate();
    let id = aggregate.id();
    repository.insert(&aggregate, &[]).await.unwrap();
    let service = service_over(repository.clone());

    let outcome = service.recompute_progress(id).await.unwrap();

    assert!(outcome.written);
    assert_eq!(outcome.progress, pct(40));
    let stored = repository.load(id).await.unwrap().unwrap();
    assert_eq!(stored.project.automated_progress, pct(40));
    // insert, interfering save, retried save
    assert_eq!(stored.version, 3);
}

#[tokio::test]
async fn test_recompute_gives_up_after_second_conflict() {
    let repository = Arc::new(InterferingRepository::new(2));
    let aggregate = stale_aggregate();
    let id = aggregate.id();
    repository.insert(&aggregate, &[]).await.unwrap();
    let service = service_over(repository.clone());

    let err = service.recompute_progress(id).await.unwrap_err();

    assert!(err.is_conflict());
    let stored = repository.load(id).await.unwrap().unwrap();
    assert_eq!(stored.project.automated_progress, pct(0));
}

#[tokio::test]
async fn test_conflicting_mutation_is_not_applied() {
    let repository = Arc::new(InterferingRepository::new(1));
    let aggregate = stale_aggregate();
    let id = aggregate.id();
    repository.insert(&aggregate, &[]).await.unwrap();
    let service = service_over(repository.clone());
    let unit = Actor::with_role(Role::ImplementingUnit);

    let err = service
        .update_milestone_weight(id, &unit, aggregate.milestones.ids()[1], pct(50))
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::ConcurrencyConflict { project_id, .. } if project_id == id));
    let stored = repository.load(id).await.unwrap().unwrap();
    assert_eq!(stored.milestones.total_weight(), pct(100));
    assert!(repository.activity(id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_projects_progress_independently() {
    let h = harness();
    let first = h.ongoing_project("First").await;
    let second = h.ongoing_project("Second").await;

    let tasks: Vec<_> = [(first, 25), (second, 75)]
        .into_iter()
        .map(|(id, weight)| {
            let service = h.service.clone();
            let unit = h.unit.clone();
            tokio::spawn(async move {
                for n in 0..4 {
                    service
                        .add_milestone(id, &unit, NewMilestone::new(format!("Part {n}"), pct(weight / 4)))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let first = h.service.project(first).await.unwrap();
    let second = h.service.project(second).await.unwrap();
    assert_eq!(first.milestones.total_weight(), pct(24));
    assert_eq!(second.milestones.total_weight(), pct(72));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_progress_reads_do_not_block_on_writers() {
    let h = harness();
    let id = h.ongoing_project("Read while writing").await;
    let m1 = h.add(id, "Half", 50).await;
    h.complete_and_validate(id, m1).await;

    let writer = {
        let service = h.service.clone();
        let unit = h.unit.clone();
        tokio::spawn(async move {
            for n in 0..5 {
                service
                    .add_milestone(id, &unit, NewMilestone::new(format!("Extra {n}"), pct(5)))
                    .await
                    .unwrap();
            }
        })
    };
    for _ in 0..5 {
        assert_eq!(h.service.progress(id).await.unwrap(), pct(50));
    }
    writer.await.unwrap();

    assert_eq!(h.service.progress(id).await.unwrap(), pct(50));
}
