use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::ProjectRepository;
use crate::audit::ActivityRecord;
use crate::error::{MonitorError, Result};
use crate::project::ProjectAggregate;

#[derive(Debug)]
struct StoredProject {
    aggregate: ProjectAggregate,
    activity: Vec<ActivityRecord>,
}

/// Process-local repository.
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<Uuid, StoredProject>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn insert(&self, aggregate: &ProjectAggregate, activity: &[ActivityRecord]) -> Result<u64> {
        let mut projects = self.projects.write().await;
        let id = aggregate.id();
        if projects.contains_key(&id) {
            return Err(MonitorError::Storage(format!("project {id} already exists")));
        }
        let mut stored = aggregate.clone();
        stored.version = 1;
        projects.insert(
            id,
            StoredProject {
                aggregate: stored,
                activity: activity.to_vec(),
            },
        );
        debug!(project_id = %id, "Project inserted");
        Ok(1)
    }

    async fn load(&self, project_id: Uuid) -> Result<Option<ProjectAggregate>> {
        Ok(self
            .projects
            .read()
            .await
            .get(&project_id)
            .map(|stored| stored.aggregate.clone()))
    }

    async fn save(
        &self,
        aggregate: &ProjectAggregate,
        expected_version: u64,
        activity: &[ActivityRecord],
    ) -> Result<u64> {
        let mut projects = self.projects.write().await;
        let project_id = aggregate.id();
        let stored = projects
            .get_mut(&project_id)
            .ok_or(MonitorError::ProjectNotFound(project_id))?;
        if stored.aggregate.version != expected_version {
            return Err(MonitorError::ConcurrencyConflict {
                project_id,
                expected: expected_version,
                found: stored.aggregate.version,
            });
        }

        let version = expected_version + 1;
        stored.aggregate = aggregate.clone();
        stored.aggregate.version = version;
        stored.activity.extend_from_slice(activity);
        debug!(project_id = %project_id, version, records = activity.len(), "Project saved");
        Ok(version)
    }

    async fn list(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.projects.read().await.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn activity(&self, project_id: Uuid) -> Result<Vec<ActivityRecord>> {
        Ok(self
            .projects
            .read()
            .await
            .get(&project_id)
            .map(|stored| stored.activity.clone())
            .unwrap_or_default())
    }
}
