// Persistence seam for project aggregates

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::ActivityRecord;
use crate::error::Result;
use crate::project::ProjectAggregate;

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

pub use memory::InMemoryProjectRepository;
#[cfg(feature = "database")]
pub use sqlite::SqliteProjectRepository;

/// Storage for project aggregates and their activity log, with optimistic
/// concurrency.
///
/// `save` only succeeds when the stored version still equals
/// `expected_version`; otherwise it fails with `ConcurrencyConflict` and
/// stores nothing. Activity passed to `insert` or `save` is written together
/// with the aggregate or not at all.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Store a new aggregate. Fails when the id is already taken.
    async fn insert(&self, aggregate: &ProjectAggregate, activity: &[ActivityRecord]) -> Result<u64>;

    async fn load(&self, project_id: Uuid) -> Result<Option<ProjectAggregate>>;

    /// Replace the stored aggregate, returning the new version.
    async fn save(
        &self,
        aggregate: &ProjectAggregate,
        expected_version: u64,
        activity: &[ActivityRecord],
    ) -> Result<u64>;

    async fn list(&self) -> Result<Vec<Uuid>>;

    /// Activity for one project, oldest first.
    async fn activity(&self, project_id: Uuid) -> Result<Vec<ActivityRecord>>;
}
