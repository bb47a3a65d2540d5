use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::ProjectRepository;
use crate::audit::ActivityRecord;
use crate::config::DatabaseConfig;
use crate::error::{MonitorError, Result};
use crate::milestones::{Milestone, MilestoneStatus, MilestoneStore};
use crate::progress::Percent;
use crate::project::{Project, ProjectAggregate};
use crate::workflow::WorkflowStatus;

/// SQLite-backed repository. Each save rewrites the project row and its
/// milestones and appends activity rows in one transaction guarded by the
/// version column.
#[derive(Debug, Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    /// Open (creating if needed) the database and optionally run migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if !Sqlite::database_exists(&config.url).await? {
            info!(url = %config.url, "Creating database");
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        let repository = Self { pool };
        if config.auto_migrate {
            repository.migrate().await?;
        }
        Ok(repository)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
    }

    async fn load_milestones(&self, project_id: Uuid) -> Result<MilestoneStore> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM milestones
            WHERE project_id = ?1
            ORDER BY sort_order ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let milestones = rows.iter().map(milestone_from_row).collect::<Result<Vec<_>>>()?;
        Ok(MilestoneStore::from_milestones(milestones))
    }

    async fn write_milestones(
        tx: &mut Transaction<'_, Sqlite>,
        aggregate: &ProjectAggregate,
    ) -> Result<()> {
        sqlx::query("DELETE FROM milestones WHERE project_id = ?1")
            .bind(aggregate.id().to_string())
            .execute(&mut **tx)
            .await?;

        for m in aggregate.milestones.iter() {
            sqlx::query(
                r#"
                INSERT INTO milestones (
                    id, project_id, title, description, weight, status, sort_order,
                    depends_on, planned_start_date, planned_end_date,
                    actual_start_date, actual_end_date,
                    validated_by, validation_date, validation_comments
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )
            .bind(m.id.to_string())
            .bind(m.project_id.to_string())
            .bind(&m.title)
            .bind(&m.description)
            .bind(i64::from(m.weight.hundredths()))
            .bind(m.status.as_str())
            .bind(i64::from(m.order))
            .bind(m.depends_on.map(|id| id.to_string()))
            .bind(m.planned_start_date.map(|d| d.to_string()))
            .bind(m.planned_end_date.map(|d| d.to_string()))
            .bind(m.actual_start_date.map(|d| d.to_string()))
            .bind(m.actual_end_date.map(|d| d.to_string()))
            .bind(m.validated_by.map(|id| id.to_string()))
            .bind(m.validation_date.map(|t| t.to_rfc3339()))
            .bind(&m.validation_comments)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn write_activity(tx: &mut Transaction<'_, Sqlite>, activity: &[ActivityRecord]) -> Result<()> {
        for record in activity {
            sqlx::query(
                r#"
                INSERT INTO activity_log (id, project_id, actor_id, action, details, description, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(record.id.to_string())
            .bind(record.project_id.to_string())
            .bind(record.actor_id.map(|id| id.to_string()))
            .bind(record.action.name())
            .bind(serde_json::to_string(&record.action)?)
            .bind(&record.description)
            .bind(record.at.to_rfc3339())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn insert(&self, aggregate: &ProjectAggregate, activity: &[ActivityRecord]) -> Result<u64> {
        let p = &aggregate.project;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO projects (
                id, name, created_by, created_at, workflow_status, automated_progress,
                last_progress_update, submitted_at, approved_at, approved_by, validated_at,
                milestone_revision, progress_revision, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1)
            "#,
        )
        .bind(p.id.to_string())
        .bind(&p.name)
        .bind(p.created_by.to_string())
        .bind(p.created_at.to_rfc3339())
        .bind(p.workflow_status.as_str())
        .bind(i64::from(p.automated_progress.hundredths()))
        .bind(p.last_progress_update.map(|t| t.to_rfc3339()))
        .bind(p.submitted_at.map(|t| t.to_rfc3339()))
        .bind(p.approved_at.map(|t| t.to_rfc3339()))
        .bind(p.approved_by.map(|id| id.to_string()))
        .bind(p.validated_at.map(|t| t.to_rfc3339()))
        .bind(p.milestone_revision as i64)
        .bind(p.progress_revision.map(|r| r as i64))
        .execute(&mut *tx)
        .await?;

        Self::write_milestones(&mut tx, aggregate).await?;
        Self::write_activity(&mut tx, activity).await?;
        tx.commit().await?;
        debug!(project_id = %p.id, "Project inserted");
        Ok(1)
    }

    async fn load(&self, project_id: Uuid) -> Result<Option<ProjectAggregate>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?1")
            .bind(project_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let project = project_from_row(&row)?;
        let version: i64 = row.try_get("version")?;
        let milestones = self.load_milestones(project_id).await?;

        Ok(Some(ProjectAggregate {
            project,
            milestones,
            version: version as u64,
        }))
    }

    async fn save(
        &self,
        aggregate: &ProjectAggregate,
        expected_version: u64,
        activity: &[ActivityRecord],
    ) -> Result<u64> {
        let p = &aggregate.project;
        let version = expected_version + 1;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE projects SET
                name = ?1, workflow_status = ?2, automated_progress = ?3,
                last_progress_update = ?4, submitted_at = ?5, approved_at = ?6,
                approved_by = ?7, validated_at = ?8, milestone_revision = ?9,
                progress_revision = ?10, version = ?11
            WHERE id = ?12 AND version = ?13
            "#,
        )
        .bind(&p.name)
        .bind(p.workflow_status.as_str())
        .bind(i64::from(p.automated_progress.hundredths()))
        .bind(p.last_progress_update.map(|t| t.to_rfc3339()))
        .bind(p.submitted_at.map(|t| t.to_rfc3339()))
        .bind(p.approved_at.map(|t| t.to_rfc3339()))
        .bind(p.approved_by.map(|id| id.to_string()))
        .bind(p.validated_at.map(|t| t.to_rfc3339()))
        .bind(p.milestone_revision as i64)
        .bind(p.progress_revision.map(|r| r as i64))
        .bind(version as i64)
        .bind(p.id.to_string())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let found: Option<i64> = sqlx::query_scalar("SELECT version FROM projects WHERE id = ?1")
                .bind(p.id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Err(match found {
                Some(found) => MonitorError::ConcurrencyConflict {
                    project_id: p.id,
                    expected: expected_version,
                    found: found as u64,
                },
                None => MonitorError::ProjectNotFound(p.id),
            });
        }

        Self::write_milestones(&mut tx, aggregate).await?;
        Self::write_activity(&mut tx, activity).await?;
        tx.commit().await?;
        debug!(project_id = %p.id, version, records = activity.len(), "Project saved");
        Ok(version)
    }

    async fn list(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM projects ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        ids.iter().map(|id| parse_uuid(id)).collect()
    }

    async fn activity(&self, project_id: Uuid) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, actor_id, details, description, created_at
            FROM activity_log
            WHERE project_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(activity_from_row).collect()
    }
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    let progress: i64 = row.try_get("automated_progress")?;
    let milestone_revision: i64 = row.try_get("milestone_revision")?;
    let progress_revision: Option<i64> = row.try_get("progress_revision")?;

    Ok(Project {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        created_by: parse_uuid(&row.try_get::<String, _>("created_by")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        workflow_status: parse_enum::<WorkflowStatus>(&row.try_get::<String, _>("workflow_status")?)?,
        automated_progress: parse_percent(progress)?,
        last_progress_update: optional(row.try_get("last_progress_update")?, parse_timestamp)?,
        submitted_at: optional(row.try_get("submitted_at")?, parse_timestamp)?,
        approved_at: optional(row.try_get("approved_at")?, parse_timestamp)?,
        approved_by: optional(row.try_get("approved_by")?, parse_uuid)?,
        validated_at: optional(row.try_get("validated_at")?, parse_timestamp)?,
        milestone_revision: milestone_revision as u64,
        progress_revision: progress_revision.map(|r| r as u64),
    })
}

fn milestone_from_row(row: &SqliteRow) -> Result<Milestone> {
    let weight: i64 = row.try_get("weight")?;
    let order: i64 = row.try_get("sort_order")?;

    Ok(Milestone {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        project_id: parse_uuid(&row.try_get::<String, _>("project_id")?)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        weight: parse_percent(weight)?,
        status: parse_enum::<MilestoneStatus>(&row.try_get::<String, _>("status")?)?,
        order: u32::try_from(order).map_err(|e| MonitorError::Storage(format!("invalid order {order}: {e}")))?,
        depends_on: optional(row.try_get("depends_on")?, parse_uuid)?,
        planned_start_date: optional(row.try_get("planned_start_date")?, parse_date)?,
        planned_end_date: optional(row.try_get("planned_end_date")?, parse_date)?,
        actual_start_date: optional(row.try_get("actual_start_date")?, parse_date)?,
        actual_end_date: optional(row.try_get("actual_end_date")?, parse_date)?,
        validated_by: optional(row.try_get("validated_by")?, parse_uuid)?,
        validation_date: optional(row.try_get("validation_date")?, parse_timestamp)?,
        validation_comments: row.try_get("validation_comments")?,
    })
}

fn activity_from_row(row: &SqliteRow) -> Result<ActivityRecord> {
    let details: String = row.try_get("details")?;
    Ok(ActivityRecord {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        project_id: parse_uuid(&row.try_get::<String, _>("project_id")?)?,
        actor_id: optional(row.try_get("actor_id")?, parse_uuid)?,
        action: serde_json::from_str(&details)?,
        description: row.try_get("description")?,
        at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn optional<T>(value: Option<String>, parse: fn(&str) -> Result<T>) -> Result<Option<T>> {
    value.as_deref().map(parse).transpose()
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| MonitorError::Storage(format!("invalid uuid '{value}': {e}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MonitorError::Storage(format!("invalid timestamp '{value}': {e}")))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::from_str(value).map_err(|e| MonitorError::Storage(format!("invalid date '{value}': {e}")))
}

fn parse_enum<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(MonitorError::Storage)
}

fn parse_percent(hundredths: i64) -> Result<Percent> {
    u32::try_from(hundredths)
        .map(Percent::from_hundredths)
        .map_err(|e| MonitorError::Storage(format!("invalid percentage {hundredths}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ActivityAction;
    use crate::milestones::NewMilestone;

    async fn repository() -> SqliteProjectRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let repository = SqliteProjectRepository::from_pool(pool);
        repository.migrate().await.unwrap();
        repository
    }

    #[tokio::test]
    async fn test_round_trip_with_milestones() {
        let repo = repository().await;
        let mut aggregate = ProjectAggregate::new(Project::new("Farm-to-market road", Uuid::new_v4(), Utc::now()));
        let project_id = aggregate.id();
        let first = aggregate
            .milestones
            .add(project_id, WorkflowStatus::Draft, NewMilestone::new("Survey", Percent::whole(30)))
            .unwrap()
            .id;
        aggregate
            .milestones
            .add(
                project_id,
                WorkflowStatus::Draft,
                NewMilestone::new("Paving", Percent::from_hundredths(6950)).depends_on(first),
            )
            .unwrap();
        repo.insert(&aggregate, &[]).await.unwrap();

        let loaded = repo.load(project_id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.milestones.len(), 2);
        assert_eq!(loaded.milestones.total_weight(), Percent::from_hundredths(9950));
        assert_eq!(loaded.milestones.as_slice()[1].depends_on, Some(first));
    }

    #[tokio::test]
    async fn test_version_guard() {
        let repo = repository().await;
        let aggregate = ProjectAggregate::new(Project::new("Clinic", Uuid::new_v4(), Utc::now()));
        repo.insert(&aggregate, &[]).await.unwrap();
        let loaded = repo.load(aggregate.id()).await.unwrap().unwrap();

        assert_eq!(repo.save(&loaded, 1, &[]).await.unwrap(), 2);
        let err = repo.save(&loaded, 1, &[]).await.unwrap_err();
        assert!(matches!(err, MonitorError::ConcurrencyConflict { found: 2, .. }));
    }

    #[tokio::test]
    async fn test_activity_commits_with_the_save() {
        let repo = repository().await;
        let aggregate = ProjectAggregate::new(Project::new("Health center", Uuid::new_v4(), Utc::now()));
        let project_id = aggregate.id();
        let created = ActivityRecord::new(
            project_id,
            Some(aggregate.project.created_by),
            ActivityAction::ProjectCreated,
            "created",
            Utc::now(),
        );
        repo.insert(&aggregate, &[created]).await.unwrap();

        let loaded = repo.load(project_id).await.unwrap().unwrap();
        let submitted = ActivityRecord::new(
            project_id,
            None,
            ActivityAction::WorkflowTransition {
                from: WorkflowStatus::Draft,
                to: WorkflowStatus::Submitted,
            },
            "submitted",
            Utc::now(),
        );
        repo.save(&loaded, 1, std::slice::from_ref(&submitted)).await.unwrap();

        // a stale save rolls back its activity rows too
        let rejected = ActivityRecord::new(project_id, None, ActivityAction::MilestonesReordered, "stale", Utc::now());
        assert!(repo.save(&loaded, 1, &[rejected]).await.is_err());

        let records = repo.activity(project_id).await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.action.name()).collect();
        assert_eq!(names, vec!["project_created", "workflow_transition"]);
        assert_eq!(records[1], submitted);
    }
}
