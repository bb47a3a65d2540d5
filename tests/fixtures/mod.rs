//! Shared setup for project monitor integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use project_monitor::{
    Actor, InMemoryActivityLog, InMemoryProjectRepository, MilestoneStatus, NewMilestone, Percent,
    ProgressSettings, ProjectService, Role, RolePolicy, WorkflowStatus,
};

pub struct Harness {
    pub service: Arc<ProjectService>,
    pub repository: Arc<InMemoryProjectRepository>,
    pub log: Arc<InMemoryActivityLog>,
    pub unit: Actor,
    pub secretariat: Actor,
    pub admin: Actor,
}

pub fn harness() -> Harness {
    harness_with(ProgressSettings::default())
}

pub fn harness_with(settings: ProgressSettings) -> Harness {
    let repository = Arc::new(InMemoryProjectRepository::new());
    let log = Arc::new(InMemoryActivityLog::new());
    let service = ProjectService::new(
        repository.clone(),
        Arc::new(RolePolicy::default()),
        log.clone(),
    )
    .with_progress_settings(settings);

    Harness {
        service: Arc::new(service),
        repository,
        log,
        unit: Actor::with_role(Role::ImplementingUnit),
        secretariat: Actor::with_role(Role::Secretariat),
        admin: Actor::with_role(Role::SystemAdministrator),
    }
}

pub fn pct(whole: u32) -> Percent {
    Percent::whole(whole)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

impl Harness {
    pub async fn draft_project(&self, name: &str) -> Uuid {
        self.service
            .create_project(name, &self.unit)
            .await
            .expect("project created")
            .id()
    }

    /// Create a project and walk it through approval into `ongoing`.
    pub async fn ongoing_project(&self, name: &str) -> Uuid {
        let id = self.draft_project(name).await;
        for (target, actor) in [
            (WorkflowStatus::Submitted, &self.unit),
            (WorkflowStatus::SecretariatApproved, &self.secretariat),
            (WorkflowStatus::Ongoing, &self.unit),
        ] {
            self.service
                .apply_transition(id, target, actor)
                .await
                .expect("approval path transition");
        }
        id
    }

    pub async fn add(&self, project_id: Uuid, title: &str, weight: u32) -> Uuid {
        self.service
            .add_milestone(project_id, &self.unit, NewMilestone::new(title, pct(weight)))
            .await
            .expect("milestone added")
            .value
            .id
    }

    /// Mark a milestone completed and have the secretariat validate it.
    pub async fn complete_and_validate(&self, project_id: Uuid, milestone_id: Uuid) {
        self.service
            .set_milestone_status(project_id, &self.unit, milestone_id, MilestoneStatus::Completed)
            .await
            .expect("milestone completed");
        self.service
            .validate_milestone(project_id, &self.secretariat, milestone_id, Some("Site inspected".into()))
            .await
            .expect("milestone validated");
    }
}
