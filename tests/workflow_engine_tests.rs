//! Integration tests for workflow transitions through the project service

use project_monitor::{
    ActivityAction, MonitorError, Role, WorkflowStatus,
};

mod fixtures;
use fixtures::{harness, pct};

#[tokio::test]
async fn test_draft_cannot_jump_to_ongoing() {
    let h = harness();
    let id = h.draft_project("Barangay health station").await;

    let err = h
        .service
        .apply_transition(id, WorkflowStatus::Ongoing, &h.admin)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::InvalidTransition {
            from: WorkflowStatus::Draft,
            to: WorkflowStatus::Ongoing
        }
    ));
    let stored = h.service.project(id).await.unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Draft);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_unauthorized_approval_keeps_submitted() {
    let h = harness();
    let id = h.draft_project("Drainage canal").await;
    h.service
        .apply_transition(id, WorkflowStatus::Submitted, &h.unit)
        .await
        .unwrap();

    let err = h
        .service
        .apply_transition(id, WorkflowStatus::SecretariatApproved, &h.unit)
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Unauthorized { role: Role::ImplementingUnit, .. }));
    let stored = h.service.project(id).await.unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Submitted);
    assert_eq!(stored.project.approved_by, None);
}

#[tokio::test]
async fn test_full_approval_and_validation_path() {
    let h = harness();
    let id = h.ongoing_project("Public market renovation").await;

    for (target, actor) in [
        (WorkflowStatus::CompiledForSecretariat, &h.unit),
        (WorkflowStatus::ValidatedBySecretariat, &h.secretariat),
        (WorkflowStatus::Completed, &h.secretariat),
    ] {
        h.service.apply_transition(id, target, actor).await.unwrap();
    }

    let stored = h.service.project(id).await.unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Completed);
    assert!(stored.project.submitted_at.is_some());
    assert_eq!(stored.project.approved_by, Some(h.secretariat.id));
    assert!(stored.project.validated_at.is_some());
    // one insert plus six transitions
    assert_eq!(stored.version, 7);

    let transitions: Vec<_> = h
        .log
        .for_project(id)
        .await
        .into_iter()
        .filter_map(|record| match record.action {
            ActivityAction::WorkflowTransition { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            WorkflowStatus::Submitted,
            WorkflowStatus::SecretariatApproved,
            WorkflowStatus::Ongoing,
            WorkflowStatus::CompiledForSecretariat,
            WorkflowStatus::ValidatedBySecretariat,
            WorkflowStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn test_rejection_returns_to_draft() {
    let h = harness();
    let id = h.draft_project("Footbridge").await;
    h.service
        .apply_transition(id, WorkflowStatus::Submitted, &h.unit)
        .await
        .unwrap();

    let committed = h
        .service
        .apply_transition(id, WorkflowStatus::Draft, &h.secretariat)
        .await
        .unwrap();

    assert_eq!(committed.project().workflow_status, WorkflowStatus::Draft);
    assert_eq!(committed.project().submitted_at, None);
    assert_eq!(committed.value.from, WorkflowStatus::Submitted);
}

#[tokio::test]
async fn test_administrator_can_cancel_from_any_open_state() {
    let h = harness();

    let draft = h.draft_project("Cancelled early").await;
    h.service
        .apply_transition(draft, WorkflowStatus::Cancelled, &h.admin)
        .await
        .unwrap();

    let ongoing = h.ongoing_project("Cancelled midway").await;
    h.service
        .apply_transition(ongoing, WorkflowStatus::Cancelled, &h.admin)
        .await
        .unwrap();

    for id in [draft, ongoing] {
        assert_eq!(
            h.service.project(id).await.unwrap().status(),
            WorkflowStatus::Cancelled
        );
    }
}

#[tokio::test]
async fn test_terminal_states_accept_no_transitions() {
    let h = harness();
    let id = h.draft_project("Closed project").await;
    h.service
        .apply_transition(id, WorkflowStatus::Cancelled, &h.admin)
        .await
        .unwrap();

    for target in WorkflowStatus::ALL {
        let result = h.service.apply_transition(id, target, &h.admin).await;
        assert!(
            matches!(result, Err(MonitorError::InvalidTransition { .. })),
            "cancelled -> {target} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_transitions_leave_progress_alone() {
    let h = harness();
    let id = h.ongoing_project("School building").await;
    let m1 = h.add(id, "Foundation", 40).await;
    h.add(id, "Roofing", 60).await;
    h.complete_and_validate(id, m1).await;
    let before = h.service.project(id).await.unwrap();
    assert_eq!(before.project.automated_progress, pct(40));

    h.service
        .apply_transition(id, WorkflowStatus::CompiledForSecretariat, &h.unit)
        .await
        .unwrap();

    let after = h.service.project(id).await.unwrap();
    assert_eq!(after.project.automated_progress, pct(40));
    assert_eq!(after.project.last_progress_update, before.project.last_progress_update);
}

#[tokio::test]
async fn test_unknown_project_is_reported() {
    let h = harness();
    let missing = uuid::Uuid::new_v4();
    let err = h
        .service
        .apply_transition(missing, WorkflowStatus::Submitted, &h.unit)
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::ProjectNotFound(id) if id == missing));
}
