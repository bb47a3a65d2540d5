// Property-based tests for progress aggregation invariants

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use project_monitor::{
    compute_progress, MilestoneStatus, NewMilestone, Percent, Project, ProjectAggregate,
    ProgressAggregator, ProgressWarning, WorkflowStatus,
};

#[derive(Debug, Clone)]
struct PlannedMilestone {
    weight: u32,
    status: MilestoneStatus,
    validated: bool,
}

fn status_strategy() -> impl Strategy<Value = MilestoneStatus> {
    prop_oneof![
        Just(MilestoneStatus::Pending),
        Just(MilestoneStatus::InProgress),
        Just(MilestoneStatus::Completed),
        Just(MilestoneStatus::Delayed),
    ]
}

// At most four milestones of up to 25.00% each, so the total never exceeds 100.
fn milestones_strategy() -> impl Strategy<Value = Vec<PlannedMilestone>> {
    prop::collection::vec(
        (0u32..=2500, status_strategy(), any::<bool>()).prop_map(|(weight, status, validated)| {
            PlannedMilestone {
                weight,
                status,
                validated,
            }
        }),
        0..=4,
    )
}

fn build(planned: &[PlannedMilestone]) -> ProjectAggregate {
    let mut project = Project::new("Generated project", Uuid::new_v4(), Utc::now());
    project.workflow_status = WorkflowStatus::Ongoing;
    let mut aggregate = ProjectAggregate::new(project);
    let project_id = aggregate.id();
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    for (i, m) in planned.iter().enumerate() {
        let id = aggregate
            .milestones
            .add(
                project_id,
                WorkflowStatus::Ongoing,
                NewMilestone::new(format!("M{i}"), Percent::from_hundredths(m.weight)),
            )
            .unwrap()
            .id;
        aggregate
            .milestones
            .set_status(project_id, WorkflowStatus::Ongoing, id, m.status, today)
            .unwrap();
        if m.validated && m.status == MilestoneStatus::Completed {
            aggregate
                .milestones
                .validate(project_id, id, Uuid::new_v4(), None, Utc::now())
                .unwrap();
        }
    }
    aggregate
}

proptest! {
    #[test]
    fn progress_is_sum_of_validated_completions(planned in milestones_strategy()) {
        let aggregate = build(&planned);
        let expected: u32 = planned
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed && m.validated)
            .map(|m| m.weight)
            .sum();

        let computation = compute_progress(&aggregate.milestones);

        prop_assert_eq!(computation.progress, Percent::from_hundredths(expected));
        prop_assert!(computation.progress <= Percent::HUNDRED);
    }

    #[test]
    fn weight_warning_iff_total_is_not_hundred(planned in milestones_strategy()) {
        let aggregate = build(&planned);
        let total: u32 = planned.iter().map(|m| m.weight).sum();

        let computation = compute_progress(&aggregate.milestones);

        if planned.is_empty() || total == 10_000 {
            prop_assert!(computation.warnings.is_empty());
        } else {
            prop_assert_eq!(
                computation.warnings,
                vec![ProgressWarning::InconsistentWeights { total: Percent::from_hundredths(total) }]
            );
        }
    }

    #[test]
    fn second_recompute_is_a_noop(planned in milestones_strategy()) {
        let mut aggregate = build(&planned);
        let aggregator = ProgressAggregator::default();

        aggregator.recompute(&mut aggregate, Utc::now()).unwrap();
        let after_first = aggregate.clone();
        let second = aggregator.recompute(&mut aggregate, Utc::now()).unwrap();

        prop_assert!(!second.written);
        prop_assert_eq!(aggregate, after_first);
    }
}
