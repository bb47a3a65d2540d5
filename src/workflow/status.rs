use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approval workflow state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Submitted,
    SecretariatApproved,
    Ongoing,
    Completed,
    Cancelled,
    CompiledForSecretariat,
    ValidatedBySecretariat,
}

/// Explicit edges of the workflow graph. Cancellation from any non-terminal
/// state is handled separately as an administrative override.
const TRANSITIONS: &[(WorkflowStatus, WorkflowStatus)] = &[
    (WorkflowStatus::Draft, WorkflowStatus::Submitted),
    (WorkflowStatus::Submitted, WorkflowStatus::SecretariatApproved),
    (WorkflowStatus::Submitted, WorkflowStatus::Draft),
    (WorkflowStatus::SecretariatApproved, WorkflowStatus::Ongoing),
    (WorkflowStatus::Ongoing, WorkflowStatus::Completed),
    (WorkflowStatus::Ongoing, WorkflowStatus::Cancelled),
    (WorkflowStatus::Ongoing, WorkflowStatus::CompiledForSecretariat),
    (WorkflowStatus::CompiledForSecretariat, WorkflowStatus::ValidatedBySecretariat),
    (WorkflowStatus::CompiledForSecretariat, WorkflowStatus::Ongoing),
    (WorkflowStatus::ValidatedBySecretariat, WorkflowStatus::Completed),
];

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 8] = [
        WorkflowStatus::Draft,
        WorkflowStatus::Submitted,
        WorkflowStatus::SecretariatApproved,
        WorkflowStatus::Ongoing,
        WorkflowStatus::Completed,
        WorkflowStatus::Cancelled,
        WorkflowStatus::CompiledForSecretariat,
        WorkflowStatus::ValidatedBySecretariat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Submitted => "submitted",
            WorkflowStatus::SecretariatApproved => "secretariat_approved",
            WorkflowStatus::Ongoing => "ongoing",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Cancelled => "cancelled",
            WorkflowStatus::CompiledForSecretariat => "compiled_for_secretariat",
            WorkflowStatus::ValidatedBySecretariat => "validated_by_secretariat",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Cancelled)
    }

    /// Milestones may only be added or re-weighted while the project is being
    /// planned or actively worked on.
    pub fn accepts_milestone_changes(&self) -> bool {
        matches!(self, WorkflowStatus::Draft | WorkflowStatus::Ongoing)
    }

    pub fn can_transition_to(&self, target: WorkflowStatus) -> bool {
        if target == WorkflowStatus::Cancelled && !self.is_terminal() {
            return true;
        }
        TRANSITIONS.contains(&(*self, target))
    }

    /// Every status reachable from this one in a single step.
    pub fn next_states(&self) -> Vec<WorkflowStatus> {
        WorkflowStatus::ALL
            .iter()
            .copied()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    /// All legal edges, including the cancellation overrides.
    pub fn edges() -> Vec<TransitionEdge> {
        WorkflowStatus::ALL
            .iter()
            .flat_map(|from| {
                from.next_states()
                    .into_iter()
                    .map(move |to| TransitionEdge::new(*from, to))
            })
            .collect()
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("unknown workflow status '{s}'"))
    }
}

/// A directed edge in the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
}

impl TransitionEdge {
    pub fn new(from: WorkflowStatus, to: WorkflowStatus) -> Self {
        Self { from, to }
    }

    pub fn is_legal(&self) -> bool {
        self.from.can_transition_to(self.to)
    }

    /// Short human label used in activity descriptions.
    pub fn label(&self) -> &'static str {
        use WorkflowStatus::*;
        match (self.from, self.to) {
            (Submitted, Draft) => "rejected and returned to draft",
            (CompiledForSecretariat, Ongoing) => "compiled report returned",
            (Ongoing, Cancelled) => "cancelled",
            (_, Cancelled) => "cancelled by administrative override",
            (Draft, Submitted) => "submitted to secretariat",
            (Submitted, SecretariatApproved) => "approved by secretariat",
            (SecretariatApproved, Ongoing) => "implementation started",
            (Ongoing, CompiledForSecretariat) => "compiled for secretariat",
            (CompiledForSecretariat, ValidatedBySecretariat) => "validated by secretariat",
            (_, Completed) => "completed",
            _ => "status changed",
        }
    }
}

impl fmt::Display for TransitionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for TransitionEdge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("->")
            .ok_or_else(|| format!("transition '{s}' must look like 'from->to'"))?;
        Ok(TransitionEdge::new(from.parse()?, to.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            WorkflowStatus::Draft,
            WorkflowStatus::Submitted,
            WorkflowStatus::SecretariatApproved,
            WorkflowStatus::Ongoing,
            WorkflowStatus::CompiledForSecretariat,
            WorkflowStatus::ValidatedBySecretariat,
            WorkflowStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_skipping_approval_is_illegal() {
        assert!(!WorkflowStatus::Draft.can_transition_to(WorkflowStatus::Ongoing));
        assert!(!WorkflowStatus::Submitted.can_transition_to(WorkflowStatus::Ongoing));
        assert!(!WorkflowStatus::SecretariatApproved.can_transition_to(WorkflowStatus::Completed));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(WorkflowStatus::Completed.next_states().is_empty());
        assert!(WorkflowStatus::Cancelled.next_states().is_empty());
    }

    #[test]
    fn test_every_non_terminal_state_can_be_cancelled() {
        for status in WorkflowStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(WorkflowStatus::Cancelled), "{status}");
        }
    }

    #[test]
    fn test_no_self_loops() {
        for status in WorkflowStatus::ALL {
            assert!(!status.can_transition_to(status), "{status}");
        }
    }

    #[test]
    fn test_edge_parsing() {
        let edge: TransitionEdge = "submitted->secretariat_approved".parse().unwrap();
        assert_eq!(
            edge,
            TransitionEdge::new(WorkflowStatus::Submitted, WorkflowStatus::SecretariatApproved)
        );
        assert_eq!(edge.to_string(), "submitted->secretariat_approved");
        assert!("submitted".parse::<TransitionEdge>().is_err());
        assert!("draft->paused".parse::<TransitionEdge>().is_err());
    }

    #[test]
    fn test_edge_count_matches_table() {
        // 10 explicit edges plus overrides from draft, submitted,
        // secretariat_approved, compiled and validated (ongoing is explicit).
        assert_eq!(WorkflowStatus::edges().len(), 15);
    }
}
