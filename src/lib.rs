// Project Monitor Library - workflow, milestones and automated progress
// This exposes the core components for the service layer and integration tests

pub mod audit;
pub mod config;
pub mod error;
pub mod milestones;
pub mod observability;
pub mod progress;
pub mod project;
pub mod repository;
pub mod service;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use audit::{ActivityAction, ActivityRecord, AuditSink, InMemoryActivityLog, TracingAuditSink};
pub use config::{config, init_config, ProjectMonitorConfig};
pub use error::{MonitorError, Result};
pub use milestones::{DependencyGraph, Milestone, MilestoneStatus, MilestoneStore, NewMilestone};
pub use observability::{monitor_metrics, MonitorMetrics, OperationTimer};
pub use progress::{
    assess_delays, compute_progress, DelayReport, DelaySeverity, DelayThresholds, Percent,
    ProgressAggregator, ProgressOutcome, ProgressSettings, ProgressWarning,
};
pub use project::{Project, ProjectAggregate};
pub use repository::{InMemoryProjectRepository, ProjectRepository};
pub use service::{Committed, ProjectService};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use workflow::{
    Actor, AuthorizationPolicy, Permission, Role, RolePolicy, TransitionEdge, TransitionRecord,
    WorkflowEngine, WorkflowStatus,
};
