// Progress Aggregator - automated progress from weighted milestones

pub mod aggregator;
pub mod delay;
pub mod percent;

pub use aggregator::{
    compute_progress, ProgressAggregator, ProgressComputation, ProgressOutcome, ProgressSettings,
    ProgressWarning,
};
pub use delay::{assess_delays, DelayReport, DelaySeverity, DelayThresholds, OverdueMilestone};
pub use percent::Percent;
