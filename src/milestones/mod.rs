// Milestone Store - ordered, weighted milestones per project
//
// Milestones carry the weights that drive automated progress. The store keeps
// their order dense and their dependency graph acyclic.

pub mod graph;
pub mod store;
pub mod types;

pub use graph::DependencyGraph;
pub use store::MilestoneStore;
pub use types::{Milestone, MilestoneStatus, NewMilestone};
