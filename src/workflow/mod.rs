// Workflow Engine - project approval lifecycle
//
// Statuses and their legal edges live in `status`, role grants in `policy`,
// and `engine` applies a transition to a project.

pub mod engine;
pub mod policy;
pub mod status;

pub use engine::{TransitionRecord, WorkflowEngine};
pub use policy::{Actor, AuthorizationPolicy, Permission, Role, RolePolicy};
pub use status::{TransitionEdge, WorkflowStatus};
