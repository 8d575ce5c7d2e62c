// Cases and sub-tasks: aggregate loading, metadata merge, status derivation.

pub mod aggregate;
pub mod handlers;
pub mod metadata;
pub mod status;
pub mod subtasks;

pub use aggregate::{load_case_aggregate, CaseAggregate};
