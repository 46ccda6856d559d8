//! Core traits for Costsim
//!
//! The ExecutionEngine trait is the boundary to whatever actually runs jobs.
//! Policies and the cost accountant never see a concrete engine.

use crate::error::Result;
use crate::types::{Assignment, Job, JobOutcome, Resource};

/// Runs a fully assigned job set and reports per-job outcomes.
///
/// The call is synchronous: submit the assignment, wait for completion, read
/// the results. Engines must treat `assignment` as read-only and must not
/// re-route jobs. A job the engine could not finish is reported with
/// [`JobStatus::Failed`](crate::types::JobStatus::Failed) rather than as an
/// error; errors are reserved for setup failures.
pub trait ExecutionEngine: Send + Sync {
    /// Engine identity (for logs and reports)
    fn name(&self) -> &str;

    /// Execute every job on its assigned resource
    fn execute(
        &self,
        jobs: &[Job],
        resources: &[Resource],
        assignment: &Assignment,
    ) -> Result<Vec<JobOutcome>>;
}
