//! Error types for Costsim

use thiserror::Error;

use crate::types::{JobId, ResourceId};

/// Result type for costsim operations
pub type Result<T> = std::result::Result<T, CostsimError>;

/// Core error type for costsim operations
#[derive(Error, Debug)]
pub enum CostsimError {
    /// A policy was handed an empty resource set
    #[error("No resources available for assignment")]
    NoResources,

    #[error("Duplicate job id: {0}")]
    DuplicateJob(JobId),

    #[error("Duplicate resource id: {0}")]
    DuplicateResource(ResourceId),

    /// Assignment points at a resource that is not part of the scenario
    #[error("Job {job} is assigned to unknown resource {resource}")]
    UnknownResource { job: JobId, resource: ResourceId },

    /// Assignment is not total over the job set
    #[error("Job {0} has no assigned resource")]
    Unassigned(JobId),

    /// Malformed resource or job table handed to an execution engine
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CostsimError {
    /// Create a setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
