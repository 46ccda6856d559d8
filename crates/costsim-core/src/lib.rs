//! Costsim Core - Shared types and traits
//!
//! This crate defines the abstractions shared by:
//! - assignment policies (which resource runs which job)
//! - cost accounting (what a placement costs)
//! - execution engines (the collaborator that actually runs jobs)
//!
//! Key types:
//! - Resource / Job records and their ids
//! - Assignment (read-only job -> resource mapping)
//! - ExecutionEngine trait
//! - Error types

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
