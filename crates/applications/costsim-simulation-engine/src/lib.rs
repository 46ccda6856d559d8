//! Costsim Simulation Engine
//!
//! Compares a cost-aware job placement policy against a naive round-robin
//! baseline over priced VMs, and reports what each placement costs.

pub mod policies;
pub mod cost;
pub mod simulator;
pub mod config;
pub mod workload;
pub mod harness;
pub mod report;
