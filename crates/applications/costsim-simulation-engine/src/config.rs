//! Scenario configuration
//!
//! Defaults reproduce the reference comparison: ten jobs, four VMs priced
//! 0.10 to 0.35, capacity threshold 10, activation pricing. A TOML file can
//! override any part of it:
//!
//! ```toml
//! capacity_threshold = 10.0
//! cost_model = "activation"
//!
//! [engine]
//! boot_delay = 0.1
//! horizon = 500.0
//!
//! [[jobs]]
//! id = 0
//! length = 1000
//!
//! [cost_aware]
//! name = "cost-aware"
//! policy = "cost-aware"
//! resources = [{ id = 0, capacity = 1000.0, price = 0.1 }]
//!
//! [naive]
//! name = "naive"
//! policy = "round-robin"
//! resources = [{ id = 0, capacity = 1000.0, price = 0.1 }]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use costsim_core::{ensure_unique_ids, ensure_valid_records, CostsimError, Job, Resource, Result};

use crate::cost::CostModel;
use crate::policies::{PolicyKind, DEFAULT_CAPACITY_THRESHOLD};
use crate::simulator::EngineConfig;

/// Job lengths of the reference workload
pub const REFERENCE_JOB_LENGTHS: [u64; 10] =
    [1000, 2000, 5000, 8000, 10000, 15000, 20000, 25000, 30000, 40000];

/// (capacity, price) of the reference VMs
pub const REFERENCE_RESOURCES: [(f64, f64); 4] =
    [(1000.0, 0.1), (2000.0, 0.15), (3000.0, 0.3), (4000.0, 0.35)];

/// One side of the comparison: which policy runs over which resource table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub policy: PolicyKind,
    pub resources: Vec<Resource>,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, policy: PolicyKind, resources: Vec<Resource>) -> Self {
        ScenarioSpec {
            name: name.into(),
            policy,
            resources,
        }
    }

    pub fn reference_cost_aware() -> Self {
        Self::new("cost-aware", PolicyKind::CostAware, reference_resources())
    }

    pub fn reference_naive() -> Self {
        Self::new("naive", PolicyKind::RoundRobin, reference_resources())
    }
}

/// The reference VM table, ids numbered from 0
pub fn reference_resources() -> Vec<Resource> {
    REFERENCE_RESOURCES
        .iter()
        .enumerate()
        .map(|(i, &(capacity, price))| Resource::new(i as u32, capacity, price))
        .collect()
}

fn reference_jobs() -> Vec<Job> {
    Job::from_lengths(&REFERENCE_JOB_LENGTHS)
}

fn default_capacity_threshold() -> f64 {
    DEFAULT_CAPACITY_THRESHOLD
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// A resource fits a job when `capacity * capacity_threshold >= length`
    #[serde(default = "default_capacity_threshold")]
    pub capacity_threshold: f64,

    #[serde(default)]
    pub cost_model: CostModel,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Shared by both scenarios
    #[serde(default = "reference_jobs")]
    pub jobs: Vec<Job>,

    #[serde(default = "ScenarioSpec::reference_cost_aware")]
    pub cost_aware: ScenarioSpec,

    #[serde(default = "ScenarioSpec::reference_naive")]
    pub naive: ScenarioSpec,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            capacity_threshold: default_capacity_threshold(),
            cost_model: CostModel::default(),
            engine: EngineConfig::default(),
            jobs: reference_jobs(),
            cost_aware: ScenarioSpec::reference_cost_aware(),
            naive: ScenarioSpec::reference_naive(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CostsimError::config(e.to_string()))
    }

    /// Replace the shared job set with jobs of the given lengths
    pub fn with_job_lengths(mut self, lengths: &[u64]) -> Self {
        self.jobs = Job::from_lengths(lengths);
        self
    }

    /// Check everything that must hold before either policy runs
    pub fn validate(&self) -> Result<()> {
        if !(self.capacity_threshold.is_finite() && self.capacity_threshold > 0.0) {
            return Err(CostsimError::config(format!(
                "capacity_threshold must be positive, got {}",
                self.capacity_threshold
            )));
        }

        if !(self.engine.boot_delay.is_finite() && self.engine.boot_delay >= 0.0) {
            return Err(CostsimError::config(format!(
                "engine.boot_delay must be non-negative, got {}",
                self.engine.boot_delay
            )));
        }
        if let Some(horizon) = self.engine.horizon {
            if horizon <= self.engine.boot_delay {
                return Err(CostsimError::config(format!(
                    "engine.horizon ({}) must be later than boot_delay ({})",
                    horizon, self.engine.boot_delay
                )));
            }
        }

        for scenario in [&self.cost_aware, &self.naive] {
            if scenario.resources.is_empty() {
                warn!("Scenario '{}' has no resources", scenario.name);
                return Err(CostsimError::NoResources);
            }
            ensure_unique_ids(&self.jobs, &scenario.resources)?;
            ensure_valid_records(&self.jobs, &scenario.resources)?;
        }

        Ok(())
    }
}
