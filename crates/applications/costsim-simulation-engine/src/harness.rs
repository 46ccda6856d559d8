//! Cost-aware vs naive comparison harness
//!
//! Runs each scenario once: assign, price the static assignment, then hand
//! the assignment to the execution engine and collect per-job outcomes. The
//! two scenarios share no state, so they can also run concurrently (`async`
//! feature).

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use costsim_core::{Assignment, ExecutionEngine, Job, JobId, JobOutcome, Resource, ResourceId, Result};

use crate::config::{ScenarioSpec, SimulationConfig};
use crate::cost::{CostAccountant, CostModel};
use crate::policies::PolicyKind;

/// Where a scenario is in its single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStage {
    Created,
    Assigned,
    Costed,
}

/// A job set, a resource table and the policy that places one on the other
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub policy: PolicyKind,
    pub jobs: Vec<Job>,
    pub resources: Vec<Resource>,
    stage: ScenarioStage,
}

impl Scenario {
    pub fn new(name: impl Into<String>, policy: PolicyKind, jobs: Vec<Job>, resources: Vec<Resource>) -> Self {
        Scenario {
            name: name.into(),
            policy,
            jobs,
            resources,
            stage: ScenarioStage::Created,
        }
    }

    /// Build a scenario from its spec, with its own copy of the shared jobs
    pub fn from_spec(spec: &ScenarioSpec, jobs: &[Job]) -> Self {
        Self::new(spec.name.clone(), spec.policy, jobs.to_vec(), spec.resources.clone())
    }

    pub fn stage(&self) -> ScenarioStage {
        self.stage
    }

    fn advance(&mut self, next: ScenarioStage) {
        debug!("Scenario '{}': {:?} -> {:?}", self.name, self.stage, next);
        self.stage = next;
    }
}

/// Result of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub policy: PolicyKind,
    pub policy_name: String,
    pub cost_model: CostModel,
    pub stage: ScenarioStage,
    pub resources: Vec<Resource>,
    pub assignment: Assignment,
    pub outcomes: Vec<JobOutcome>,
    pub activated_resources: Vec<ResourceId>,
    pub total_cost: f64,
}

impl ScenarioResult {
    pub fn total_jobs(&self) -> usize {
        self.assignment.len()
    }

    /// Assigned jobs with at least one successful outcome
    pub fn completed_jobs(&self) -> usize {
        let succeeded: HashSet<JobId> = self
            .outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.job_id)
            .collect();
        self.assignment.iter().filter(|(job, _)| succeeded.contains(job)).count()
    }

    /// Assigned jobs that failed or that the engine never reported on
    pub fn failed_jobs(&self) -> usize {
        self.total_jobs() - self.completed_jobs()
    }
}

/// Both scenario results and what the cost-aware policy saved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub engine: String,
    pub cost_aware: ScenarioResult,
    pub naive: ScenarioResult,
    /// Naive cost minus cost-aware cost (negative if cost-aware spent more)
    pub savings: f64,
    /// Savings as a percentage of the naive cost, 0 when that cost is 0
    pub savings_pct: f64,
}

impl ComparisonReport {
    pub fn new(engine: impl Into<String>, cost_aware: ScenarioResult, naive: ScenarioResult) -> Self {
        let savings = naive.total_cost - cost_aware.total_cost;
        let savings_pct = if naive.total_cost > 0.0 {
            savings / naive.total_cost * 100.0
        } else {
            0.0
        };

        ComparisonReport {
            engine: engine.into(),
            cost_aware,
            naive,
            savings,
            savings_pct,
        }
    }
}

/// Run one scenario to completion on `engine`
pub fn run_scenario(
    engine: &dyn ExecutionEngine,
    mut scenario: Scenario,
    capacity_threshold: f64,
    cost_model: CostModel,
) -> Result<ScenarioResult> {
    let policy = scenario.policy.build(capacity_threshold);
    let assignment = policy.assign(&scenario.jobs, &scenario.resources)?;
    scenario.advance(ScenarioStage::Assigned);

    // Cost comes from the static assignment alone
    let accountant = CostAccountant::new(&scenario.resources, cost_model);
    let activated_resources: Vec<ResourceId> =
        accountant.activated_resources(&assignment)?.into_iter().collect();
    let total_cost = accountant.total_cost(&assignment, &scenario.jobs)?;
    scenario.advance(ScenarioStage::Costed);

    info!(
        "Scenario '{}' ({}): {} jobs on {} of {} resources, {} cost ${:.2}",
        scenario.name,
        policy.name(),
        assignment.len(),
        activated_resources.len(),
        scenario.resources.len(),
        cost_model,
        total_cost
    );
    for (resource, jobs) in assignment.load() {
        debug!("Scenario '{}': resource {} runs {} jobs", scenario.name, resource, jobs);
    }

    let outcomes = engine.execute(&scenario.jobs, &scenario.resources, &assignment)?;

    Ok(ScenarioResult {
        policy_name: policy.name().to_string(),
        name: scenario.name,
        policy: scenario.policy,
        cost_model,
        stage: scenario.stage,
        resources: scenario.resources,
        assignment,
        outcomes,
        activated_resources,
        total_cost,
    })
}

/// Drives the cost-aware and naive scenarios through one execution engine
pub struct ComparisonHarness {
    engine: Arc<dyn ExecutionEngine>,
    config: SimulationConfig,
}

impl ComparisonHarness {
    /// Create a harness over a validated configuration
    pub fn new(engine: Arc<dyn ExecutionEngine>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(ComparisonHarness { engine, config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn scenarios(&self) -> (Scenario, Scenario) {
        (
            Scenario::from_spec(&self.config.cost_aware, &self.config.jobs),
            Scenario::from_spec(&self.config.naive, &self.config.jobs),
        )
    }

    /// Run both scenarios one after the other
    pub fn run(&self) -> Result<ComparisonReport> {
        let (cost_aware, naive) = self.scenarios();
        let threshold = self.config.capacity_threshold;
        let model = self.config.cost_model;

        let cost_aware = run_scenario(self.engine.as_ref(), cost_aware, threshold, model)?;
        let naive = run_scenario(self.engine.as_ref(), naive, threshold, model)?;

        Ok(ComparisonReport::new(self.engine.name(), cost_aware, naive))
    }

    /// Run both scenarios concurrently on the blocking pool
    #[cfg(feature = "async")]
    pub async fn run_concurrent(&self) -> Result<ComparisonReport> {
        let (cost_aware, naive) = self.scenarios();
        let threshold = self.config.capacity_threshold;
        let model = self.config.cost_model;

        let spawn = |scenario: Scenario| {
            let engine = Arc::clone(&self.engine);
            tokio::task::spawn_blocking(move || run_scenario(engine.as_ref(), scenario, threshold, model))
        };

        let aborted = |side: &str, e: tokio::task::JoinError| {
            costsim_core::CostsimError::internal(format!("{} run aborted: {}", side, e))
        };

        let (cost_aware, naive) = tokio::join!(spawn(cost_aware), spawn(naive));
        let cost_aware = cost_aware.map_err(|e| aborted("cost-aware", e))??;
        let naive = naive.map_err(|e| aborted("naive", e))??;

        Ok(ComparisonReport::new(self.engine.name(), cost_aware, naive))
    }
}
