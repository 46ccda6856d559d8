//! Assignment policies for job placement
//!
//! Implements the two policies being compared:
//! - CostAware: cheapest resource that can finish the job within the
//!   capacity threshold, falling back to the most expensive resource
//! - RoundRobin: pricing- and capacity-blind cycling over the resource list

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use costsim_core::{ensure_unique_ids, ensure_valid_records, Assignment, CostsimError, Job, Resource, Result};

/// Nominal duration a resource gets to finish a job before it counts as too
/// small for it
pub const DEFAULT_CAPACITY_THRESHOLD: f64 = 10.0;

/// Assignment policy trait
pub trait AssignmentPolicy: Send + Sync {
    /// Map every job to exactly one resource
    fn assign(&self, jobs: &[Job], resources: &[Resource]) -> Result<Assignment>;

    /// Get policy name
    fn name(&self) -> &str;
}

/// Policy selector, used by configuration and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Greedy first-fit by ascending price
    CostAware,

    /// Cycle through resources in their given order
    RoundRobin,
}

impl PolicyKind {
    /// Build the policy this kind names
    pub fn build(self, capacity_threshold: f64) -> Box<dyn AssignmentPolicy> {
        match self {
            PolicyKind::CostAware => Box::new(CostAwarePolicy::new(capacity_threshold)),
            PolicyKind::RoundRobin => Box::new(RoundRobinPolicy::new()),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::CostAware => write!(f, "cost-aware"),
            PolicyKind::RoundRobin => write!(f, "round-robin"),
        }
    }
}

fn check_preconditions(jobs: &[Job], resources: &[Resource]) -> Result<()> {
    if resources.is_empty() {
        return Err(CostsimError::NoResources);
    }
    ensure_unique_ids(jobs, resources)?;
    ensure_valid_records(jobs, resources)
}

/// Cost-aware policy: shortest jobs first, each onto the cheapest resource
/// whose `capacity * threshold` covers the job length
pub struct CostAwarePolicy {
    capacity_threshold: f64,
}

impl CostAwarePolicy {
    pub fn new(capacity_threshold: f64) -> Self {
        CostAwarePolicy { capacity_threshold }
    }
}

impl Default for CostAwarePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_THRESHOLD)
    }
}

impl AssignmentPolicy for CostAwarePolicy {
    fn assign(&self, jobs: &[Job], resources: &[Resource]) -> Result<Assignment> {
        check_preconditions(jobs, resources)?;

        // Both sorts are stable, so ties keep their original order
        let mut by_length: Vec<&Job> = jobs.iter().collect();
        by_length.sort_by_key(|job| job.length);

        let mut by_price: Vec<&Resource> = resources.iter().collect();
        by_price.sort_by(|a, b| a.price.total_cmp(&b.price));

        let fallback = by_price[by_price.len() - 1];

        let assignment: Assignment = by_length
            .into_iter()
            .map(|job| {
                let target = match by_price
                    .iter()
                    .copied()
                    .find(|resource| resource.covers(job, self.capacity_threshold))
                {
                    Some(resource) => resource,
                    None => {
                        debug!(
                            "Job {} (length {}) fits no resource at threshold {}, falling back to resource {}",
                            job.id, job.length, self.capacity_threshold, fallback.id
                        );
                        fallback
                    }
                };
                trace!("Job {} -> resource {} (${:.2})", job.id, target.id, target.price);
                (job.id, target.id)
            })
            .collect();

        Ok(assignment)
    }

    fn name(&self) -> &str {
        "CostAware"
    }
}

/// Naive baseline: job `i` (original order) goes to `resources[i mod M]`
pub struct RoundRobinPolicy;

impl RoundRobinPolicy {
    pub fn new() -> Self {
        RoundRobinPolicy
    }
}

impl Default for RoundRobinPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentPolicy for RoundRobinPolicy {
    fn assign(&self, jobs: &[Job], resources: &[Resource]) -> Result<Assignment> {
        check_preconditions(jobs, resources)?;

        let mut cursor = 0;
        let assignment = jobs
            .iter()
            .map(|job| {
                let target = resources[cursor].id;
                cursor = (cursor + 1) % resources.len();
                (job.id, target)
            })
            .collect();

        Ok(assignment)
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costsim_core::{JobId, ResourceId};

    fn reference_resources() -> Vec<Resource> {
        vec![
            Resource::new(0, 1000.0, 0.1),
            Resource::new(1, 2000.0, 0.15),
            Resource::new(2, 3000.0, 0.3),
            Resource::new(3, 4000.0, 0.35),
        ]
    }

    fn reference_jobs() -> Vec<Job> {
        Job::from_lengths(&[1000, 2000, 5000, 8000, 10000, 15000, 20000, 25000, 30000, 40000])
    }

    #[test]
    fn test_cost_aware_reference_placement() {
        let policy = CostAwarePolicy::default();
        let assignment = policy.assign(&reference_jobs(), &reference_resources()).unwrap();

        let expected = [
            (0, 0), (1, 0), (2, 0), (3, 0), (4, 0),
            (5, 1), (6, 1),
            (7, 2), (8, 2),
            (9, 3),
        ];
        for (job, resource) in expected {
            assert_eq!(assignment.resource_for(JobId(job)), Some(ResourceId(resource)));
        }
        assert_eq!(assignment.targets().len(), 4);
    }

    #[test]
    fn test_cost_aware_picks_cheapest_fitting_resource() {
        // Listed out of price order: the cheap big machine must win
        let resources = vec![
            Resource::new(0, 500.0, 0.05),
            Resource::new(1, 5000.0, 0.50),
            Resource::new(2, 5000.0, 0.20),
        ];
        let jobs = vec![Job::new(7, 20_000)];

        let assignment = CostAwarePolicy::default().assign(&jobs, &resources).unwrap();
        assert_eq!(assignment.resource_for(JobId(7)), Some(ResourceId(2)));
    }

    #[test]
    fn test_cost_aware_fallback_to_priciest() {
        let resources = vec![
            Resource::new(0, 4000.0, 0.35),
            Resource::new(1, 1000.0, 0.10),
            Resource::new(2, 2000.0, 0.15),
        ];
        let jobs = vec![Job::new(0, 1_000_000)];

        let assignment = CostAwarePolicy::default().assign(&jobs, &resources).unwrap();
        assert_eq!(assignment.resource_for(JobId(0)), Some(ResourceId(0)));
    }

    #[test]
    fn test_cost_aware_price_ties_keep_input_order() {
        let resources = vec![
            Resource::new(5, 1000.0, 0.1),
            Resource::new(3, 1000.0, 0.1),
        ];
        let jobs = vec![Job::new(0, 100)];

        let assignment = CostAwarePolicy::default().assign(&jobs, &resources).unwrap();
        assert_eq!(assignment.resource_for(JobId(0)), Some(ResourceId(5)));

        // Same for the fallback: last in price order is the later of the tie
        let jobs = vec![Job::new(0, 1_000_000)];
        let assignment = CostAwarePolicy::default().assign(&jobs, &resources).unwrap();
        assert_eq!(assignment.resource_for(JobId(0)), Some(ResourceId(3)));
    }

    #[test]
    fn test_cost_aware_places_shortest_first() {
        let jobs = Job::from_lengths(&[30000, 1000, 15000]);
        let assignment = CostAwarePolicy::default().assign(&jobs, &reference_resources()).unwrap();

        let order: Vec<JobId> = assignment.iter().map(|(job, _)| job).collect();
        assert_eq!(order, vec![JobId(1), JobId(2), JobId(0)]);
    }

    #[test]
    fn test_cost_aware_threshold_is_configurable() {
        let jobs = vec![Job::new(0, 15_000)];

        let tight = CostAwarePolicy::new(10.0).assign(&jobs, &reference_resources()).unwrap();
        assert_eq!(tight.resource_for(JobId(0)), Some(ResourceId(1)));

        let loose = CostAwarePolicy::new(20.0).assign(&jobs, &reference_resources()).unwrap();
        assert_eq!(loose.resource_for(JobId(0)), Some(ResourceId(0)));
    }

    #[test]
    fn test_round_robin_cycles() {
        let jobs = reference_jobs();
        let resources = reference_resources();
        let assignment = RoundRobinPolicy::new().assign(&jobs, &resources).unwrap();

        assert_eq!(assignment.len(), jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(
                assignment.resource_for(job.id),
                Some(resources[i % resources.len()].id)
            );
        }
    }

    #[test]
    fn test_round_robin_ignores_price_order() {
        let resources = vec![
            Resource::new(9, 100.0, 9.0),
            Resource::new(1, 100.0, 0.1),
        ];
        let jobs = Job::from_lengths(&[1, 1, 1]);
        let assignment = RoundRobinPolicy::new().assign(&jobs, &resources).unwrap();

        let targets: Vec<ResourceId> = assignment.iter().map(|(_, r)| r).collect();
        assert_eq!(targets, vec![ResourceId(9), ResourceId(1), ResourceId(9)]);
    }

    #[test]
    fn test_policies_are_total() {
        let resources = reference_resources();
        for n in [0usize, 1, 3, 4, 11] {
            let lengths: Vec<u64> = (0..n as u64).map(|i| (i + 1) * 4321).collect();
            let jobs = Job::from_lengths(&lengths);

            for kind in [PolicyKind::CostAware, PolicyKind::RoundRobin] {
                let assignment = kind.build(DEFAULT_CAPACITY_THRESHOLD).assign(&jobs, &resources).unwrap();
                assert!(assignment.ensure_total(&jobs).is_ok(), "{} not total for {} jobs", kind, n);
            }
        }
    }

    #[test]
    fn test_empty_resources_rejected() {
        let jobs = reference_jobs();
        for kind in [PolicyKind::CostAware, PolicyKind::RoundRobin] {
            let result = kind.build(DEFAULT_CAPACITY_THRESHOLD).assign(&jobs, &[]);
            assert!(matches!(result, Err(CostsimError::NoResources)));
        }
    }

    #[test]
    fn test_unpriceable_resources_rejected() {
        let jobs = reference_jobs();
        let mut resources = reference_resources();
        resources[2].price = f64::NAN;

        for kind in [PolicyKind::CostAware, PolicyKind::RoundRobin] {
            let result = kind.build(DEFAULT_CAPACITY_THRESHOLD).assign(&jobs, &resources);
            assert!(matches!(result, Err(CostsimError::Setup(_))));
        }
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(PolicyKind::CostAware.build(10.0).name(), "CostAware");
        assert_eq!(PolicyKind::RoundRobin.build(10.0).name(), "RoundRobin");
        assert_eq!(PolicyKind::RoundRobin.to_string(), "round-robin");
    }
}
