//! Cost accounting for a static assignment
//!
//! Cost is derived from the assignment alone. Execution results never feed
//! into it, so a job that failed on a resource still activates that resource.

use std::collections::{BTreeSet, HashMap};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use costsim_core::{Assignment, CostsimError, Job, JobId, Resource, ResourceId, Result};

/// How a placement is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CostModel {
    /// Each used resource charges its price once, regardless of load
    #[default]
    Activation,

    /// Each job charges `price * length / capacity` on its resource
    Metered,
}

impl std::fmt::Display for CostModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostModel::Activation => write!(f, "activation"),
            CostModel::Metered => write!(f, "metered"),
        }
    }
}

/// Prices assignments against a resource table
pub struct CostAccountant<'a> {
    resources: HashMap<ResourceId, &'a Resource>,
    model: CostModel,
}

impl<'a> CostAccountant<'a> {
    pub fn new(resources: &'a [Resource], model: CostModel) -> Self {
        CostAccountant {
            resources: resources.iter().map(|r| (r.id, r)).collect(),
            model,
        }
    }

    /// Activation-model accountant
    pub fn activation(resources: &'a [Resource]) -> Self {
        Self::new(resources, CostModel::Activation)
    }

    /// Resources that received at least one job
    pub fn activated_resources(&self, assignment: &Assignment) -> Result<BTreeSet<ResourceId>> {
        for (job, resource) in assignment.iter() {
            self.lookup(job, resource)?;
        }
        Ok(assignment.targets())
    }

    /// Total cost of `assignment`.
    ///
    /// `jobs` is only consulted by the metered model (for job lengths).
    pub fn total_cost(&self, assignment: &Assignment, jobs: &[Job]) -> Result<f64> {
        match self.model {
            CostModel::Activation => {
                let mut total = 0.0;
                for id in self.activated_resources(assignment)? {
                    total += self.resources[&id].price;
                }
                Ok(total)
            }
            CostModel::Metered => {
                let lengths: HashMap<JobId, u64> = jobs.iter().map(|j| (j.id, j.length)).collect();
                let mut total = 0.0;
                for (job, resource_id) in assignment.iter() {
                    let resource = self.lookup(job, resource_id)?;
                    let length = lengths
                        .get(&job)
                        .copied()
                        .ok_or(CostsimError::Unassigned(job))?;
                    total += resource.price * length as f64 / resource.capacity;
                }
                Ok(total)
            }
        }
    }

    fn lookup(&self, job: JobId, resource: ResourceId) -> Result<&'a Resource> {
        self.resources
            .get(&resource)
            .copied()
            .ok_or(CostsimError::UnknownResource { job, resource })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> Vec<Resource> {
        vec![
            Resource::new(0, 1000.0, 0.1),
            Resource::new(1, 2000.0, 0.15),
            Resource::new(2, 3000.0, 0.3),
            Resource::new(3, 4000.0, 0.35),
        ]
    }

    fn assignment(pairs: &[(u32, u32)]) -> Assignment {
        pairs
            .iter()
            .map(|&(j, r)| (JobId(j), ResourceId(r)))
            .collect()
    }

    #[test]
    fn test_activation_counts_each_resource_once() {
        let resources = resources();
        let accountant = CostAccountant::activation(&resources);

        let light = assignment(&[(0, 0), (1, 2)]);
        let heavy = assignment(&[(0, 0), (1, 2), (2, 2), (3, 2), (4, 0)]);

        let light_cost = accountant.total_cost(&light, &[]).unwrap();
        let heavy_cost = accountant.total_cost(&heavy, &[]).unwrap();
        assert!((light_cost - 0.4).abs() < 1e-9);
        assert!((heavy_cost - light_cost).abs() < 1e-12);
    }

    #[test]
    fn test_unused_resources_are_free() {
        let resources = resources();
        let accountant = CostAccountant::activation(&resources);

        assert_eq!(accountant.total_cost(&Assignment::default(), &[]).unwrap(), 0.0);
        assert!(accountant.activated_resources(&Assignment::default()).unwrap().is_empty());
    }

    #[test]
    fn test_cost_is_order_independent_and_idempotent() {
        let resources = resources();
        let accountant = CostAccountant::activation(&resources);

        let forward = assignment(&[(0, 3), (1, 1), (2, 0)]);
        let backward = assignment(&[(2, 0), (1, 1), (0, 3)]);

        let first = accountant.total_cost(&forward, &[]).unwrap();
        let again = accountant.total_cost(&forward, &[]).unwrap();
        let reversed = accountant.total_cost(&backward, &[]).unwrap();
        assert_eq!(first, again);
        assert_eq!(first, reversed);
        assert!((first - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_cost_grows_with_activated_resources() {
        let resources = resources();
        let accountant = CostAccountant::activation(&resources);

        let mut previous = 0.0;
        for used in 1..=4u32 {
            let pairs: Vec<(u32, u32)> = (0..used).map(|r| (r, r)).collect();
            let cost = accountant.total_cost(&assignment(&pairs), &[]).unwrap();
            assert!(cost >= previous);
            previous = cost;
        }
        assert!((previous - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_resource_is_an_error() {
        let resources = resources();
        let accountant = CostAccountant::activation(&resources);

        let stray = assignment(&[(0, 0), (1, 42)]);
        assert!(matches!(
            accountant.total_cost(&stray, &[]),
            Err(CostsimError::UnknownResource { job: JobId(1), resource: ResourceId(42) })
        ));
    }

    #[test]
    fn test_metered_cost_uses_nominal_busy_time() {
        let resources = resources();
        let accountant = CostAccountant::new(&resources, CostModel::Metered);
        let jobs = Job::from_lengths(&[10_000, 4_000]);

        // 10000 / 1000 * 0.1 + 4000 / 4000 * 0.35
        let cost = accountant
            .total_cost(&assignment(&[(0, 0), (1, 3)]), &jobs)
            .unwrap();
        assert!((cost - 1.35).abs() < 1e-9);
    }
}
