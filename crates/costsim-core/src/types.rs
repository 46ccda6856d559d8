//! Core types shared across Costsim components

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CostsimError, Result};

/// Unique identifier for a job within a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Unique identifier for a resource within a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A priced unit of compute capacity (a virtual machine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub capacity: f64,  // Work units processed per nominal time unit (MIPS)
    pub price: f64,     // Flat activation cost, charged once if the resource is used

    // Passed through to the execution engine unchanged
    #[serde(default = "Resource::default_pes")]
    pub pes: u32,
    #[serde(default = "Resource::default_ram_mb")]
    pub ram_mb: u32,
    #[serde(default = "Resource::default_bandwidth")]
    pub bandwidth: u64,
    #[serde(default = "Resource::default_image_size")]
    pub image_size: u64,
}

impl Resource {
    /// Create a single-PE resource with the default machine profile
    /// (512 MB RAM, 1000 bandwidth, 10000 image size)
    pub fn new(id: u32, capacity: f64, price: f64) -> Self {
        Resource {
            id: ResourceId(id),
            capacity,
            price,
            pes: Self::default_pes(),
            ram_mb: Self::default_ram_mb(),
            bandwidth: Self::default_bandwidth(),
            image_size: Self::default_image_size(),
        }
    }

    /// Whether this resource can finish `job` within `threshold` nominal time units
    pub fn covers(&self, job: &Job, threshold: f64) -> bool {
        self.capacity * threshold >= job.length as f64
    }

    fn default_pes() -> u32 {
        1
    }

    fn default_ram_mb() -> u32 {
        512
    }

    fn default_bandwidth() -> u64 {
        1000
    }

    fn default_image_size() -> u64 {
        10000
    }
}

/// A unit of work to be placed on exactly one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub length: u64,  // Total work units required

    // Passed through to the execution engine unchanged
    #[serde(default = "Job::default_pes")]
    pub pes: u32,
    #[serde(default = "Job::default_io_size")]
    pub input_size: u64,
    #[serde(default = "Job::default_io_size")]
    pub output_size: u64,
}

impl Job {
    pub fn new(id: u32, length: u64) -> Self {
        Job {
            id: JobId(id),
            length,
            pes: Self::default_pes(),
            input_size: Self::default_io_size(),
            output_size: Self::default_io_size(),
        }
    }

    /// Build a job set from a list of lengths, numbering ids from 0
    pub fn from_lengths(lengths: &[u64]) -> Vec<Job> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &length)| Job::new(i as u32, length))
            .collect()
    }

    fn default_pes() -> u32 {
        1
    }

    fn default_io_size() -> u64 {
        300
    }
}

/// Reject job or resource sets that reuse an id
pub fn ensure_unique_ids(jobs: &[Job], resources: &[Resource]) -> Result<()> {
    let mut seen_jobs = HashSet::with_capacity(jobs.len());
    for job in jobs {
        if !seen_jobs.insert(job.id) {
            return Err(CostsimError::DuplicateJob(job.id));
        }
    }

    let mut seen_resources = HashSet::with_capacity(resources.len());
    for resource in resources {
        if !seen_resources.insert(resource.id) {
            return Err(CostsimError::DuplicateResource(resource.id));
        }
    }

    Ok(())
}

/// Reject records whose fields cannot be priced or run: capacity must be
/// positive and finite, price non-negative and finite, and every job needs a
/// non-zero length and at least one PE
pub fn ensure_valid_records(jobs: &[Job], resources: &[Resource]) -> Result<()> {
    for resource in resources {
        if !(resource.capacity.is_finite() && resource.capacity > 0.0) {
            return Err(CostsimError::setup(format!(
                "resource {} has non-positive capacity {}",
                resource.id, resource.capacity
            )));
        }
        if !(resource.price.is_finite() && resource.price >= 0.0) {
            return Err(CostsimError::setup(format!(
                "resource {} has invalid price {}",
                resource.id, resource.price
            )));
        }
        if resource.pes == 0 {
            return Err(CostsimError::setup(format!("resource {} has no PEs", resource.id)));
        }
    }

    for job in jobs {
        if job.length == 0 {
            return Err(CostsimError::setup(format!("job {} has zero length", job.id)));
        }
        if job.pes == 0 {
            return Err(CostsimError::setup(format!("job {} requests zero PEs", job.id)));
        }
    }

    Ok(())
}

/// Read-only mapping from job to the single resource it runs on.
///
/// Entries keep the order in which the policy placed them. There is no
/// mutating API: an assignment is built once (via `FromIterator`) and then
/// only read by engines and accountants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    entries: Vec<(JobId, ResourceId)>,
}

impl Assignment {
    /// Resource assigned to `job`, if any
    pub fn resource_for(&self, job: JobId) -> Option<ResourceId> {
        self.entries
            .iter()
            .find(|(j, _)| *j == job)
            .map(|(_, r)| *r)
    }

    /// Entries in placement order
    pub fn iter(&self) -> impl Iterator<Item = (JobId, ResourceId)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct resources that received at least one job, in id order
    pub fn targets(&self) -> BTreeSet<ResourceId> {
        self.entries.iter().map(|(_, r)| *r).collect()
    }

    /// Number of jobs placed on each targeted resource
    pub fn load(&self) -> HashMap<ResourceId, usize> {
        let mut load = HashMap::new();
        for (_, resource) in &self.entries {
            *load.entry(*resource).or_insert(0) += 1;
        }
        load
    }

    /// Check that every job in `jobs` has exactly one entry and that nothing
    /// else is mapped
    pub fn ensure_total(&self, jobs: &[Job]) -> Result<()> {
        let mut counts: HashMap<JobId, usize> = HashMap::with_capacity(self.entries.len());
        for (job, _) in &self.entries {
            *counts.entry(*job).or_insert(0) += 1;
        }

        for job in jobs {
            match counts.get(&job.id) {
                Some(1) => {}
                Some(_) => return Err(CostsimError::DuplicateJob(job.id)),
                None => return Err(CostsimError::Unassigned(job.id)),
            }
        }

        if counts.len() != jobs.len() {
            let known: HashSet<JobId> = jobs.iter().map(|j| j.id).collect();
            if let Some(stray) = counts.keys().find(|id| !known.contains(id)) {
                return Err(CostsimError::config(format!(
                    "assignment maps job {} which is not part of the scenario",
                    stray
                )));
            }
        }

        Ok(())
    }
}

impl FromIterator<(JobId, ResourceId)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (JobId, ResourceId)>>(iter: I) -> Self {
        Assignment {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Terminal status of a job as reported by the execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Success,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // pad() so column widths in reports apply
        match self {
            JobStatus::Success => f.pad("SUCCESS"),
            JobStatus::Failed => f.pad("FAILED"),
        }
    }
}

/// Per-job result read back from the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub resource_id: ResourceId,
    pub status: JobStatus,
    pub start_time: f64,
    pub finish_time: Option<f64>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Time spent executing, if the job finished
    pub fn elapsed(&self) -> Option<f64> {
        self.finish_time.map(|finish| finish - self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_covers_threshold() {
        let resource = Resource::new(0, 1000.0, 0.1);

        assert!(resource.covers(&Job::new(0, 10_000), 10.0));
        assert!(!resource.covers(&Job::new(1, 10_001), 10.0));
        assert!(resource.covers(&Job::new(2, 10_001), 11.0));
    }

    #[test]
    fn test_jobs_from_lengths() {
        let jobs = Job::from_lengths(&[1000, 2000, 5000]);

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].id, JobId(2));
        assert_eq!(jobs[2].length, 5000);
        assert_eq!(jobs[0].pes, 1);
        assert_eq!(jobs[0].input_size, 300);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let jobs = vec![Job::new(1, 10), Job::new(1, 20)];
        let resources = vec![Resource::new(0, 1.0, 0.0)];
        assert!(matches!(
            ensure_unique_ids(&jobs, &resources),
            Err(CostsimError::DuplicateJob(JobId(1)))
        ));

        let jobs = vec![Job::new(1, 10)];
        let resources = vec![Resource::new(3, 1.0, 0.0), Resource::new(3, 2.0, 0.0)];
        assert!(matches!(
            ensure_unique_ids(&jobs, &resources),
            Err(CostsimError::DuplicateResource(ResourceId(3)))
        ));
    }

    #[test]
    fn test_invalid_records_rejected() {
        let jobs = Job::from_lengths(&[10]);
        let valid = vec![Resource::new(0, 1.0, 0.0)];
        assert!(ensure_valid_records(&jobs, &valid).is_ok());

        for resource in [
            Resource::new(0, 0.0, 0.1),
            Resource::new(0, f64::INFINITY, 0.1),
            Resource::new(0, 1.0, -5.0),
            Resource::new(0, 1.0, f64::NAN),
        ] {
            assert!(matches!(
                ensure_valid_records(&jobs, &[resource]),
                Err(CostsimError::Setup(_))
            ));
        }

        let empty_job = vec![Job::new(0, 0)];
        assert!(matches!(
            ensure_valid_records(&empty_job, &valid),
            Err(CostsimError::Setup(_))
        ));
    }

    #[test]
    fn test_assignment_targets_and_load() {
        let assignment: Assignment = vec![
            (JobId(0), ResourceId(2)),
            (JobId(1), ResourceId(0)),
            (JobId(2), ResourceId(2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.resource_for(JobId(1)), Some(ResourceId(0)));
        assert_eq!(assignment.resource_for(JobId(9)), None);
        assert_eq!(
            assignment.targets().into_iter().collect::<Vec<_>>(),
            vec![ResourceId(0), ResourceId(2)]
        );
        assert_eq!(assignment.load()[&ResourceId(2)], 2);
    }

    #[test]
    fn test_assignment_totality_check() {
        let jobs = Job::from_lengths(&[10, 20]);

        let partial: Assignment = vec![(JobId(0), ResourceId(0))].into_iter().collect();
        assert!(matches!(partial.ensure_total(&jobs), Err(CostsimError::Unassigned(JobId(1)))));

        let doubled: Assignment = vec![
            (JobId(0), ResourceId(0)),
            (JobId(1), ResourceId(0)),
            (JobId(1), ResourceId(1)),
        ]
        .into_iter()
        .collect();
        assert!(matches!(doubled.ensure_total(&jobs), Err(CostsimError::DuplicateJob(JobId(1)))));

        let total: Assignment = vec![(JobId(1), ResourceId(0)), (JobId(0), ResourceId(0))]
            .into_iter()
            .collect();
        assert!(total.ensure_total(&jobs).is_ok());
    }

    #[test]
    fn test_outcome_elapsed() {
        let done = JobOutcome {
            job_id: JobId(0),
            resource_id: ResourceId(0),
            status: JobStatus::Success,
            start_time: 0.1,
            finish_time: Some(2.1),
        };
        assert!(done.is_success());
        assert!((done.elapsed().unwrap() - 2.0).abs() < 1e-9);

        let failed = JobOutcome {
            status: JobStatus::Failed,
            finish_time: None,
            ..done
        };
        assert!(!failed.is_success());
        assert_eq!(failed.elapsed(), None);
        assert_eq!(failed.status.to_string(), "FAILED");
    }
}
