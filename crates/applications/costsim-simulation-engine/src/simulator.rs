//! Discrete-event reference execution engine
//!
//! Runs an already-assigned job set on time-shared resources: every job on a
//! resource starts once the resource has booted, and the resource's capacity
//! is split evenly across its unfinished jobs. Placement is never revisited.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use costsim_core::{
    Assignment, CostsimError, ExecutionEngine, Job, JobId, JobOutcome, JobStatus, Resource,
    ResourceId, Result,
};

/// Provisioning delay before a resource starts running jobs
pub const DEFAULT_BOOT_DELAY: f64 = 0.1;

// Remaining work below this counts as done (absorbs float drift)
const WORK_EPSILON: f64 = 1e-6;

// Drift tolerance as a fraction of the job's length
const RELATIVE_WORK_EPSILON: f64 = 1e-12;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time at which resources become available
    pub boot_delay: f64,
    /// Jobs still running past this time are reported as failed
    pub horizon: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            boot_delay: DEFAULT_BOOT_DELAY,
            horizon: None,
        }
    }
}

/// Simulation event
#[derive(Debug, Clone, Copy)]
enum Event {
    ResourceReady { resource_id: ResourceId },
    JobCompletion { resource_id: ResourceId },
}

/// Timed event wrapper for priority queue ordering
#[derive(Debug, Clone)]
struct TimedEvent {
    time: f64,
    event: Event,
}

// Priority queue orders by time (earliest first)
impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time)
    }
}

impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for TimedEvent {}

impl PartialEq for TimedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

/// A job running on a resource
struct ActiveJob {
    id: JobId,
    length: f64,
    remaining: f64,
}

impl ActiveJob {
    fn is_done(&self) -> bool {
        self.remaining <= WORK_EPSILON.max(self.length * RELATIVE_WORK_EPSILON)
    }
}

/// Live state of one resource while the simulation runs
struct ResourceRun {
    capacity: f64,
    last_update: f64,
    active: Vec<ActiveJob>,
}

impl ResourceRun {
    /// Progress all active jobs up to `now` at their shared rate
    fn advance(&mut self, now: f64) {
        if !self.active.is_empty() {
            let share = self.capacity / self.active.len() as f64;
            let done = share * (now - self.last_update);
            for job in &mut self.active {
                job.remaining -= done;
            }
        }
        self.last_update = now;
    }

    fn smallest_remaining(&self) -> Option<usize> {
        self.active
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.remaining.total_cmp(&b.remaining))
            .map(|(index, _)| index)
    }

    /// When the next active job will finish, if any
    fn next_completion(&self) -> Option<f64> {
        let smallest = &self.active[self.smallest_remaining()?];
        let share = self.capacity / self.active.len() as f64;
        Some(self.last_update + smallest.remaining.max(0.0) / share)
    }

    /// Remove the jobs that are done at the current time.
    ///
    /// Called only when the earliest completion is due, so the job with the
    /// least remaining work is retired even if rounding left it just short.
    fn take_finished(&mut self) -> Vec<JobId> {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.active.drain(..).partition(ActiveJob::is_done);
        self.active = running;

        let mut finished: Vec<JobId> = finished.into_iter().map(|job| job.id).collect();
        if finished.is_empty() {
            if let Some(index) = self.smallest_remaining() {
                finished.push(self.active.swap_remove(index).id);
            }
        }
        finished
    }
}

/// Time-shared execution engine
pub struct TimeSharedEngine {
    config: EngineConfig,
}

impl TimeSharedEngine {
    pub fn new(config: EngineConfig) -> Self {
        TimeSharedEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reject malformed job or resource tables before anything runs
    fn validate(jobs: &[Job], resources: &[Resource], assignment: &Assignment) -> Result<()> {
        if resources.is_empty() {
            return Err(CostsimError::setup("resource set is empty"));
        }
        costsim_core::ensure_unique_ids(jobs, resources)?;
        costsim_core::ensure_valid_records(jobs, resources)?;

        assignment.ensure_total(jobs)?;
        for (job, resource) in assignment.iter() {
            if !resources.iter().any(|r| r.id == resource) {
                return Err(CostsimError::UnknownResource { job, resource });
            }
        }

        Ok(())
    }
}

impl Default for TimeSharedEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ExecutionEngine for TimeSharedEngine {
    fn name(&self) -> &str {
        "TimeShared"
    }

    fn execute(
        &self,
        jobs: &[Job],
        resources: &[Resource],
        assignment: &Assignment,
    ) -> Result<Vec<JobOutcome>> {
        Self::validate(jobs, resources, assignment)?;

        let start = self.config.boot_delay;
        let lengths: HashMap<JobId, u64> = jobs.iter().map(|j| (j.id, j.length)).collect();

        let mut runs: HashMap<ResourceId, ResourceRun> = resources
            .iter()
            .map(|r| {
                (r.id, ResourceRun { capacity: r.capacity, last_update: start, active: Vec::new() })
            })
            .collect();

        let mut event_queue = BinaryHeap::new();
        for resource in resources {
            event_queue.push(TimedEvent {
                time: start,
                event: Event::ResourceReady { resource_id: resource.id },
            });
        }

        let mut finish_times: HashMap<JobId, f64> = HashMap::new();

        while let Some(timed_event) = event_queue.pop() {
            if let Some(horizon) = self.config.horizon {
                if timed_event.time > horizon {
                    debug!("Reached horizon {:.2}, stopping", horizon);
                    break;
                }
            }

            let now = timed_event.time;
            match timed_event.event {
                Event::ResourceReady { resource_id } => {
                    let Some(run) = runs.get_mut(&resource_id) else { continue };
                    run.active = assignment
                        .iter()
                        .filter(|(_, r)| *r == resource_id)
                        .map(|(job, _)| {
                            let length = lengths[&job] as f64;
                            ActiveJob { id: job, length, remaining: length }
                        })
                        .collect();
                    run.last_update = now;
                    debug!("Resource {} started {} jobs at {:.2}", resource_id, run.active.len(), now);

                    if let Some(time) = run.next_completion() {
                        event_queue.push(TimedEvent { time, event: Event::JobCompletion { resource_id } });
                    }
                }
                Event::JobCompletion { resource_id } => {
                    let Some(run) = runs.get_mut(&resource_id) else { continue };
                    run.advance(now);
                    for job in run.take_finished() {
                        finish_times.insert(job, now);
                    }

                    if let Some(time) = run.next_completion() {
                        event_queue.push(TimedEvent { time, event: Event::JobCompletion { resource_id } });
                    }
                }
            }
        }

        let mut outcomes: Vec<JobOutcome> = assignment
            .iter()
            .map(|(job_id, resource_id)| {
                let finish_time = finish_times.get(&job_id).copied();
                JobOutcome {
                    job_id,
                    resource_id,
                    status: if finish_time.is_some() { JobStatus::Success } else { JobStatus::Failed },
                    start_time: start,
                    finish_time,
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed > 0 {
            warn!("{} of {} jobs did not finish", failed, outcomes.len());
        }

        outcomes.sort_by(|a, b| match (a.finish_time, b.finish_time) {
            (Some(x), Some(y)) => x.total_cmp(&y).then(a.job_id.cmp(&b.job_id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.job_id.cmp(&b.job_id),
        });

        Ok(outcomes)
    }
}
