//! Synthetic job set generation
//!
//! Job lengths are drawn from a log-normal distribution (most jobs short, a
//! long tail of big ones) and clamped to a configurable range. A fixed seed
//! makes the workload reproducible across the two scenarios and across runs.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal};

use costsim_core::{CostsimError, Job, Result};

/// Log-normal job length generator
pub struct WorkloadGenerator {
    distribution: LogNormal<f64>,
    min_length: u64,
    max_length: u64,
    rng: StdRng,
}

impl WorkloadGenerator {
    /// Create a new generator
    ///
    /// # Arguments
    /// * `median_length` - Median job length in work units (e.g. 10000)
    /// * `sigma` - Spread of the underlying normal (0.0 gives constant lengths)
    /// * `seed` - Fixed seed for reproducible workloads, `None` for entropy
    pub fn new(median_length: f64, sigma: f64, seed: Option<u64>) -> Result<Self> {
        if !(median_length.is_finite() && median_length >= 1.0) {
            return Err(CostsimError::config(format!(
                "median job length must be at least 1, got {}",
                median_length
            )));
        }

        let distribution = LogNormal::new(median_length.ln(), sigma)
            .map_err(|e| CostsimError::config(format!("invalid length spread {}: {}", sigma, e)))?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(WorkloadGenerator {
            distribution,
            min_length: 1,
            max_length: u64::MAX,
            rng,
        })
    }

    /// Clamp generated lengths to `[min_length, max_length]`
    pub fn with_bounds(mut self, min_length: u64, max_length: u64) -> Self {
        self.min_length = min_length.max(1);
        self.max_length = max_length.max(self.min_length);
        self
    }

    /// Generate `count` jobs with ids `0..count`
    pub fn generate(&mut self, count: usize) -> Vec<Job> {
        let lengths: Vec<u64> = (0..count)
            .map(|_| {
                let sample = self.distribution.sample(&mut self.rng).round();
                // `as` saturates, so huge samples land on u64::MAX before clamping
                (sample as u64).clamp(self.min_length, self.max_length)
            })
            .collect();

        Job::from_lengths(&lengths)
    }
}
