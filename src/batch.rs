//! Batch obfuscation of plot records
//!
//! Each record is sampled independently and its rows are appended in input
//! order, so all samples of one plot stay contiguous.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::sampler::{validate_radius, validate_sample_count, SampleRequest, SampleResult, SpatialSampler};
use crate::types::{PlotRecord, SampleRow};

const ROW_PREALLOCATION_LIMIT: usize = 1 << 20;

/// What to do when a single record cannot be sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and continue with the next record
    #[default]
    SkipAndReport,
    /// Abort the whole batch on the first failing record
    FailFast,
}

/// Parameters shared by every record in a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchParams {
    radius_feet: f64,
    sample_count: usize,
}

impl BatchParams {
    pub fn new(radius_feet: f64, sample_count: i64) -> Result<Self> {
        Ok(Self {
            radius_feet: validate_radius(radius_feet)?,
            sample_count: validate_sample_count(sample_count)?,
        })
    }

    pub fn radius_feet(&self) -> f64 {
        self.radius_feet
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn request_for(&self, record: &PlotRecord) -> Result<SampleRequest> {
        SampleRequest::new(
            record.location(),
            self.radius_feet,
            self.sample_count as i64,
            record.plot_id.clone(),
        )
    }
}

/// A record that could not be sampled
#[derive(Debug)]
pub struct RecordFailure {
    /// Zero-based position in the input
    pub index: usize,
    pub plot_id: String,
    pub error: Error,
}

/// Flattened rows plus every record that failed
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub rows: Vec<SampleRow>,
    pub failures: Vec<RecordFailure>,
}

impl BatchOutput {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Maps records through a [`SpatialSampler`] and flattens the results
pub struct BatchDriver {
    sampler: SpatialSampler,
    policy: FailurePolicy,
}

impl BatchDriver {
    pub fn new(sampler: SpatialSampler, policy: FailurePolicy) -> Self {
        Self { sampler, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Samples records sequentially from one random source
    pub fn run<R: Rng>(&self, records: &[PlotRecord], params: &BatchParams, rng: &mut R) -> Result<BatchOutput> {
        self.sampler.check_sample_count(params.sample_count())?;

        let results = records
            .iter()
            .map(|record| self.sample_record(record, params, &mut *rng));

        self.collect(records, params, results)
    }

    /// Samples records in parallel, reproducibly for a given seed
    ///
    /// Record `i` draws from its own generator seeded from `(seed, i)`, so the
    /// output does not depend on thread scheduling.
    pub fn run_parallel(&self, records: &[PlotRecord], params: &BatchParams, seed: u64) -> Result<BatchOutput> {
        self.sampler.check_sample_count(params.sample_count())?;

        let results: Vec<Result<SampleResult>> = records
            .par_iter()
            .enumerate()
            .map(|(index, record)| {
                let mut rng = record_rng(seed, index);
                self.sample_record(record, params, &mut rng)
            })
            .collect();

        self.collect(records, params, results)
    }

    fn sample_record<R: Rng>(&self, record: &PlotRecord, params: &BatchParams, rng: &mut R) -> Result<SampleResult> {
        let request = params.request_for(record)?;
        self.sampler.sample(&request, rng)
    }

    fn collect<I>(&self, records: &[PlotRecord], params: &BatchParams, results: I) -> Result<BatchOutput>
    where
        I: IntoIterator<Item = Result<SampleResult>>,
    {
        // preallocate only what fits; the rows grow past it if needed
        let capacity = records
            .len()
            .checked_mul(params.sample_count())
            .map_or(0, |n| n.min(ROW_PREALLOCATION_LIMIT));
        let mut output = BatchOutput {
            rows: Vec::with_capacity(capacity),
            failures: Vec::new(),
        };

        for (index, (record, result)) in records.iter().zip(results).enumerate() {
            match result {
                Ok(samples) => output.rows.extend(samples.into_rows()),
                Err(error) => {
                    if self.policy == FailurePolicy::FailFast {
                        log::error!("Plot {} (record {}) failed: {}", record.plot_id, index, error);
                        return Err(error);
                    }

                    log::warn!("Skipping plot {} (record {}): {}", record.plot_id, index, error);
                    output.failures.push(RecordFailure {
                        index,
                        plot_id: record.plot_id.clone(),
                        error,
                    });
                }
            }
        }

        log::info!(
            "Sampled {} records into {} rows ({} failed)",
            records.len() - output.failures.len(),
            output.rows.len(),
            output.failures.len()
        );

        Ok(output)
    }
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::new(SpatialSampler::default(), FailurePolicy::default())
    }
}

fn record_rng(seed: u64, index: usize) -> StdRng {
    // golden-ratio multiplier spreads consecutive indices across the seed space
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
