//! Online models of the time a worker needs to complete a job.

use std::fmt;

use maw_common::config::EstimatorKind;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

mod decay;
mod exact;
mod log_domain;

pub use decay::DecayEstimator;
pub use exact::ExactEstimator;
pub use log_domain::LogEstimator;

/// Running statistics of a non-negative scalar process.
///
/// Each estimator owns its random number generator so that the draws of
/// [`Estimator::likely_value`] are reproducible for a seeded scheduler.
pub trait Estimator: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// Incorporates one observation. The first call seeds the state.
    fn add_sample(&mut self, value: f64);

    fn sample_count(&self) -> u64;

    fn average(&self) -> f64;

    /// The standard deviation, or `f64::INFINITY` with fewer than two samples.
    fn std_dev(&self) -> f64;

    /// A randomized value around the average, following the spread of the samples.
    /// Two calls without an intervening sample may return different values.
    fn likely_value(&mut self) -> f64;

    /// A pessimistic estimate, or `f64::INFINITY` with fewer than two samples.
    fn high_estimate(&self) -> f64 {
        self.average() + self.std_dev()
    }
}

/// Draws `average + std_dev * N(0, 1)`.
/// A non-finite deviation means there is nothing known about the spread yet,
/// in which case the average itself is returned.
pub(crate) fn draw_normal(rng: &mut ChaCha8Rng, average: f64, std_dev: f64) -> f64 {
    if !std_dev.is_finite() {
        return average;
    }
    let z: f64 = StandardNormal.sample(rng);
    average + std_dev * z
}

/// Creates an estimator of the given kind, seeded with one optimistic sample of 0
/// so that workers without history are attractive to the scheduler.
pub fn create_estimator(
    kind: EstimatorKind,
    decay_alpha: f64,
    rng: ChaCha8Rng,
) -> Box<dyn Estimator> {
    let mut estimator: Box<dyn Estimator> = match kind {
        EstimatorKind::Exact => Box::new(ExactEstimator::new(rng)),
        EstimatorKind::Decay => Box::new(DecayEstimator::new(decay_alpha, rng)),
        EstimatorKind::LogExact => Box::new(LogEstimator::new(ExactEstimator::new(rng))),
        EstimatorKind::LogDecay => {
            Box::new(LogEstimator::new(DecayEstimator::new(decay_alpha, rng)))
        }
    };
    estimator.add_sample(0.0);
    estimator
}
