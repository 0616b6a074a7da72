use rand_chacha::ChaCha8Rng;

use crate::estimator::{draw_normal, Estimator};

/// An exponentially weighted mean and variance.
/// Recent samples dominate, with an effective horizon of about `1 / alpha` samples.
#[derive(Debug, Clone)]
pub struct DecayEstimator {
    alpha: f64,
    count: u64,
    mean: f64,
    variance: f64,
    rng: ChaCha8Rng,
}

impl DecayEstimator {
    pub fn new(alpha: f64, rng: ChaCha8Rng) -> Self {
        Self {
            alpha,
            count: 0,
            mean: 0.0,
            variance: 0.0,
            rng,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Estimator for DecayEstimator {
    fn name(&self) -> &'static str {
        "decay"
    }

    fn add_sample(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.variance = 0.0;
            return;
        }
        let delta = value - self.mean;
        let increment = self.alpha * delta;
        self.mean += increment;
        self.variance = (1.0 - self.alpha) * (self.variance + delta * increment);
    }

    fn sample_count(&self) -> u64 {
        self.count
    }

    fn average(&self) -> f64 {
        self.mean
    }

    fn std_dev(&self) -> f64 {
        if self.count < 2 {
            f64::INFINITY
        } else {
            self.variance.sqrt()
        }
    }

    fn likely_value(&mut self) -> f64 {
        let std_dev = self.std_dev();
        draw_normal(&mut self.rng, self.mean, std_dev)
    }
}
