use rand_chacha::ChaCha8Rng;

use crate::estimator::{draw_normal, Estimator};

/// Exact mean and sample variance over all observations, computed with
/// Welford's incremental algorithm.
#[derive(Debug, Clone)]
pub struct ExactEstimator {
    count: u64,
    mean: f64,
    m2: f64,
    rng: ChaCha8Rng,
}

impl ExactEstimator {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            rng,
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            f64::INFINITY
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

impl Estimator for ExactEstimator {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn add_sample(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn sample_count(&self) -> u64 {
        self.count
    }

    fn average(&self) -> f64 {
        self.mean
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    fn likely_value(&mut self) -> f64 {
        let std_dev = self.std_dev();
        draw_normal(&mut self.rng, self.mean, std_dev)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn estimator() -> ExactEstimator {
        ExactEstimator::new(ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn test_average_is_arithmetic_mean() {
        let samples = [0.0, 3.5, 12.0, 7.25, 0.5, 100.0];
        let mut e = estimator();
        for (i, value) in samples.iter().enumerate() {
            e.add_sample(*value);
            let expected = samples[..=i].iter().sum::<f64>() / (i + 1) as f64;
            assert!((e.average() - expected).abs() < 1e-9);
        }
        assert_eq!(e.sample_count(), samples.len() as u64);
    }

    #[test]
    fn test_seeded_estimator_with_repeated_samples() {
        let mut e = estimator();
        e.add_sample(0.0);
        for _ in 0..4 {
            e.add_sample(10.0);
        }
        assert!((e.average() - 8.0).abs() < 1e-9);
        // sample variance of [0, 10, 10, 10, 10]
        assert!((e.variance() - 20.0).abs() < 1e-9);
        let high = e.high_estimate();
        assert!(high.is_finite());
        assert!(high >= e.average());
    }

    #[test]
    fn test_single_sample() {
        let mut e = estimator();
        e.add_sample(4.0);
        assert_eq!(e.std_dev(), f64::INFINITY);
        assert_eq!(e.high_estimate(), f64::INFINITY);
        assert_eq!(e.likely_value(), 4.0);
    }

    #[test]
    fn test_likely_value_is_randomized() {
        let mut e = estimator();
        for value in [8.0, 10.0, 12.0, 9.0, 11.0] {
            e.add_sample(value);
        }
        let draws = (0..2000).map(|_| e.likely_value()).collect::<Vec<_>>();
        assert!(draws.windows(2).any(|w| w[0] != w[1]));
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - e.average()).abs() < 0.5);
    }

    #[test]
    fn test_likely_value_is_reproducible() {
        let mut a = estimator();
        let mut b = estimator();
        for value in [1.0, 2.0, 3.0] {
            a.add_sample(value);
            b.add_sample(value);
        }
        for _ in 0..10 {
            assert_eq!(a.likely_value(), b.likely_value());
        }
    }
}
