use crate::estimator::Estimator;

/// Estimates a value through its logarithm, which suits processes whose spread
/// grows with their magnitude.
///
/// Samples are mapped with `ln(1 + x)` and estimates are mapped back with
/// `exp(y) - 1`, so a sample of 0 stays finite and estimates are never negative.
#[derive(Debug, Clone)]
pub struct LogEstimator<E> {
    inner: E,
}

impl<E: Estimator> LogEstimator<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

fn to_log(value: f64) -> f64 {
    value.max(0.0).ln_1p()
}

fn from_log(value: f64) -> f64 {
    value.exp_m1().max(0.0)
}

impl<E: Estimator> Estimator for LogEstimator<E> {
    fn name(&self) -> &'static str {
        "log"
    }

    fn add_sample(&mut self, value: f64) {
        self.inner.add_sample(to_log(value));
    }

    fn sample_count(&self) -> u64 {
        self.inner.sample_count()
    }

    fn average(&self) -> f64 {
        from_log(self.inner.average())
    }

    fn std_dev(&self) -> f64 {
        self.high_estimate() - self.average()
    }

    fn likely_value(&mut self) -> f64 {
        from_log(self.inner.likely_value())
    }

    fn high_estimate(&self) -> f64 {
        from_log(self.inner.high_estimate())
    }
}
