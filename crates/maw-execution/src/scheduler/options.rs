use maw_common::config::{AppConfig, EstimatorKind, SelectorKind};

#[readonly::make]
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub selector: SelectorKind,
    pub max_outstanding_per_worker: usize,
    /// The maximum number of dispatches of a job, or `None` for no limit.
    pub job_max_attempts: Option<usize>,
    pub learn_from_failures: bool,
    pub account_queued_work: bool,
    pub rng_seed: Option<u64>,
    pub estimator_kind: EstimatorKind,
    pub estimator_decay_alpha: f64,
}

impl SchedulerOptions {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            selector: config.scheduler.selector,
            max_outstanding_per_worker: config.scheduler.max_outstanding_per_worker,
            job_max_attempts: config.scheduler.job_max_attempts,
            learn_from_failures: config.scheduler.learn_from_failures,
            account_queued_work: config.scheduler.account_queued_work,
            rng_seed: config.scheduler.rng_seed,
            estimator_kind: config.estimator.kind,
            estimator_decay_alpha: config.estimator.decay_alpha,
        }
    }
}
