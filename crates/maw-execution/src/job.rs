use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::id::{JobId, NodeId};

/// The failure reported by a job that could not produce a result.
#[derive(Debug, Clone, Error)]
#[error("job failed: {message}")]
pub struct JobError {
    message: String,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An executable unit of work.
/// The job is shared between the master and the workers of an in-process pool,
/// so it must be safe to run from any engine thread.
pub trait Job: fmt::Debug + Send + Sync {
    fn run(&self, input: &[u8]) -> Result<Vec<u8>, JobError>;
}

/// A job that sleeps for a fixed duration and echoes its input.
#[derive(Debug, Clone)]
pub struct SleepJob {
    duration: Duration,
}

impl SleepJob {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for SleepJob {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl Job for SleepJob {
    fn run(&self, input: &[u8]) -> Result<Vec<u8>, JobError> {
        std::thread::sleep(self.duration);
        Ok(input.to_vec())
    }
}

/// A job that always fails, optionally after doing some work first.
#[derive(Debug, Clone, Default)]
pub struct FailingJob {
    delay: Duration,
}

impl FailingJob {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Job for FailingJob {
    fn run(&self, _input: &[u8]) -> Result<Vec<u8>, JobError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Err(JobError::new("the job was configured to fail"))
    }
}

/// A job backed by a closure.
pub struct FnJob<F> {
    name: &'static str,
    func: F,
}

impl<F> FnJob<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, JobError> + Send + Sync,
{
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> fmt::Debug for FnJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnJob").field("name", &self.name).finish()
    }
}

impl<F> Job for FnJob<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, JobError> + Send + Sync,
{
    fn run(&self, input: &[u8]) -> Result<Vec<u8>, JobError> {
        (self.func)(input)
    }
}

/// A submitted job together with its input.
/// The instance moves between the pending queue and the outstanding ledger,
/// and the attempt number is the only part that changes along the way.
#[derive(Debug, Clone)]
pub struct JobInstance {
    id: JobId,
    job: Arc<dyn Job>,
    input: Arc<[u8]>,
    attempt: usize,
}

impl JobInstance {
    pub fn new(id: JobId, job: Arc<dyn Job>, input: Arc<[u8]>) -> Self {
        Self {
            id,
            job,
            input,
            attempt: 1,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn job(&self) -> &Arc<dyn Job> {
        &self.job
    }

    pub fn input(&self) -> &Arc<[u8]> {
        &self.input
    }

    /// The 1-based attempt number of the next (or current) dispatch.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub(crate) fn into_retry(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}

/// The final state of a submitted job, delivered to the submitter.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded {
        job_id: JobId,
        worker: NodeId,
        result: Vec<u8>,
        duration: Duration,
        attempts: usize,
    },
    Failed {
        job_id: JobId,
        worker: NodeId,
        duration: Duration,
        attempts: usize,
    },
    /// The job was requeued too many times after worker departures.
    Abandoned { job_id: JobId, attempts: usize },
}

impl JobOutcome {
    pub fn job_id(&self) -> JobId {
        match self {
            JobOutcome::Succeeded { job_id, .. }
            | JobOutcome::Failed { job_id, .. }
            | JobOutcome::Abandoned { job_id, .. } => *job_id,
        }
    }

    pub fn result(&self) -> Option<&[u8]> {
        match self {
            JobOutcome::Succeeded { result, .. } => Some(result.as_slice()),
            JobOutcome::Failed { .. } | JobOutcome::Abandoned { .. } => None,
        }
    }

    pub fn worker(&self) -> Option<NodeId> {
        match self {
            JobOutcome::Succeeded { worker, .. } | JobOutcome::Failed { worker, .. } => {
                Some(*worker)
            }
            JobOutcome::Abandoned { .. } => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            JobOutcome::Succeeded { duration, .. } | JobOutcome::Failed { duration, .. } => {
                Some(*duration)
            }
            JobOutcome::Abandoned { .. } => None,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            JobOutcome::Succeeded { attempts, .. }
            | JobOutcome::Failed { attempts, .. }
            | JobOutcome::Abandoned { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}
