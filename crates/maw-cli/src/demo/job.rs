use std::collections::HashMap;
use std::time::Duration;

use maw_execution::job::{Job, JobError};

/// The largest accepted slowdown factor of a worker.
pub(super) const MAX_SLOWDOWN: f64 = 1000.0;

/// A job that sleeps for a base duration scaled by the slowdown factor of the
/// worker running it. The worker is identified by the name of its engine thread.
#[derive(Debug)]
pub(super) struct DemoJob {
    pub base: Duration,
    pub slowdown: HashMap<String, f64>,
    pub fail_every: usize,
}

impl Job for DemoJob {
    fn run(&self, input: &[u8]) -> Result<Vec<u8>, JobError> {
        let factor = std::thread::current()
            .name()
            .and_then(|name| self.slowdown.get(name))
            .copied()
            .unwrap_or(1.0);
        let delay = Duration::try_from_secs_f64(self.base.as_secs_f64() * factor)
            .map_err(|e| JobError::new(format!("invalid slowdown factor {factor}: {e}")))?;
        std::thread::sleep(delay);
        let index = input
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| JobError::new("the input is not a job index"))?;
        if self.fail_every > 0 && index % self.fail_every as u64 == 0 {
            return Err(JobError::new(format!("job {index} failed on purpose")));
        }
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_job_failures() {
        let job = DemoJob {
            base: Duration::ZERO,
            slowdown: HashMap::new(),
            fail_every: 3,
        };
        assert!(job.run(&1u64.to_le_bytes()).is_ok());
        assert!(job.run(&3u64.to_le_bytes()).is_err());
        assert!(job.run(b"x").is_err());
    }

    #[test]
    fn test_demo_job_rejects_overflowing_slowdown() {
        let name = std::thread::current().name().unwrap().to_string();
        let job = DemoJob {
            base: Duration::from_secs(1),
            slowdown: HashMap::from([(name, 1e20)]),
            fail_every: 0,
        };
        assert!(job.run(&1u64.to_le_bytes()).is_err());
    }
}
