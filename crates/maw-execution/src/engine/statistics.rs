use std::fmt;
use std::time::Duration;

use crate::id::NodeId;
use crate::scheduler::{SchedulerRole, WorkerStatistics};

/// Count, mean and maximum of a series of durations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeStatistics {
    count: u64,
    total: Duration,
    max: Duration,
}

impl TimeStatistics {
    pub fn add(&mut self, value: Duration) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.count as f64)
        }
    }
}

impl fmt::Display for TimeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count {}, mean {:.3}ms, max {:.3}ms",
            self.count,
            self.mean().as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0
        )
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct EngineStatistics {
    pub message_handling: Duration,
    pub requests_handling: Duration,
    pub idle: Duration,
    /// The time messages spent in the receive queue before being handled.
    pub linger: TimeStatistics,
    /// The longest the receive queue has been when drained.
    pub max_receive_queue_length: usize,
    pub executed_jobs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All submitted jobs have completed and no more submissions are expected.
    Completed,
    MasterDeparted,
    ShutdownRequested,
    PoolTerminated,
    /// The membership service declared the local node dead.
    DeclaredDead,
    /// All handles to the engine have been dropped.
    Disconnected,
}

/// The final statistics of an engine, available after it stops.
#[derive(Debug, Clone)]
pub struct EngineReport {
    pub node: NodeId,
    pub role: SchedulerRole,
    pub stop_reason: StopReason,
    pub message_handling_time: Duration,
    pub requests_handling_time: Duration,
    pub idle_time: Duration,
    pub linger: TimeStatistics,
    pub max_receive_queue_length: usize,
    pub executed_jobs: u64,
    /// The number of nodes that departed while this node was the master.
    pub departed_nodes: usize,
    pub workers: Vec<WorkerStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_statistics() {
        let mut statistics = TimeStatistics::default();
        assert_eq!(statistics.mean(), Duration::ZERO);
        statistics.add(Duration::from_millis(10));
        statistics.add(Duration::from_millis(30));
        assert_eq!(statistics.count(), 2);
        assert_eq!(statistics.mean(), Duration::from_millis(20));
        assert_eq!(statistics.max(), Duration::from_millis(30));
        assert_eq!(
            statistics.to_string(),
            "count 2, mean 20.000ms, max 30.000ms"
        );
    }
}
