use std::fmt;

use crate::estimator::Estimator;
use crate::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerRole {
    Master,
    Worker { master: NodeId, master_gone: bool },
}

impl fmt::Display for SchedulerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerRole::Master => write!(f, "master"),
            SchedulerRole::Worker { master, .. } => write!(f, "worker of master {master}"),
        }
    }
}

pub(super) struct WorkerRecord {
    pub estimator: Box<dyn Estimator>,
    pub deleted: bool,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
}

impl WorkerRecord {
    pub fn new(estimator: Box<dyn Estimator>) -> Self {
        Self {
            estimator,
            deleted: false,
            dispatched: 0,
            completed: 0,
            failed: 0,
        }
    }
}

/// A snapshot of what the scheduler knows about one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStatistics {
    pub worker: NodeId,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub sample_count: u64,
    pub average_seconds: f64,
    pub deleted: bool,
}
