use std::sync::Arc;

use crate::id::{NodeId, RequestId};
use crate::job::Job;

/// A message exchanged between the master and its workers.
#[derive(Debug, Clone)]
pub struct Message {
    pub source: NodeId,
    pub payload: Payload,
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// Sent by the master to ask a worker to run a job.
    ExecuteRequest {
        job_id: RequestId,
        job: Arc<dyn Job>,
        input: Arc<[u8]>,
    },
    /// Sent by a worker after running a job.
    /// The result is empty when the job failed.
    Completed {
        job_id: RequestId,
        result: Vec<u8>,
        failed: bool,
        duration_seconds: f64,
    },
    /// Sent once by a worker when its transport is ready.
    RegisterWorker,
}

impl Payload {
    pub fn name(&self) -> &'static str {
        match self {
            Payload::ExecuteRequest { .. } => "execute request",
            Payload::Completed { .. } => "completed",
            Payload::RegisterWorker => "register worker",
        }
    }
}

/// A change in the membership of the pool, as observed by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEvent {
    Joined(NodeId),
    /// The node left gracefully or was declared dead.
    Departed(NodeId),
    PoolTerminated,
}
