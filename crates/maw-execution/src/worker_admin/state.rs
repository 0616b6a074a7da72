use crate::error::ExecutionError;
use crate::id::RequestId;
use crate::job::JobInstance;

#[derive(Debug, Clone)]
pub struct OutstandingRequest {
    pub id: RequestId,
    pub job: JobInstance,
}

/// A job that could not be recorded as outstanding.
/// The job is handed back so that the caller can put it back in the queue.
#[derive(Debug)]
pub struct RejectedRequest {
    pub job: JobInstance,
    pub error: ExecutionError,
}

pub(super) enum WorkerLedger {
    Active { requests: Vec<OutstandingRequest> },
    /// The worker has departed. A worker identity is never reused,
    /// so the entry is kept to reject late registrations.
    Deleted,
}
