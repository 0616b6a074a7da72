mod core;
mod state;

use indexmap::IndexMap;
pub use state::{OutstandingRequest, RejectedRequest};

use crate::id::{IdGenerator, NodeId, RequestId};
use crate::worker_admin::state::WorkerLedger;

/// The ledger of outstanding requests, i.e. jobs that were dispatched to
/// a worker but whose completion has not been received yet.
pub struct WorkerAdministration {
    workers: IndexMap<NodeId, WorkerLedger>,
    /// The total number of outstanding requests across all workers.
    /// This always equals the sum of the per-worker request lists.
    outstanding: usize,
    request_id_generator: IdGenerator<RequestId>,
}

impl WorkerAdministration {
    pub fn new() -> Self {
        Self {
            workers: IndexMap::new(),
            outstanding: 0,
            request_id_generator: IdGenerator::new(),
        }
    }
}

impl Default for WorkerAdministration {
    fn default() -> Self {
        Self::new()
    }
}
