use log::{debug, error, info, warn};

use crate::error::ExecutionError;
use crate::id::{NodeId, RequestId};
use crate::job::JobInstance;
use crate::scheduler::Scheduler;
use crate::worker_admin::state::{OutstandingRequest, RejectedRequest, WorkerLedger};
use crate::worker_admin::WorkerAdministration;

impl WorkerAdministration {
    pub fn add_worker(&mut self, worker: NodeId) {
        match self.workers.get(&worker) {
            Some(WorkerLedger::Active { .. }) => {
                warn!("worker {worker} is already registered");
            }
            Some(WorkerLedger::Deleted) => {
                warn!("worker {worker} has departed and cannot register again");
            }
            None => {
                self.workers
                    .insert(worker, WorkerLedger::Active { requests: vec![] });
            }
        }
    }

    /// Records the job as outstanding on the worker and returns the request ID.
    /// The job is handed back if the worker is not registered or has departed.
    pub fn add_request(
        &mut self,
        worker: NodeId,
        job: JobInstance,
    ) -> Result<RequestId, RejectedRequest> {
        let Some(WorkerLedger::Active { requests }) = self.workers.get_mut(&worker) else {
            error!(
                "cannot add a request for job {} to unknown or departed worker {worker}",
                job.id()
            );
            return Err(RejectedRequest {
                job,
                error: ExecutionError::InternalError(format!(
                    "worker {worker} is not registered"
                )),
            });
        };
        let id = match self.request_id_generator.next() {
            Ok(id) => id,
            Err(error) => return Err(RejectedRequest { job, error }),
        };
        requests.push(OutstandingRequest { id, job });
        self.outstanding += 1;
        Ok(id)
    }

    /// Removes the outstanding request when its completion arrives.
    /// Stale or duplicate completions are tolerated and leave the ledger unchanged.
    pub fn remove_request(
        &mut self,
        worker: NodeId,
        id: RequestId,
        failed: bool,
    ) -> Option<JobInstance> {
        let requests = match self.workers.get_mut(&worker) {
            Some(WorkerLedger::Active { requests }) => requests,
            Some(WorkerLedger::Deleted) => {
                warn!("ignoring completion of request {id} from departed worker {worker}");
                return None;
            }
            None => {
                error!("completion of request {id} from unknown worker {worker}");
                return None;
            }
        };
        let Some(position) = requests.iter().position(|x| x.id == id) else {
            error!("request {id} is not outstanding on worker {worker}");
            return None;
        };
        let request = requests.remove(position);
        self.outstanding -= 1;
        if failed {
            warn!(
                "request {id} for job {} failed on worker {worker}",
                request.job.id()
            );
        }
        Some(request.job)
    }

    /// Marks the worker as departed and returns all its outstanding jobs to
    /// the scheduler. Returns the number of jobs returned.
    pub fn remove_worker(&mut self, worker: NodeId, scheduler: &mut Scheduler) -> usize {
        match self.workers.insert(worker, WorkerLedger::Deleted) {
            Some(WorkerLedger::Active { requests }) => {
                let count = requests.len();
                self.outstanding -= count;
                for request in requests {
                    scheduler.return_job(request.job);
                }
                info!("worker {worker} removed with {count} outstanding request(s) returned");
                count
            }
            Some(WorkerLedger::Deleted) => {
                warn!("worker {worker} is already removed");
                0
            }
            None => {
                debug!("worker {worker} departed before registering");
                0
            }
        }
    }

    pub fn has_capacity(&self, worker: NodeId, capacity: usize) -> bool {
        match self.workers.get(&worker) {
            Some(WorkerLedger::Active { requests }) => requests.len() < capacity,
            Some(WorkerLedger::Deleted) | None => false,
        }
    }

    pub fn is_registered(&self, worker: NodeId) -> bool {
        matches!(self.workers.get(&worker), Some(WorkerLedger::Active { .. }))
    }

    pub fn is_departed(&self, worker: NodeId) -> bool {
        matches!(self.workers.get(&worker), Some(WorkerLedger::Deleted))
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding == 0
    }

    pub fn outstanding_for(&self, worker: NodeId) -> usize {
        match self.workers.get(&worker) {
            Some(WorkerLedger::Active { requests }) => requests.len(),
            Some(WorkerLedger::Deleted) | None => 0,
        }
    }

    pub fn requests(&self, worker: NodeId) -> &[OutstandingRequest] {
        match self.workers.get(&worker) {
            Some(WorkerLedger::Active { requests }) => requests,
            Some(WorkerLedger::Deleted) | None => &[],
        }
    }

    /// Checks that the global count agrees with the per-worker request lists.
    pub fn is_consistent(&self) -> bool {
        let total = self
            .workers
            .values()
            .map(|worker| match worker {
                WorkerLedger::Active { requests } => requests.len(),
                WorkerLedger::Deleted => 0,
            })
            .sum::<usize>();
        total == self.outstanding
    }

    pub fn dump_state(&self) {
        debug!(
            "worker administration: {} outstanding request(s) on {} worker(s)",
            self.outstanding,
            self.workers.len()
        );
        for (worker, ledger) in &self.workers {
            match ledger {
                WorkerLedger::Active { requests } => {
                    let ids = requests
                        .iter()
                        .map(|x| x.id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    debug!("  worker {worker}: [{ids}]");
                }
                WorkerLedger::Deleted => debug!("  worker {worker}: departed"),
            }
        }
    }
}
