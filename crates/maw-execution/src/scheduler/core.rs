use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{ExecutionError, ExecutionResult};
use crate::estimator::create_estimator;
use crate::id::NodeId;
use crate::job::JobInstance;
use crate::message::Payload;
use crate::scheduler::selector::Candidate;
use crate::scheduler::state::{SchedulerRole, WorkerRecord, WorkerStatistics};
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use crate::worker_admin::{RejectedRequest, WorkerAdministration};

impl Scheduler {
    pub fn role(&self) -> SchedulerRole {
        self.role
    }

    pub fn is_master(&self) -> bool {
        matches!(self.role, SchedulerRole::Master)
    }

    pub fn submit(&mut self, job: JobInstance) -> ExecutionResult<()> {
        match self.role {
            SchedulerRole::Master => {
                self.queue.push_back(job);
                Ok(())
            }
            SchedulerRole::Worker { .. } => Err(ExecutionError::InvalidArgument(format!(
                "cannot submit job {} to a worker node",
                job.id()
            ))),
        }
    }

    pub fn worker_joined(&mut self, worker: NodeId) {
        if worker == self.local_node || !self.is_master() {
            return;
        }
        if self.departed.contains(&worker) {
            warn!("worker {worker} has departed and cannot join again");
            return;
        }
        if self.workers.contains_key(&worker) {
            return;
        }
        let rng = ChaCha8Rng::from_rng(&mut self.rng);
        let estimator = create_estimator(
            self.options.estimator_kind,
            self.options.estimator_decay_alpha,
            rng,
        );
        self.workers.insert(worker, WorkerRecord::new(estimator));
        info!("worker {worker} joined");
    }

    pub fn worker_left(&mut self, worker: NodeId) {
        if let SchedulerRole::Worker {
            master,
            master_gone,
        } = &mut self.role
        {
            if worker == *master {
                warn!("master {worker} has departed");
                *master_gone = true;
            }
            return;
        }
        self.departed.insert(worker);
        if let Some(record) = self.workers.get_mut(&worker) {
            record.deleted = true;
            info!("worker {worker} left");
        }
    }

    /// Dispatches at most one pending job.
    /// Returns whether a job was dispatched.
    pub fn maintain(
        &mut self,
        transport: &mut dyn Transport,
        ledger: &mut WorkerAdministration,
    ) -> bool {
        if !self.is_master() || self.queue.is_empty() {
            return false;
        }
        let capacity = self.options.max_outstanding_per_worker;
        let mut candidates = self
            .workers
            .iter_mut()
            .enumerate()
            .filter_map(|(position, (worker, record))| {
                if record.deleted || !ledger.has_capacity(*worker, capacity) {
                    return None;
                }
                Some(Candidate {
                    worker: *worker,
                    position,
                    outstanding: ledger.outstanding_for(*worker),
                    estimator: record.estimator.as_mut(),
                })
            })
            .collect::<Vec<_>>();
        let Some(worker) = self.selector.select(&mut candidates) else {
            return false;
        };
        let Some(job) = self.queue.pop_front() else {
            return false;
        };
        let job_id = job.id();
        let attempt = job.attempt();
        let payload_job = Arc::clone(job.job());
        let input = Arc::clone(job.input());
        let request_id = match ledger.add_request(worker, job) {
            Ok(x) => x,
            Err(RejectedRequest { job, error }) => {
                error!("failed to dispatch job {job_id} to worker {worker}: {error}");
                self.queue.push_front(job);
                return false;
            }
        };
        if let Some(record) = self.workers.get_mut(&worker) {
            record.dispatched += 1;
        }
        debug!("dispatching job {job_id} (attempt {attempt}) to worker {worker} as request {request_id}");
        let payload = Payload::ExecuteRequest {
            job_id: request_id,
            job: payload_job,
            input,
        };
        if let Err(e) = transport.send(worker, payload) {
            // The request stays outstanding and is returned if the worker departs.
            warn!("failed to send request {request_id} to worker {worker}: {e}");
        }
        true
    }

    /// Puts a job back at the tail of the queue after its worker departed,
    /// unless the job has used up its attempts.
    pub fn return_job(&mut self, job: JobInstance) {
        if !self.is_master() {
            error!("cannot return job {} to a worker node", job.id());
            return;
        }
        if let Some(max_attempts) = self.options.job_max_attempts {
            if job.attempt() >= max_attempts {
                warn!(
                    "abandoning job {} after {} attempt(s)",
                    job.id(),
                    job.attempt()
                );
                self.abandoned.push(job);
                return;
            }
        }
        self.queue.push_back(job.into_retry());
    }

    pub fn take_abandoned(&mut self) -> Vec<JobInstance> {
        std::mem::take(&mut self.abandoned)
    }

    pub fn on_completion(&mut self, worker: NodeId, duration_seconds: f64, failed: bool) {
        let Some(record) = self.workers.get_mut(&worker) else {
            warn!("worker {worker} not found");
            return;
        };
        record.completed += 1;
        if failed {
            record.failed += 1;
            if !self.options.learn_from_failures {
                return;
            }
        }
        record.estimator.add_sample(duration_seconds.max(0.0));
    }

    /// Whether the scheduler has nothing left to do.
    /// The master is done when no job is pending or outstanding,
    /// and a worker is done when its master has departed.
    pub fn should_stop(&self, ledger: &WorkerAdministration) -> bool {
        match self.role {
            SchedulerRole::Master => self.queue.is_empty() && ledger.is_empty(),
            SchedulerRole::Worker { master_gone, .. } => master_gone,
        }
    }

    /// The number of workers that departed, including those never seen joining.
    pub fn departed_count(&self) -> usize {
        self.departed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_jobs(&self) -> impl Iterator<Item = &JobInstance> {
        self.queue.iter()
    }

    pub fn worker_statistics(&self) -> Vec<WorkerStatistics> {
        self.workers
            .iter()
            .map(|(worker, record)| WorkerStatistics {
                worker: *worker,
                dispatched: record.dispatched,
                completed: record.completed,
                failed: record.failed,
                sample_count: record.estimator.sample_count(),
                average_seconds: record.estimator.average(),
                deleted: record.deleted,
            })
            .collect()
    }

    pub fn dump_state(&self) {
        debug!(
            "scheduler ({}, {} selector): {} pending job(s), {} worker(s)",
            self.role,
            self.selector.name(),
            self.queue.len(),
            self.workers.len()
        );
        for (worker, record) in &self.workers {
            debug!(
                "  worker {worker}: {} estimate {:.3}s (+{:.3}s) from {} sample(s), dispatched {}, completed {}, failed {}{}",
                record.estimator.name(),
                record.estimator.average(),
                record.estimator.std_dev(),
                record.estimator.sample_count(),
                record.dispatched,
                record.completed,
                record.failed,
                if record.deleted { ", departed" } else { "" },
            );
        }
    }
}
