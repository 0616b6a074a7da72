use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::engine::event::EngineEvent;
use crate::engine::{Engine, StopReason, WorkRequest};
use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{JobId, NodeId, RequestId};
use crate::job::{Job, JobInstance, JobOutcome};
use crate::message::{MembershipEvent, Message, Payload};

impl Engine {
    /// Sorts an incoming event into the queue of the step that handles it.
    /// Local commands take effect immediately.
    pub(super) fn accept_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Message {
                message,
                received_at,
            } => {
                self.inbound.push_back((message, received_at));
            }
            EngineEvent::Membership(MembershipEvent::Joined(node)) => {
                self.joined.push_back(node);
            }
            EngineEvent::Membership(MembershipEvent::Departed(node)) => {
                if node == self.local_node {
                    error!("node {node} has been declared dead");
                    self.request_stop(StopReason::DeclaredDead);
                } else {
                    self.departed.push_back(node);
                }
            }
            EngineEvent::Membership(MembershipEvent::PoolTerminated) => {
                warn!("the pool has been terminated");
                self.request_stop(StopReason::PoolTerminated);
            }
            EngineEvent::Submit { job, input, result } => {
                self.handle_submit(job, input, result);
            }
            EngineEvent::EndSubmissions => {
                debug!("no more submissions are expected on node {}", self.local_node);
                self.waiting_for_submissions = false;
            }
            EngineEvent::Shutdown => {
                info!("shutdown requested on node {}", self.local_node);
                self.request_stop(StopReason::ShutdownRequested);
            }
        }
    }

    pub(super) fn request_stop(&mut self, reason: StopReason) {
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason);
        }
    }

    fn handle_submit(
        &mut self,
        job: Arc<dyn Job>,
        input: Arc<[u8]>,
        result: oneshot::Sender<ExecutionResult<JobOutcome>>,
    ) {
        if !self.waiting_for_submissions {
            let _ = result.send(Err(ExecutionError::InvalidArgument(
                "submissions have ended".to_string(),
            )));
            return;
        }
        let job_id = match self.job_id_generator.next() {
            Ok(x) => x,
            Err(e) => {
                let _ = result.send(Err(e));
                return;
            }
        };
        match self.scheduler.submit(JobInstance::new(job_id, job, input)) {
            Ok(()) => {
                self.subscribers.insert(job_id, result);
            }
            Err(e) => {
                let _ = result.send(Err(e));
            }
        }
    }

    pub(super) fn handle_message(&mut self, message: Message, received_at: Instant) {
        self.statistics.linger.add(received_at.elapsed());
        let Message { source, payload } = message;
        let name = payload.name();
        match payload {
            Payload::ExecuteRequest { job_id, job, input } => {
                if self.scheduler.is_master() {
                    error!("unexpected {name} message from node {source} on the master");
                    return;
                }
                self.work_queue.push_back(WorkRequest {
                    source,
                    request_id: job_id,
                    job,
                    input,
                });
            }
            Payload::Completed {
                job_id,
                result,
                failed,
                duration_seconds,
            } => {
                if !self.scheduler.is_master() {
                    error!("unexpected {name} message from node {source} on a worker");
                    return;
                }
                self.handle_completed(source, job_id, result, failed, duration_seconds);
            }
            Payload::RegisterWorker => {
                if !self.scheduler.is_master() {
                    error!("unexpected {name} message from node {source} on a worker");
                    return;
                }
                info!("worker {source} registered");
                self.ledger.add_worker(source);
                self.scheduler.worker_joined(source);
            }
        }
    }

    fn handle_completed(
        &mut self,
        worker: NodeId,
        request_id: RequestId,
        result: Vec<u8>,
        failed: bool,
        duration_seconds: f64,
    ) {
        let Some(job) = self.ledger.remove_request(worker, request_id, failed) else {
            // Late completions of a departed worker are still learned from.
            // Duplicates of resolved requests are not.
            if self.ledger.is_departed(worker) {
                self.scheduler.on_completion(worker, duration_seconds, failed);
            }
            return;
        };
        self.scheduler.on_completion(worker, duration_seconds, failed);
        let duration = Duration::try_from_secs_f64(duration_seconds).unwrap_or_default();
        let outcome = if failed {
            JobOutcome::Failed {
                job_id: job.id(),
                worker,
                duration,
                attempts: job.attempt(),
            }
        } else {
            JobOutcome::Succeeded {
                job_id: job.id(),
                worker,
                result,
                duration,
                attempts: job.attempt(),
            }
        };
        self.notify(job.id(), Ok(outcome));
    }

    pub(super) fn handle_departure(&mut self, node: NodeId) {
        self.active_peers = self.active_peers.saturating_sub(1);
        if self.scheduler.is_master() {
            self.ledger.remove_worker(node, &mut self.scheduler);
        }
        self.scheduler.worker_left(node);
        for job in self.scheduler.take_abandoned() {
            let outcome = JobOutcome::Abandoned {
                job_id: job.id(),
                attempts: job.attempt(),
            };
            self.notify(job.id(), Ok(outcome));
        }
    }

    pub(super) fn handle_join(&mut self, node: NodeId) {
        if node == self.local_node {
            return;
        }
        self.active_peers += 1;
        self.scheduler.worker_joined(node);
    }

    /// Runs one job requested by the master and sends back its completion.
    pub(super) fn execute(&mut self, request: WorkRequest) {
        let WorkRequest {
            source,
            request_id,
            job,
            input,
        } = request;
        let started = Instant::now();
        let output = panic::catch_unwind(AssertUnwindSafe(|| job.run(&input)));
        let duration = started.elapsed();
        self.statistics.executed_jobs += 1;
        let (result, failed) = match output {
            Ok(Ok(x)) => (x, false),
            Ok(Err(e)) => {
                warn!("request {request_id} from node {source} failed: {e}");
                (vec![], true)
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic");
                error!("request {request_id} from node {source} panicked: {reason}");
                (vec![], true)
            }
        };
        let payload = Payload::Completed {
            job_id: request_id,
            result,
            failed,
            duration_seconds: duration.as_secs_f64(),
        };
        let Some(transport) = self.transport.as_deref_mut() else {
            warn!("cannot report request {request_id} without a transport");
            return;
        };
        if let Err(e) = transport.send(source, payload) {
            warn!("failed to report request {request_id} to node {source}: {e}");
        }
    }

    fn notify(&mut self, job_id: JobId, outcome: ExecutionResult<JobOutcome>) {
        let Some(subscriber) = self.subscribers.remove(&job_id) else {
            return;
        };
        if subscriber.send(outcome).is_err() {
            debug!("the submitter of job {job_id} is no longer waiting");
        }
    }
}
