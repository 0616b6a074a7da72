use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::mpsc::error::TryRecvError;

use crate::engine::handle::EngineHandle;
use crate::engine::statistics::{EngineReport, StopReason};
use crate::engine::{Engine, EngineOptions, EngineState};
use crate::error::ExecutionResult;
use crate::id::NodeId;
use crate::message::Payload;
use crate::scheduler::SchedulerRole;
use crate::transport::Transport;

impl Engine {
    /// Creates an engine for the transport and runs it on a dedicated thread.
    pub fn launch(
        options: EngineOptions,
        transport: Box<dyn Transport>,
    ) -> ExecutionResult<EngineHandle> {
        let (handle, mailbox) = EngineHandle::channel(transport.local_node());
        Self::new(options, transport, mailbox).spawn()?;
        Ok(handle)
    }

    /// Runs the engine on a dedicated thread with its own single-threaded runtime.
    pub fn spawn(self) -> ExecutionResult<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        std::thread::Builder::new()
            .name(Self::thread_name(self.local_node))
            .spawn(move || runtime.block_on(self.run()))?;
        Ok(())
    }

    /// The name of the thread that runs the engine of the node.
    pub fn thread_name(node: NodeId) -> String {
        format!("maw-engine-{node}")
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub async fn run(mut self) {
        info!(
            "engine started on node {} as {}",
            self.local_node,
            self.scheduler.role()
        );
        self.start();
        while self.state == EngineState::Running {
            while self.stop_reason.is_none() && self.tick() {}
            if self.stop_reason.is_none() && self.should_stop() {
                let reason = match self.scheduler.role() {
                    SchedulerRole::Master => StopReason::Completed,
                    SchedulerRole::Worker { .. } => StopReason::MasterDeparted,
                };
                self.request_stop(reason);
            }
            if self.stop_reason.is_some() {
                self.shutdown();
                break;
            }
            self.wait().await;
        }
        let report = self.report();
        let _ = self.mailbox.stopped.send(Some(report));
    }

    fn start(&mut self) {
        let SchedulerRole::Worker { master, .. } = self.scheduler.role() else {
            return;
        };
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        if let Err(e) = transport.send(master, Payload::RegisterWorker) {
            warn!("failed to register with master {master}: {e}");
        }
    }

    /// Makes one pass over all the work the engine can do without waiting.
    /// Returns whether any progress was made.
    pub(super) fn tick(&mut self) -> bool {
        let mut progress = self.handle_incoming_events();
        if self.stop_reason.is_some() {
            return progress;
        }
        progress |= self.handle_membership_changes();
        progress |= self.maintain_outstanding_requests();
        progress |= self.handle_work_request();
        progress
    }

    fn handle_incoming_events(&mut self) -> bool {
        let started = Instant::now();
        let mut progress = false;
        loop {
            match self.mailbox.events.try_recv() {
                Ok(event) => {
                    progress = true;
                    self.accept_event(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.request_stop(StopReason::Disconnected);
                    break;
                }
            }
        }
        self.statistics.max_receive_queue_length = self
            .statistics
            .max_receive_queue_length
            .max(self.inbound.len());
        while let Some((message, received_at)) = self.inbound.pop_front() {
            progress = true;
            self.handle_message(message, received_at);
        }
        self.statistics.message_handling += started.elapsed();
        progress
    }

    /// Applies all departures before any joins.
    fn handle_membership_changes(&mut self) -> bool {
        let mut progress = false;
        while let Some(node) = self.departed.pop_front() {
            progress = true;
            self.handle_departure(node);
        }
        while let Some(node) = self.joined.pop_front() {
            progress = true;
            self.handle_join(node);
        }
        progress
    }

    fn maintain_outstanding_requests(&mut self) -> bool {
        let Some(transport) = self.transport.as_deref_mut() else {
            return false;
        };
        let started = Instant::now();
        let progress = self.scheduler.maintain(transport, &mut self.ledger);
        self.statistics.requests_handling += started.elapsed();
        progress
    }

    fn handle_work_request(&mut self) -> bool {
        let Some(request) = self.work_queue.pop_front() else {
            return false;
        };
        self.execute(request);
        true
    }

    pub(super) fn should_stop(&self) -> bool {
        match self.scheduler.role() {
            SchedulerRole::Master => {
                !self.waiting_for_submissions && self.scheduler.should_stop(&self.ledger)
            }
            SchedulerRole::Worker { .. } => self.scheduler.should_stop(&self.ledger),
        }
    }

    async fn wait(&mut self) {
        let interval = self.options.sleep_interval;
        let started = Instant::now();
        match tokio::time::timeout(interval, self.mailbox.events.recv()).await {
            Ok(Some(event)) => self.accept_event(event),
            Ok(None) => self.request_stop(StopReason::Disconnected),
            Err(_) => {}
        }
        let elapsed = started.elapsed();
        self.statistics.idle += elapsed;
        if elapsed > interval.mul_f64(self.options.long_sleep_ratio) && self.active_peers > 0 {
            self.dump_state();
        }
    }

    /// Stops the transport and releases it. Calling this again has no effect.
    pub fn shutdown(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        self.state = EngineState::Draining;
        self.request_stop(StopReason::ShutdownRequested);
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
            if let Err(e) = transport.join(self.options.transport_shutdown_timeout) {
                warn!("failed to drain the transport of node {}: {e}", self.local_node);
            }
        }
        if !self.subscribers.is_empty() {
            warn!(
                "{} submitted job(s) on node {} did not complete",
                self.subscribers.len(),
                self.local_node
            );
            self.subscribers.clear();
        }
        self.state = EngineState::Stopped;
        self.log_statistics();
    }

    pub fn report(&self) -> EngineReport {
        EngineReport {
            node: self.local_node,
            role: self.scheduler.role(),
            stop_reason: self.stop_reason.unwrap_or(StopReason::ShutdownRequested),
            message_handling_time: self.statistics.message_handling,
            requests_handling_time: self.statistics.requests_handling,
            idle_time: self.statistics.idle,
            linger: self.statistics.linger.clone(),
            max_receive_queue_length: self.statistics.max_receive_queue_length,
            executed_jobs: self.statistics.executed_jobs,
            departed_nodes: self.scheduler.departed_count(),
            workers: self.scheduler.worker_statistics(),
        }
    }

    fn log_statistics(&self) {
        let statistics = &self.statistics;
        info!(
            "engine on node {} stopped ({:?})",
            self.local_node,
            self.stop_reason.unwrap_or(StopReason::ShutdownRequested)
        );
        info!(
            "  message handling {:.3}s, request handling {:.3}s, idle {:.3}s, executed {} job(s)",
            statistics.message_handling.as_secs_f64(),
            statistics.requests_handling.as_secs_f64(),
            statistics.idle.as_secs_f64(),
            statistics.executed_jobs
        );
        info!(
            "  receive queue linger: {}, max length {}",
            statistics.linger, statistics.max_receive_queue_length
        );
    }

    fn dump_state(&self) {
        debug!(
            "engine on node {} ({:?}): {} active peer(s), {} queued work request(s), {} waiting submitter(s)",
            self.local_node,
            self.state,
            self.active_peers,
            self.work_queue.len(),
            self.subscribers.len()
        );
        debug!(
            "  receive queue linger: {}, max length {}, {} departed node(s)",
            self.statistics.linger,
            self.statistics.max_receive_queue_length,
            self.scheduler.departed_count()
        );
        self.scheduler.dump_state();
        self.ledger.dump_state();
    }
}
