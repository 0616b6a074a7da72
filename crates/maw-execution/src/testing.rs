use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use maw_common::config::AppConfig;

use crate::error::ExecutionResult;
use crate::id::{JobId, NodeId};
use crate::job::{FnJob, JobInstance};
use crate::message::Payload;
use crate::scheduler::SchedulerOptions;
use crate::transport::Transport;

/// A transport that records everything sent through it.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    pub local_node: NodeId,
    pub master: NodeId,
    pub sent: Arc<Mutex<Vec<(NodeId, Payload)>>>,
    pub shutdowns: Arc<AtomicUsize>,
}

impl RecordingTransport {
    pub fn new(local_node: NodeId, master: NodeId) -> Self {
        Self {
            local_node,
            master,
            sent: Arc::new(Mutex::new(vec![])),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn take_sent(&self) -> Vec<(NodeId, Payload)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn local_node(&self) -> NodeId {
        self.local_node
    }

    fn master(&self) -> NodeId {
        self.master
    }

    fn send(&mut self, destination: NodeId, payload: Payload) -> ExecutionResult<()> {
        self.sent.lock().unwrap().push((destination, payload));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn join(&mut self, _timeout: Duration) -> ExecutionResult<()> {
        Ok(())
    }
}

pub fn node(id: u64) -> NodeId {
    NodeId::from(id)
}

/// A job instance whose job echoes its input.
pub fn job_instance(id: u64) -> JobInstance {
    JobInstance::new(
        JobId::from(id),
        Arc::new(FnJob::new("echo", |input: &[u8]| Ok(input.to_vec()))),
        Arc::from(id.to_le_bytes().as_slice()),
    )
}

pub fn test_config(f: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig::load_default().unwrap();
    config.scheduler.rng_seed = Some(42);
    f(&mut config);
    config
}

pub fn scheduler_options(f: impl FnOnce(&mut AppConfig)) -> SchedulerOptions {
    SchedulerOptions::new(&test_config(f))
}
