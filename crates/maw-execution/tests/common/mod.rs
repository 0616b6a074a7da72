//! Shared utilities for the execution integration tests.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use maw_common::config::AppConfig;
use maw_execution::error::ExecutionResult;
use maw_execution::id::NodeId;
use maw_execution::job::{FnJob, Job};
use maw_execution::message::Payload;
use maw_execution::transport::Transport;
use maw_execution::EngineOptions;

/// The default configuration with a fixed seed and a short idle interval.
pub fn test_config(f: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig::load_default().unwrap();
    config.engine.sleep_interval_millis = 50;
    config.scheduler.rng_seed = Some(42);
    f(&mut config);
    config
}

#[allow(dead_code)]
pub fn engine_options(f: impl FnOnce(&mut AppConfig)) -> EngineOptions {
    EngineOptions::new(&test_config(f))
}

/// A transport that keeps the sent messages for the test to inspect.
#[allow(dead_code)]
pub struct QueueTransport {
    pub local_node: NodeId,
    pub sent: Vec<(NodeId, Payload)>,
}

impl Transport for QueueTransport {
    fn local_node(&self) -> NodeId {
        self.local_node
    }

    fn master(&self) -> NodeId {
        self.local_node
    }

    fn send(&mut self, destination: NodeId, payload: Payload) -> ExecutionResult<()> {
        self.sent.push((destination, payload));
        Ok(())
    }

    fn shutdown(&mut self) {}

    fn join(&mut self, _timeout: Duration) -> ExecutionResult<()> {
        Ok(())
    }
}

/// A gate that blocks jobs until it is opened.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

#[allow(dead_code)]
impl Gate {
    pub fn open(&self) {
        let (lock, condvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        condvar.notify_all();
    }

    pub fn wait(&self) {
        let (lock, condvar) = &*self.inner;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = condvar.wait(open).unwrap();
        }
    }
}

/// A job that doubles every input byte.
#[allow(dead_code)]
pub fn doubling_job(delay: Duration) -> Arc<dyn Job> {
    Arc::new(FnJob::new("double", move |input: &[u8]| {
        std::thread::sleep(delay);
        Ok(input.iter().map(|x| x.wrapping_mul(2)).collect())
    }))
}

/// A job that reports that it has started and then waits for the gate.
#[allow(dead_code)]
pub fn gated_job(gate: Gate, started: std::sync::mpsc::Sender<()>) -> Arc<dyn Job> {
    Arc::new(FnJob::new("gated", move |input: &[u8]| {
        let _ = started.send(());
        gate.wait();
        Ok(input.to_vec())
    }))
}
