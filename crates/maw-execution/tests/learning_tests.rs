//! Simulated runs of the master scheduler against workers of different speed.
//!
//! The workers run in virtual time. Each worker executes the requests it
//! receives one after another, with a duration drawn from its own distribution.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use common::{test_config, QueueTransport};
use maw_common::config::{AppConfig, SelectorKind};
use maw_execution::id::{JobId, NodeId, RequestId};
use maw_execution::job::{Job, JobInstance, SleepJob};
use maw_execution::message::Payload;
use maw_execution::scheduler::{Scheduler, SchedulerOptions};
use maw_execution::WorkerAdministration;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

struct SimulatedWorker {
    node: NodeId,
    duration: Normal<f64>,
    queue: VecDeque<RequestId>,
    /// The request being executed, with its finish time and duration.
    running: Option<(f64, RequestId, f64)>,
    executed: usize,
}

impl SimulatedWorker {
    fn new(node: NodeId, mean: f64, std_dev: f64) -> Self {
        Self {
            node,
            duration: Normal::new(mean, std_dev).unwrap(),
            queue: VecDeque::new(),
            running: None,
            executed: 0,
        }
    }
}

struct Simulation {
    scheduler: Scheduler,
    ledger: WorkerAdministration,
    transport: QueueTransport,
    workers: Vec<SimulatedWorker>,
    capacity: usize,
    now: f64,
    rng: ChaCha8Rng,
    job: Arc<dyn Job>,
}

impl Simulation {
    /// A fast worker with mean 100 and a slow worker with mean 1000, in that order.
    fn new(config: &AppConfig) -> Self {
        let master = NodeId::from(1);
        let mut simulation = Self {
            scheduler: Scheduler::new(SchedulerOptions::new(config), master, master),
            ledger: WorkerAdministration::new(),
            transport: QueueTransport {
                local_node: master,
                sent: vec![],
            },
            workers: vec![
                SimulatedWorker::new(NodeId::from(2), 100.0, 10.0),
                SimulatedWorker::new(NodeId::from(3), 1000.0, 100.0),
            ],
            capacity: config.scheduler.max_outstanding_per_worker,
            now: 0.0,
            rng: ChaCha8Rng::seed_from_u64(7),
            job: Arc::new(SleepJob::new(Duration::ZERO)),
        };
        for worker in &simulation.workers {
            simulation.ledger.add_worker(worker.node);
            simulation.scheduler.worker_joined(worker.node);
        }
        simulation
    }

    /// Runs the jobs while keeping at most `max_in_flight` of them outstanding,
    /// and returns the number of jobs executed by each worker.
    fn run(&mut self, total: usize, max_in_flight: usize) -> Vec<usize> {
        let mut submitted = 0;
        let mut completed = 0;
        while completed < total {
            loop {
                if self.scheduler.pending_count() == 0
                    && submitted < total
                    && self.ledger.outstanding_count() < max_in_flight
                {
                    submitted += 1;
                    let job = JobInstance::new(
                        JobId::from(submitted as u64),
                        Arc::clone(&self.job),
                        Arc::from(&[][..]),
                    );
                    self.scheduler.submit(job).unwrap();
                }
                if !self
                    .scheduler
                    .maintain(&mut self.transport, &mut self.ledger)
                {
                    break;
                }
                for worker in &self.workers {
                    assert!(self.ledger.outstanding_for(worker.node) <= self.capacity);
                }
                assert!(self.ledger.is_consistent());
            }
            self.deliver_requests();
            self.complete_next_request();
            completed += 1;
        }
        self.workers.iter().map(|x| x.executed).collect()
    }

    fn deliver_requests(&mut self) {
        for (destination, payload) in self.transport.sent.drain(..) {
            let Payload::ExecuteRequest { job_id, .. } = payload else {
                panic!("unexpected message: {payload:?}");
            };
            let worker = self
                .workers
                .iter_mut()
                .find(|x| x.node == destination)
                .unwrap();
            worker.queue.push_back(job_id);
        }
    }

    fn complete_next_request(&mut self) {
        for worker in &mut self.workers {
            if worker.running.is_none() {
                if let Some(request) = worker.queue.pop_front() {
                    let duration = worker.duration.sample(&mut self.rng).max(1.0);
                    worker.running = Some((self.now + duration, request, duration));
                }
            }
        }
        let worker = self
            .workers
            .iter_mut()
            .filter(|x| x.running.is_some())
            .min_by(|a, b| {
                let a = a.running.map(|(finish, _, _)| finish).unwrap();
                let b = b.running.map(|(finish, _, _)| finish).unwrap();
                a.total_cmp(&b)
            })
            .expect("no request is running");
        let (finish, request, duration) = worker.running.take().unwrap();
        worker.executed += 1;
        self.now = finish;
        let node = worker.node;
        assert!(self.ledger.remove_request(node, request, false).is_some());
        self.scheduler.on_completion(node, duration, false);
        assert!(self.ledger.is_consistent());
    }
}

/// The fast worker executes most of the jobs when both workers are kept busy.
#[test]
fn test_fast_worker_executes_most_jobs() {
    let config = test_config(|config| config.scheduler.max_outstanding_per_worker = 2);
    let mut simulation = Simulation::new(&config);
    let executed = simulation.run(1000, usize::MAX);
    assert_eq!(executed.iter().sum::<usize>(), 1000);
    let share = executed[0] as f64 / 1000.0;
    assert!(share > 0.7, "fast worker share {share}");
    assert!(simulation.scheduler.should_stop(&simulation.ledger));
}

/// With one job at a time, learning sends almost everything to the fast worker,
/// while round-robin splits the jobs evenly.
#[test]
fn test_learning_outperforms_round_robin_for_sequential_jobs() {
    let config = test_config(|_| {});
    let executed = Simulation::new(&config).run(200, 1);
    let learning_share = executed[0] as f64 / 200.0;
    assert!(learning_share > 0.8, "learning share {learning_share}");

    let config = test_config(|config| config.scheduler.selector = SelectorKind::RoundRobin);
    let executed = Simulation::new(&config).run(200, 1);
    assert_eq!(executed, vec![100, 100]);
}
