mod core;
mod options;
mod selector;
mod state;

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
pub use options::SchedulerOptions;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
pub use selector::{
    create_selector, Candidate, LearningSelector, RoundRobinSelector, WorkerSelector,
};
pub use state::{SchedulerRole, WorkerStatistics};

use crate::id::NodeId;
use crate::job::JobInstance;
use crate::scheduler::state::WorkerRecord;

/// The pending job queue and the worker selection policy.
///
/// On the master, the scheduler learns how fast each worker completes jobs and
/// dispatches the next pending job to the worker predicted to be fastest.
/// On a worker, the scheduler only tracks whether the master is still alive.
pub struct Scheduler {
    options: SchedulerOptions,
    local_node: NodeId,
    role: SchedulerRole,
    queue: VecDeque<JobInstance>,
    workers: IndexMap<NodeId, WorkerRecord>,
    /// The workers that have departed, including those that were never seen joining.
    departed: HashSet<NodeId>,
    selector: Box<dyn WorkerSelector>,
    rng: ChaCha8Rng,
    /// Jobs that ran out of attempts, to be reported by the engine.
    abandoned: Vec<JobInstance>,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions, local_node: NodeId, master: NodeId) -> Self {
        let role = if local_node == master {
            SchedulerRole::Master
        } else {
            SchedulerRole::Worker {
                master,
                master_gone: false,
            }
        };
        let rng = match options.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let selector = create_selector(&options);
        Self {
            options,
            local_node,
            role,
            queue: VecDeque::new(),
            workers: IndexMap::new(),
            departed: HashSet::new(),
            selector,
            rng,
            abandoned: vec![],
        }
    }
}
