mod core;
mod event;
mod handle;
mod handler;
mod options;
mod statistics;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

pub use event::EngineEvent;
pub use handle::{EngineHandle, EngineMailbox, JobTicket};
pub use options::EngineOptions;
pub use statistics::{EngineReport, StopReason, TimeStatistics};
use tokio::sync::oneshot;

use crate::engine::statistics::EngineStatistics;
use crate::error::ExecutionResult;
use crate::id::{IdGenerator, JobId, NodeId, RequestId};
use crate::job::{Job, JobOutcome};
use crate::message::Message;
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use crate::worker_admin::WorkerAdministration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// The transport is draining its outbound queue.
    Draining,
    Stopped,
}

/// A job that a remote master asked this node to execute.
struct WorkRequest {
    source: NodeId,
    request_id: RequestId,
    job: Arc<dyn Job>,
    input: Arc<[u8]>,
}

/// The control loop of one node.
///
/// The engine owns the scheduler, the worker administration and the estimators,
/// and is the only one to touch them. Everything else talks to the engine
/// through its [`EngineHandle`].
pub struct Engine {
    options: EngineOptions,
    state: EngineState,
    local_node: NodeId,
    transport: Option<Box<dyn Transport>>,
    scheduler: Scheduler,
    ledger: WorkerAdministration,
    mailbox: EngineMailbox,
    inbound: VecDeque<(Message, Instant)>,
    departed: VecDeque<NodeId>,
    joined: VecDeque<NodeId>,
    work_queue: VecDeque<WorkRequest>,
    /// The submitters waiting for the outcome of their jobs.
    subscribers: HashMap<JobId, oneshot::Sender<ExecutionResult<JobOutcome>>>,
    job_id_generator: IdGenerator<JobId>,
    waiting_for_submissions: bool,
    stop_reason: Option<StopReason>,
    /// The number of peers seen joining and not yet departed.
    active_peers: usize,
    statistics: EngineStatistics,
}

impl Engine {
    pub fn new(
        options: EngineOptions,
        transport: Box<dyn Transport>,
        mailbox: EngineMailbox,
    ) -> Self {
        let local_node = transport.local_node();
        let scheduler = Scheduler::new(options.scheduler.clone(), local_node, transport.master());
        Self {
            options,
            state: EngineState::Running,
            local_node,
            transport: Some(transport),
            scheduler,
            ledger: WorkerAdministration::new(),
            mailbox,
            inbound: VecDeque::new(),
            departed: VecDeque::new(),
            joined: VecDeque::new(),
            work_queue: VecDeque::new(),
            subscribers: HashMap::new(),
            job_id_generator: IdGenerator::new(),
            waiting_for_submissions: true,
            stop_reason: None,
            active_peers: 0,
            statistics: EngineStatistics::default(),
        }
    }
}
