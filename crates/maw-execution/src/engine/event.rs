use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::ExecutionResult;
use crate::job::{Job, JobOutcome};
use crate::message::{MembershipEvent, Message};

pub enum EngineEvent {
    Message {
        message: Message,
        /// The time the message entered the receive queue.
        received_at: Instant,
    },
    Membership(MembershipEvent),
    Submit {
        job: Arc<dyn Job>,
        input: Arc<[u8]>,
        result: oneshot::Sender<ExecutionResult<JobOutcome>>,
    },
    EndSubmissions,
    Shutdown,
}
