use std::sync::Arc;
use std::time::Instant;

use log::debug;
use tokio::sync::{mpsc, oneshot, watch};

use crate::engine::event::EngineEvent;
use crate::engine::statistics::EngineReport;
use crate::error::{ExecutionError, ExecutionResult};
use crate::id::NodeId;
use crate::job::{Job, JobOutcome};
use crate::message::{MembershipEvent, Message};

/// A cheap, cloneable handle to a running engine.
///
/// All methods are non-blocking and safe to call from any thread,
/// including the transport threads that deliver inbound traffic.
#[derive(Clone)]
pub struct EngineHandle {
    node: NodeId,
    sender: mpsc::UnboundedSender<EngineEvent>,
    stopped: watch::Receiver<Option<EngineReport>>,
}

/// The receiving end of an [`EngineHandle`], owned by the engine.
pub struct EngineMailbox {
    pub(super) events: mpsc::UnboundedReceiver<EngineEvent>,
    pub(super) stopped: watch::Sender<Option<EngineReport>>,
}

impl EngineHandle {
    /// Creates a handle before the engine exists, so that the handle can be
    /// registered with the transport before the engine starts.
    pub fn channel(node: NodeId) -> (EngineHandle, EngineMailbox) {
        let (sender, events) = mpsc::unbounded_channel();
        let (stopped_tx, stopped_rx) = watch::channel(None);
        let handle = EngineHandle {
            node,
            sender,
            stopped: stopped_rx,
        };
        let mailbox = EngineMailbox {
            events,
            stopped: stopped_tx,
        };
        (handle, mailbox)
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn on_message(&self, message: Message) {
        self.send(EngineEvent::Message {
            message,
            received_at: Instant::now(),
        });
    }

    pub fn on_membership_event(&self, event: MembershipEvent) {
        self.send(EngineEvent::Membership(event));
    }

    pub fn submit(&self, job: Arc<dyn Job>, input: impl Into<Arc<[u8]>>) -> JobTicket {
        let (tx, rx) = oneshot::channel();
        self.send(EngineEvent::Submit {
            job,
            input: input.into(),
            result: tx,
        });
        JobTicket { receiver: rx }
    }

    /// Declares that no more jobs will be submitted, so that the master engine
    /// can stop once all submitted jobs have completed.
    pub fn end_submissions(&self) {
        self.send(EngineEvent::EndSubmissions);
    }

    pub fn shutdown(&self) {
        self.send(EngineEvent::Shutdown);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.borrow().is_some()
    }

    /// Waits for the engine to stop and returns its final report.
    /// Returns `None` if the engine went away without reporting.
    pub async fn wait_for_stop(mut self) -> Option<EngineReport> {
        match self.stopped.wait_for(|x| x.is_some()).await {
            Ok(report) => report.clone(),
            Err(_) => None,
        }
    }

    fn send(&self, event: EngineEvent) {
        if self.sender.send(event).is_err() {
            debug!("engine on node {} has stopped, dropping event", self.node);
        }
    }
}

/// The pending outcome of a submitted job.
pub struct JobTicket {
    receiver: oneshot::Receiver<ExecutionResult<JobOutcome>>,
}

impl JobTicket {
    pub async fn wait(self) -> ExecutionResult<JobOutcome> {
        self.receiver.await.map_err(|_| {
            ExecutionError::InternalError(
                "the engine stopped before the job completed".to_string(),
            )
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SleepJob;
    use crate::testing::node;

    #[tokio::test]
    async fn test_submit_to_stopped_engine() {
        let (handle, mailbox) = EngineHandle::channel(node(1));
        drop(mailbox);
        let ticket = handle.submit(Arc::new(SleepJob::default()), vec![1, 2, 3]);
        assert!(matches!(
            ticket.wait().await,
            Err(ExecutionError::InternalError(_))
        ));
        assert!(!handle.is_stopped());
        assert!(handle.wait_for_stop().await.is_none());
    }
}
