use std::time::Duration;

use crate::error::ExecutionResult;
use crate::id::NodeId;
use crate::message::Payload;

mod local;

pub use local::{LocalCluster, LocalTransport};

/// The outbound side of the messaging layer, as seen by one engine.
///
/// Inbound traffic does not go through this trait. The transport delivers
/// messages and membership events to the engine handle of the destination node.
pub trait Transport: Send {
    fn local_node(&self) -> NodeId;

    /// The node elected as master of the pool.
    fn master(&self) -> NodeId;

    /// Queues a message for delivery. This must not block on remote I/O.
    fn send(&mut self, destination: NodeId, payload: Payload) -> ExecutionResult<()>;

    /// Stops accepting new messages and lets the queued messages drain.
    fn shutdown(&mut self);

    /// Waits for the outbound queue to drain after [`Transport::shutdown`].
    fn join(&mut self, timeout: Duration) -> ExecutionResult<()>;
}
