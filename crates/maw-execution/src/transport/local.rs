use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::engine::{Engine, EngineHandle, EngineOptions};
use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{IdGenerator, NodeId};
use crate::message::{MembershipEvent, Message, Payload};
use crate::transport::Transport;

struct ClusterState {
    members: IndexMap<NodeId, EngineHandle>,
    /// The first node that joined the cluster.
    master: Option<NodeId>,
    node_id_generator: IdGenerator<NodeId>,
    terminated: bool,
    /// Whether the master has left. A pool without master accepts no new nodes.
    master_departed: bool,
}

impl ClusterState {
    fn broadcast(&self, event: MembershipEvent) {
        for handle in self.members.values() {
            handle.on_membership_event(event);
        }
    }

    /// Removes the node and tells the remaining members that it departed.
    fn remove(&mut self, node: NodeId) -> Option<EngineHandle> {
        let handle = self.members.shift_remove(&node)?;
        if self.master == Some(node) {
            self.master_departed = true;
        }
        self.broadcast(MembershipEvent::Departed(node));
        Some(handle)
    }
}

struct Fabric {
    state: Mutex<ClusterState>,
}

impl Fabric {
    fn lock(&self) -> ExecutionResult<MutexGuard<'_, ClusterState>> {
        self.state
            .lock()
            .map_err(|e| ExecutionError::InternalError(format!("local cluster: {e}")))
    }

    fn deliver(&self, source: NodeId, destination: NodeId, payload: Payload) {
        let state = match self.lock() {
            Ok(x) => x,
            Err(e) => {
                error!("failed to deliver message: {e}");
                return;
            }
        };
        if !state.members.contains_key(&source) {
            debug!(
                "dropping {} message from departed node {source}",
                payload.name()
            );
            return;
        }
        let Some(handle) = state.members.get(&destination) else {
            warn!(
                "dropping {} message from node {source} to unknown node {destination}",
                payload.name()
            );
            return;
        };
        handle.on_message(Message { source, payload });
    }

    fn depart(&self, node: NodeId) {
        let mut state = match self.lock() {
            Ok(x) => x,
            Err(e) => {
                error!("failed to remove node {node}: {e}");
                return;
            }
        };
        if state.remove(node).is_some() {
            info!("node {node} left the local cluster");
        }
    }
}

/// An in-process pool of engines, each running on its own thread.
///
/// The first node launched becomes the master and every later node is a worker.
/// Membership changes are broadcast to all current members.
#[derive(Clone)]
pub struct LocalCluster {
    fabric: Arc<Fabric>,
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCluster {
    pub fn new() -> Self {
        Self {
            fabric: Arc::new(Fabric {
                state: Mutex::new(ClusterState {
                    members: IndexMap::new(),
                    master: None,
                    node_id_generator: IdGenerator::new(),
                    terminated: false,
                    master_departed: false,
                }),
            }),
        }
    }

    /// Adds a node to the cluster and starts its engine.
    pub fn launch(&self, options: EngineOptions) -> ExecutionResult<EngineHandle> {
        let (node, master, handle, mailbox) = {
            let mut state = self.fabric.lock()?;
            if state.terminated {
                return Err(ExecutionError::InvalidArgument(
                    "the local cluster has been terminated".to_string(),
                ));
            }
            if state.master_departed {
                return Err(ExecutionError::InvalidArgument(
                    "the master of the local cluster has departed".to_string(),
                ));
            }
            let node = state.node_id_generator.next()?;
            let master = *state.master.get_or_insert(node);
            let (handle, mailbox) = EngineHandle::channel(node);
            for (member, member_handle) in &state.members {
                member_handle.on_membership_event(MembershipEvent::Joined(node));
                handle.on_membership_event(MembershipEvent::Joined(*member));
            }
            handle.on_membership_event(MembershipEvent::Joined(node));
            state.members.insert(node, handle.clone());
            (node, master, handle, mailbox)
        };
        let started = LocalTransport::start(node, master, Arc::clone(&self.fabric))
            .and_then(|transport| Engine::new(options, Box::new(transport), mailbox).spawn());
        if let Err(e) = started {
            self.fabric.depart(node);
            return Err(e);
        }
        info!("node {node} joined the local cluster with master {master}");
        Ok(handle)
    }

    /// Asks the node to stop. The node leaves the cluster once its outbound
    /// messages are delivered.
    pub fn leave(&self, node: NodeId) -> ExecutionResult<()> {
        let state = self.fabric.lock()?;
        let Some(handle) = state.members.get(&node) else {
            return Err(ExecutionError::InvalidArgument(format!(
                "node {node} is not a member of the local cluster"
            )));
        };
        handle.shutdown();
        Ok(())
    }

    /// Removes the node from the cluster immediately, as if it crashed.
    /// The node itself is told that it has been declared dead.
    pub fn kill(&self, node: NodeId) -> ExecutionResult<()> {
        let mut state = self.fabric.lock()?;
        let Some(handle) = state.remove(node) else {
            return Err(ExecutionError::InvalidArgument(format!(
                "node {node} is not a member of the local cluster"
            )));
        };
        warn!("node {node} killed");
        handle.on_membership_event(MembershipEvent::Departed(node));
        Ok(())
    }

    /// Stops every node in the cluster without waiting for outstanding work.
    pub fn terminate(&self) -> ExecutionResult<()> {
        let mut state = self.fabric.lock()?;
        state.terminated = true;
        state.broadcast(MembershipEvent::PoolTerminated);
        state.members.clear();
        Ok(())
    }

    /// The current master, or `None` before the first launch and after the
    /// master has left.
    pub fn master(&self) -> ExecutionResult<Option<NodeId>> {
        let state = self.fabric.lock()?;
        if state.master_departed {
            return Ok(None);
        }
        Ok(state.master)
    }

    pub fn members(&self) -> ExecutionResult<Vec<NodeId>> {
        Ok(self.fabric.lock()?.members.keys().copied().collect())
    }
}

/// The transport of one node in a [`LocalCluster`].
///
/// Outbound messages are queued and delivered by a dedicated thread.
/// When the transport shuts down, the thread delivers the remaining messages
/// and then removes the node from the cluster.
pub struct LocalTransport {
    node: NodeId,
    master: NodeId,
    outbound: Option<mpsc::UnboundedSender<(NodeId, Payload)>>,
    drained: std::sync::mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl LocalTransport {
    fn start(node: NodeId, master: NodeId, fabric: Arc<Fabric>) -> ExecutionResult<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(NodeId, Payload)>();
        let (drained_tx, drained_rx) = std::sync::mpsc::channel();
        let thread = std::thread::Builder::new()
            .name(format!("maw-transport-{node}"))
            .spawn(move || {
                while let Some((destination, payload)) = rx.blocking_recv() {
                    fabric.deliver(node, destination, payload);
                }
                fabric.depart(node);
                let _ = drained_tx.send(());
            })?;
        Ok(Self {
            node,
            master,
            outbound: Some(tx),
            drained: drained_rx,
            thread: Some(thread),
        })
    }
}

impl Transport for LocalTransport {
    fn local_node(&self) -> NodeId {
        self.node
    }

    fn master(&self) -> NodeId {
        self.master
    }

    fn send(&mut self, destination: NodeId, payload: Payload) -> ExecutionResult<()> {
        let Some(outbound) = &self.outbound else {
            return Err(ExecutionError::TransportError(format!(
                "transport of node {} is shut down",
                self.node
            )));
        };
        outbound.send((destination, payload)).map_err(|_| {
            ExecutionError::TransportError(format!(
                "transport thread of node {} has stopped",
                self.node
            ))
        })
    }

    fn shutdown(&mut self) {
        self.outbound = None;
    }

    fn join(&mut self, timeout: Duration) -> ExecutionResult<()> {
        match self.drained.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(ExecutionError::TransportError(format!(
                    "timed out after {timeout:?} waiting for the transport of node {} to drain",
                    self.node
                )));
            }
        }
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| {
                ExecutionError::InternalError(format!(
                    "transport thread of node {} panicked",
                    self.node
                ))
            })?;
        }
        Ok(())
    }
}
