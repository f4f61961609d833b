//! Cross-thread control and monitoring.
//!
//! Other threads never touch graph structure directly. They send
//! [`Command`]s through a [`GraphController`]; the render thread drains the
//! queue at the start of the next block. Monitoring flows the other way
//! through the atomics in [`GraphStats`].

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel::{Sender, TrySendError};

use crate::node::NodeId;
use crate::patch::PatchId;
use crate::{Error, Result};

/// Capacity of the control queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug)]
pub(crate) enum Command {
    Play(NodeId),
    Stop(NodeId),
    AddNode(NodeId),
    RemoveNode(NodeId),
    PlayPatch(PatchId),
    StopPatch(PatchId),
    Trigger {
        node: NodeId,
        name: String,
        value: f32,
    },
}

/// Cloneable handle for controlling a graph from another thread.
///
/// Every request takes effect at the start of the next rendered block.
#[derive(Clone, Debug)]
pub struct GraphController {
    tx: Sender<Command>,
}

impl GraphController {
    pub(crate) fn new(tx: Sender<Command>) -> Self {
        Self { tx }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => Error::CommandQueueFull,
            TrySendError::Disconnected(_) => Error::GraphClosed,
        })
    }

    /// Attach a node to the output sink.
    pub fn play(&self, node: NodeId) -> Result<()> {
        self.send(Command::Play(node))
    }

    /// Disconnect a node from all of its consumers.
    pub fn stop(&self, node: NodeId) -> Result<()> {
        self.send(Command::Stop(node))
    }

    /// Render a node every block without connecting it to the output.
    pub fn add_node(&self, node: NodeId) -> Result<()> {
        self.send(Command::AddNode(node))
    }

    /// Undo [`add_node`](Self::add_node).
    pub fn remove_node(&self, node: NodeId) -> Result<()> {
        self.send(Command::RemoveNode(node))
    }

    /// Start a patch.
    pub fn play_patch(&self, patch: PatchId) -> Result<()> {
        self.send(Command::PlayPatch(patch))
    }

    /// Stop a patch.
    pub fn stop_patch(&self, patch: PatchId) -> Result<()> {
        self.send(Command::StopPatch(patch))
    }

    /// Send a discrete event to a node.
    pub fn trigger(&self, node: NodeId, name: impl Into<String>, value: f32) -> Result<()> {
        self.send(Command::Trigger {
            node,
            name: name.into(),
            value,
        })
    }
}

/// Render statistics readable from any thread.
#[derive(Debug, Default)]
pub struct GraphStats {
    node_count: AtomicUsize,
    cpu_usage: AtomicU32,
    blocks: AtomicU64,
}

impl GraphStats {
    /// Non-constant nodes processed in the last block.
    pub fn node_count(&self) -> usize {
        self.node_count.load(Ordering::Relaxed)
    }

    /// Render time of the last block as a fraction of its real-time duration.
    pub fn cpu_usage(&self) -> f32 {
        f32::from_bits(self.cpu_usage.load(Ordering::Relaxed))
    }

    /// Blocks rendered since the graph was created.
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, node_count: usize, cpu_usage: f32) {
        self.node_count.store(node_count, Ordering::Relaxed);
        self.cpu_usage.store(cpu_usage.to_bits(), Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn full_queue_reports_backpressure() {
        let (tx, _rx) = bounded(1);
        let controller = GraphController::new(tx);
        controller.stop(NodeId::new(0, 0)).unwrap();
        assert!(matches!(
            controller.stop(NodeId::new(1, 0)),
            Err(Error::CommandQueueFull)
        ));
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (tx, rx) = bounded(4);
        drop(rx);
        let controller = GraphController::new(tx);
        assert!(matches!(controller.play(NodeId::new(0, 0)), Err(Error::GraphClosed)));
    }

    #[test]
    fn stats_publish_round_trips() {
        let stats = GraphStats::default();
        stats.publish(5, 0.25);
        assert_eq!(stats.node_count(), 5);
        assert_eq!(stats.cpu_usage(), 0.25);
        assert_eq!(stats.blocks_rendered(), 1);
    }
}
