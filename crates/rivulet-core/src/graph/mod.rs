//! The render scheduler and audio context.
//!
//! A [`Graph`] owns every node in a slot table addressed by [`NodeId`]. Slots
//! of freed nodes are reused under a new generation, so the table never grows
//! past the peak number of live nodes. Edges
//! are stored on the consumer (one optional producer per input slot, plus a
//! variadic list for summing sinks) and mirrored as non-owning back-references
//! on the producer, so disconnection never needs ownership bookkeeping.
//!
//! # Render model
//!
//! Each [`render`](Graph::render) call pulls one block from the output sink:
//! producers render before consumers, each non-constant node at most once per
//! block however many consumers read it. Structural requests that arrive while
//! a block may be in flight ([`stop`](Graph::stop), [`stop_patch`](Graph::stop_patch),
//! and everything sent through a [`GraphController`]) are queued and applied at
//! the start of the next block.
//!
//! # Singleton
//!
//! Exactly one graph may be live per process. [`Graph::new`] fails with
//! [`Error::DuplicateGraph`] while another exists; dropping the graph releases
//! the slot.
//!
//! # Example
//!
//! ```rust,ignore
//! use rivulet_core::{Graph, GraphConfig};
//! use rivulet_nodes::{Sine, multiply};
//!
//! let mut graph = Graph::new(GraphConfig::default())?;
//! let sine = graph.add(Sine::new());
//! graph.set_value(sine, "frequency", 220.0)?;
//! let quiet = multiply(&mut graph, sine, 0.25)?;
//! graph.play(quiet)?;
//! graph.render(256)?;
//! ```

mod control;
mod record;
mod render;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use rivulet_config::GraphConfig;

use crate::block::AudioBlock;
use crate::buffer::Buffer;
use crate::constant::Constant;
use crate::node::{ChannelLayout, NodeData, NodeId, Port, Processor};
use crate::patch::{PatchData, PatchId};
use crate::sink::OutputSink;
use crate::table::Table;
use crate::{Error, Result};

pub(crate) use control::Command;
pub use control::{COMMAND_QUEUE_CAPACITY, GraphController, GraphStats};
use record::Recorder;

static GRAPH_LIVE: AtomicBool = AtomicBool::new(false);

/// Poll interval of [`Graph::wait`].
const WAIT_POLL: Duration = Duration::from_millis(10);

/// The audio dataflow graph.
pub struct Graph {
    pub(crate) nodes: Table<NodeId, NodeData>,
    pub(crate) patches: Table<PatchId, PatchData>,
    output: NodeId,
    scheduled: Vec<NodeId>,
    pub(crate) active_patches: Vec<PatchId>,
    nodes_to_remove: Vec<NodeId>,
    pub(crate) patches_to_remove: Vec<PatchId>,
    sample_rate: f32,
    max_block_size: usize,
    processed: usize,
    /// Current block stamp; a node stamped with it has rendered this block.
    block: u64,
    /// Stamp of the most recent cycle search.
    search: u64,
    stats: Arc<GraphStats>,
    commands: Receiver<Command>,
    command_tx: Sender<Command>,
    recorder: Option<Recorder>,
    silence: Vec<f32>,
    /// Nodes created while a patch is being built.
    pub(crate) capture: Option<Vec<NodeId>>,
}

impl Graph {
    /// Create the process-wide graph.
    ///
    /// Fails with [`Error::DuplicateGraph`] if another graph is live, or with
    /// [`Error::Config`] if `config` does not validate.
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        if GRAPH_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::DuplicateGraph);
        }

        let (command_tx, commands) = bounded(COMMAND_QUEUE_CAPACITY);
        let mut graph = Self {
            nodes: Table::default(),
            patches: Table::default(),
            output: NodeId::new(0, 0),
            scheduled: Vec::new(),
            active_patches: Vec::new(),
            nodes_to_remove: Vec::new(),
            patches_to_remove: Vec::new(),
            sample_rate: config.sample_rate as f32,
            max_block_size: config.max_block_size,
            processed: 0,
            block: 0,
            search: 0,
            stats: Arc::new(GraphStats::default()),
            commands,
            command_tx,
            recorder: None,
            silence: vec![0.0; config.max_block_size],
            capture: None,
        };
        graph.output = graph.add(OutputSink::new(config.output_channels as usize));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = config.sample_rate,
            channels = config.output_channels,
            max_block_size = config.max_block_size,
            "graph created"
        );
        Ok(graph)
    }

    /// Whether a graph is currently live in this process.
    pub fn is_live() -> bool {
        GRAPH_LIVE.load(Ordering::Acquire)
    }

    // --- Node table ---

    /// Add a node. Its output block is allocated immediately.
    pub fn add<P: Processor + 'static>(&mut self, processor: P) -> NodeId {
        self.add_boxed(Box::new(processor))
    }

    /// Add an already-boxed node, e.g. one created by a [`NodeRegistry`](crate::NodeRegistry).
    pub fn add_boxed(&mut self, processor: Box<dyn Processor>) -> NodeId {
        let mut node = NodeData::new(processor);
        node.ensure_alloc(self.max_block_size);
        #[cfg(feature = "tracing")]
        let name = node.processor.name();
        let id = self.nodes.insert(node);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {name} node {id}");
        if let Some(captured) = self.capture.as_mut() {
            captured.push(id);
        }
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id).ok_or(Error::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes.get_mut(id).ok_or(Error::NodeNotFound(id))
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes, including the output sink and constants.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Type name of a node.
    pub fn node_name(&self, id: NodeId) -> Result<&'static str> {
        Ok(self.node(id)?.processor.name())
    }

    /// Effective channel layout of a node.
    pub fn channels(&self, id: NodeId) -> Result<ChannelLayout> {
        Ok(self.node(id)?.layout)
    }

    /// The node's output block as of the last render.
    pub fn node_output(&self, id: NodeId) -> Result<&AudioBlock> {
        Ok(&self.node(id)?.out)
    }

    /// Producer currently bound to a named input, if any.
    pub fn input_of(&self, node: NodeId, name: &str) -> Result<Option<NodeId>> {
        let slot = self.input_slot(node, name)?;
        Ok(self.node(node)?.inputs[slot])
    }

    // --- Inputs ---

    pub(crate) fn input_slot(&self, node: NodeId, name: &str) -> Result<usize> {
        let data = self.node(node)?;
        data.processor
            .inputs()
            .iter()
            .position(|slot| slot.name == name)
            .ok_or_else(|| Error::UnknownParameter {
                node: data.processor.name().to_string(),
                name: name.to_string(),
            })
    }

    /// Bind `producer` to the input `name` of `node`.
    ///
    /// Fails with [`Error::UnknownParameter`] if the node type has no such
    /// input, or [`Error::CycleDetected`] if `producer` already depends on `node`.
    pub fn set_param(&mut self, node: NodeId, name: &str, producer: NodeId) -> Result<()> {
        let slot = self.input_slot(node, name)?;
        self.bind_input(node, slot, producer)
    }

    /// Bind a fresh constant to the input `name` of `node`.
    ///
    /// If the input is already fed by a constant that nothing else reads, that
    /// constant is updated in place. Returns the constant's handle.
    pub fn set_value(&mut self, node: NodeId, name: &str, value: f32) -> Result<NodeId> {
        let slot = self.input_slot(node, name)?;
        let previous = self.node(node)?.inputs[slot];
        if let Some(p) = previous {
            let producer = self.node_mut(p)?;
            if producer.constant && producer.patch.is_none() && producer.consumers.len() == 1 {
                producer.processor.trigger("value", value);
                return Ok(p);
            }
        }

        let constant = self.add(Constant::new(value));
        self.bind_input(node, slot, constant)?;
        if let Some(p) = previous {
            self.free_if_orphaned_constant(p);
        }
        Ok(constant)
    }

    /// Unbind the input `name` of `node`. The slot reads its default value afterwards.
    pub fn clear_param(&mut self, node: NodeId, name: &str) -> Result<()> {
        let slot = self.input_slot(node, name)?;
        if let Some(p) = self.unbind_input(node, slot)? {
            self.free_if_orphaned_constant(p);
        }
        self.update_channels(node);
        Ok(())
    }

    pub(crate) fn bind_input(&mut self, consumer: NodeId, slot: usize, producer: NodeId) -> Result<()> {
        self.node(producer)?;
        if producer == consumer || self.reaches(consumer, producer) {
            return Err(Error::CycleDetected {
                from: producer,
                to: consumer,
            });
        }
        self.unbind_input(consumer, slot)?;
        self.node_mut(consumer)?.inputs[slot] = Some(producer);
        self.node_mut(producer)?
            .consumers
            .push((consumer, Port::Input(slot)));
        self.update_channels(consumer);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {producer} → {consumer}[{slot}]");
        Ok(())
    }

    fn unbind_input(&mut self, consumer: NodeId, slot: usize) -> Result<Option<NodeId>> {
        let previous = self
            .node_mut(consumer)?
            .inputs
            .get_mut(slot)
            .and_then(Option::take);
        if let Some(p) = previous {
            self.remove_back_ref(p, consumer, Port::Input(slot));
        }
        Ok(previous)
    }

    /// Add `producer` to the summed inputs of a variadic node such as the output sink.
    pub fn add_input(&mut self, consumer: NodeId, producer: NodeId) -> Result<()> {
        let data = self.node(consumer)?;
        if !data.processor.accepts_variadic() {
            return Err(Error::InvalidConfiguration(format!(
                "node '{}' does not accept variadic inputs",
                data.processor.name()
            )));
        }
        if data.variadic.contains(&producer) {
            return Ok(());
        }
        self.node(producer)?;
        if producer == consumer || self.reaches(consumer, producer) {
            return Err(Error::CycleDetected {
                from: producer,
                to: consumer,
            });
        }
        self.node_mut(consumer)?.variadic.push(producer);
        self.node_mut(producer)?
            .consumers
            .push((consumer, Port::Variadic));
        Ok(())
    }

    /// Remove `producer` from the summed inputs of `consumer`.
    pub fn remove_input(&mut self, consumer: NodeId, producer: NodeId) -> Result<()> {
        self.node_mut(consumer)?.variadic.retain(|&p| p != producer);
        self.remove_back_ref(producer, consumer, Port::Variadic);
        Ok(())
    }

    fn remove_back_ref(&mut self, producer: NodeId, consumer: NodeId, port: Port) {
        if let Some(node) = self.nodes.get_mut(producer) {
            node.consumers
                .retain(|&(c, p)| !(c == consumer && p == port));
        }
    }

    /// Clear the consumer side of one back-reference.
    fn detach(&mut self, consumer: NodeId, port: Port, producer: NodeId) {
        let Some(node) = self.nodes.get_mut(consumer) else {
            return;
        };
        match port {
            Port::Input(slot) => {
                if node.inputs.get(slot) == Some(&Some(producer)) {
                    node.inputs[slot] = None;
                }
            }
            Port::Variadic => node.variadic.retain(|&p| p != producer),
        }
    }

    /// Disconnect a node from every consumer, keeping it in the table.
    fn disconnect_outputs(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let mut consumers = std::mem::take(&mut node.consumers);
        for &(consumer, port) in &consumers {
            self.detach(consumer, port, id);
        }
        consumers.clear();
        if let Some(node) = self.nodes.get_mut(id) {
            node.consumers = consumers;
        }
    }

    /// Depth-first search over back-references: does `from` feed `to`,
    /// directly or indirectly? Visits are marked with a per-search stamp.
    fn reaches(&mut self, from: NodeId, to: NodeId) -> bool {
        self.search += 1;
        self.search_from(from, to, self.search)
    }

    fn search_from(&mut self, current: NodeId, to: NodeId, stamp: u64) -> bool {
        if current == to {
            return true;
        }
        let count = match self.nodes.get_mut(current) {
            Some(node) if node.visited != stamp => {
                node.visited = stamp;
                node.consumers.len()
            }
            _ => return false,
        };
        for i in 0..count {
            let next = self
                .nodes
                .get(current)
                .and_then(|n| n.consumers.get(i))
                .map(|&(c, _)| c);
            if let Some(next) = next
                && self.search_from(next, to, stamp)
            {
                return true;
            }
        }
        false
    }

    /// Recompute a node's effective layout and propagate changes downstream.
    fn update_channels(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let declared = node.processor.layout();
        let layout = if node.processor.matches_input_channels() {
            let widest = node
                .producers()
                .filter_map(|p| self.nodes.get(p))
                .map(|p| p.layout.outputs)
                .max();
            match widest {
                Some(n) if n > 0 => ChannelLayout::square(n),
                _ => declared,
            }
        } else {
            declared
        };

        if layout == node.layout {
            return;
        }
        let consumers: Vec<NodeId> = node.consumers.iter().map(|&(c, _)| c).collect();
        let max_block_size = self.max_block_size;
        if let Some(node) = self.nodes.get_mut(id) {
            node.layout = layout;
            node.ensure_alloc(max_block_size);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_channels: {id} now {}→{}", layout.inputs, layout.outputs);
        for consumer in consumers {
            self.update_channels(consumer);
        }
    }

    fn free_if_orphaned_constant(&mut self, id: NodeId) {
        let orphaned = self
            .node(id)
            .is_ok_and(|n| n.constant && n.patch.is_none() && n.consumers.is_empty())
            && !self.scheduled.contains(&id);
        if orphaned {
            let _ = self.free_node(id);
        }
    }

    // --- Buffers, events, flags ---

    /// Bind a buffer to the buffer slot `name` of `node`.
    pub fn set_buffer(
        &mut self,
        node: NodeId,
        name: &str,
        buffer: impl Into<Arc<Buffer>>,
    ) -> Result<()> {
        let buffer = buffer.into();
        let data = self.node_mut(node)?;
        let slot = data
            .processor
            .buffers()
            .iter()
            .position(|&b| b == name)
            .ok_or_else(|| Error::UnknownBuffer {
                node: data.processor.name().to_string(),
                name: name.to_string(),
            })?;
        data.processor.buffer_changed(slot, Some(&buffer));
        data.buffers[slot] = Some(buffer);
        self.update_channels(node);
        Ok(())
    }

    /// Buffer bound to the slot `name` of `node`, if any.
    pub fn buffer_of(&self, node: NodeId, name: &str) -> Result<Option<Arc<Buffer>>> {
        let data = self.node(node)?;
        let slot = data
            .processor
            .buffers()
            .iter()
            .position(|&b| b == name)
            .ok_or_else(|| Error::UnknownBuffer {
                node: data.processor.name().to_string(),
                name: name.to_string(),
            })?;
        Ok(data.buffers[slot].clone())
    }

    /// Deliver a discrete event to a node immediately.
    pub fn trigger(&mut self, node: NodeId, name: &str, value: f32) -> Result<()> {
        self.node_mut(node)?.processor.trigger(name, value);
        Ok(())
    }

    /// Opt a node in or out of input upmixing.
    pub fn set_no_input_upmix(&mut self, node: NodeId, no_upmix: bool) -> Result<()> {
        self.node_mut(node)?.no_input_upmix = no_upmix;
        Ok(())
    }

    // --- Scheduling ---

    /// The output sink.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Input width of the output sink.
    pub fn output_channels(&self) -> usize {
        self.node(self.output).map_or(0, |n| n.layout.inputs)
    }

    /// Attach a node to the output sink.
    pub fn play(&mut self, node: NodeId) -> Result<()> {
        self.add_input(self.output, node)
    }

    /// Whether a node is currently attached to the output sink.
    pub fn is_playing(&self, node: NodeId) -> bool {
        self.node(self.output)
            .is_ok_and(|sink| sink.variadic.contains(&node))
    }

    /// Disconnect a node from all of its consumers at the start of the next block.
    pub fn stop(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        if !self.nodes_to_remove.contains(&node) {
            self.nodes_to_remove.push(node);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_stop: {node} queued");
        Ok(())
    }

    /// Render a node every block even though nothing consumes it.
    pub fn add_node(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        if !self.scheduled.contains(&node) {
            self.scheduled.push(node);
        }
        Ok(())
    }

    /// Stop rendering a node added with [`add_node`](Self::add_node).
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        self.scheduled.retain(|&n| n != node);
        Ok(())
    }

    /// Remove a node from the table immediately, disconnecting it on both sides.
    ///
    /// Private constants left without a consumer are freed with it.
    pub fn free_node(&mut self, id: NodeId) -> Result<()> {
        if id == self.output {
            return Err(Error::InvalidConfiguration(
                "the output sink cannot be freed".to_string(),
            ));
        }
        let data = self.nodes.remove(id).ok_or(Error::NodeNotFound(id))?;

        for (slot, producer) in data.inputs.iter().enumerate() {
            if let Some(p) = *producer {
                self.remove_back_ref(p, id, Port::Input(slot));
            }
        }
        for &p in &data.variadic {
            self.remove_back_ref(p, id, Port::Variadic);
        }
        for &(consumer, port) in &data.consumers {
            self.detach(consumer, port, id);
        }
        self.scheduled.retain(|&n| n != id);
        self.nodes_to_remove.retain(|&n| n != id);
        for producer in data.inputs.iter().flatten() {
            self.free_if_orphaned_constant(*producer);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_free: {id}");
        Ok(())
    }

    /// Detach everything from the output sink and stop all scheduled nodes.
    pub fn clear(&mut self) {
        let sink = self.output;
        let playing = self
            .node_mut(sink)
            .map(|n| std::mem::take(&mut n.variadic))
            .unwrap_or_default();
        for producer in playing {
            self.remove_back_ref(producer, sink, Port::Variadic);
        }
        self.scheduled.clear();
        self.active_patches.clear();
    }

    // --- Timing and monitoring ---

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Change the sample rate. Must be positive.
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<()> {
        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Largest block a single render may produce.
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Non-constant nodes processed in the last block.
    pub fn node_count(&self) -> usize {
        self.stats.node_count()
    }

    /// Render time of the last block as a fraction of its real-time duration.
    pub fn cpu_usage(&self) -> f32 {
        self.stats.cpu_usage()
    }

    /// Shared statistics handle for monitoring from other threads.
    pub fn stats(&self) -> Arc<GraphStats> {
        Arc::clone(&self.stats)
    }

    /// A handle for controlling this graph from other threads.
    pub fn controller(&self) -> GraphController {
        GraphController::new(self.command_tx.clone())
    }

    /// Block the calling thread, polling every 10 ms.
    ///
    /// Returns once `duration` has elapsed or the live graph has been dropped.
    /// With `None`, waits until the graph is dropped.
    pub fn wait(duration: Option<Duration>) {
        let deadline = duration.map(|d| Instant::now() + d);
        loop {
            if !Self::is_live() {
                return;
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    WAIT_POLL.min(deadline - now)
                }
                None => WAIT_POLL,
            };
            std::thread::sleep(step);
        }
    }

    // --- Introspection ---

    /// Indented rendering of everything reachable from the output and scheduled nodes.
    ///
    /// Constant inputs are shown inline as `name: value`.
    pub fn structure(&self) -> String {
        let mut out = String::new();
        self.write_structure(&mut out, self.output, 0);
        for &id in &self.scheduled {
            self.write_structure(&mut out, id, 0);
        }
        out
    }

    fn write_structure(&self, out: &mut String, id: NodeId, depth: usize) {
        let Ok(node) = self.node(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{indent}* {}\n", node.processor.name()));

        let slots = node.processor.inputs();
        for (slot, producer) in slots.iter().zip(&node.inputs) {
            let Some(p) = *producer else {
                continue;
            };
            match self.node(p) {
                Ok(input) if input.constant => {
                    let value = input.processor.describe().unwrap_or_default();
                    out.push_str(&format!("{indent}  {}: {value}\n", slot.name));
                }
                Ok(_) => {
                    out.push_str(&format!("{indent}  {}:\n", slot.name));
                    self.write_structure(out, p, depth + 2);
                }
                Err(_) => {}
            }
        }
        for (i, &p) in node.variadic.iter().enumerate() {
            out.push_str(&format!("{indent}  input{i}:\n"));
            self.write_structure(out, p, depth + 2);
        }
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        GRAPH_LIVE.store(false, Ordering::Release);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph dropped");
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.num_nodes())
            .field("sample_rate", &self.sample_rate)
            .field("max_block_size", &self.max_block_size)
            .field("active_patches", &self.active_patches.len())
            .finish_non_exhaustive()
    }
}
