//! Graph vertices: handles, the processor contract, and per-node bookkeeping.
//!
//! A node is a [`Processor`] (the behavior) wrapped in [`NodeData`] (the
//! graph's bookkeeping: bound inputs, buffers, output block, render flag).
//! Callers only ever see the copyable [`NodeId`] handle.

use std::sync::Arc;

use crate::block::AudioBlock;
use crate::buffer::Buffer;
use crate::context::ProcessContext;
use crate::patch::PatchId;
use crate::table::Handle;

/// Handle to a node in a [`Graph`](crate::Graph).
///
/// A freed node's slot is reused by later nodes under a new generation, so a
/// stale handle reports [`Error::NodeNotFound`](crate::Error::NodeNotFound)
/// rather than reaching its successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the graph's node table.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// How many times the slot had been freed when this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Handle for NodeId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self::new(index, generation)
    }

    fn index(self) -> u32 {
        self.index
    }

    fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generation == 0 {
            write!(f, "NodeId({})", self.index)
        } else {
            write!(f, "NodeId({}v{})", self.index, self.generation)
        }
    }
}

/// Input and output channel counts of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    /// Channels the node expects on each input.
    pub inputs: usize,
    /// Channels the node writes.
    pub outputs: usize,
}

impl ChannelLayout {
    /// Layout with explicit counts.
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }

    /// One channel in, one channel out.
    pub const fn mono() -> Self {
        Self::new(1, 1)
    }

    /// Same count in and out.
    pub const fn square(channels: usize) -> Self {
        Self::new(channels, channels)
    }
}

/// A named input slot and the value read while nothing is bound to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputSlot {
    /// Slot name used by [`Graph::set_param`](crate::Graph::set_param).
    pub name: &'static str,
    /// Value [`ProcessContext::sample`] reports for an unbound slot.
    pub default: f32,
}

impl InputSlot {
    /// Declare a slot.
    pub const fn new(name: &'static str, default: f32) -> Self {
        Self { name, default }
    }
}

/// Behavior of a node.
///
/// Slot tables are static per type: the slot index is the position of the
/// name in [`inputs`](Self::inputs) or [`buffers`](Self::buffers).
///
/// ## Real-Time Safety
///
/// [`process`](Self::process) runs on the render thread and must not
/// allocate, lock, or block. Per-channel state belongs in
/// [`alloc`](Self::alloc), which the graph calls whenever the channel layout
/// or block size changes.
pub trait Processor: Send {
    /// Type name, as registered with a [`NodeRegistry`](crate::NodeRegistry).
    fn name(&self) -> &'static str;

    /// Named input slots.
    fn inputs(&self) -> &'static [InputSlot] {
        &[]
    }

    /// Named buffer slots.
    fn buffers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Declared channel layout.
    ///
    /// For nodes that [match their inputs](Self::matches_input_channels) this is
    /// the layout used while no input is bound.
    fn layout(&self) -> ChannelLayout;

    /// Widen to the widest bound input (both input and output counts).
    fn matches_input_channels(&self) -> bool {
        false
    }

    /// Initial value of the node's no-upmix flag.
    fn no_input_upmix(&self) -> bool {
        false
    }

    /// Accept any number of summed inputs (output sinks).
    fn accepts_variadic(&self) -> bool {
        false
    }

    /// Constant producers are exempt from per-block memoization and counting.
    fn is_constant(&self) -> bool {
        false
    }

    /// Reports that the node has run to completion (envelopes, one-shot players).
    fn is_finished(&self) -> bool {
        false
    }

    /// Resize per-channel state.
    fn alloc(&mut self, _layout: ChannelLayout, _block_size: usize) {}

    /// Write `ctx.num_frames()` samples to each output channel.
    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock);

    /// Handle a discrete event. Unknown names are ignored.
    fn trigger(&mut self, _name: &str, _value: f32) {}

    /// A buffer slot was rebound. Recompute derived state here.
    fn buffer_changed(&mut self, _slot: usize, _buffer: Option<&Buffer>) {}

    /// Short inline rendering for [`Graph::structure`](crate::Graph::structure).
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Which input of a consumer a producer feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Port {
    Input(usize),
    Variadic,
}

pub(crate) struct NodeData {
    pub processor: Box<dyn Processor>,
    pub inputs: Vec<Option<NodeId>>,
    pub variadic: Vec<NodeId>,
    pub buffers: Vec<Option<Arc<Buffer>>>,
    /// Non-owning back-references: which consumers read this node, and where.
    pub consumers: Vec<(NodeId, Port)>,
    pub out: AudioBlock,
    /// Effective layout after input matching.
    pub layout: ChannelLayout,
    allocated: Option<(ChannelLayout, usize)>,
    /// Block stamp of the last render; equal to the graph's current block
    /// means rendered this block.
    pub rendered_block: u64,
    /// Stamp of the last cycle search that visited this node.
    pub visited: u64,
    pub no_input_upmix: bool,
    pub constant: bool,
    pub patch: Option<PatchId>,
}

impl NodeData {
    pub fn new(processor: Box<dyn Processor>) -> Self {
        let inputs = vec![None; processor.inputs().len()];
        let buffers = vec![None; processor.buffers().len()];
        Self {
            layout: processor.layout(),
            no_input_upmix: processor.no_input_upmix(),
            constant: processor.is_constant(),
            processor,
            inputs,
            variadic: Vec::new(),
            buffers,
            consumers: Vec::new(),
            out: AudioBlock::default(),
            allocated: None,
            rendered_block: 0,
            visited: 0,
            patch: None,
        }
    }

    /// Run `alloc` and resize the output block if the layout or block size changed.
    pub fn ensure_alloc(&mut self, block_size: usize) {
        if self.allocated == Some((self.layout, block_size)) {
            return;
        }
        self.processor.alloc(self.layout, block_size);
        self.out.resize(self.layout.outputs, block_size);
        self.allocated = Some((self.layout, block_size));
    }

    /// Every producer this node reads, slots first.
    pub fn producers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs
            .iter()
            .flatten()
            .copied()
            .chain(self.variadic.iter().copied())
    }
}
