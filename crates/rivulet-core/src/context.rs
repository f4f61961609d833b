//! Read-only view of a node's inputs during one render.

use std::sync::Arc;

use crate::block::AudioBlock;
use crate::buffer::Buffer;
use crate::node::{InputSlot, NodeData, NodeId};
use crate::table::Table;

/// Everything a [`Processor`](crate::Processor) may read while processing one block.
///
/// Inputs are exposed as [`Input`] views over the producers' already-rendered
/// output blocks. When a producer has fewer channels than the consumer's input
/// width, the view presents channel `k` as the producer's channel
/// `k % producer_channels` (upmixing), unless the consumer has opted out.
pub struct ProcessContext<'a> {
    pub(crate) sample_rate: f32,
    pub(crate) num_frames: usize,
    pub(crate) nodes: &'a Table<NodeId, NodeData>,
    pub(crate) slots: &'static [InputSlot],
    pub(crate) inputs: &'a [Option<NodeId>],
    pub(crate) variadic: &'a [NodeId],
    pub(crate) buffers: &'a [Option<Arc<Buffer>>],
    pub(crate) width: usize,
    pub(crate) upmix: bool,
    pub(crate) silence: &'a [f32],
}

impl<'a> ProcessContext<'a> {
    /// Graph sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames to produce in this block.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Input width of the node being processed.
    #[inline]
    pub fn input_channels(&self) -> usize {
        self.width
    }

    /// Whether anything is bound to input `slot`.
    pub fn is_bound(&self, slot: usize) -> bool {
        matches!(self.inputs.get(slot), Some(Some(_)))
    }

    /// View of the producer bound to input `slot`.
    pub fn input(&self, slot: usize) -> Option<Input<'a>> {
        let producer = (*self.inputs.get(slot)?)?;
        self.view(producer)
    }

    /// Views of every variadic input, in binding order.
    pub fn variadic(&self) -> impl Iterator<Item = Input<'a>> + '_ {
        self.variadic.iter().filter_map(|&id| self.view(id))
    }

    /// One sample of input `slot`.
    ///
    /// Channels beyond the input's width wrap around. An unbound slot reads the
    /// slot's default value; a bound producer with no channels reads 0.0.
    #[inline]
    pub fn sample(&self, slot: usize, channel: usize, frame: usize) -> f32 {
        match self.input(slot) {
            Some(input) if input.channels() > 0 => {
                input.channel(channel % input.channels())[frame]
            }
            Some(_) => 0.0,
            None => self.slots.get(slot).map_or(0.0, |s| s.default),
        }
    }

    /// Channel `channel` of input `slot` for the whole block.
    ///
    /// Follows the same rules as [`sample`](Self::sample) but resolves the
    /// producer once, so per-frame reads are a slice index.
    pub fn signal(&self, slot: usize, channel: usize) -> Signal<'a> {
        match self.input(slot) {
            Some(input) if input.channels() > 0 => {
                Signal::Samples(input.channel(channel % input.channels()))
            }
            Some(_) => Signal::Constant(0.0),
            None => Signal::Constant(self.slots.get(slot).map_or(0.0, |s| s.default)),
        }
    }

    /// Buffer bound to buffer slot `slot`.
    pub fn buffer(&self, slot: usize) -> Option<&'a Buffer> {
        self.buffers.get(slot)?.as_deref()
    }

    fn view(&self, producer: NodeId) -> Option<Input<'a>> {
        let node = self.nodes.get(producer)?;
        let native = node.out.channels();
        let upmix = self.upmix && native > 0 && native < self.width;
        Some(Input {
            block: &node.out,
            native,
            width: if upmix { self.width } else { native },
            num_frames: self.num_frames,
            silence: &self.silence[..self.num_frames],
        })
    }
}

/// A producer's output as seen by one consumer.
#[derive(Clone, Copy)]
pub struct Input<'a> {
    block: &'a AudioBlock,
    native: usize,
    width: usize,
    num_frames: usize,
    silence: &'a [f32],
}

impl<'a> Input<'a> {
    /// Channels visible to the consumer (after upmixing).
    #[inline]
    pub fn channels(&self) -> usize {
        self.width
    }

    /// Channels the producer actually wrote.
    #[inline]
    pub fn native_channels(&self) -> usize {
        self.native
    }

    /// Samples of channel `k` for this block. Out-of-range channels read silence.
    #[inline]
    pub fn channel(&self, k: usize) -> &'a [f32] {
        if self.native == 0 || k >= self.width {
            return self.silence;
        }
        let source = if self.width > self.native {
            k % self.native
        } else {
            k
        };
        &self.block.channel(source)[..self.num_frames]
    }
}

/// One input channel resolved for a block: rendered samples or a fixed default.
#[derive(Clone, Copy, Debug)]
pub enum Signal<'a> {
    /// Samples written by the bound producer.
    Samples(&'a [f32]),
    /// Value of an unbound slot.
    Constant(f32),
}

impl Signal<'_> {
    /// Value at `frame`.
    #[inline]
    pub fn at(&self, frame: usize) -> f32 {
        match self {
            Signal::Samples(samples) => samples[frame],
            Signal::Constant(value) => *value,
        }
    }
}
