//! Shared fixtures for rivulet-core integration tests.
#![allow(dead_code)]

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};
use rivulet_core::{
    AudioBlock, ChannelLayout, Graph, GraphConfig, InputSlot, ProcessContext, Processor,
};

static LOCK: Mutex<()> = parking_lot::const_mutex(());

/// A live graph holding the process-wide test lock.
pub struct Fixture {
    graph: Graph,
    _guard: MutexGuard<'static, ()>,
}

impl Deref for Fixture {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

impl DerefMut for Fixture {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

pub fn graph() -> Fixture {
    graph_with(GraphConfig::default())
}

pub fn graph_with(config: GraphConfig) -> Fixture {
    let guard = LOCK.lock();
    Fixture {
        graph: Graph::new(config).unwrap(),
        _guard: guard,
    }
}

/// Running frame counter: frame `n` of the stream carries the value `n`.
pub struct Ramp {
    pub next: f32,
}

impl Processor for Ramp {
    fn name(&self) -> &'static str {
        "ramp"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, 1)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        for sample in &mut out.channel_mut(0)[..ctx.num_frames()] {
            *sample = self.next;
            self.next += 1.0;
        }
    }
}

static GAIN_INPUTS: [InputSlot; 2] = [InputSlot::new("in", 0.0), InputSlot::new("gain", 1.0)];

/// `in * gain`, widening to its input.
#[derive(Default)]
pub struct Gain;

impl Processor for Gain {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &GAIN_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        for (k, channel) in out.channels_mut().enumerate() {
            for (frame, sample) in channel[..ctx.num_frames()].iter_mut().enumerate() {
                *sample = ctx.sample(0, k, frame) * ctx.sample(1, k, frame);
            }
        }
    }
}

/// Reads buffer slot `table` at the offset given by input `offset`.
#[derive(Default)]
pub struct Lookup;

static LOOKUP_INPUTS: [InputSlot; 1] = [InputSlot::new("offset", 0.0)];

impl Processor for Lookup {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &LOOKUP_INPUTS
    }

    fn buffers(&self) -> &'static [&'static str] {
        &["table"]
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(1, 1)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let table = ctx.buffer(0);
        for (frame, sample) in out.channel_mut(0)[..ctx.num_frames()].iter_mut().enumerate() {
            let offset = f64::from(ctx.sample(0, 0, frame));
            *sample = table.map_or(0.0, |t| t.get(0, offset));
        }
    }
}
