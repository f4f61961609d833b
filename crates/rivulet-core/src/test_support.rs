//! Shared helpers for unit tests that build a [`Graph`].

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::block::AudioBlock;
use crate::context::ProcessContext;
use crate::node::{ChannelLayout, InputSlot, Processor};
use crate::{Graph, GraphConfig};

static LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Serialize access to the process-wide graph slot.
pub(crate) fn lock() -> MutexGuard<'static, ()> {
    LOCK.lock()
}

/// A live graph that holds the test lock until it is dropped.
pub(crate) struct TestGraph {
    // Field order matters: the graph must drop before the guard.
    graph: Graph,
    _guard: MutexGuard<'static, ()>,
}

impl Deref for TestGraph {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

impl DerefMut for TestGraph {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

pub(crate) fn graph() -> TestGraph {
    graph_with(GraphConfig::default())
}

pub(crate) fn graph_with(config: GraphConfig) -> TestGraph {
    let guard = lock();
    let graph = Graph::new(config).expect("graph should be creatable under the test lock");
    TestGraph {
        graph,
        _guard: guard,
    }
}

static PASS_INPUTS: [InputSlot; 1] = [InputSlot::new("in", 0.0)];

/// Writes `base + channel` on every channel and counts its `process` calls.
pub(crate) struct Source {
    pub base: f32,
    pub channels: usize,
    pub calls: Arc<AtomicUsize>,
}

impl Source {
    pub fn new(base: f32, channels: usize) -> Self {
        Self {
            base,
            channels,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Processor for Source {
    fn name(&self) -> &'static str {
        "source"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, self.channels)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        for (k, channel) in out.channels_mut().enumerate() {
            channel[..ctx.num_frames()].fill(self.base + k as f32);
        }
    }
}

/// Copies its `in` input at a fixed width, counting calls and recording the
/// input width it saw.
pub(crate) struct Pass {
    pub channels: usize,
    pub calls: Arc<AtomicUsize>,
    pub seen_width: Arc<AtomicUsize>,
}

impl Pass {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            calls: Arc::new(AtomicUsize::new(0)),
            seen_width: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Processor for Pass {
    fn name(&self) -> &'static str {
        "pass"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &PASS_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::square(self.channels)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let n = ctx.num_frames();
        let input = ctx.input(0);
        self.seen_width
            .store(input.map_or(0, |i| i.channels()), Ordering::Relaxed);
        for (k, channel) in out.channels_mut().enumerate() {
            match input {
                Some(input) => channel[..n].copy_from_slice(input.channel(k)),
                None => channel[..n].fill(ctx.sample(0, k, 0)),
            }
        }
    }
}

static SUM_INPUTS: [InputSlot; 2] = [InputSlot::new("a", 0.0), InputSlot::new("b", 0.0)];

/// Mono sum of inputs `a` and `b`.
pub(crate) struct Sum {
    pub calls: Arc<AtomicUsize>,
}

impl Sum {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Processor for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &SUM_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        for (frame, sample) in out.channel_mut(0)[..ctx.num_frames()].iter_mut().enumerate() {
            *sample = ctx.sample(0, 0, frame) + ctx.sample(1, 0, frame);
        }
    }
}

/// A constant that counts how often it runs.
pub(crate) struct CountingConstant {
    pub value: f32,
    pub calls: Arc<AtomicUsize>,
}

impl CountingConstant {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Processor for CountingConstant {
    fn name(&self) -> &'static str {
        "counting-constant"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, 1)
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        out.channel_mut(0)[..ctx.num_frames()].fill(self.value);
    }
}

/// Reports finished after a fixed number of blocks.
pub(crate) struct OneShot {
    pub remaining: usize,
}

impl Processor for OneShot {
    fn name(&self) -> &'static str {
        "one-shot"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, 1)
    }

    fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let value = if self.remaining > 0 { 1.0 } else { 0.0 };
        out.channel_mut(0)[..ctx.num_frames()].fill(value);
        self.remaining = self.remaining.saturating_sub(1);
    }
}
