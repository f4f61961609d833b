//! Constant-valued producer.

use crate::block::AudioBlock;
use crate::context::ProcessContext;
use crate::node::{ChannelLayout, Processor};

/// Emits a single channel holding one value.
///
/// Constants are exempt from per-block memoization: they run once per
/// consumer edge and are never counted in [`Graph::node_count`](crate::Graph::node_count).
/// `trigger("value", v)` changes the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    /// Create a constant.
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Processor for Constant {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(0, 1)
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        out.channel_mut(0)[..ctx.num_frames()].fill(self.value);
    }

    fn trigger(&mut self, name: &str, value: f32) {
        if name == "value" {
            self.value = value;
        }
    }

    fn describe(&self) -> Option<String> {
        Some(format!("{}", self.value))
    }
}
