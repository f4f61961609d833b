//! Mono to stereo.

use rivulet_core::{AudioBlock, ChannelLayout, InputSlot, ProcessContext, Processor};

static WIDTH_INPUTS: [InputSlot; 2] = [InputSlot::new("input", 0.0), InputSlot::new("width", 0.0)];

/// Spreads a mono input across two channels.
///
/// The left channel passes the input. The right channel is the input scaled
/// by `1 - 2 * width`: identical at width 0, silent at 0.5, and phase inverted
/// at 1. `width` is clamped to [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct Width;

impl Width {
    /// Create a width node.
    pub fn new() -> Self {
        Self
    }
}

impl Processor for Width {
    fn name(&self) -> &'static str {
        "width"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &WIDTH_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(1, 2)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let input = ctx.signal(0, 0);
        let width = ctx.signal(1, 0);
        for frame in 0..ctx.num_frames() {
            let x = input.at(frame);
            let side = 1.0 - 2.0 * width.at(frame).clamp(0.0, 1.0);
            out.channel_mut(0)[frame] = x;
            out.channel_mut(1)[frame] = x * side;
        }
    }
}
