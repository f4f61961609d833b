//! The graph's output sink.

use crate::block::AudioBlock;
use crate::context::ProcessContext;
use crate::node::{ChannelLayout, Processor};

/// Sums every variadic input into the graph output.
///
/// Inputs are summed at their native width: a mono source lands on channel 0
/// only. Channels beyond the sink's width are dropped.
#[derive(Debug)]
pub struct OutputSink {
    channels: usize,
}

impl OutputSink {
    /// Create a sink with `channels` output channels.
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

impl Processor for OutputSink {
    fn name(&self) -> &'static str {
        "audio-out"
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::square(self.channels)
    }

    fn no_input_upmix(&self) -> bool {
        true
    }

    fn accepts_variadic(&self) -> bool {
        true
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let n = ctx.num_frames();
        for channel in out.channels_mut() {
            channel[..n].fill(0.0);
        }
        for input in ctx.variadic() {
            for k in 0..input.channels().min(self.channels) {
                let src = input.channel(k);
                for (dst, &s) in out.channel_mut(k)[..n].iter_mut().zip(src) {
                    *dst += s;
                }
            }
        }
    }
}
