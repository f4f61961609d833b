//! Sample-wise arithmetic on two signals.
//!
//! Operators widen to their widest input: a stereo `a` times a mono `b`
//! produces stereo, with `b` upmixed across both channels.

use rivulet_core::{AudioBlock, ChannelLayout, InputSlot, ProcessContext, Processor};

static BINARY_INPUTS: [InputSlot; 2] = [InputSlot::new("a", 0.0), InputSlot::new("b", 0.0)];

#[inline]
fn binary(ctx: &ProcessContext<'_>, out: &mut AudioBlock, op: impl Fn(f32, f32) -> f32) {
    let n = ctx.num_frames();
    for (k, channel) in out.channels_mut().enumerate() {
        let a = ctx.signal(0, k);
        let b = ctx.signal(1, k);
        for (frame, sample) in channel[..n].iter_mut().enumerate() {
            *sample = op(a.at(frame), b.at(frame));
        }
    }
}

macro_rules! binary_operator {
    ($(#[$doc:meta])* $ty:ident, $name:literal, $op:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl $ty {
            /// Create the operator.
            pub fn new() -> Self {
                Self
            }
        }

        impl Processor for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn inputs(&self) -> &'static [InputSlot] {
                &BINARY_INPUTS
            }

            fn layout(&self) -> ChannelLayout {
                ChannelLayout::mono()
            }

            fn matches_input_channels(&self) -> bool {
                true
            }

            fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
                binary(ctx, out, $op);
            }
        }
    };
}

binary_operator!(
    /// `a + b`.
    Add,
    "add",
    |a, b| a + b
);

binary_operator!(
    /// `a - b`.
    Subtract,
    "subtract",
    |a, b| a - b
);

binary_operator!(
    /// `a * b`.
    Multiply,
    "multiply",
    |a, b| a * b
);
