//! Linear ramps.

use rivulet_core::{AudioBlock, ChannelLayout, InputSlot, ProcessContext, Processor};

static LINE_INPUTS: [InputSlot; 3] = [
    InputSlot::new("from", 0.0),
    InputSlot::new("to", 1.0),
    InputSlot::new("time", 1.0),
];

/// Ramp from `from` to `to` over `time` seconds, then hold `to`.
///
/// The ramp starts on the first rendered block and restarts on
/// `trigger("trigger", _)`. Reports [`is_finished`](Processor::is_finished)
/// once the target is reached, so an auto-free patch built around a line
/// frees itself.
#[derive(Debug, Clone, Default)]
pub struct Line {
    elapsed: f32,
    finished: bool,
}

impl Line {
    /// Create a line.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for Line {
    fn name(&self) -> &'static str {
        "line"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &LINE_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(1, 1)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let from = ctx.signal(0, 0);
        let to = ctx.signal(1, 0);
        let time = ctx.signal(2, 0);
        let step = 1.0 / ctx.sample_rate();
        for (frame, sample) in out.channel_mut(0)[..ctx.num_frames()]
            .iter_mut()
            .enumerate()
        {
            let duration = time.at(frame).max(0.0);
            let progress = if duration > 0.0 {
                (self.elapsed / duration).min(1.0)
            } else {
                1.0
            };
            let (a, b) = (from.at(frame), to.at(frame));
            *sample = a + (b - a) * progress;
            if progress >= 1.0 {
                self.finished = true;
            } else {
                self.elapsed += step;
            }
        }
    }

    fn trigger(&mut self, name: &str, _value: f32) {
        if name == "trigger" {
            self.elapsed = 0.0;
            self.finished = false;
        }
    }
}
