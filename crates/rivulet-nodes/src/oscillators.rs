//! Audio-rate oscillators.
//!
//! All oscillators read their `frequency` input per sample and keep one phase
//! accumulator per output channel, so a stereo frequency input yields two
//! independent voices. Phases live in [0, 1) and are restarted by
//! `trigger("reset", phase)`.

use core::f32::consts::TAU;

use libm::sinf;
use rivulet_core::{AudioBlock, ChannelLayout, InputSlot, ProcessContext, Processor};

/// Per-channel phase accumulators.
#[derive(Debug, Clone, Default)]
struct Phases {
    phase: Vec<f32>,
}

impl Phases {
    fn alloc(&mut self, channels: usize) {
        self.phase.resize(channels, 0.0);
    }

    fn reset(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0) % 1.0;
        self.phase.fill(value);
    }

    /// Current phase of `channel`, then advance by `frequency / sample_rate`.
    #[inline]
    fn advance(&mut self, channel: usize, frequency: f32, sample_rate: f32) -> f32 {
        let Some(phase) = self.phase.get_mut(channel) else {
            return 0.0;
        };
        let current = *phase;
        *phase += frequency / sample_rate;
        *phase -= libm::floorf(*phase);
        current
    }
}

static FREQUENCY_INPUTS: [InputSlot; 1] = [InputSlot::new("frequency", 440.0)];

fn run(
    phases: &mut Phases,
    ctx: &ProcessContext<'_>,
    out: &mut AudioBlock,
    wave: impl Fn(f32, &ProcessContext<'_>, usize, usize) -> f32,
) {
    let n = ctx.num_frames();
    let sample_rate = ctx.sample_rate();
    for (k, channel) in out.channels_mut().enumerate() {
        let frequency = ctx.signal(0, k);
        for (frame, sample) in channel[..n].iter_mut().enumerate() {
            let phase = phases.advance(k, frequency.at(frame), sample_rate);
            *sample = wave(phase, ctx, k, frame);
        }
    }
}

/// Sine oscillator.
///
/// Inputs: `frequency` (Hz, default 440).
#[derive(Debug, Clone, Default)]
pub struct Sine {
    phases: Phases,
}

impl Sine {
    /// Create a sine oscillator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for Sine {
    fn name(&self) -> &'static str {
        "sine"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &FREQUENCY_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, layout: ChannelLayout, _block_size: usize) {
        self.phases.alloc(layout.outputs);
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        run(&mut self.phases, ctx, out, |phase, _, _, _| sinf(phase * TAU));
    }

    fn trigger(&mut self, name: &str, value: f32) {
        if name == "reset" {
            self.phases.reset(value);
        }
    }
}

/// Naive rising sawtooth in [-1, 1).
///
/// Inputs: `frequency` (Hz, default 440).
#[derive(Debug, Clone, Default)]
pub struct Saw {
    phases: Phases,
}

impl Saw {
    /// Create a sawtooth oscillator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for Saw {
    fn name(&self) -> &'static str {
        "saw"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &FREQUENCY_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, layout: ChannelLayout, _block_size: usize) {
        self.phases.alloc(layout.outputs);
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        run(&mut self.phases, ctx, out, |phase, _, _, _| phase * 2.0 - 1.0);
    }

    fn trigger(&mut self, name: &str, value: f32) {
        if name == "reset" {
            self.phases.reset(value);
        }
    }
}

static SQUARE_INPUTS: [InputSlot; 2] = [
    InputSlot::new("frequency", 440.0),
    InputSlot::new("width", 0.5),
];

/// Pulse wave: +1 while the phase is below `width`, -1 after.
///
/// Inputs: `frequency` (Hz, default 440), `width` (duty cycle, default 0.5).
#[derive(Debug, Clone, Default)]
pub struct Square {
    phases: Phases,
}

impl Square {
    /// Create a square oscillator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &SQUARE_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, layout: ChannelLayout, _block_size: usize) {
        self.phases.alloc(layout.outputs);
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        run(&mut self.phases, ctx, out, |phase, ctx, k, frame| {
            if phase < ctx.sample(1, k, frame) { 1.0 } else { -1.0 }
        });
    }

    fn trigger(&mut self, name: &str, value: f32) {
        if name == "reset" {
            self.phases.reset(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wraps_into_unit_interval() {
        let mut phases = Phases::default();
        phases.alloc(1);
        let mut last = 0.0;
        for _ in 0..1000 {
            last = phases.advance(0, 1000.0, 44100.0);
            assert!((0.0..1.0).contains(&last));
        }
        assert!(last > 0.0);
    }

    #[test]
    fn reset_sets_every_channel() {
        let mut phases = Phases::default();
        phases.alloc(3);
        phases.advance(0, 100.0, 1000.0);
        phases.reset(0.25);
        assert_eq!(phases.phase, vec![0.25; 3]);
        phases.reset(1.0);
        assert_eq!(phases.phase, vec![0.0; 3]);
    }

    #[test]
    fn missing_channel_reads_zero() {
        let mut phases = Phases::default();
        assert_eq!(phases.advance(2, 440.0, 44100.0), 0.0);
    }
}
