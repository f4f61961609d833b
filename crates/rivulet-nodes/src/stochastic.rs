//! Random signal generators.

use rivulet_core::{AudioBlock, ChannelLayout, InputSlot, ProcessContext, Processor};

use crate::rng::Rng;

/// Samples until the next event at `frequency` Hz, or `None` when the rate is not positive.
fn interval(sample_rate: f32, frequency: f32) -> Option<f32> {
    (frequency > 0.0).then(|| sample_rate / frequency)
}

static NOISE_INPUTS: [InputSlot; 3] = [
    InputSlot::new("frequency", 0.0),
    InputSlot::new("min", -1.0),
    InputSlot::new("max", 1.0),
];

/// Uniform noise between `min` and `max`.
///
/// With `frequency` at 0 every sample is a fresh value. Above 0 a new target
/// is drawn `frequency` times per second and held, or approached linearly when
/// interpolating. With random intervals the spacing between targets varies
/// uniformly around the mean period.
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    interpolate: bool,
    random_interval: bool,
    rng: Rng,
    value: Vec<f32>,
    steps_remaining: Vec<u32>,
    step_change: Vec<f32>,
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl WhiteNoise {
    /// Interpolating noise with random intervals.
    pub fn new() -> Self {
        Self::with_options(true, true)
    }

    /// Noise with explicit interpolation and interval behavior.
    pub fn with_options(interpolate: bool, random_interval: bool) -> Self {
        Self {
            interpolate,
            random_interval,
            rng: Rng::fresh(),
            value: Vec::new(),
            steps_remaining: Vec::new(),
            step_change: Vec::new(),
        }
    }

    /// Replace the generator seed, for reproducible output.
    #[must_use]
    pub fn seeded(mut self, seed: u32) -> Self {
        self.rng = Rng::new(seed);
        self
    }
}

impl Processor for WhiteNoise {
    fn name(&self) -> &'static str {
        "white-noise"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &NOISE_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, layout: ChannelLayout, _block_size: usize) {
        self.value.resize(layout.outputs, 0.0);
        self.steps_remaining.resize(layout.outputs, 0);
        self.step_change.resize(layout.outputs, 0.0);
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let sample_rate = ctx.sample_rate();
        let channels = out.channels().min(self.value.len());
        for k in 0..channels {
            let frequency = ctx.signal(0, k);
            let min = ctx.signal(1, k);
            let max = ctx.signal(2, k);
            let samples = &mut out.channel_mut(k)[..ctx.num_frames()];
            for (frame, sample) in samples.iter_mut().enumerate() {
                let (lo, hi) = (min.at(frame), max.at(frame));
                let Some(period) = interval(sample_rate, frequency.at(frame)) else {
                    *sample = self.rng.range(lo, hi);
                    continue;
                };

                if self.steps_remaining[k] == 0 {
                    let steps = if self.random_interval {
                        self.rng.range(0.0, period * 2.0)
                    } else {
                        period
                    };
                    let steps = (steps as u32).max(1);
                    let target = self.rng.range(lo, hi);
                    self.steps_remaining[k] = steps;
                    if self.interpolate {
                        self.step_change[k] = (target - self.value[k]) / steps as f32;
                    } else {
                        self.value[k] = target;
                    }
                }

                *sample = self.value[k];
                if self.interpolate {
                    self.value[k] += self.step_change[k];
                }
                self.steps_remaining[k] -= 1;
            }
        }
        for k in channels..out.channels() {
            out.channel_mut(k).fill(0.0);
        }
    }
}

/// Spacing of [`RandomImpulse`] events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventDistribution {
    /// Intervals uniform in `[0, 2 / frequency)` seconds.
    #[default]
    Uniform,
    /// Exponentially distributed intervals, giving a Poisson process.
    Poisson,
}

static IMPULSE_INPUTS: [InputSlot; 1] = [InputSlot::new("frequency", 1.0)];

/// Emits single-sample impulses of 1.0 at random times, `frequency` per second on average.
#[derive(Debug, Clone)]
pub struct RandomImpulse {
    distribution: EventDistribution,
    rng: Rng,
    steps_remaining: Vec<u32>,
}

impl Default for RandomImpulse {
    fn default() -> Self {
        Self::new(EventDistribution::Uniform)
    }
}

impl RandomImpulse {
    /// Create an impulse generator.
    pub fn new(distribution: EventDistribution) -> Self {
        Self {
            distribution,
            rng: Rng::fresh(),
            steps_remaining: Vec::new(),
        }
    }

    /// Replace the generator seed, for reproducible output.
    #[must_use]
    pub fn seeded(mut self, seed: u32) -> Self {
        self.rng = Rng::new(seed);
        self
    }

    fn next_interval(&mut self, period: f32) -> u32 {
        let steps = match self.distribution {
            EventDistribution::Uniform => self.rng.range(0.0, period * 2.0),
            EventDistribution::Poisson => {
                let u = 1.0 - self.rng.uniform();
                -libm::logf(u) * period
            }
        };
        (steps as u32).max(1)
    }
}

impl Processor for RandomImpulse {
    fn name(&self) -> &'static str {
        "random-impulse"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &IMPULSE_INPUTS
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::mono()
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, layout: ChannelLayout, _block_size: usize) {
        self.steps_remaining.resize(layout.outputs, 0);
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let sample_rate = ctx.sample_rate();
        for k in 0..out.channels() {
            let frequency = ctx.signal(0, k);
            for frame in 0..ctx.num_frames() {
                let Some(period) = interval(sample_rate, frequency.at(frame)) else {
                    out.channel_mut(k)[frame] = 0.0;
                    continue;
                };
                let Some(remaining) = self.steps_remaining.get(k).copied() else {
                    out.channel_mut(k)[frame] = 0.0;
                    continue;
                };
                out.channel_mut(k)[frame] = if remaining == 0 {
                    self.steps_remaining[k] = self.next_interval(period);
                    1.0
                } else {
                    0.0
                };
                self.steps_remaining[k] = self.steps_remaining[k].saturating_sub(1);
            }
        }
    }
}
