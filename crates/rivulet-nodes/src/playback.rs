//! Nodes that play audio from a bound buffer.
//!
//! Both players take their output width from the buffer: binding a stereo
//! buffer makes the node stereo. Read positions are in buffer frames and
//! advance by `rate` scaled for the buffer's own sample rate.

use rivulet_core::{
    AudioBlock, Buffer, ChannelLayout, DEFAULT_SAMPLE_RATE, InputSlot, ProcessContext, Processor,
};

use crate::rng::Rng;

static PLAYER_INPUTS: [InputSlot; 2] = [InputSlot::new("rate", 1.0), InputSlot::new("loop", 0.0)];

/// Plays the `buffer` slot from the start.
///
/// Inputs: `rate` (playback speed, default 1; negative plays backwards),
/// `loop` (wrap at the ends while > 0.5). Without looping the player holds
/// silence after the last frame and reports finished. `trigger("trigger", _)`
/// rewinds; `trigger("seek", seconds)` jumps.
#[derive(Debug, Clone)]
pub struct BufferPlayer {
    channels: usize,
    buffer_rate: f32,
    position: f64,
    finished: bool,
}

impl Default for BufferPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPlayer {
    /// Create a player. It outputs one silent channel until a buffer is bound.
    pub fn new() -> Self {
        Self {
            channels: 1,
            buffer_rate: DEFAULT_SAMPLE_RATE,
            position: 0.0,
            finished: false,
        }
    }

    /// Current read position in buffer frames.
    pub fn position(&self) -> f64 {
        self.position
    }
}

impl Processor for BufferPlayer {
    fn name(&self) -> &'static str {
        "buffer-player"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &PLAYER_INPUTS
    }

    fn buffers(&self) -> &'static [&'static str] {
        &["buffer"]
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(1, self.channels)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let n = ctx.num_frames();
        let Some(buffer) = ctx.buffer(0).filter(|b| b.num_frames() > 0) else {
            out.clear();
            return;
        };
        let frames = buffer.num_frames() as f64;
        let ratio = f64::from(buffer.sample_rate() / ctx.sample_rate());
        let rate = ctx.signal(0, 0);
        let looping = ctx.signal(1, 0);

        for frame in 0..n {
            let in_range = !self.finished && (0.0..frames).contains(&self.position);
            for channel in 0..out.channels() {
                out.channel_mut(channel)[frame] = if in_range {
                    buffer.get_frame(channel, self.position)
                } else {
                    0.0
                };
            }
            if self.finished {
                continue;
            }

            self.position += f64::from(rate.at(frame)) * ratio;
            if !(0.0..frames).contains(&self.position) {
                if looping.at(frame) > 0.5 {
                    self.position = self.position.rem_euclid(frames);
                } else {
                    self.finished = true;
                }
            }
        }
    }

    fn trigger(&mut self, name: &str, value: f32) {
        match name {
            "trigger" => {
                self.position = 0.0;
                self.finished = false;
            }
            "seek" => {
                self.position = f64::from(value.max(0.0) * self.buffer_rate);
                self.finished = false;
            }
            _ => {}
        }
    }

    fn buffer_changed(&mut self, _slot: usize, buffer: Option<&Buffer>) {
        if let Some(buffer) = buffer {
            self.channels = buffer.num_channels();
            self.buffer_rate = buffer.sample_rate();
        }
        self.position = 0.0;
        self.finished = false;
    }
}

static CUTTER_INPUTS: [InputSlot; 5] = [
    InputSlot::new("stutter_probability", 0.0),
    InputSlot::new("stutter_count", 1.0),
    InputSlot::new("jump_probability", 0.0),
    InputSlot::new("duty_cycle", 1.0),
    InputSlot::new("rate", 1.0),
];

/// Loops a buffer as a sequence of equal segments, randomly jumping and
/// stuttering at segment boundaries.
///
/// At each boundary the next segment is chosen in order, or at random with
/// probability `jump_probability`. With probability `stutter_probability`
/// the segment is repeated `stutter_count` times at a fraction of its length.
/// `duty_cycle` gates each (possibly stuttered) segment to its leading
/// fraction. `rate` is the read speed in frames per sample.
#[derive(Debug, Clone)]
pub struct BeatCutter {
    segment_count: usize,
    segment_offsets: Vec<f64>,
    segment_length: f64,
    num_frames: f64,
    channels: usize,
    phase: f64,
    segment_index: usize,
    segment_phase: f64,
    segment_duty: f32,
    current_offset: f64,
    next_offset: f64,
    stutter_length: f64,
    rng: Rng,
}

impl Default for BeatCutter {
    fn default() -> Self {
        Self::new(8)
    }
}

impl BeatCutter {
    /// Create a cutter slicing its buffer into `segment_count` segments (at least 1).
    pub fn new(segment_count: usize) -> Self {
        let segment_count = segment_count.max(1);
        Self {
            segment_count,
            segment_offsets: vec![0.0; segment_count],
            segment_length: 0.0,
            num_frames: 0.0,
            channels: 1,
            phase: 0.0,
            segment_index: 0,
            segment_phase: 0.0,
            segment_duty: 1.0,
            current_offset: 0.0,
            next_offset: 0.0,
            stutter_length: 0.0,
            rng: Rng::fresh(),
        }
    }

    /// Same as [`new`](Self::new) with a fixed random seed.
    pub fn with_seed(segment_count: usize, seed: u32) -> Self {
        Self {
            rng: Rng::new(seed),
            ..Self::new(segment_count)
        }
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Start frame of every segment of the bound buffer.
    pub fn segment_offsets(&self) -> &[f64] {
        &self.segment_offsets
    }

    fn offset_after(&self, index: usize) -> f64 {
        let next = self.segment_offsets[(index + 1) % self.segment_count];
        if next == 0.0 { self.num_frames } else { next }
    }

    fn next_segment(&mut self, ctx: &ProcessContext<'_>, frame: usize) {
        self.segment_index = (self.segment_index + 1) % self.segment_count;
        self.segment_phase = 0.0;
        self.current_offset = self.segment_offsets[self.segment_index];

        if self.rng.uniform() < ctx.sample(2, 0, frame) {
            let jump = self.rng.below(self.segment_count);
            self.current_offset = self.segment_offsets[jump];
        }
        self.stutter_length = if self.rng.uniform() < ctx.sample(0, 0, frame) {
            let count = f64::from(ctx.sample(1, 0, frame).max(1.0));
            (self.segment_length / count).floor()
        } else {
            self.segment_length
        };
        self.next_offset = self.offset_after(self.segment_index);
        self.segment_duty = ctx.sample(3, 0, frame);
    }
}

impl Processor for BeatCutter {
    fn name(&self) -> &'static str {
        "beat-cutter"
    }

    fn inputs(&self) -> &'static [InputSlot] {
        &CUTTER_INPUTS
    }

    fn buffers(&self) -> &'static [&'static str] {
        &["buffer"]
    }

    fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(1, self.channels)
    }

    fn process(&mut self, ctx: &ProcessContext<'_>, out: &mut AudioBlock) {
        let Some(buffer) = ctx.buffer(0).filter(|b| b.num_frames() > 0) else {
            out.clear();
            return;
        };
        let rate = ctx.signal(4, 0);

        for frame in 0..ctx.num_frames() {
            let stutter = self.stutter_length.max(1.0);
            let position = self.segment_phase % stutter;
            let audible =
                self.segment_duty >= 1.0 || position < f64::from(self.segment_duty) * stutter;
            for channel in 0..out.channels() {
                out.channel_mut(channel)[frame] = if audible {
                    buffer.get_frame(channel, self.current_offset + position)
                } else {
                    0.0
                };
            }

            let step = f64::from(rate.at(frame));
            self.phase += step;
            self.segment_phase += step;
            if self.phase >= self.next_offset {
                self.next_segment(ctx, frame);
            }
            self.phase %= self.num_frames;
        }
    }

    fn buffer_changed(&mut self, _slot: usize, buffer: Option<&Buffer>) {
        let Some(buffer) = buffer else {
            return;
        };
        self.channels = buffer.num_channels();
        self.num_frames = buffer.num_frames() as f64;
        let count = self.segment_count as f64;
        self.segment_length = (self.num_frames / count).floor();
        for (i, offset) in self.segment_offsets.iter_mut().enumerate() {
            *offset = (i as f64 * self.num_frames / count).round();
        }

        self.phase = 0.0;
        self.segment_index = 0;
        self.segment_phase = 0.0;
        self.segment_duty = 1.0;
        self.current_offset = self.segment_offsets[0];
        self.next_offset = self.offset_after(0);
        self.stutter_length = self.segment_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Buffer {
        Buffer::from_mono((0..frames).map(|i| i as f32).collect(), 44100.0).unwrap()
    }

    #[test]
    fn cutter_segments_follow_buffer() {
        let mut cutter = BeatCutter::with_seed(4, 1);
        cutter.buffer_changed(0, Some(&ramp(10)));
        assert_eq!(cutter.segment_offsets(), &[0.0, 3.0, 5.0, 8.0]);
        assert_eq!(cutter.segment_length, 2.0);
        assert_eq!(cutter.next_offset, 3.0);
    }

    #[test]
    fn single_segment_wraps_at_buffer_end() {
        let mut cutter = BeatCutter::with_seed(1, 1);
        cutter.buffer_changed(0, Some(&ramp(16)));
        assert_eq!(cutter.next_offset, 16.0);
    }

    #[test]
    fn cutter_width_follows_buffer() {
        let mut cutter = BeatCutter::new(0);
        assert_eq!(cutter.segment_count(), 1);
        let stereo = Buffer::new(2, 8);
        cutter.buffer_changed(0, Some(&stereo));
        assert_eq!(cutter.layout(), ChannelLayout::new(1, 2));
    }

    #[test]
    fn player_rewinds_on_rebind() {
        let mut player = BufferPlayer::new();
        player.position = 12.0;
        player.finished = true;
        player.buffer_changed(0, Some(&Buffer::new(3, 4)));
        assert_eq!(player.position(), 0.0);
        assert!(!player.is_finished());
        assert_eq!(player.layout().outputs, 3);
    }

    #[test]
    fn seek_uses_buffer_rate() {
        let mut player = BufferPlayer::new();
        player.buffer_changed(0, Some(&Buffer::new(1, 100).with_sample_rate(8000.0)));
        player.trigger("seek", 0.5);
        assert_eq!(player.position(), 4000.0);
    }
}
