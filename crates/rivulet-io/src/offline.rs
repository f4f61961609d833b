//! Headless backend driven by a paced thread.
//!
//! [`OfflineBackend`] stands in for a sound card: each stream runs a thread
//! that invokes the callback once per buffer, sleeping so blocks arrive at the
//! configured sample rate. Unpaced streams run as fast as the callback allows.
//! Output can be tapped for inspection; input streams deliver a constant level.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::{
    AudioBackend, AudioDevice, BackendStreamConfig, ErrorCallback, InputCallback, OutputCallback,
    StreamHandle,
};
use crate::{Error, Result};

/// Name of the single device the offline backend exposes.
pub const OFFLINE_DEVICE: &str = "offline";

/// Interleaved samples captured from offline output streams.
#[derive(Debug, Clone, Default)]
pub struct OutputTap {
    samples: Arc<Mutex<Vec<f32>>>,
    limit: usize,
}

impl OutputTap {
    /// A tap keeping at most `limit` samples.
    pub fn new(limit: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::with_capacity(limit))),
            limit,
        }
    }

    /// Copy of everything captured so far.
    pub fn samples(&self) -> Vec<f32> {
        self.samples.lock().clone()
    }

    /// Number of samples captured.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the tap has reached its limit.
    pub fn is_full(&self) -> bool {
        self.len() >= self.limit
    }

    /// Discard captured samples.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    fn push(&self, data: &[f32]) {
        let mut samples = self.samples.lock();
        let room = self.limit.saturating_sub(samples.len());
        samples.extend_from_slice(&data[..room.min(data.len())]);
    }
}

/// Headless backend for servers, CI and tests.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    paced: bool,
    sample_rate: Option<u32>,
    input_level: f32,
    tap: Option<OutputTap>,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineBackend {
    /// A backend that delivers blocks in real time.
    pub fn new() -> Self {
        Self {
            paced: true,
            sample_rate: None,
            input_level: 0.0,
            tap: None,
        }
    }

    /// A backend that delivers blocks back to back without sleeping.
    pub fn unpaced() -> Self {
        Self {
            paced: false,
            ..Self::new()
        }
    }

    /// Run every stream at `sample_rate` regardless of the request.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Value delivered on every channel of input streams.
    #[must_use]
    pub fn with_input_level(mut self, level: f32) -> Self {
        self.input_level = level;
        self
    }

    /// Capture output streams into `tap`.
    #[must_use]
    pub fn with_tap(mut self, tap: OutputTap) -> Self {
        self.tap = Some(tap);
        self
    }

    fn device(&self) -> AudioDevice {
        AudioDevice {
            name: OFFLINE_DEVICE.to_string(),
            is_input: true,
            is_output: true,
            default_sample_rate: self.sample_rate.unwrap_or(44100),
        }
    }

    fn check_device(&self, config: &BackendStreamConfig) -> Result<()> {
        match config.device_name.as_deref() {
            Some(name) if !self.device().matches(name) => Err(Error::DeviceNotFound(format!(
                "no offline device matching '{name}'"
            ))),
            _ => Ok(()),
        }
    }

    fn spawn(
        &self,
        config: &BackendStreamConfig,
        kind: &'static str,
        mut tick: impl FnMut(&mut [f32]) + Send + 'static,
    ) -> Result<StreamHandle> {
        if config.buffer_size == 0 || config.channels == 0 {
            return Err(Error::Stream(format!(
                "offline {kind} stream needs a non-zero buffer size and channel count"
            )));
        }
        let sample_rate = self.actual_sample_rate(config);
        let period = Duration::from_secs_f64(f64::from(config.buffer_size) / f64::from(sample_rate));
        let paced = self.paced;
        let mut data = vec![0.0; config.buffer_size as usize * config.channels as usize];

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("rivulet-offline-{kind}"))
            .spawn(move || {
                let mut deadline = Instant::now();
                while flag.load(Ordering::Acquire) {
                    tick(&mut data);
                    if paced {
                        deadline += period;
                        let now = Instant::now();
                        if deadline > now {
                            thread::sleep(deadline - now);
                        } else {
                            deadline = now;
                        }
                    } else {
                        thread::yield_now();
                    }
                }
            })?;

        tracing::info!(
            channels = config.channels,
            sample_rate,
            buffer_size = config.buffer_size,
            paced,
            "offline {kind} stream started"
        );
        Ok(StreamHandle::new(OfflineStream {
            running,
            thread: Some(thread),
        }))
    }
}

/// Stops and joins the stream thread on drop.
struct OfflineStream {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for OfflineStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("offline stream thread panicked");
        }
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(vec![self.device()])
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(Some(self.device()))
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        Ok(Some(self.device()))
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        self.check_device(config)?;
        let tap = self.tap.clone();
        self.spawn(config, "output", move |data| {
            callback(data);
            if let Some(tap) = &tap {
                tap.push(data);
            }
        })
    }

    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: InputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        self.check_device(config)?;
        let level = self.input_level;
        self.spawn(config, "input", move |data| {
            data.fill(level);
            callback(data);
        })
    }

    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        self.sample_rate.unwrap_or(config.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(buffer_size: u32) -> BackendStreamConfig {
        BackendStreamConfig {
            buffer_size,
            ..BackendStreamConfig::default()
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn tap_respects_limit() {
        let tap = OutputTap::new(3);
        tap.push(&[1.0, 2.0]);
        tap.push(&[3.0, 4.0]);
        assert_eq!(tap.samples(), vec![1.0, 2.0, 3.0]);
        assert!(tap.is_full());
        tap.clear();
        assert!(tap.is_empty());
    }

    #[test]
    fn output_stream_feeds_the_tap_until_dropped() {
        let tap = OutputTap::new(1024);
        let backend = OfflineBackend::unpaced().with_tap(tap.clone());
        let stream = backend
            .build_output_stream(
                &config(16),
                Box::new(|data: &mut [f32]| data.fill(0.5)),
                Box::new(|_: &str| {}),
            )
            .unwrap();
        wait_until(|| tap.is_full());
        drop(stream);

        assert!(tap.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn input_stream_delivers_the_level() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let backend = OfflineBackend::unpaced().with_input_level(0.25);
        let stream = backend
            .build_input_stream(
                &config(8),
                Box::new(move |data: &[f32]| sink.lock().extend_from_slice(data)),
                Box::new(|_: &str| {}),
            )
            .unwrap();
        wait_until(|| seen.lock().len() >= 16);
        drop(stream);

        let seen = seen.lock();
        assert_eq!(seen.len() % 16, 0);
        assert!(seen.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn paced_stream_runs_near_real_time() {
        let backend = OfflineBackend::new().with_sample_rate(16000);
        let count = Arc::new(Mutex::new(0u32));
        let ticks = Arc::clone(&count);
        let started = Instant::now();
        let stream = backend
            .build_output_stream(
                &config(160),
                Box::new(move |_: &mut [f32]| *ticks.lock() += 1),
                Box::new(|_: &str| {}),
            )
            .unwrap();
        wait_until(|| *count.lock() >= 5);
        drop(stream);

        // five 10 ms blocks; the first is immediate
        assert!(started.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn named_devices_must_match() {
        let backend = OfflineBackend::new();
        let named = BackendStreamConfig {
            device_name: Some("speakers".into()),
            ..config(16)
        };
        let result = backend.build_output_stream(
            &named,
            Box::new(|_: &mut [f32]| {}),
            Box::new(|_: &str| {}),
        );
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let backend = OfflineBackend::unpaced();
        let result =
            backend.build_output_stream(&config(0), Box::new(|_: &mut [f32]| {}), Box::new(|_: &str| {}));
        assert!(matches!(result, Err(Error::Stream(_))));
    }
}
