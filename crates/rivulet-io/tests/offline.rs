//! Device adapter tests on the offline backend.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use rivulet_core::{Graph, GraphConfig};
use rivulet_io::{
    AudioIn, AudioOut, Error, OfflineBackend, OutputTap, SharedGraph, backend_by_name, shared,
};
use rivulet_nodes::{Width, scale};

static LOCK: Mutex<()> = parking_lot::const_mutex(());

/// A shared live graph holding the process-wide test lock.
struct Fixture {
    graph: SharedGraph,
    _guard: MutexGuard<'static, ()>,
}

fn fixture(config: &GraphConfig) -> Fixture {
    let guard = LOCK.lock();
    Fixture {
        graph: shared(Graph::new(config.clone()).unwrap()),
        _guard: guard,
    }
}

fn offline_config() -> GraphConfig {
    GraphConfig {
        output_backend: Some("offline".into()),
        sample_rate: 8000,
        output_buffer_size: 32,
        input_buffer_size: 32,
        ..GraphConfig::default()
    }
}

fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn init_resolves_backend_and_device() {
    let out = AudioOut::init(&offline_config()).unwrap();
    assert_eq!(out.backend_name(), "offline");
    assert_eq!(out.sample_rate(), 8000);
    assert_eq!(out.buffer_size(), 32);
    assert!(!out.is_running());
}

#[test]
fn missing_device_is_reported_at_init() {
    let config = GraphConfig {
        output_device: Some("studio monitors".into()),
        ..offline_config()
    };
    assert!(matches!(
        AudioOut::init(&config),
        Err(Error::DeviceNotFound(_))
    ));

    let config = GraphConfig {
        input_device: Some("microphone".into()),
        ..offline_config()
    };
    assert!(matches!(
        AudioIn::init(&config, 1),
        Err(Error::DeviceNotFound(_))
    ));
}

#[test]
fn unknown_backend_and_bad_config_fail_fast() {
    let config = GraphConfig {
        output_backend: Some("pulse".into()),
        ..offline_config()
    };
    assert!(matches!(
        AudioOut::init(&config),
        Err(Error::UnknownBackend(_))
    ));

    let config = GraphConfig {
        sample_rate: 0,
        ..offline_config()
    };
    assert!(matches!(AudioOut::init(&config), Err(Error::Config(_))));
    assert!(backend_by_name(Some("offline")).is_ok());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn output_streams_the_rendered_graph() {
    let config = offline_config();
    let fixture = fixture(&config);
    {
        let mut graph = fixture.graph.lock();
        let width = graph.add(Width);
        graph.set_value(width, "input", 0.5).unwrap();
        graph.set_value(width, "width", 1.0).unwrap();
        let quiet = scale(&mut graph, width, 0.5).unwrap();
        graph.play(quiet).unwrap();
    }

    let tap = OutputTap::new(2 * 256);
    let backend = OfflineBackend::unpaced().with_tap(tap.clone());
    let mut out = AudioOut::with_backend(Box::new(backend), &config).unwrap();
    out.start(Arc::clone(&fixture.graph)).unwrap();
    assert!(out.is_running());
    assert_eq!(out.channels(), 2);
    wait_until(|| tap.is_full());
    out.stop();

    let samples = tap.samples();
    assert!(samples.chunks(2).all(|f| f == [0.25, -0.25]), "{samples:?}");
    assert!(fixture.graph.lock().stats().blocks_rendered() >= 8);
}

#[test]
fn held_lock_yields_silence() {
    let config = offline_config();
    let fixture = fixture(&config);
    {
        let mut graph = fixture.graph.lock();
        let width = graph.add(Width);
        graph.set_value(width, "input", 1.0).unwrap();
        graph.play(width).unwrap();
    }

    let tap = OutputTap::new(2 * 128);
    let backend = OfflineBackend::unpaced().with_tap(tap.clone());
    let mut out = AudioOut::with_backend(Box::new(backend), &config).unwrap();
    out.start(Arc::clone(&fixture.graph)).unwrap();
    {
        let held = fixture.graph.lock();
        // let a block rendered before the lock land in the tap
        thread::sleep(Duration::from_millis(20));
        tap.clear();
        wait_until(|| tap.is_full());
        drop(held);
    }
    out.close();

    assert!(tap.samples().iter().all(|&s| s == 0.0));
}

#[test]
fn graph_is_retuned_to_the_device_rate() {
    let config = offline_config();
    let fixture = fixture(&config);
    let backend = OfflineBackend::unpaced().with_sample_rate(16000);
    let mut out = AudioOut::with_backend(Box::new(backend), &config).unwrap();
    assert_eq!(out.sample_rate(), 16000);

    out.start(Arc::clone(&fixture.graph)).unwrap();
    out.stop();
    assert_eq!(fixture.graph.lock().sample_rate(), 16000.0);
}

#[test]
fn output_can_restart() {
    let config = offline_config();
    let fixture = fixture(&config);
    let backend = OfflineBackend::unpaced();
    let mut out = AudioOut::with_backend(Box::new(backend), &config).unwrap();
    let stats = fixture.graph.lock().stats();

    out.start(Arc::clone(&fixture.graph)).unwrap();
    wait_until(|| stats.blocks_rendered() > 0);
    out.stop();
    let after_first = stats.blocks_rendered();
    assert!(!out.is_running());

    out.start(Arc::clone(&fixture.graph)).unwrap();
    wait_until(|| stats.blocks_rendered() > after_first);
    out.close();
}

// ============================================================================
// Input
// ============================================================================

#[test]
fn captured_audio_reaches_the_graph() {
    let config = offline_config();
    let fixture = fixture(&config);
    let backend = OfflineBackend::unpaced().with_input_level(0.75);
    let (mut input, node) = AudioIn::with_backend(Box::new(backend), &config, 2).unwrap();
    assert_eq!(input.channels(), 2);

    input.start().unwrap();
    wait_until(|| node.available() >= 64);
    input.stop();

    let mut graph = fixture.graph.lock();
    let id = graph.add(node);
    graph.play(id).unwrap();
    graph.render(64).unwrap();
    let out = graph.node_output(id).unwrap();
    assert_eq!(out.channels(), 2);
    assert!(out.channel(0)[..64].iter().all(|&s| s == 0.75));
    assert!(out.channel(1)[..64].iter().all(|&s| s == 0.75));
}

#[test]
fn ring_holds_a_full_size_render() {
    let config = GraphConfig {
        max_block_size: 256,
        ..offline_config()
    };
    let fixture = fixture(&config);
    let backend = OfflineBackend::unpaced().with_input_level(0.5);
    let (mut input, node) = AudioIn::with_backend(Box::new(backend), &config, 1).unwrap();
    let stats = input.stats();

    input.start().unwrap();
    wait_until(|| node.available() >= 256);
    input.stop();

    let mut graph = fixture.graph.lock();
    let id = graph.add(node);
    graph.play(id).unwrap();
    graph.render(256).unwrap();
    assert!(graph.node_output(id).unwrap().channel(0)[..256].iter().all(|&s| s == 0.5));
    assert_eq!(stats.underruns(), 0);
}

#[test]
fn empty_ring_is_silent_and_counted() {
    let config = offline_config();
    let fixture = fixture(&config);
    let (input, node) =
        AudioIn::with_backend(Box::new(OfflineBackend::unpaced()), &config, 1).unwrap();
    let stats = input.stats();

    let mut graph = fixture.graph.lock();
    let id = graph.add(node);
    graph.play(id).unwrap();
    graph.render(32).unwrap();
    assert!(graph.node_output(id).unwrap().channel(0)[..32].iter().all(|&s| s == 0.0));
    assert_eq!(stats.underruns(), 1);
}
