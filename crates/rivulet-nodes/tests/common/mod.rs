//! Shared fixtures for rivulet-nodes integration tests.
#![allow(dead_code)]

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};
use rivulet_core::{Graph, GraphConfig, NodeId};

static LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Sample rate used by every fixture graph.
pub const SAMPLE_RATE: f32 = 8000.0;

/// A live graph holding the process-wide test lock.
pub struct Fixture {
    graph: Graph,
    _guard: MutexGuard<'static, ()>,
}

impl Deref for Fixture {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

impl DerefMut for Fixture {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

impl Fixture {
    /// Play `node`, render `frames` frames and return its output channels.
    pub fn run(&mut self, node: NodeId, frames: usize) -> Vec<Vec<f32>> {
        if !self.graph.is_playing(node) {
            self.graph.play(node).unwrap();
        }
        self.graph.render(frames).unwrap();
        let out = self.graph.node_output(node).unwrap();
        (0..out.channels())
            .map(|k| out.channel(k)[..frames].to_vec())
            .collect()
    }
}

pub fn graph() -> Fixture {
    let guard = LOCK.lock();
    let config = GraphConfig {
        sample_rate: SAMPLE_RATE as u32,
        ..GraphConfig::default()
    };
    Fixture {
        graph: Graph::new(config).unwrap(),
        _guard: guard,
    }
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{actual:?} vs {expected:?}");
    }
}
