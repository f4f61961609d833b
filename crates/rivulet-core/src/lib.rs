//! Rivulet Core - real-time audio dataflow graph engine
//!
//! A host program composes a directed graph of signal-processing nodes and
//! pulls multi-channel audio from it one block at a time, either from a device
//! callback or into memory.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`Graph`] - Node table, output sink, render scheduler (one per process)
//! - [`GraphController`] - Cross-thread command sender, applied at block boundaries
//! - [`GraphStats`] - Node count and CPU usage of the last block, readable anywhere
//!
//! ## Nodes
//!
//! - [`Processor`] - Behavior contract every node implements
//! - [`ProcessContext`] / [`Input`] - Read-only view of rendered inputs, with upmixing
//! - [`AudioBlock`] - A node's owned output storage
//! - [`Constant`] - Single-value producer bound by [`Graph::set_value`]
//! - [`NodeRegistry`] - Type name to factory catalog
//!
//! ## Buffers
//!
//! - [`Buffer`] - Multi-channel sample storage with interpolated, mapped reads
//! - [`codec`] - File decode/encode boundary (WAV behind the `wav` feature)
//!
//! ## Patches
//!
//! - [`PatchSpec`] / [`PatchBuilder`] - Reusable parameterized subgraph recipes
//! - [`PatchDescription`] - Serializable recipe resolved through a [`NodeRegistry`]
//! - [`PatchRegistry`] - Name to spec catalog, owned or process-global
//!
//! ## Device input
//!
//! - [`input_ring`] - Lock-free SPSC ring from a capture callback to a node
//!
//! # Example
//!
//! ```rust,ignore
//! use rivulet_core::{Buffer, Graph, GraphConfig};
//! use rivulet_nodes::{Sine, multiply};
//!
//! let mut graph = Graph::new(GraphConfig::default())?;
//! let sine = graph.add(Sine::new());
//! graph.set_value(sine, "frequency", 440.0)?;
//! let quiet = multiply(&mut graph, sine, 0.5)?;
//! graph.play(quiet)?;
//!
//! let mut bounce = Buffer::new(2, 44_100);
//! graph.render_to_buffer(&mut bounce, 256)?;
//! bounce.save("tone.wav")?;
//! ```
//!
//! # Features
//!
//! - `wav` (default): WAV load and save through `hound`
//! - `tracing`: debug events at topology changes and patch lifecycle

pub mod block;
pub mod buffer;
pub mod codec;
pub mod constant;
pub mod context;
pub mod error;
pub mod graph;
pub mod node;
pub mod patch;
pub mod registry;
pub mod ring;
pub mod sink;
mod table;

pub use block::AudioBlock;
pub use buffer::{
    Buffer, DEFAULT_SAMPLE_RATE, DEFAULT_TABLE_LENGTH, EnvelopeShape, Interpolation,
    OffsetMapping,
};
pub use constant::Constant;
pub use context::{Input, ProcessContext, Signal};
pub use error::{Error, Result};
pub use graph::{COMMAND_QUEUE_CAPACITY, Graph, GraphController, GraphStats};
pub use node::{ChannelLayout, InputSlot, NodeId, Processor};
pub use patch::{
    ConnectionDescription, InputDescription, NodeDescription, PatchBuilder, PatchDescription,
    PatchId, PatchParam, PatchRegistry, PatchSpec, TargetDescription,
};
pub use registry::{NodeCategory, NodeDescriptor, NodeFactory, NodeRegistry};
pub use ring::{RING_BLOCKS, RingReader, RingStats, RingWriter, input_ring};
pub use rivulet_config::GraphConfig;
pub use sink::OutputSink;

#[cfg(test)]
pub(crate) mod test_support;
