//! Rivulet Nodes - standard node library
//!
//! Concrete [`Processor`](rivulet_core::Processor) implementations for
//! rivulet graphs:
//!
//! - Operators: [`Add`], [`Subtract`], [`Multiply`], with the builder
//!   functions [`add`], [`subtract`], [`multiply`] and [`scale`]
//! - Oscillators: [`Sine`], [`Saw`], [`Square`]
//! - Envelopes: [`Line`]
//! - Buffer playback: [`BufferPlayer`], [`BeatCutter`]
//! - Stochastic: [`WhiteNoise`], [`RandomImpulse`]
//! - Stereo: [`Width`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use rivulet_core::{Graph, GraphConfig};
//! use rivulet_nodes::{Sine, multiply};
//!
//! let mut graph = Graph::new(GraphConfig::default())?;
//! let tone = graph.add(Sine::new());
//! graph.set_value(tone, "frequency", 220.0)?;
//! let quiet = multiply(&mut graph, tone, 0.1)?;
//! graph.play(quiet)?;
//! ```
//!
//! ## Registration
//!
//! [`register_standard_nodes`] adds every type here to a
//! [`NodeRegistry`], so patch descriptions can refer to them by name.

pub mod builders;
pub mod envelope;
pub mod operators;
pub mod oscillators;
pub mod playback;
mod rng;
pub mod stereo;
pub mod stochastic;

pub use builders::{Operand, add, multiply, scale, subtract};
pub use envelope::Line;
pub use operators::{Add, Multiply, Subtract};
pub use oscillators::{Saw, Sine, Square};
pub use playback::{BeatCutter, BufferPlayer};
pub use stereo::Width;
pub use stochastic::{EventDistribution, RandomImpulse, WhiteNoise};

use rivulet_core::{NodeCategory, NodeRegistry, Processor};

/// Register every standard node type.
///
/// Types already present under the same name are replaced.
pub fn register_standard_nodes(registry: &mut NodeRegistry) {
    let entries: [(&'static str, NodeCategory, fn() -> Box<dyn Processor>); 12] = [
        ("Sum of two signals", NodeCategory::Operator, || Box::new(Add)),
        ("Difference of two signals", NodeCategory::Operator, || {
            Box::new(Subtract)
        }),
        ("Product of two signals", NodeCategory::Operator, || {
            Box::new(Multiply)
        }),
        ("Sine oscillator", NodeCategory::Generator, || {
            Box::new(Sine::new())
        }),
        ("Rising sawtooth oscillator", NodeCategory::Generator, || {
            Box::new(Saw::new())
        }),
        ("Pulse oscillator with variable width", NodeCategory::Generator, || {
            Box::new(Square::new())
        }),
        ("Linear ramp between two values", NodeCategory::Envelope, || {
            Box::new(Line::new())
        }),
        ("Plays a buffer, optionally looping", NodeCategory::Buffer, || {
            Box::new(BufferPlayer::new())
        }),
        ("Slices a buffer into segments and rearranges them", NodeCategory::Buffer, || {
            Box::new(BeatCutter::default())
        }),
        ("Uniform noise, optionally band-limited", NodeCategory::Stochastic, || {
            Box::new(WhiteNoise::new())
        }),
        ("Impulses at random times", NodeCategory::Stochastic, || {
            Box::new(RandomImpulse::default())
        }),
        ("Mono to stereo with adjustable width", NodeCategory::Processor, || {
            Box::new(Width)
        }),
    ];
    for (description, category, factory) in entries {
        registry.register(description, category, factory);
    }
}

/// A registry holding the core and standard node types.
pub fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_standard_nodes(&mut registry);
    registry
}
