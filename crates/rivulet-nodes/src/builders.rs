//! Builder functions for composing signals.
//!
//! Each builder adds one operator node and binds its operands, which may be
//! node handles or plain numbers:
//!
//! ```rust,ignore
//! let tone = graph.add(Sine::new());
//! let lfo = graph.add(Sine::new());
//! graph.set_value(lfo, "frequency", 3.0)?;
//! let tremolo = multiply(&mut graph, tone, lfo)?;
//! let quiet = scale(&mut graph, tremolo, 0.2)?;
//! ```

use rivulet_core::{Graph, NodeId, Result};

use crate::operators::{Add, Multiply, Subtract};

/// Something that can drive a node input: another node or a fixed value.
pub trait Operand {
    /// Bind `self` to the input `input` of `node`.
    fn bind(self, graph: &mut Graph, node: NodeId, input: &str) -> Result<()>;
}

impl Operand for NodeId {
    fn bind(self, graph: &mut Graph, node: NodeId, input: &str) -> Result<()> {
        graph.set_param(node, input, self)
    }
}

impl Operand for f32 {
    fn bind(self, graph: &mut Graph, node: NodeId, input: &str) -> Result<()> {
        graph.set_value(node, input, self).map(|_| ())
    }
}

fn binary(
    graph: &mut Graph,
    node: NodeId,
    a: impl Operand,
    b: impl Operand,
) -> Result<NodeId> {
    let bound = a
        .bind(graph, node, "a")
        .and_then(|()| b.bind(graph, node, "b"));
    match bound {
        Ok(()) => Ok(node),
        Err(e) => {
            // also frees a constant already bound for `a`
            let _ = graph.free_node(node);
            Err(e)
        }
    }
}

/// `a + b`.
pub fn add(graph: &mut Graph, a: impl Operand, b: impl Operand) -> Result<NodeId> {
    let node = graph.add(Add);
    binary(graph, node, a, b)
}

/// `a - b`.
pub fn subtract(graph: &mut Graph, a: impl Operand, b: impl Operand) -> Result<NodeId> {
    let node = graph.add(Subtract);
    binary(graph, node, a, b)
}

/// `a * b`.
pub fn multiply(graph: &mut Graph, a: impl Operand, b: impl Operand) -> Result<NodeId> {
    let node = graph.add(Multiply);
    binary(graph, node, a, b)
}

/// `input * factor`.
pub fn scale(graph: &mut Graph, input: NodeId, factor: f32) -> Result<NodeId> {
    multiply(graph, input, factor)
}
