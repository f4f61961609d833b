//! Reusable, parameterized subgraphs.
//!
//! A [`PatchSpec`] is a named recipe. Instantiating it runs the recipe against
//! a [`PatchBuilder`], which adds nodes to the graph, declares named external
//! parameters, and picks the output node. The result is a live patch inside
//! the graph, addressed by [`PatchId`]:
//!
//! ```rust,ignore
//! use rivulet_core::{PatchSpec, Graph, GraphConfig};
//! use rivulet_nodes::{Sine, multiply};
//!
//! let spec = PatchSpec::new("tone", |p| {
//!     let sine = p.add(Sine::new());
//!     let freq = p.add_input("frequency", 440.0)?;
//!     p.connect(freq, sine, "frequency")?;
//!     let out = multiply(p, sine, 0.2)?;
//!     p.set_output(out);
//!     Ok(())
//! });
//!
//! let mut graph = Graph::new(GraphConfig::default())?;
//! let tone = graph.create_patch(&spec)?;
//! graph.set_patch_value(tone, "frequency", 660.0)?;
//! graph.play_patch(tone)?;
//! ```
//!
//! Each instantiation creates fresh nodes; instances never share state.

mod description;
mod registry;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub use description::{
    ConnectionDescription, InputDescription, NodeDescription, PatchDescription,
    TargetDescription,
};
pub use registry::PatchRegistry;

use crate::constant::Constant;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::table::Handle;
use crate::{Error, Result};

/// Handle to a patch instance in a [`Graph`].
///
/// Like [`NodeId`], slots of freed patches are reused under a new generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId {
    index: u32,
    generation: u32,
}

impl PatchId {
    /// Slot index in the graph's patch table.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// How many times the slot had been freed when this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Handle for PatchId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    fn index(self) -> u32 {
        self.index
    }

    fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for PatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generation == 0 {
            write!(f, "PatchId({})", self.index)
        } else {
            write!(f, "PatchId({}v{})", self.index, self.generation)
        }
    }
}

/// Handle to an external parameter declared with [`PatchBuilder::add_input`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchParam(usize);

pub(crate) struct PatchInput {
    name: String,
    /// Constant feeding the targets while no external producer is bound.
    default: NodeId,
    targets: Vec<(NodeId, usize)>,
}

pub(crate) struct PatchData {
    name: String,
    output: NodeId,
    inputs: Vec<PatchInput>,
    nodes: Vec<NodeId>,
    auto_free: bool,
}

type Recipe = dyn Fn(&mut PatchBuilder<'_>) -> Result<()> + Send + Sync;

/// A named recipe producing a fresh subgraph.
#[derive(Clone)]
pub struct PatchSpec {
    name: String,
    recipe: Arc<Recipe>,
}

impl PatchSpec {
    /// Create a spec from a builder closure.
    pub fn new<F>(name: impl Into<String>, recipe: F) -> Self
    where
        F: Fn(&mut PatchBuilder<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            recipe: Arc::new(recipe),
        }
    }

    /// Name the spec was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a new instance inside `graph`.
    pub fn instantiate(&self, graph: &mut Graph) -> Result<PatchId> {
        graph.create_patch(self)
    }
}

impl std::fmt::Debug for PatchSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder handed to a [`PatchSpec`] recipe.
///
/// Dereferences to the [`Graph`], so every graph operation (and every node
/// builder function taking `&mut Graph`) works inside a recipe. Nodes added
/// while the builder is alive belong to the patch.
pub struct PatchBuilder<'g> {
    graph: &'g mut Graph,
    name: String,
    inputs: Vec<PatchInput>,
    output: Option<NodeId>,
    auto_free: bool,
}

impl PatchBuilder<'_> {
    /// Name of the patch being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a named external parameter with a default value.
    pub fn add_input(&mut self, name: impl Into<String>, default: f32) -> Result<PatchParam> {
        let name = name.into();
        if self.inputs.iter().any(|i| i.name == name) {
            return Err(Error::InvalidConfiguration(format!(
                "patch '{}' declares input '{name}' twice",
                self.name
            )));
        }
        let constant = self.graph.add(Constant::new(default));
        self.inputs.push(PatchInput {
            name,
            default: constant,
            targets: Vec::new(),
        });
        Ok(PatchParam(self.inputs.len() - 1))
    }

    /// Forward a patch parameter to the input `input` of `node`.
    pub fn connect(&mut self, param: PatchParam, node: NodeId, input: &str) -> Result<()> {
        let slot = self.graph.input_slot(node, input)?;
        let default = self
            .inputs
            .get(param.0)
            .map(|i| i.default)
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!("patch '{}' has no such input", self.name))
            })?;
        self.graph.bind_input(node, slot, default)?;
        self.inputs[param.0].targets.push((node, slot));
        Ok(())
    }

    /// Choose the node whose output is the patch output.
    pub fn set_output(&mut self, node: NodeId) {
        self.output = Some(node);
    }

    /// Free the patch's nodes when it stops or when any of them finishes.
    pub fn set_auto_free(&mut self, auto_free: bool) {
        self.auto_free = auto_free;
    }
}

impl Deref for PatchBuilder<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &*self.graph
    }
}

impl DerefMut for PatchBuilder<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut *self.graph
    }
}

impl Graph {
    /// Instantiate a spec. On failure every node the recipe created is freed.
    pub fn create_patch(&mut self, spec: &PatchSpec) -> Result<PatchId> {
        let outer = self.capture.replace(Vec::new());
        let mut builder = PatchBuilder {
            graph: &mut *self,
            name: spec.name.clone(),
            inputs: Vec::new(),
            output: None,
            auto_free: false,
        };
        let result = (spec.recipe)(&mut builder);
        let PatchBuilder {
            name,
            inputs,
            output,
            auto_free,
            ..
        } = builder;
        let captured = std::mem::replace(&mut self.capture, outer).unwrap_or_default();

        let output = match (result, output) {
            (Ok(()), Some(output)) => output,
            (Ok(()), None) => {
                self.free_all(&captured);
                return Err(Error::InvalidConfiguration(format!(
                    "patch '{name}' did not set an output node"
                )));
            }
            (Err(e), _) => {
                self.free_all(&captured);
                return Err(e);
            }
        };

        let id = self.patches.next_handle();
        for &node in &captured {
            if let Ok(data) = self.node_mut(node) {
                data.patch = Some(id);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("patch_create: '{name}' as {id} ({} nodes)", captured.len());
        let inserted = self.patches.insert(PatchData {
            name,
            output,
            inputs,
            nodes: captured,
            auto_free,
        });
        debug_assert_eq!(inserted, id);
        Ok(id)
    }

    fn free_all(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            let _ = self.free_node(node);
        }
    }

    fn patch(&self, id: PatchId) -> Result<&PatchData> {
        self.patches.get(id).ok_or(Error::PatchNotFound(id))
    }

    /// Name of the spec a patch was built from.
    pub fn patch_name(&self, id: PatchId) -> Result<&str> {
        Ok(&self.patch(id)?.name)
    }

    /// Output node of a patch.
    pub fn patch_output(&self, id: PatchId) -> Result<NodeId> {
        Ok(self.patch(id)?.output)
    }

    /// Nodes owned by a patch, in creation order.
    pub fn patch_nodes(&self, id: PatchId) -> Result<&[NodeId]> {
        Ok(&self.patch(id)?.nodes)
    }

    /// Names of a patch's external parameters.
    pub fn patch_inputs(&self, id: PatchId) -> Result<Vec<&str>> {
        Ok(self
            .patch(id)?
            .inputs
            .iter()
            .map(|i| i.name.as_str())
            .collect())
    }

    /// Number of patches currently playing.
    pub fn patch_count(&self) -> usize {
        self.active_patches.len()
    }

    /// Whether a patch is playing.
    pub fn is_patch_playing(&self, id: PatchId) -> bool {
        self.active_patches.contains(&id)
    }

    /// Attach a patch's output to the output sink.
    pub fn play_patch(&mut self, id: PatchId) -> Result<()> {
        let output = self.patch(id)?.output;
        self.play(output)?;
        if !self.active_patches.contains(&id) {
            self.active_patches.push(id);
        }
        Ok(())
    }

    /// Detach a patch at the start of the next block.
    ///
    /// The patch output is disconnected from every consumer, not only the
    /// output sink, as with [`stop`](Self::stop).
    pub fn stop_patch(&mut self, id: PatchId) -> Result<()> {
        let output = self.patch(id)?.output;
        if self.contains(output) {
            self.stop(output)?;
        }
        if !self.patches_to_remove.contains(&id) {
            self.patches_to_remove.push(id);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("patch_stop: {id} queued");
        Ok(())
    }

    /// Immediately detach a patch and free every node it owns.
    pub fn free_patch(&mut self, id: PatchId) -> Result<()> {
        let data = self.patches.remove(id).ok_or(Error::PatchNotFound(id))?;
        let sink = self.output();
        self.remove_input(sink, data.output)?;
        self.free_all(&data.nodes);
        self.active_patches.retain(|&p| p != id);
        self.patches_to_remove.retain(|&p| p != id);
        #[cfg(feature = "tracing")]
        tracing::debug!("patch_free: '{}' ({id})", data.name);
        Ok(())
    }

    /// Deferred half of [`stop_patch`](Self::stop_patch).
    pub(crate) fn retire_patch(&mut self, id: PatchId) {
        let Ok(data) = self.patch(id) else {
            return;
        };
        let (output, auto_free) = (data.output, data.auto_free);
        self.active_patches.retain(|&p| p != id);
        if auto_free {
            let _ = self.free_patch(id);
        } else {
            let sink = self.output();
            let _ = self.remove_input(sink, output);
        }
    }

    /// Queue auto-free patches with a finished node for removal.
    pub(crate) fn queue_finished_patches(&mut self) {
        for i in 0..self.active_patches.len() {
            let id = self.active_patches[i];
            let finished = self.patch(id).is_ok_and(|data| {
                data.auto_free
                    && data
                        .nodes
                        .iter()
                        .any(|&n| self.node(n).is_ok_and(|node| node.processor.is_finished()))
            });
            if finished && !self.patches_to_remove.contains(&id) {
                self.patches_to_remove.push(id);
            }
        }
    }

    fn patch_input_index(&self, id: PatchId, name: &str) -> Result<usize> {
        let data = self.patch(id)?;
        data.inputs
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| Error::UnknownParameter {
                node: data.name.clone(),
                name: name.to_string(),
            })
    }

    /// Feed a patch parameter from `producer` instead of its default constant.
    pub fn set_patch_input(&mut self, id: PatchId, name: &str, producer: NodeId) -> Result<()> {
        let index = self.patch_input_index(id, name)?;
        let targets = self.patch(id)?.inputs[index].targets.clone();
        for (node, slot) in targets {
            self.bind_input(node, slot, producer)?;
        }
        Ok(())
    }

    /// Set a patch parameter to a fixed value.
    pub fn set_patch_value(&mut self, id: PatchId, name: &str, value: f32) -> Result<()> {
        let index = self.patch_input_index(id, name)?;
        let input = &self.patch(id)?.inputs[index];
        let default = input.default;
        let targets = input.targets.clone();
        self.trigger(default, "value", value)?;
        for (node, slot) in targets {
            if self.node(node)?.inputs[slot] != Some(default) {
                self.bind_input(node, slot, default)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
