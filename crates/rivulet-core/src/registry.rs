//! Node type registry and factory.
//!
//! Maps type names to factories so graphs can be built from data (see
//! [`PatchDescription`](crate::PatchDescription)). Types are registered with
//! explicit [`NodeRegistry::register`] calls; the core registers only
//! [`Constant`]. Node libraries provide a function that registers their types.

use crate::constant::Constant;
use crate::node::{ChannelLayout, Processor};
use crate::{Error, Result};

/// Category of node for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Oscillators and other signal sources.
    Generator,
    /// Arithmetic on signals.
    Operator,
    /// Envelopes and ramps.
    Envelope,
    /// Nodes that play or slice buffers.
    Buffer,
    /// Random and noise sources.
    Stochastic,
    /// Stereo and channel processing.
    Processor,
    /// Device input and output.
    Io,
    /// Constants and plumbing.
    Utility,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Generator => "Generator",
            NodeCategory::Operator => "Operator",
            NodeCategory::Envelope => "Envelope",
            NodeCategory::Buffer => "Buffer",
            NodeCategory::Stochastic => "Stochastic",
            NodeCategory::Processor => "Processor",
            NodeCategory::Io => "I/O",
            NodeCategory::Utility => "Utility",
        }
    }
}

/// Describes a node type in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Type name, as returned by [`Processor::name`].
    pub id: &'static str,
    /// Brief description of the node.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
    /// Input slot names, in slot order.
    pub inputs: Vec<&'static str>,
    /// Buffer slot names, in slot order.
    pub buffers: &'static [&'static str],
    /// Declared channel layout of a fresh instance.
    pub layout: ChannelLayout,
}

/// Factory function type for creating nodes.
pub type NodeFactory = fn() -> Box<dyn Processor>;

#[derive(Clone)]
struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of node types available by name.
#[derive(Clone)]
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a registry holding the built-in `constant` type.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register(
            "Fixed value, updated with trigger(\"value\")",
            NodeCategory::Utility,
            || Box::new(Constant::new(0.0)),
        );
        registry
    }

    /// Register a node type. The type name is taken from a fresh instance.
    ///
    /// Registering a name twice replaces the earlier entry.
    pub fn register(
        &mut self,
        description: &'static str,
        category: NodeCategory,
        factory: NodeFactory,
    ) -> &NodeDescriptor {
        let sample = factory();
        let descriptor = NodeDescriptor {
            id: sample.name(),
            description,
            category,
            inputs: sample.inputs().iter().map(|slot| slot.name).collect(),
            buffers: sample.buffers(),
            layout: sample.layout(),
        };
        self.entries.retain(|e| e.descriptor.id != descriptor.id);
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
        &self.entries[self.entries.len() - 1].descriptor
    }

    /// Create a node by type name.
    pub fn create(&self, id: &str) -> Result<Box<dyn Processor>> {
        Ok((self.factory(id)?)())
    }

    /// Factory for a type name.
    pub fn factory(&self, id: &str) -> Result<NodeFactory> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.factory)
            .ok_or_else(|| Error::UnknownNodeType(id.to_string()))
    }

    /// Descriptor for a type name.
    pub fn descriptor(&self, id: &str) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Whether a type name is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.descriptor(id).is_some()
    }

    /// All descriptors, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptors in one category.
    pub fn in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeDescriptor> {
        self.all().filter(move |d| d.category == category)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_is_built_in() {
        let registry = NodeRegistry::new();
        assert!(registry.contains("constant"));
        let descriptor = registry.descriptor("constant").unwrap();
        assert_eq!(descriptor.category, NodeCategory::Utility);
        assert_eq!(descriptor.layout, ChannelLayout::new(0, 1));
        assert!(descriptor.inputs.is_empty());
    }

    #[test]
    fn create_unknown_fails() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.create("theremin"),
            Err(Error::UnknownNodeType(ref n)) if n == "theremin"
        ));
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = NodeRegistry::new();
        registry.register("again", NodeCategory::Utility, || {
            Box::new(Constant::new(1.0))
        });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.descriptor("constant").unwrap().description, "again");
    }

    #[test]
    fn in_category_filters() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.in_category(NodeCategory::Utility).count(), 1);
        assert_eq!(registry.in_category(NodeCategory::Generator).count(), 0);
    }
}
