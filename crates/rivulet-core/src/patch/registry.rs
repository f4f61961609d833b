//! Named catalog of patch specs.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::{PatchDescription, PatchId, PatchSpec};
use crate::graph::Graph;
use crate::registry::NodeRegistry;
use crate::{Error, Result};

/// Catalog mapping names to [`PatchSpec`]s.
///
/// Use an owned registry, or the process-wide one from [`PatchRegistry::global`].
#[derive(Clone, Debug, Default)]
pub struct PatchRegistry {
    specs: BTreeMap<String, PatchSpec>,
}

impl PatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static RwLock<PatchRegistry> {
        static GLOBAL: OnceLock<RwLock<PatchRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(PatchRegistry::new()))
    }

    /// Register `spec` under `name`, returning any spec it replaces.
    pub fn add(&mut self, name: impl Into<String>, spec: PatchSpec) -> Option<PatchSpec> {
        self.specs.insert(name.into(), spec)
    }

    /// Resolve a description and register it under its own name.
    pub fn add_description(
        &mut self,
        description: PatchDescription,
        nodes: &NodeRegistry,
    ) -> Result<()> {
        let name = description.name.clone();
        let spec = description.into_spec(nodes)?;
        self.specs.insert(name, spec);
        Ok(())
    }

    /// Load a `.json` or `.toml` description and register it. Returns its name.
    pub fn add_description_file(
        &mut self,
        path: impl AsRef<Path>,
        nodes: &NodeRegistry,
    ) -> Result<String> {
        let description = PatchDescription::load(path)?;
        let name = description.name.clone();
        self.add_description(description, nodes)?;
        Ok(name)
    }

    /// Remove a spec.
    pub fn remove(&mut self, name: &str) -> Option<PatchSpec> {
        self.specs.remove(name)
    }

    /// Spec registered under `name`.
    pub fn get(&self, name: &str) -> Result<&PatchSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| Error::UnknownPatch(name.to_string()))
    }

    /// Instantiate the spec registered under `name` inside `graph`.
    pub fn create(&self, name: &str, graph: &mut Graph) -> Result<PatchId> {
        graph.create_patch(self.get(name)?)
    }

    /// Whether a spec is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Number of registered specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Constant;
    use crate::test_support;

    fn level() -> PatchSpec {
        PatchSpec::new("level", |p| {
            let out = p.add(Constant::new(0.5));
            p.set_output(out);
            Ok(())
        })
    }

    #[test]
    fn unknown_patch_fails() {
        let registry = PatchRegistry::new();
        assert!(matches!(
            registry.get("pad"),
            Err(Error::UnknownPatch(ref n)) if n == "pad"
        ));
    }

    #[test]
    fn create_unknown_patch_fails() {
        let mut graph = test_support::graph();
        let registry = PatchRegistry::new();
        assert!(matches!(
            registry.create("pad", &mut graph),
            Err(Error::UnknownPatch(_))
        ));
    }

    #[test]
    fn add_replaces_and_lists_sorted() {
        let mut registry = PatchRegistry::new();
        assert!(registry.add("b", level()).is_none());
        assert!(registry.add("a", level()).is_none());
        assert!(registry.add("b", level()).is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn instances_are_independent() {
        let mut graph = test_support::graph();
        let mut registry = PatchRegistry::new();
        registry.add("level", level());

        let first = registry.create("level", &mut graph).unwrap();
        let second = registry.create("level", &mut graph).unwrap();
        let a = graph.patch_output(first).unwrap();
        let b = graph.patch_output(second).unwrap();
        assert_ne!(a, b);

        graph.trigger(a, "value", 0.9).unwrap();
        graph.add_node(a).unwrap();
        graph.add_node(b).unwrap();
        graph.render(8).unwrap();
        assert_eq!(graph.node_output(a).unwrap().channel(0)[0], 0.9);
        assert_eq!(graph.node_output(b).unwrap().channel(0)[0], 0.5);
    }

    #[test]
    fn description_file_registers_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        std::fs::write(
            &path,
            r#"{ "name": "level", "nodes": [{ "id": "c", "type": "constant" }], "output": "c" }"#,
        )
        .unwrap();

        let mut registry = PatchRegistry::new();
        let name = registry
            .add_description_file(&path, &NodeRegistry::new())
            .unwrap();
        assert_eq!(name, "level");
        assert!(registry.contains("level"));
    }

    #[test]
    fn global_registry_is_shared() {
        PatchRegistry::global().write().add("global-level", level());
        assert!(PatchRegistry::global().read().contains("global-level"));
    }
}
