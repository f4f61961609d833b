//! Declarative patch descriptions.
//!
//! A [`PatchDescription`] is the data form of a [`PatchSpec`]: node types by
//! registry name, fixed input values, connections, external parameters, and
//! the output node. Descriptions load from JSON or TOML and resolve through a
//! [`NodeRegistry`] into an ordinary spec.
//!
//! ```json
//! {
//!   "name": "tremolo",
//!   "nodes": [
//!     { "id": "osc", "type": "sine", "values": { "frequency": 220.0 } },
//!     { "id": "lfo", "type": "sine", "values": { "frequency": 4.0 } },
//!     { "id": "amp", "type": "multiply" }
//!   ],
//!   "connections": [
//!     { "from": "osc", "to": "amp", "input": "a" },
//!     { "from": "lfo", "to": "amp", "input": "b" }
//!   ],
//!   "inputs": [
//!     { "name": "pitch", "default": 220.0, "targets": [{ "node": "osc", "input": "frequency" }] }
//!   ],
//!   "output": "amp"
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PatchSpec;
use crate::node::NodeId;
use crate::registry::{NodeFactory, NodeRegistry};
use crate::{Error, Result};

/// One node of a described patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Identifier used by connections and targets within this description.
    pub id: String,
    /// Registered node type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Fixed values bound to named inputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, f32>,
}

/// An edge from one described node into a named input of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescription {
    /// Producer id.
    pub from: String,
    /// Consumer id.
    pub to: String,
    /// Input name on the consumer.
    pub input: String,
}

/// A node input driven by an external patch parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescription {
    /// Node id.
    pub node: String,
    /// Input name on that node.
    pub input: String,
}

/// An external patch parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescription {
    /// Parameter name.
    pub name: String,
    /// Value used until the parameter is set.
    #[serde(default)]
    pub default: f32,
    /// Inputs the parameter feeds.
    #[serde(default)]
    pub targets: Vec<TargetDescription>,
}

/// Serializable form of a patch recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDescription {
    /// Patch name.
    pub name: String,
    /// Nodes, instantiated in order.
    pub nodes: Vec<NodeDescription>,
    /// Edges between nodes.
    #[serde(default)]
    pub connections: Vec<ConnectionDescription>,
    /// External parameters.
    #[serde(default)]
    pub inputs: Vec<InputDescription>,
    /// Id of the output node.
    pub output: String,
    /// Free the patch when it stops or any node finishes.
    #[serde(default)]
    pub auto_free: bool,
}

impl PatchDescription {
    /// Parse from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::PatchDescription(e.to_string()))
    }

    /// Parse from TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::PatchDescription(e.to_string()))
    }

    /// Load a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("toml") => Self::from_toml(&text),
            _ => Err(Error::PatchDescription(format!(
                "{}: expected a .json or .toml file",
                path.display()
            ))),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::PatchDescription(e.to_string()))
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::PatchDescription(e.to_string()))
    }

    /// Check the description against `registry` and turn it into a spec.
    ///
    /// Node types, ids, and input names are all validated here, so a spec
    /// that resolves only fails at instantiation for graph-level reasons
    /// such as cycles.
    pub fn into_spec(self, registry: &NodeRegistry) -> Result<PatchSpec> {
        let factories = self.validate(registry)?;
        let name = self.name.clone();
        Ok(PatchSpec::new(name, move |p| {
            let mut ids = Vec::with_capacity(factories.len());
            for (node, factory) in self.nodes.iter().zip(&factories) {
                let id = p.add_boxed(factory());
                for (input, &value) in &node.values {
                    p.set_value(id, input, value)?;
                }
                ids.push(id);
            }
            let lookup = |key: &str| -> Result<NodeId> {
                self.nodes
                    .iter()
                    .position(|n| n.id == key)
                    .and_then(|i| ids.get(i).copied())
                    .ok_or_else(|| Error::PatchDescription(format!("unknown node id '{key}'")))
            };

            for c in &self.connections {
                p.set_param(lookup(&c.to)?, &c.input, lookup(&c.from)?)?;
            }
            for input in &self.inputs {
                let param = p.add_input(input.name.clone(), input.default)?;
                for target in &input.targets {
                    p.connect(param, lookup(&target.node)?, &target.input)?;
                }
            }
            p.set_output(lookup(&self.output)?);
            p.set_auto_free(self.auto_free);
            Ok(())
        }))
    }

    fn validate(&self, registry: &NodeRegistry) -> Result<Vec<NodeFactory>> {
        let mut seen = HashSet::new();
        let mut factories = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(Error::PatchDescription(format!(
                    "patch '{}' declares node '{}' twice",
                    self.name, node.id
                )));
            }
            factories.push(registry.factory(&node.kind)?);
            for input in node.values.keys() {
                self.check_input(registry, &node.id, input)?;
            }
        }

        for c in &self.connections {
            self.kind_of(&c.from)?;
            self.check_input(registry, &c.to, &c.input)?;
        }
        for input in &self.inputs {
            for target in &input.targets {
                self.check_input(registry, &target.node, &target.input)?;
            }
        }
        self.kind_of(&self.output)?;
        Ok(factories)
    }

    fn kind_of(&self, id: &str) -> Result<&str> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.kind.as_str())
            .ok_or_else(|| {
                Error::PatchDescription(format!("patch '{}' has no node '{id}'", self.name))
            })
    }

    fn check_input(&self, registry: &NodeRegistry, id: &str, input: &str) -> Result<()> {
        let kind = self.kind_of(id)?;
        let known = registry
            .descriptor(kind)
            .is_some_and(|d| d.inputs.contains(&input));
        if known {
            Ok(())
        } else {
            Err(Error::UnknownParameter {
                node: kind.to_string(),
                name: input.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    const CONSTANT_PATCH: &str = r#"
        name = "level"
        output = "c"

        [[nodes]]
        id = "c"
        type = "constant"
    "#;

    #[test]
    fn parses_toml_with_defaults() {
        let desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        assert_eq!(desc.name, "level");
        assert!(desc.connections.is_empty());
        assert!(desc.inputs.is_empty());
        assert!(!desc.auto_free);
        assert_eq!(desc.nodes[0].kind, "constant");
    }

    #[test]
    fn json_uses_type_key() {
        let desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        let json = desc.to_json().unwrap();
        assert!(json.contains("\"type\": \"constant\""));
        assert_eq!(PatchDescription::from_json(&json).unwrap(), desc);
    }

    #[test]
    fn malformed_json_is_a_description_error() {
        assert!(matches!(
            PatchDescription::from_json("{ \"name\": "),
            Err(Error::PatchDescription(_))
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        desc.nodes[0].kind = "theremin".to_string();
        assert!(matches!(
            desc.into_spec(&NodeRegistry::new()),
            Err(Error::UnknownNodeType(_))
        ));
    }

    #[test]
    fn unknown_output_id_is_rejected() {
        let mut desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        desc.output = "nowhere".to_string();
        assert!(matches!(
            desc.into_spec(&NodeRegistry::new()),
            Err(Error::PatchDescription(_))
        ));
    }

    #[test]
    fn unknown_input_name_is_rejected() {
        let mut desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        desc.nodes[0].values.insert("gain".to_string(), 1.0);
        assert!(matches!(
            desc.into_spec(&NodeRegistry::new()),
            Err(Error::UnknownParameter { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut desc = PatchDescription::from_toml(CONSTANT_PATCH).unwrap();
        desc.nodes.push(desc.nodes[0].clone());
        assert!(matches!(
            desc.into_spec(&NodeRegistry::new()),
            Err(Error::PatchDescription(_))
        ));
    }

    #[test]
    fn resolved_spec_builds_a_patch() {
        let mut graph = test_support::graph();
        let spec = PatchDescription::from_toml(CONSTANT_PATCH)
            .unwrap()
            .into_spec(&NodeRegistry::new())
            .unwrap();
        let patch = graph.create_patch(&spec).unwrap();
        assert_eq!(graph.patch_name(patch).unwrap(), "level");
        assert_eq!(graph.patch_nodes(patch).unwrap().len(), 1);
        let output = graph.patch_output(patch).unwrap();
        assert_eq!(graph.node_name(output).unwrap(), "constant");
    }
}
