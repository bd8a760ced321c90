//! Feature-gate tables and resolution

use crate::error::{Error, Result};
use render_values::{Document, Mapping, Node};

/// What to do with override gates the table does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownGatePolicy {
    #[default]
    Reject,
    /// Drop the gate and log a warning.
    Ignore,
}

impl UnknownGatePolicy {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "reject" => Some(Self::Reject),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// A fixed, versioned gate table declared by a `#@computed/gates` document.
#[derive(Debug, Clone, PartialEq)]
pub struct GateTable {
    pub name: String,
    pub gates: Vec<(String, bool)>,
    pub unknown: UnknownGatePolicy,
    pub position: String,
}

impl GateTable {
    /// Build a table from its declaring document.
    ///
    /// The document body must be a mapping of gate name to boolean default.
    pub fn from_document(name: &str, document: &Document) -> Result<Self> {
        let position = document.meta.describe_position();
        let annotation = document.meta.annotation(crate::pipeline::COMPUTED_GATES);

        let unknown = match annotation.and_then(|a| a.kwarg("unknown")) {
            None => UnknownGatePolicy::default(),
            Some(text) => UnknownGatePolicy::parse(text).ok_or_else(|| Error::TypeError {
                function: "computed/gates".into(),
                position: position.clone(),
                message: format!("unknown= must be 'reject' or 'ignore', got '{text}'"),
            })?,
        };

        let gates = match &document.root {
            Node::Mapping(mapping) => mapping
                .iter()
                .map(|entry| {
                    entry
                        .value
                        .as_bool()
                        .map(|enabled| (entry.key.clone(), enabled))
                        .ok_or_else(|| non_bool(&entry.key, &entry.value, &entry.meta.describe_position()))
                })
                .collect::<Result<Vec<_>>>()?,
            other if other.is_null() => Vec::new(),
            other => {
                return Err(Error::TypeError {
                    function: "computed/gates".into(),
                    position,
                    message: format!("gate table must be a map, got {}", other.kind()),
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            gates,
            unknown,
            position,
        })
    }

    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|(name, _)| name == gate)
    }
}

/// The resolved gate set: every known gate in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureGateSet {
    pub gates: Vec<(String, bool)>,
    /// Override gates dropped under [`UnknownGatePolicy::Ignore`].
    pub ignored: Vec<String>,
}

impl FeatureGateSet {
    /// Apply `overrides` (gate name to bool, null keeps the default) to `table`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownFeatureGate`] for a gate the table does not declare,
    ///   unless the table ignores unknown gates.
    /// - [`Error::TypeError`] for a non-boolean override.
    pub fn resolve(table: &GateTable, overrides: Option<&Mapping>, position: &str) -> Result<Self> {
        let mut set = Self {
            gates: table.gates.clone(),
            ignored: Vec::new(),
        };

        for entry in overrides.into_iter().flatten() {
            if entry.value.is_null() {
                continue;
            }
            let enabled = entry
                .value
                .as_bool()
                .ok_or_else(|| non_bool(&entry.key, &entry.value, position))?;

            match set.gates.iter_mut().find(|(name, _)| *name == entry.key) {
                Some(slot) => slot.1 = enabled,
                None if table.unknown == UnknownGatePolicy::Ignore => {
                    tracing::warn!(
                        gate = %entry.key,
                        table = %table.name,
                        "Ignoring unknown feature gate"
                    );
                    set.ignored.push(entry.key.clone());
                }
                None => {
                    return Err(Error::UnknownFeatureGate {
                        gate: entry.key.clone(),
                        table: table.name.clone(),
                        position: entry
                            .meta
                            .position
                            .as_ref()
                            .map_or_else(|| position.to_string(), ToString::to_string),
                    });
                }
            }
        }

        Ok(set)
    }

    pub fn get(&self, gate: &str) -> Option<bool> {
        self.gates
            .iter()
            .find(|(name, _)| name == gate)
            .map(|(_, enabled)| *enabled)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn to_node(&self) -> Node {
        self.gates
            .iter()
            .map(|(name, enabled)| (name.clone(), Node::bool(*enabled)))
            .collect::<Mapping>()
            .into()
    }
}

fn non_bool(gate: &str, value: &Node, position: &str) -> Error {
    Error::TypeError {
        function: "feature_gates".into(),
        position: position.to_string(),
        message: format!("gate '{gate}' must be true or false, got {}", value.kind()),
    }
}
