//! Expression and computed-field evaluation
//!
//! The [`Evaluator`] owns the merged data values plus everything computed
//! from them so far: gate tables, named computed fields and the gate sets
//! resolved by `feature_gates()`. Computed fields are defined in declaration
//! order and may reference fields defined before them.

use crate::error::{Error, Result};
use crate::expr::{Expr, Function};
use crate::gates::{FeatureGateSet, GateTable};
use render_values::path::format_path;
use render_values::{Document, Mapping, Meta, Node, Scalar, Sequence, get_at_path};
use std::fmt;
use std::net::IpAddr;

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Value(Node),
    /// A reference that resolved to nothing. Fatal unless absorbed by
    /// `optional()` or `default()`.
    Missing(String),
    /// `optional()` of an absent value: the node is dropped.
    Omit,
}

/// Address families present in a set of CIDRs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpStack {
    Ipv4,
    Ipv6,
    DualStack,
}

impl IpStack {
    /// Classify CIDRs such as `10.96.0.0/12` or `[fe80::1]/64`.
    /// Returns `None` for an empty input.
    pub fn detect<'a>(cidrs: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let (mut v4, mut v6) = (false, false);
        for cidr in cidrs {
            if is_ipv6(cidr) {
                v6 = true;
            } else {
                v4 = true;
            }
        }
        match (v4, v6) {
            (true, true) => Some(Self::DualStack),
            (true, false) => Some(Self::Ipv4),
            (false, true) => Some(Self::Ipv6),
            (false, false) => None,
        }
    }
}

fn is_ipv6(cidr: &str) -> bool {
    let address = cidr.split('/').next().unwrap_or(cidr);
    let address = address.trim_start_matches('[').trim_end_matches(']');
    match address.parse::<IpAddr>() {
        Ok(ip) => ip.is_ipv6(),
        Err(_) => address.contains(':'),
    }
}

impl fmt::Display for IpStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::DualStack => "dual-stack",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    values: Node,
    tables: Vec<GateTable>,
    computed: Vec<(String, Node)>,
    gate_sets: Vec<(String, FeatureGateSet)>,
}

impl Evaluator {
    pub fn new(values: Node) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn values(&self) -> &Node {
        &self.values
    }

    pub fn computed(&self, name: &str) -> Option<&Node> {
        self.computed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    /// Gate sets resolved so far, keyed by table name.
    pub fn gate_sets(&self) -> &[(String, FeatureGateSet)] {
        &self.gate_sets
    }

    pub fn into_gate_sets(self) -> Vec<(String, FeatureGateSet)> {
        self.gate_sets
    }

    pub fn declare_gates(&mut self, table: GateTable) -> Result<()> {
        self.ensure_unique(&table.name, &table.position)?;
        tracing::debug!(table = %table.name, gates = table.gates.len(), "Declared feature gate table");
        self.tables.push(table);
        Ok(())
    }

    /// Evaluate a `#@computed/config` document body into the field `name`.
    pub fn define(&mut self, name: &str, document: &Document) -> Result<()> {
        let position = document.meta.describe_position();
        self.ensure_unique(name, &position)?;
        let value = self.resolve_document(document)?;
        tracing::debug!(field = name, %position, "Computed field defined");
        self.computed.push((name.to_string(), value));
        Ok(())
    }

    fn ensure_unique(&self, name: &str, position: &str) -> Result<()> {
        let taken = self.computed(name).is_some() || self.tables.iter().any(|t| t.name == name);
        if taken {
            return Err(Error::DuplicateComputed {
                name: name.to_string(),
                position: position.to_string(),
            });
        }
        Ok(())
    }

    /// Substitute every value expression in a document, including one on
    /// the `---` line itself.
    pub fn resolve_document(&mut self, document: &Document) -> Result<Node> {
        match &document.meta.expression {
            Some(text) => Ok(self.substitute(text, &document.meta)?.unwrap_or(Node::NULL)),
            None => self.resolve_tree(&document.root),
        }
    }

    /// Copy `node`, replacing every node that carries a value expression
    /// with its value and dropping the ones that evaluate to
    /// [`Evaluated::Omit`]. Meta is stripped from the result.
    pub fn resolve_tree(&mut self, node: &Node) -> Result<Node> {
        Ok(match node {
            Node::Scalar(scalar) => Node::Scalar(scalar.clone()),
            Node::Mapping(mapping) => {
                let mut out = Mapping::new();
                for entry in mapping {
                    let value = match &entry.meta.expression {
                        Some(text) => match self.substitute(text, &entry.meta)? {
                            Some(value) => value,
                            None => continue,
                        },
                        None => self.resolve_tree(&entry.value)?,
                    };
                    out.insert(entry.key.clone(), value);
                }
                out.into()
            }
            Node::Sequence(sequence) => {
                let mut out = Sequence::new();
                for item in &sequence.items {
                    let value = match &item.meta.expression {
                        Some(text) => match self.substitute(text, &item.meta)? {
                            Some(value) => value,
                            None => continue,
                        },
                        None => self.resolve_tree(&item.value)?,
                    };
                    out.push(value);
                }
                out.into()
            }
        })
    }

    fn substitute(&mut self, text: &str, meta: &Meta) -> Result<Option<Node>> {
        let position = meta.describe_position();
        match self.evaluate(text, &position)? {
            Evaluated::Value(mut value) => {
                value.strip_meta();
                Ok(Some(value))
            }
            Evaluated::Omit => {
                tracing::trace!(%position, expression = text, "Dropping optional node");
                Ok(None)
            }
            Evaluated::Missing(reference) => Err(Error::UnknownReference { reference, position }),
        }
    }

    /// Parse and evaluate one expression.
    pub fn evaluate(&mut self, text: &str, position: &str) -> Result<Evaluated> {
        let expr = Expr::parse(text, position)?;
        self.eval(&expr, position)
    }

    fn eval(&mut self, expr: &Expr, position: &str) -> Result<Evaluated> {
        match expr {
            Expr::Literal(node) => Ok(Evaluated::Value(node.clone())),
            Expr::Value(path) => Ok(match get_at_path(&self.values, path) {
                Some(node) => Evaluated::Value(node.clone()),
                None => Evaluated::Missing(format!("values.{}", format_path(path))),
            }),
            Expr::Computed { name, path } => Ok(self.lookup(name, path)),
            Expr::Call { function, args } => self.call(*function, args, position),
        }
    }

    fn lookup(&self, name: &str, path: &[render_values::PathSegment]) -> Evaluated {
        let root = match self.computed(name) {
            Some(node) => node.clone(),
            // A bare table name reads as its default gates
            None => match self.tables.iter().find(|t| t.name == name) {
                Some(table) => FeatureGateSet::resolve(table, None, &table.position)
                    .map(|set| set.to_node())
                    .unwrap_or_default(),
                None => return Evaluated::Missing(name.to_string()),
            },
        };
        match get_at_path(&root, path) {
            Some(node) => Evaluated::Value(node.clone()),
            None if path.is_empty() => Evaluated::Value(root),
            None => Evaluated::Missing(format!("{name}.{}", format_path(path))),
        }
    }

    fn call(&mut self, function: Function, args: &[Expr], position: &str) -> Result<Evaluated> {
        match function {
            Function::Optional => Ok(match self.eval(&args[0], position)? {
                Evaluated::Value(node) if !node.is_null() => Evaluated::Value(node),
                _ => Evaluated::Omit,
            }),

            Function::Default => match self.eval(&args[0], position)? {
                Evaluated::Value(node) if !node.is_null() => Ok(Evaluated::Value(node)),
                _ => self.eval(&args[1], position),
            },

            Function::FeatureGates => self.feature_gates(args, position),

            Function::Join => {
                let list = self.require(&args[0], position)?;
                let separator = self.require(&args[1], position)?;
                let Some(separator) = separator.as_str().map(str::to_string) else {
                    return Err(type_error(function, position, "separator must be a string"));
                };
                join(&list, &separator, position).map(|s| Evaluated::Value(Node::string(s)))
            }

            Function::Yaml => {
                let mut node = self.require(&args[0], position)?;
                node.strip_meta();
                Ok(Evaluated::Value(Node::string(node.to_yaml()?)))
            }

            Function::IpStack => {
                let mut cidrs = Vec::new();
                for arg in args {
                    if let Evaluated::Value(node) = self.eval(arg, position)? {
                        if let Some(text) = node.as_scalar().filter(|s| **s != Scalar::Null) {
                            cidrs.push(text.to_text());
                        }
                    }
                }
                let stack = IpStack::detect(cidrs.iter().map(String::as_str));
                tracing::debug!(%position, stack = ?stack, "Detected IP stack");
                Ok(Evaluated::Value(
                    stack.map_or(Node::NULL, |s| Node::string(s.to_string())),
                ))
            }
        }
    }

    fn feature_gates(&mut self, args: &[Expr], position: &str) -> Result<Evaluated> {
        let table_name = match &args[0] {
            Expr::Computed { name, path } if path.is_empty() => name.clone(),
            _ => {
                return Err(type_error(
                    Function::FeatureGates,
                    position,
                    "first argument must name a #@computed/gates table",
                ));
            }
        };
        let Some(table) = self.tables.iter().find(|t| t.name == table_name).cloned() else {
            return Ok(Evaluated::Missing(table_name));
        };

        let overrides = match self.eval(&args[1], position)? {
            Evaluated::Value(Node::Mapping(mapping)) => Some(mapping),
            Evaluated::Value(node) if !node.is_null() => {
                return Err(type_error(
                    Function::FeatureGates,
                    position,
                    &format!("overrides must be a map, got {}", node.kind()),
                ));
            }
            _ => None,
        };

        let set = FeatureGateSet::resolve(&table, overrides.as_ref(), position)?;
        tracing::debug!(
            table = %table.name,
            gates = set.len(),
            ignored = set.ignored.len(),
            "Resolved feature gates"
        );

        let node = set.to_node();
        match self.gate_sets.iter_mut().find(|(name, _)| *name == table.name) {
            Some(slot) => slot.1 = set,
            None => self.gate_sets.push((table.name.clone(), set)),
        }
        Ok(Evaluated::Value(node))
    }

    /// Evaluate an argument that must be present.
    fn require(&mut self, expr: &Expr, position: &str) -> Result<Node> {
        match self.eval(expr, position)? {
            Evaluated::Value(node) => Ok(node),
            Evaluated::Omit => Ok(Node::NULL),
            Evaluated::Missing(reference) => Err(Error::UnknownReference {
                reference,
                position: position.to_string(),
            }),
        }
    }
}

/// Join sequence items in source order. A string passes through and null
/// joins to the empty string.
fn join(node: &Node, separator: &str, position: &str) -> Result<String> {
    match node {
        Node::Sequence(sequence) => sequence
            .values()
            .map(|item| {
                item.as_scalar()
                    .map(Scalar::to_text)
                    .ok_or_else(|| type_error(Function::Join, position, "list items must be scalars"))
            })
            .collect::<Result<Vec<_>>>()
            .map(|parts| parts.join(separator)),
        Node::Scalar(Scalar::Null) => Ok(String::new()),
        Node::Scalar(scalar) => Ok(scalar.to_text()),
        Node::Mapping(_) => Err(type_error(Function::Join, position, "cannot join a map")),
    }
}

fn type_error(function: Function, position: &str, message: &str) -> Error {
    Error::TypeError {
        function: function.name().to_string(),
        position: position.to_string(),
        message: message.to_string(),
    }
}
