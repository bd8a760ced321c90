//! The template/data tree

use crate::meta::Meta;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text form used when a scalar is compared with or joined into a string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// A mapping entry. Keys are unique within a [`Mapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Node,
    pub meta: Meta,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Node) -> Self {
        Self {
            key: key.into(),
            value,
            meta: Meta::default(),
        }
    }
}

/// A sequence item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub value: Node,
    pub meta: Meta,
}

impl Item {
    pub fn new(value: Node) -> Self {
        Self {
            value,
            meta: Meta::default(),
        }
    }
}

/// Insertion-ordered association list.
///
/// Serialization order is the order entries were inserted, so output is
/// deterministic without sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<Entry>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    /// Insert or update. An existing key keeps its place in the order.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        self.insert_entry(Entry::new(key, value))
    }

    /// Insert a full entry (with meta). Returns the displaced value if any.
    pub fn insert_entry(&mut self, entry: Entry) -> Option<Node> {
        match self.entry_mut(&entry.key) {
            Some(existing) => {
                existing.meta = entry.meta;
                Some(std::mem::replace(&mut existing.value, entry.value))
            }
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn get_index(&self, idx: usize) -> Option<&Entry> {
        self.entries.get(idx)
    }

    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut Entry> {
        self.entries.get_mut(idx)
    }

    /// Remove by position. Panics if `idx` is out of bounds, like `Vec::remove`.
    pub fn remove_index(&mut self, idx: usize) -> Entry {
        self.entries.remove(idx)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx))
    }

    pub fn retain(&mut self, f: impl FnMut(&Entry) -> bool) {
        self.entries.retain(f);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.entries.iter_mut()
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (String, Node)>>(iter: T) -> Self {
        let mut mapping = Self::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Ordered list of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub items: Vec<Item>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: Node) {
        self.items.push(Item::new(value));
    }

    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|i| &i.value)
    }
}

impl FromIterator<Node> for Sequence {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().map(Item::new).collect(),
        }
    }
}

/// Structural kind of a node, used in shape errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Scalar,
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Scalar => "scalar",
            Self::Sequence => "array",
            Self::Mapping => "map",
        })
    }
}

/// Tagged union over every value a template or data-values tree can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Sequence),
    Mapping(Mapping),
}

impl Node {
    pub const NULL: Node = Node::Scalar(Scalar::Null);

    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn bool(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Scalar(Scalar::Null) => NodeKind::Null,
            Self::Scalar(_) => NodeKind::Scalar,
            Self::Sequence(_) => NodeKind::Sequence,
            Self::Mapping(_) => NodeKind::Mapping,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Shorthand for `self.as_mapping()?.get(key)`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?.get(key)
    }

    /// Drop all template metadata, recursively.
    pub fn strip_meta(&mut self) {
        match self {
            Self::Scalar(_) => {}
            Self::Sequence(seq) => {
                for item in &mut seq.items {
                    item.meta = Meta::default();
                    item.value.strip_meta();
                }
            }
            Self::Mapping(map) => {
                for entry in map.iter_mut() {
                    entry.meta = Meta::default();
                    entry.value.strip_meta();
                }
            }
        }
    }

    /// Serialize as a YAML stream body (no leading `---`).
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| crate::Error::Serialize(e.to_string()))
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<Sequence> for Node {
    fn from(s: Sequence) -> Self {
        Self::Sequence(s)
    }
}

impl From<Scalar> for Node {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => Self::NULL,
            Value::Bool(b) => Self::bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Scalar(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Self::Scalar(Scalar::Float(f))
                } else {
                    Self::string(n.to_string())
                }
            }
            Value::String(s) => Self::string(s),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (key_text(k), Node::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

fn key_text(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => Node::from(other)
            .as_scalar()
            .map(Scalar::to_text)
            .unwrap_or_default(),
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => s.serialize(serializer),
            Self::Sequence(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for value in seq.values() {
                    out.serialize_element(value)?;
                }
                out.end()
            }
            Self::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for entry in map {
                    out.serialize_entry(&entry.key, &entry.value)?;
                }
                out.end()
            }
        }
    }
}

/// One YAML document of a template source.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub meta: Meta,
    pub root: Node,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            meta: Meta::default(),
            root,
        }
    }
}

/// All documents parsed from one source, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    pub origin: String,
    pub documents: Vec<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mapping_preserves_insertion_order() {
        let mut map = Mapping::new();
        map.insert("zeta", Node::from(1_i64));
        map.insert("alpha", Node::from(2_i64));
        map.insert("zeta", Node::from(3_i64));

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(map.get("zeta"), Some(&Node::from(3_i64)));
    }

    #[test]
    fn test_serialize_in_insertion_order() {
        let map: Mapping = [
            ("trafficEncapMode".to_string(), Node::from("encap")),
            ("noSNAT".to_string(), Node::from(false)),
            ("egress".to_string(), Node::NULL),
        ]
        .into_iter()
        .collect();

        let yaml = Node::Mapping(map).to_yaml().unwrap();
        assert_eq!(yaml, "trafficEncapMode: encap\nnoSNAT: false\negress: null\n");
    }

    #[test]
    fn test_from_yaml_value() {
        let value: serde_yaml::Value = serde_yaml::from_str("{a: [1, true], b: null}").unwrap();
        let node = Node::from(value);
        assert_eq!(node.get("b"), Some(&Node::NULL));
        assert_eq!(node.get("a").and_then(Node::as_sequence).map(Sequence::len), Some(2));
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(Node::NULL.kind(), NodeKind::Null);
        assert_eq!(Node::from("x").kind(), NodeKind::Scalar);
        assert_eq!(Node::Mapping(Mapping::new()).kind(), NodeKind::Mapping);
    }
}
