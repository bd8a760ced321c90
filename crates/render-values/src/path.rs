//! Path parsing and traversal utilities
//!
//! Paths address nodes inside a tree with dot-separated keys and array
//! indexing.
//!
//! # Path Syntax
//!
//! - Dot-separated keys: `antrea.config.serviceCIDR`
//! - Array indexing: `containers[0].name`
//!
//! # Examples
//!
//! ```
//! use render_values::path::{parse_path, PathSegment, get_at_path};
//! use render_values::{parse_documents, Node};
//!
//! let path = parse_path("spec.containers[0].name");
//! assert_eq!(path, vec![
//!     PathSegment::Key("spec".to_string()),
//!     PathSegment::Key("containers".to_string()),
//!     PathSegment::Index(0),
//!     PathSegment::Key("name".to_string()),
//! ]);
//!
//! let set = parse_documents("pod.yaml", "spec:\n  containers:\n  - name: agent\n").unwrap();
//! assert_eq!(
//!     get_at_path(&set.documents[0].root, &path).and_then(Node::as_str),
//!     Some("agent")
//! );
//! ```

use crate::node::Node;
use std::fmt;

/// A segment of a path - either a key or an array index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A key in a mapping (e.g., "config" in "antrea.config")
    Key(String),
    /// An index in a sequence (e.g., 0 in `containers[0]`)
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Render segments back into `a.b[0].c` form.
pub fn format_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

/// Parse a path string into segments.
///
/// An index that is not a valid number is dropped.
///
/// # Examples
///
/// ```
/// use render_values::path::{parse_path, PathSegment};
///
/// let path = parse_path("metadata.name");
/// assert_eq!(path, vec![
///     PathSegment::Key("metadata".to_string()),
///     PathSegment::Key("name".to_string()),
/// ]);
/// ```
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                let mut index_str = String::new();
                for ch in chars.by_ref() {
                    if ch == ']' {
                        break;
                    }
                    index_str.push(ch);
                }
                if let Ok(index) = index_str.parse::<usize>() {
                    segments.push(PathSegment::Index(index));
                }
            }
            _ => current_key.push(ch),
        }
    }

    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    }

    segments
}

/// Get the node at the given path.
///
/// Returns `None` if any segment is missing or addresses the wrong kind of
/// node.
pub fn get_at_path<'a>(node: &'a Node, segments: &[PathSegment]) -> Option<&'a Node> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(node);
    };

    let next = match first {
        PathSegment::Key(key) => node.as_mapping()?.get(key)?,
        PathSegment::Index(idx) => &node.as_sequence()?.items.get(*idx)?.value,
    };

    get_at_path(next, rest)
}

/// Build the nested mapping `{a: {b: value}}` for path `a.b`.
///
/// Index segments are not meaningful here and are skipped.
pub fn nest_at_path(segments: &[PathSegment], value: Node) -> Node {
    segments.iter().rev().fold(value, |acc, segment| match segment {
        PathSegment::Key(key) => {
            let mut mapping = crate::node::Mapping::new();
            mapping.insert(key.clone(), acc);
            Node::Mapping(mapping)
        }
        PathSegment::Index(_) => acc,
    })
}
