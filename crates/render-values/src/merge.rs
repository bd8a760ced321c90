//! Data-values merge
//!
//! Overrides are folded into the defaults tree one document at a time.
//! Mappings merge key by key; everything else replaces the default subtree.
//! Whether an override may introduce a key the defaults do not declare is
//! governed by the [`MergePolicy`] in scope.

use crate::error::{Error, Result};
use crate::meta::Meta;
use crate::node::{Document, Entry, Mapping, Node, NodeKind, Scalar};

const MATCH_CHILD_DEFAULTS: &str = "overlay/match-child-defaults";
const MATCH: &str = "overlay/match";

/// Whether override keys must already exist in the defaults tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Every override key must exist in the defaults.
    #[default]
    StrictMatch,
    /// Policy declared by `#@overlay/match-child-defaults`.
    MatchChildDefaults { missing_ok: bool },
}

impl MergePolicy {
    pub fn allows_missing(self) -> bool {
        matches!(self, Self::MatchChildDefaults { missing_ok: true })
    }

    /// Policy for the children of a node: its own
    /// `#@overlay/match-child-defaults` if present, otherwise `inherited`.
    pub fn for_children(meta: &Meta, inherited: Self) -> Self {
        meta.annotation(MATCH_CHILD_DEFAULTS)
            .map_or(inherited, |a| Self::MatchChildDefaults {
                missing_ok: a.flag("missing_ok").unwrap_or(false),
            })
    }
}

/// Merge `overrides` into `defaults`.
///
/// # Errors
///
/// - [`Error::UnknownField`] when an override key is absent from the
///   defaults and the policy in scope does not allow missing keys.
/// - [`Error::TypeMismatch`] when a non-null map or array would be replaced
///   by a different kind of non-null value (or vice versa).
pub fn merge(defaults: Node, overrides: &Node, policy: MergePolicy) -> Result<Node> {
    match (defaults, overrides) {
        (Node::Mapping(base), Node::Mapping(over)) => merge_mapping(base, over, policy).map(Node::Mapping),
        (_, over) => Ok(over.clone()),
    }
}

fn merge_mapping(mut base: Mapping, over: &Mapping, policy: MergePolicy) -> Result<Mapping> {
    for entry in over {
        let child_policy = MergePolicy::for_children(&entry.meta, policy);

        match base.entry_mut(&entry.key) {
            Some(existing) => {
                check_shape(&existing.value, entry)?;
                let current = std::mem::take(&mut existing.value);
                existing.value = merge(current, &entry.value, child_policy)?;
            }
            None if policy.allows_missing() || key_missing_ok(&entry.meta) => {
                tracing::trace!(key = %entry.key, "Adding data value absent from defaults");
                base.insert_entry(entry.clone());
            }
            None => {
                return Err(Error::UnknownField {
                    key: entry.key.clone(),
                    position: entry.meta.describe_position(),
                });
            }
        }
    }
    Ok(base)
}

/// `#@overlay/match missing_ok=True` on the entry itself.
fn key_missing_ok(meta: &Meta) -> bool {
    meta.annotation(MATCH)
        .and_then(|a| a.flag("missing_ok"))
        .unwrap_or(false)
}

fn check_shape(existing: &Node, entry: &Entry) -> Result<()> {
    let (expected, actual) = (existing.kind(), entry.value.kind());
    let structural = |k: NodeKind| matches!(k, NodeKind::Mapping | NodeKind::Sequence);

    if expected == NodeKind::Null || actual == NodeKind::Null || expected == actual {
        return Ok(());
    }
    if structural(expected) || structural(actual) {
        return Err(Error::TypeMismatch {
            key: entry.key.clone(),
            position: entry.meta.describe_position(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Fold data-values documents in order. The first document is the defaults
/// tree; each later one is merged with the policy its own annotations
/// declare, or `default_policy` when it declares none.
pub fn merge_data_values<'a, I>(documents: I, default_policy: MergePolicy) -> Result<Node>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut tree: Option<Node> = None;

    for document in documents {
        let root = match &document.root {
            Node::Scalar(Scalar::Null) => continue,
            Node::Mapping(_) => &document.root,
            other => {
                return Err(Error::NotAMapping {
                    position: document.meta.describe_position(),
                    actual: other.kind(),
                });
            }
        };

        tree = Some(match tree {
            None => root.clone(),
            Some(current) => {
                let policy = MergePolicy::for_children(&document.meta, default_policy);
                tracing::debug!(
                    position = %document.meta.describe_position(),
                    ?policy,
                    "Merging data values document"
                );
                merge(current, root, policy)?
            }
        });
    }

    Ok(tree.unwrap_or_else(|| Node::Mapping(Mapping::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_documents;
    use pretty_assertions::assert_eq;

    fn docs(origin: &str, text: &str) -> Vec<Document> {
        parse_documents(origin, text).unwrap().documents
    }

    #[test]
    fn test_policy_from_annotation() {
        let d = docs("o.yaml", "#@overlay/match-child-defaults missing_ok=True\n---\na: 1\n");
        assert_eq!(
            MergePolicy::for_children(&d[0].meta, MergePolicy::StrictMatch),
            MergePolicy::MatchChildDefaults { missing_ok: true }
        );
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let base = docs("d.yaml", "list: [a, b, c]\n").remove(0).root;
        let over = docs("o.yaml", "list: [z]\n").remove(0).root;
        let merged = merge(base, &over, MergePolicy::StrictMatch).unwrap();
        assert_eq!(merged.get("list").and_then(Node::as_sequence).map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_entry_level_missing_ok() {
        let base = docs("d.yaml", "a: 1\n").remove(0).root;
        let over = docs("o.yaml", "#@overlay/match missing_ok=True\nb: 2\n").remove(0).root;
        let merged = merge(base, &over, MergePolicy::StrictMatch).unwrap();
        assert_eq!(merged.as_mapping().unwrap().keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_field_message() {
        let base = docs("values.yaml", "a: 1\n").remove(0).root;
        let over = docs("stdin.yml", "a: 2\nnope: 3\n").remove(0).root;
        let err = merge(base, &over, MergePolicy::StrictMatch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Map item (key 'nope') on line stdin.yml:2: Expected number of matched nodes to be 1, but was 0 (unknown field)"
        );
    }

    #[test]
    fn test_null_may_replace_a_map() {
        let base = docs("d.yaml", "a:\n  b: 1\n").remove(0).root;
        let over = docs("o.yaml", "a:\n").remove(0).root;
        let merged = merge(base, &over, MergePolicy::StrictMatch).unwrap();
        assert_eq!(merged.get("a"), Some(&Node::NULL));
    }
}
