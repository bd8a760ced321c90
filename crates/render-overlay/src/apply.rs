//! Apply compiled overlay rules to base documents
//!
//! Rules run strictly in order. Each selector on a rule's path is resolved
//! against the current tree and its match count checked before anything is
//! written, so a failing rule leaves the node it targets untouched.

use crate::error::{Error, Result};
use crate::rule::{Expects, Matcher, Operation, OverlayRule, Selector, Template};
use render_values::{Document, Entry, Item, Mapping, Node, NodeKind, Sequence};

/// Apply `rules` to `documents`, returning the edited document list.
///
/// # Errors
///
/// - [`Error::Structural`] when a selector matches a number of nodes its
///   [`Expects`] does not allow.
/// - [`Error::Shape`] when a path step meets a node it cannot select from.
/// - [`Error::AlreadyExists`] when a non-idempotent insert meets an existing key.
pub fn apply_overlay(mut documents: Vec<Document>, rules: &[OverlayRule]) -> Result<Vec<Document>> {
    for rule in rules {
        apply_rule(&mut documents, rule)?;
    }
    Ok(documents)
}

fn apply_rule(documents: &mut Vec<Document>, rule: &OverlayRule) -> Result<()> {
    tracing::debug!(
        operation = rule.operation.name(),
        origin = %rule.describe_origin(),
        documents = %rule.documents.matcher,
        depth = rule.path.len(),
        "Applying overlay rule"
    );

    if rule.path.is_empty() {
        if let Operation::Insert {
            template,
            idempotent,
        } = &rule.operation
        {
            if *idempotent && documents.iter().any(|d| d.root == template.value) {
                return Ok(());
            }
            documents.push(Document {
                meta: template.meta.clone(),
                root: template.value.clone(),
            });
            return Ok(());
        }
    }

    let matched: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(idx, doc)| document_matches(&rule.documents.matcher, *idx, doc))
        .map(|(idx, _)| idx)
        .collect();
    check(
        &rule.documents,
        || format!("Document ({})", rule.documents.matcher),
        matched.len(),
        rule,
    )?;

    if !rule.path.is_empty() {
        for idx in matched {
            apply_path(&mut documents[idx].root, &rule.path, rule)?;
        }
        return Ok(());
    }

    match &rule.operation {
        Operation::Delete => {
            for idx in matched.into_iter().rev() {
                documents.remove(idx);
            }
        }
        Operation::Replace(template) => {
            for idx in matched {
                documents[idx].root = template.value.clone();
            }
        }
        Operation::Append(template) => {
            let step = Selector::new(Matcher::all(), Expects::Any);
            for idx in matched {
                ensure_sequence(&mut documents[idx].root, &step, rule)?.items.push(item(template));
            }
        }
        // Document inserts returned above
        Operation::Insert { .. } => {}
    }
    Ok(())
}

fn document_matches(matcher: &Matcher, idx: usize, document: &Document) -> bool {
    match matcher {
        Matcher::ByIndex(i) => *i == idx,
        Matcher::ByKey(key) => document.root.get(key).is_some(),
        Matcher::ByFieldValue(_) => matcher.matches_fields(&document.root),
    }
}

fn apply_path(node: &mut Node, steps: &[Selector], rule: &OverlayRule) -> Result<()> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return apply_final(node, step, rule);
    }

    let matched = resolve(node, step, rule)?;
    check(step, || step.describe(), matched.len(), rule)?;
    for idx in matched {
        if let Some(child) = child_mut(node, idx) {
            apply_path(child, rest, rule)?;
        }
    }
    Ok(())
}

fn apply_final(node: &mut Node, step: &Selector, rule: &OverlayRule) -> Result<()> {
    match &rule.operation {
        Operation::Insert {
            template,
            idempotent,
        } => insert(node, step, template, *idempotent, rule),

        Operation::Replace(template) => {
            let matched = resolve(node, step, rule)?;
            check(step, || step.describe(), matched.len(), rule)?;

            if matched.is_empty() && step.expects.allows(0) {
                tracing::trace!(selector = %step.describe(), "Nothing matched, adding node");
                return upsert(node, step, template, rule);
            }
            for idx in matched {
                replace_at(node, idx, template);
            }
            Ok(())
        }

        Operation::Append(template) => {
            let matched = resolve(node, step, rule)?;
            check(step, || step.describe(), matched.len(), rule)?;
            for idx in matched {
                if let Some(child) = child_mut(node, idx) {
                    ensure_sequence(child, step, rule)?.items.push(item(template));
                }
            }
            Ok(())
        }

        Operation::Delete => {
            let matched = resolve(node, step, rule)?;
            check(step, || step.describe(), matched.len(), rule)?;
            for idx in matched.into_iter().rev() {
                match &mut *node {
                    Node::Mapping(map) => {
                        map.remove_index(idx);
                    }
                    Node::Sequence(seq) => {
                        seq.items.remove(idx);
                    }
                    Node::Scalar(_) => {}
                }
            }
            Ok(())
        }
    }
}

/// Indices into `node`'s entries or items that `selector` picks out.
fn resolve(node: &Node, selector: &Selector, rule: &OverlayRule) -> Result<Vec<usize>> {
    match (&selector.matcher, node) {
        (_, n) if n.is_null() => Ok(Vec::new()),
        (Matcher::ByKey(key), Node::Mapping(map)) => Ok(map.position(key).into_iter().collect()),
        (Matcher::ByKey(_), other) => Err(shape(selector, rule, NodeKind::Mapping, other.kind())),
        (Matcher::ByIndex(idx), Node::Sequence(seq)) => {
            Ok(if *idx < seq.len() { vec![*idx] } else { Vec::new() })
        }
        (Matcher::ByFieldValue(_), Node::Sequence(seq)) => Ok(seq
            .items
            .iter()
            .enumerate()
            .filter(|(_, candidate)| selector.matcher.matches_fields(&candidate.value))
            .map(|(idx, _)| idx)
            .collect()),
        (_, other) => Err(shape(selector, rule, NodeKind::Sequence, other.kind())),
    }
}

fn child_mut(node: &mut Node, idx: usize) -> Option<&mut Node> {
    match node {
        Node::Mapping(map) => map.get_index_mut(idx).map(|e| &mut e.value),
        Node::Sequence(seq) => seq.items.get_mut(idx).map(|i| &mut i.value),
        Node::Scalar(_) => None,
    }
}

fn replace_at(node: &mut Node, idx: usize, template: &Template) {
    match node {
        Node::Mapping(map) => {
            if let Some(entry) = map.get_index_mut(idx) {
                entry.value = template.value.clone();
                entry.meta = template.meta.clone();
            }
        }
        Node::Sequence(seq) => {
            if let Some(slot) = seq.items.get_mut(idx) {
                *slot = item(template);
            }
        }
        Node::Scalar(_) => {}
    }
}

fn upsert(node: &mut Node, step: &Selector, template: &Template, rule: &OverlayRule) -> Result<()> {
    match &step.matcher {
        Matcher::ByKey(key) => {
            ensure_mapping(node, step, rule)?.insert_entry(entry(key, template));
        }
        _ => ensure_sequence(node, step, rule)?.items.push(item(template)),
    }
    Ok(())
}

fn insert(
    node: &mut Node,
    step: &Selector,
    template: &Template,
    idempotent: bool,
    rule: &OverlayRule,
) -> Result<()> {
    match &step.matcher {
        Matcher::ByKey(key) => {
            let map = ensure_mapping(node, step, rule)?;
            if map.contains_key(key) {
                if idempotent {
                    tracing::trace!(key = %key, "Key already present, skipping insert");
                    return Ok(());
                }
                return Err(Error::AlreadyExists {
                    target: step.describe(),
                    position: position_of(step, rule),
                });
            }
            map.insert_entry(entry(key, template));
        }
        Matcher::ByIndex(idx) => {
            let seq = ensure_sequence(node, step, rule)?;
            if idempotent && seq.items.iter().any(|i| i.value == template.value) {
                return Ok(());
            }
            if *idx > seq.len() {
                return Err(Error::Structural {
                    target: step.describe(),
                    position: position_of(step, rule),
                    expected: step.expects,
                    actual: 0,
                });
            }
            seq.items.insert(*idx, item(template));
        }
        Matcher::ByFieldValue(_) => {
            let matched = resolve(node, step, rule)?;
            check(step, || step.describe(), matched.len(), rule)?;
            let seq = ensure_sequence(node, step, rule)?;
            if idempotent && seq.items.iter().any(|i| i.value == template.value) {
                return Ok(());
            }
            for idx in matched.into_iter().rev() {
                seq.items.insert(idx, item(template));
            }
        }
    }
    Ok(())
}

fn ensure_mapping<'a>(
    node: &'a mut Node,
    step: &Selector,
    rule: &OverlayRule,
) -> Result<&'a mut Mapping> {
    if node.is_null() {
        *node = Node::Mapping(Mapping::new());
    }
    let actual = node.kind();
    node.as_mapping_mut()
        .ok_or_else(|| shape(step, rule, NodeKind::Mapping, actual))
}

fn ensure_sequence<'a>(
    node: &'a mut Node,
    step: &Selector,
    rule: &OverlayRule,
) -> Result<&'a mut Sequence> {
    if node.is_null() {
        *node = Node::Sequence(Sequence::new());
    }
    let actual = node.kind();
    node.as_sequence_mut()
        .ok_or_else(|| shape(step, rule, NodeKind::Sequence, actual))
}

fn entry(key: &str, template: &Template) -> Entry {
    Entry {
        key: key.to_string(),
        value: template.value.clone(),
        meta: template.meta.clone(),
    }
}

fn item(template: &Template) -> Item {
    Item {
        value: template.value.clone(),
        meta: template.meta.clone(),
    }
}

fn check(
    selector: &Selector,
    target: impl FnOnce() -> String,
    actual: usize,
    rule: &OverlayRule,
) -> Result<()> {
    if selector.expects.allows(actual) {
        return Ok(());
    }
    Err(Error::Structural {
        target: target(),
        position: position_of(selector, rule),
        expected: selector.expects,
        actual,
    })
}

/// The selector's own line, or the rule's when the selector was synthesized.
fn position_of(selector: &Selector, rule: &OverlayRule) -> String {
    selector
        .position
        .as_ref()
        .map_or_else(|| rule.describe_origin(), ToString::to_string)
}

fn shape(step: &Selector, rule: &OverlayRule, expected: NodeKind, actual: NodeKind) -> Error {
    Error::Shape {
        target: step.describe(),
        position: position_of(step, rule),
        expected,
        actual,
    }
}
