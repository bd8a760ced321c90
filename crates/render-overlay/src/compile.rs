//! Compile annotated overlay documents into [`OverlayRule`]s
//!
//! The document-level `#@overlay/match` picks target documents. The body is
//! walked depth first; each entry or item becomes one rule, in source order:
//!
//! | annotation             | map item                      | array item                  |
//! |------------------------|-------------------------------|-----------------------------|
//! | none, map value        | descend                       | append                      |
//! | none, scalar value     | replace                       | append                      |
//! | `overlay/replace`      | replace                       | replace matched items       |
//! | `overlay/remove`       | delete                        | delete matched items        |
//! | `overlay/insert`       | insert new key                | insert before matched items |
//! | `overlay/append`       | error                         | append                      |
//!
//! `#@overlay/match missing_ok=True` on a map item relaxes its cardinality to
//! "0 or 1"; descending into such an item first inserts an empty map, and
//! every map item below it defaults to "0 or 1" as well, so a missing subtree
//! is built up key by key. `#@overlay/match-child-defaults missing_ok=True`
//! sets that default for the children of a document or map item.

use crate::error::{Error, Result};
use crate::rule::{Expects, Matcher, Operation, OverlayRule, Selector, Template};
use render_values::path::parse_path;
use render_values::{Annotation, Document, Entry, Item, Mapping, Meta, Node};

const MATCH: &str = "overlay/match";
const REPLACE: &str = "overlay/replace";
const REMOVE: &str = "overlay/remove";
const INSERT: &str = "overlay/insert";
const APPEND: &str = "overlay/append";
const MATCH_CHILD_DEFAULTS: &str = "overlay/match-child-defaults";

/// Whether a document carries overlay annotations at document level.
pub fn is_overlay_document(document: &Document) -> bool {
    document
        .meta
        .annotations
        .iter()
        .any(|a| matches!(a.name.as_str(), MATCH | REPLACE | REMOVE | INSERT))
}

/// Compile every overlay document, keeping document order.
pub fn compile_overlays<'a, I>(documents: I) -> Result<Vec<OverlayRule>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut rules = Vec::new();
    for document in documents {
        rules.extend(compile_document(document)?);
    }
    Ok(rules)
}

pub fn compile_document(document: &Document) -> Result<Vec<OverlayRule>> {
    let meta = &document.meta;
    let operation = edit_annotation(meta)?;

    if let Some(insert) = operation.filter(|a| a.name == INSERT) {
        return Ok(vec![OverlayRule {
            documents: Selector::new(Matcher::all(), Expects::Any),
            path: Vec::new(),
            operation: Operation::Insert {
                template: Template::new(&document.root, meta),
                idempotent: insert.flag("idempotent").unwrap_or(false),
            },
            origin: meta.position.clone(),
        }]);
    }

    let documents = match meta.annotation(MATCH) {
        Some(annotation) => item_selector(annotation)?.at(meta.position.clone()),
        None => {
            return Err(Error::MissingMatcher {
                position: meta.describe_position(),
            });
        }
    };

    let mut compiler = Compiler {
        documents,
        rules: Vec::new(),
    };

    match operation.map(|a| a.name.as_str()) {
        Some(REMOVE) => compiler.push(Vec::new(), Operation::Delete, meta),
        Some(REPLACE) => compiler.push(
            Vec::new(),
            Operation::Replace(Template::new(&document.root, meta)),
            meta,
        ),
        _ => compiler.body(&document.root, meta)?,
    }

    tracing::trace!(
        position = %meta.describe_position(),
        rules = compiler.rules.len(),
        "Compiled overlay document"
    );
    Ok(compiler.rules)
}

struct Compiler {
    documents: Selector,
    rules: Vec<OverlayRule>,
}

impl Compiler {
    fn push(&mut self, path: Vec<Selector>, operation: Operation, meta: &Meta) {
        self.rules.push(OverlayRule {
            documents: self.documents.clone(),
            path,
            operation,
            origin: meta.position.clone(),
        });
    }

    fn body(&mut self, root: &Node, meta: &Meta) -> Result<()> {
        match root {
            Node::Mapping(mapping) => self.mapping(mapping, &[], child_default(meta, Expects::ONE)),
            Node::Sequence(sequence) => self.items(&sequence.items, &[]),
            Node::Scalar(_) if root.is_null() => Ok(()),
            Node::Scalar(_) => {
                self.push(Vec::new(), Operation::Replace(Template::new(root, meta)), meta);
                Ok(())
            }
        }
    }

    /// `default` is the cardinality of map items that declare none.
    fn mapping(&mut self, mapping: &Mapping, parent: &[Selector], default: Expects) -> Result<()> {
        for entry in mapping {
            self.entry(entry, parent, default)?;
        }
        Ok(())
    }

    fn entry(&mut self, entry: &Entry, parent: &[Selector], default: Expects) -> Result<()> {
        let meta = &entry.meta;
        let expects = match meta.annotation(MATCH) {
            Some(annotation) => expects_of(annotation)?.unwrap_or(default),
            None => default,
        };
        let selector =
            Selector::new(Matcher::ByKey(entry.key.clone()), expects).at(meta.position.clone());
        let path = extend(parent, selector.clone());
        let template = || Template::new(&entry.value, meta);

        match edit_annotation(meta)?.map(|a| (a.name.as_str(), a)) {
            Some((REMOVE, _)) => self.push(path, Operation::Delete, meta),
            Some((REPLACE, _)) => self.push(path, Operation::Replace(template()), meta),
            Some((INSERT, annotation)) => {
                let operation = Operation::Insert {
                    template: template(),
                    idempotent: annotation.flag("idempotent").unwrap_or(false),
                };
                self.push(path, operation, meta);
            }
            Some((_, annotation)) => {
                return Err(invalid(annotation, "only array items can be appended"));
            }
            None => match &entry.value {
                Node::Mapping(children) => {
                    let inherited = if expects == Expects::AtMostOne { expects } else { default };
                    let descend = if expects == Expects::AtMostOne {
                        let empty = Template::new(&Node::Mapping(Mapping::new()), meta);
                        self.push(
                            path,
                            Operation::Insert {
                                template: empty,
                                idempotent: true,
                            },
                            meta,
                        );
                        extend(parent, Selector { expects: Expects::ONE, ..selector })
                    } else {
                        path
                    };
                    self.mapping(children, &descend, child_default(meta, inherited))?;
                }
                Node::Sequence(sequence) => self.items(&sequence.items, &path)?,
                Node::Scalar(_) => self.push(path, Operation::Replace(template()), meta),
            },
        }
        Ok(())
    }

    /// `parent` resolves to the array these items edit.
    fn items(&mut self, items: &[Item], parent: &[Selector]) -> Result<()> {
        for item in items {
            let meta = &item.meta;
            let operation = edit_annotation(meta)?;
            let template = || Template::new(&item.value, meta);

            let Some(annotation) = meta.annotation(MATCH) else {
                match operation.map(|a| a.name.as_str()) {
                    None | Some(APPEND) => {
                        self.push(parent.to_vec(), Operation::Append(template()), meta);
                        continue;
                    }
                    Some(name) => {
                        return Err(Error::InvalidAnnotation {
                            annotation: name.to_string(),
                            position: meta.describe_position(),
                            reason: "array item requires #@overlay/match".into(),
                        });
                    }
                }
            };

            let selector = item_selector(annotation)?.at(meta.position.clone());
            let path = extend(parent, selector);
            match operation.map(|a| (a.name.as_str(), a)) {
                Some((REMOVE, _)) => self.push(path, Operation::Delete, meta),
                Some((REPLACE, _)) => self.push(path, Operation::Replace(template()), meta),
                Some((INSERT, annotation)) => {
                    let operation = Operation::Insert {
                        template: template(),
                        idempotent: annotation.flag("idempotent").unwrap_or(false),
                    };
                    self.push(path, operation, meta);
                }
                Some((_, annotation)) => {
                    return Err(invalid(annotation, "matched array items cannot be appended"));
                }
                None => match &item.value {
                    Node::Mapping(children) => {
                        self.mapping(children, &path, child_default(meta, Expects::ONE))?
                    }
                    _ => self.push(path, Operation::Replace(template()), meta),
                },
            }
        }
        Ok(())
    }
}

fn extend(parent: &[Selector], selector: Selector) -> Vec<Selector> {
    let mut path = parent.to_vec();
    path.push(selector);
    path
}

/// The single editing annotation on a node, if any.
fn edit_annotation(meta: &Meta) -> Result<Option<&Annotation>> {
    let mut edits = meta
        .annotations
        .iter()
        .filter(|a| matches!(a.name.as_str(), REPLACE | REMOVE | INSERT | APPEND));
    let first = edits.next();
    if let Some(second) = edits.next() {
        return Err(invalid(second, "conflicts with another overlay edit on the same node"));
    }
    Ok(first)
}

/// Cardinality declared by `expects=` or `missing_ok=`, if any.
fn expects_of(annotation: &Annotation) -> Result<Option<Expects>> {
    if let Some(text) = annotation.kwarg("expects") {
        return Expects::parse(text)
            .map(Some)
            .ok_or_else(|| invalid(annotation, &format!("unsupported expects value '{text}'")));
    }
    Ok(match annotation.flag("missing_ok") {
        Some(true) => Some(Expects::AtMostOne),
        Some(false) => Some(Expects::ONE),
        None => None,
    })
}

/// Default cardinality for the map items under a node.
fn child_default(meta: &Meta, inherited: Expects) -> Expects {
    match meta.annotation(MATCH_CHILD_DEFAULTS).and_then(|a| a.flag("missing_ok")) {
        Some(true) => Expects::AtMostOne,
        Some(false) => Expects::ONE,
        None => inherited,
    }
}

/// `by.<path>=value` conditions, or `index=N`.
fn item_selector(annotation: &Annotation) -> Result<Selector> {
    let expects = expects_of(annotation)?.unwrap_or(Expects::ONE);

    if let Some(index) = annotation.kwarg("index") {
        let index = index
            .parse()
            .map_err(|_| invalid(annotation, &format!("index '{index}' is not a number")))?;
        return Ok(Selector::new(Matcher::ByIndex(index), expects));
    }

    let conditions: Vec<_> = annotation
        .kwargs
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix("by.")
                .map(|path| (parse_path(path), value.clone()))
        })
        .collect();

    if conditions.is_empty() && annotation.flag("all") != Some(true) {
        return Err(invalid(annotation, "expected by.<field>=<value>, index=N or all=True"));
    }
    Ok(Selector::new(Matcher::ByFieldValue(conditions), expects))
}

fn invalid(annotation: &Annotation, reason: &str) -> Error {
    Error::InvalidAnnotation {
        annotation: annotation.name.clone(),
        position: annotation.position.to_string(),
        reason: reason.to_string(),
    }
}
