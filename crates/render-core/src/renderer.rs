//! Rendering patched documents into output text

use crate::error::Result;
use crate::evaluator::Evaluator;
use render_values::{Document, Node};

/// Document separator line written before every rendered document.
pub const SEPARATOR: &str = "---";

/// One rendered output document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub kind: Option<String>,
    pub name: Option<String>,
    /// Scalar `data` entries in document order, as text.
    pub payload: Vec<(String, String)>,
    /// The full rendered tree, meta stripped.
    pub tree: Node,
}

impl RenderedDocument {
    pub fn from_tree(tree: Node) -> Self {
        let text = |node: Option<&Node>| node.and_then(Node::as_scalar).map(|s| s.to_text());
        let kind = text(tree.get("kind"));
        let name = text(tree.get("metadata").and_then(|m| m.get("name")));
        let payload = tree
            .get("data")
            .and_then(Node::as_mapping)
            .map(|data| {
                data.iter()
                    .filter_map(|e| Some((e.key.clone(), e.value.as_scalar()?.to_text())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            kind,
            name,
            payload,
            tree,
        }
    }

    /// Value of one `data` entry.
    pub fn payload_value(&self, key: &str) -> Option<&str> {
        self.payload
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialized form, prefixed with the separator line.
    pub fn to_text(&self) -> Result<String> {
        Ok(format!("{SEPARATOR}\n{}", self.tree.to_yaml()?))
    }
}

/// Substitute value expressions in every document, keeping document order.
pub fn render(documents: &[Document], evaluator: &mut Evaluator) -> Result<Vec<RenderedDocument>> {
    documents
        .iter()
        .map(|document| {
            let tree = evaluator.resolve_document(document)?;
            let rendered = RenderedDocument::from_tree(tree);
            tracing::trace!(
                kind = rendered.kind.as_deref().unwrap_or("-"),
                name = rendered.name.as_deref().unwrap_or("-"),
                "Rendered document"
            );
            Ok(rendered)
        })
        .collect()
}

/// Concatenate rendered documents into the output stream.
pub fn to_text(documents: &[RenderedDocument]) -> Result<String> {
    let mut out = String::new();
    for document in documents {
        out.push_str(&document.to_text()?);
    }
    Ok(out)
}
