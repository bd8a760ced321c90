//! Overlay rule model

use render_values::path::{PathSegment, format_path};
use render_values::{Meta, Node, Position, Scalar};
use std::fmt;

/// How many nodes a selector is required to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expects {
    Exactly(usize),
    /// `missing_ok=True`
    AtMostOne,
    /// `expects="1+"`
    AtLeastOne,
    /// `expects="0+"`
    #[default]
    Any,
}

impl Expects {
    pub const ONE: Expects = Expects::Exactly(1);

    pub fn allows(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtMostOne => count <= 1,
            Self::AtLeastOne => count >= 1,
            Self::Any => true,
        }
    }

    /// Parse the value of an `expects=` keyword: `N`, `N+` or `0..1`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "0+" => Some(Self::Any),
            "1+" => Some(Self::AtLeastOne),
            "0..1" | "0-1" => Some(Self::AtMostOne),
            other => other.parse().ok().map(Self::Exactly),
        }
    }
}

impl fmt::Display for Expects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::AtMostOne => f.write_str("0 or 1"),
            Self::AtLeastOne => f.write_str("1+"),
            Self::Any => f.write_str("0+"),
        }
    }
}

/// Picks nodes out of a container.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Mapping entry by key.
    ByKey(String),
    /// Array item by position.
    ByIndex(usize),
    /// Documents or array items whose fields equal every given value.
    /// No conditions matches everything.
    ByFieldValue(Vec<(Vec<PathSegment>, String)>),
}

impl Matcher {
    pub fn all() -> Self {
        Self::ByFieldValue(Vec::new())
    }

    /// Whether `node` satisfies a [`Matcher::ByFieldValue`] condition list.
    /// Always false for the positional matchers.
    pub fn matches_fields(&self, node: &Node) -> bool {
        let Self::ByFieldValue(conditions) = self else {
            return false;
        };
        conditions.iter().all(|(path, expected)| {
            render_values::get_at_path(node, path)
                .and_then(Node::as_scalar)
                .is_some_and(|s| scalar_equals(s, expected))
        })
    }
}

fn scalar_equals(scalar: &Scalar, expected: &str) -> bool {
    match scalar {
        Scalar::Null => expected == "null" || expected == "~",
        Scalar::Bool(b) => expected.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        other => other.to_text() == expected,
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByKey(key) => write!(f, "key '{key}'"),
            Self::ByIndex(idx) => write!(f, "index {idx}"),
            Self::ByFieldValue(conditions) if conditions.is_empty() => f.write_str("any"),
            Self::ByFieldValue(conditions) => {
                let parts: Vec<String> = conditions
                    .iter()
                    .map(|(path, value)| format!("{}={value}", format_path(path)))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub matcher: Matcher,
    pub expects: Expects,
    /// Line of the overlay node this step was read from.
    pub position: Option<Position>,
}

impl Selector {
    pub fn new(matcher: Matcher, expects: Expects) -> Self {
        Self {
            matcher,
            expects,
            position: None,
        }
    }

    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::new(Matcher::ByKey(key.into()), Expects::ONE)
    }

    /// Subject used in error messages, e.g. `Map item (key 'noSNAT')`.
    pub fn describe(&self) -> String {
        match &self.matcher {
            Matcher::ByKey(key) => format!("Map item (key '{key}')"),
            other => format!("Array item ({other})"),
        }
    }
}

/// A node to write into the base tree. Overlay annotations are stripped;
/// value expressions and other annotations carry over.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub value: Node,
    pub meta: Meta,
}

impl Template {
    pub fn new(value: &Node, meta: &Meta) -> Self {
        let mut meta = meta.clone();
        meta.annotations.retain(|a| !a.name.starts_with("overlay/"));
        Self {
            value: value.clone(),
            meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Overwrite the matched node; upsert when nothing matched and the
    /// selector allows it.
    Replace(Template),
    /// Add a new node where the last selector points.
    Insert { template: Template, idempotent: bool },
    /// Push onto the array the path resolves to.
    Append(Template),
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::Insert { .. } => "insert",
            Self::Append(_) => "append",
            Self::Delete => "remove",
        }
    }
}

/// One compiled overlay step.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRule {
    pub documents: Selector,
    /// Steps from the document root to the target. Empty targets the
    /// document itself.
    pub path: Vec<Selector>,
    pub operation: Operation,
    /// Where the rule was written.
    pub origin: Option<Position>,
}

impl OverlayRule {
    pub fn describe_origin(&self) -> String {
        self.origin
            .as_ref()
            .map_or_else(|| "<unknown>".to_string(), Position::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_values::parse_documents;
    use render_values::path::parse_path;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(Expects::Exactly(1)))]
    #[case("0", Some(Expects::Exactly(0)))]
    #[case("0+", Some(Expects::Any))]
    #[case("1+", Some(Expects::AtLeastOne))]
    #[case("0..1", Some(Expects::AtMostOne))]
    #[case("many", None)]
    fn test_parse_expects(#[case] text: &str, #[case] expected: Option<Expects>) {
        assert_eq!(Expects::parse(text), expected);
    }

    #[rstest]
    #[case(Expects::ONE, 0, false)]
    #[case(Expects::ONE, 1, true)]
    #[case(Expects::AtMostOne, 0, true)]
    #[case(Expects::AtMostOne, 2, false)]
    #[case(Expects::AtLeastOne, 0, false)]
    #[case(Expects::Any, 5, true)]
    fn test_expects_allows(#[case] expects: Expects, #[case] count: usize, #[case] ok: bool) {
        assert_eq!(expects.allows(count), ok);
    }

    #[test]
    fn test_field_matcher() {
        let doc = parse_documents("a.yaml", "kind: ConfigMap\nmetadata:\n  name: antrea-config\n")
            .unwrap()
            .documents
            .remove(0);
        let matcher = Matcher::ByFieldValue(vec![
            (parse_path("kind"), "ConfigMap".into()),
            (parse_path("metadata.name"), "antrea-config".into()),
        ]);
        assert!(matcher.matches_fields(&doc.root));
        assert!(Matcher::all().matches_fields(&doc.root));

        let other = Matcher::ByFieldValue(vec![(parse_path("kind"), "Deployment".into())]);
        assert!(!other.matches_fields(&doc.root));
    }

    #[test]
    fn test_template_drops_overlay_annotations() {
        let docs = parse_documents("o.yaml", "#@overlay/replace\n#@schema/desc \"x\"\nkey: 1\n").unwrap();
        let entry = docs.documents[0].root.as_mapping().unwrap().entry("key").unwrap();
        let template = Template::new(&entry.value, &entry.meta);
        let names: Vec<_> = template.meta.annotations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["schema/desc"]);
    }
}
