//! Source positions and `#@` annotations attached to template nodes

use std::fmt;

/// Location of a node in its template source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub origin: String,
    /// 1-based line number
    pub line: usize,
}

impl Position {
    pub fn new(origin: impl Into<String>, line: usize) -> Self {
        Self {
            origin: origin.into(),
            line,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.line)
    }
}

/// A `#@name arg key=value` comment preceding a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
    pub position: Position,
}

impl Annotation {
    /// Parse the text following `#@` (e.g. `overlay/match missing_ok=True`).
    pub fn parse(text: &str, position: Position) -> Self {
        let mut tokens = split_tokens(text).into_iter();
        let name = tokens.next().unwrap_or_default();
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        for token in tokens {
            match token.split_once('=') {
                Some((key, value)) => kwargs.push((key.to_string(), unquote(value))),
                None => args.push(unquote(&token)),
            }
        }
        Self {
            name,
            args,
            kwargs,
            position,
        }
    }

    pub fn kwarg(&self, key: &str) -> Option<&str> {
        self.kwargs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Read a boolean keyword argument. Accepts `True`/`true`/`False`/`false`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.kwarg(key)? {
            "True" | "true" => Some(true),
            "False" | "false" => Some(false),
            _ => None,
        }
    }
}

/// Split on whitespace, keeping quoted runs together.
fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Template metadata carried by documents, mapping entries and array items.
///
/// Meta never reaches serialized output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub position: Option<Position>,
    pub annotations: Vec<Annotation>,
    /// Value expression from a trailing `#@ expr` comment.
    pub expression: Option<String>,
}

impl Meta {
    pub fn at(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Position rendered for messages; `<unknown>` for synthesized nodes.
    pub fn describe_position(&self) -> String {
        self.position
            .as_ref()
            .map_or_else(|| "<unknown>".to_string(), Position::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new("overlay.yaml", 3)
    }

    #[test]
    fn test_parse_annotation_name_only() {
        let a = Annotation::parse("data/values", pos());
        assert_eq!(a.name, "data/values");
        assert!(a.args.is_empty());
        assert!(a.kwargs.is_empty());
    }

    #[test]
    fn test_parse_annotation_kwargs() {
        let a = Annotation::parse(
            "overlay/match by.kind=ConfigMap by.metadata.name=\"antrea config\" missing_ok=True",
            pos(),
        );
        assert_eq!(a.name, "overlay/match");
        assert_eq!(a.kwarg("by.kind"), Some("ConfigMap"));
        assert_eq!(a.kwarg("by.metadata.name"), Some("antrea config"));
        assert_eq!(a.flag("missing_ok"), Some(true));
        assert_eq!(a.flag("absent"), None);
    }

    #[test]
    fn test_parse_annotation_positional_args() {
        let a = Annotation::parse("computed/config agentConfig 'x y'", pos());
        assert_eq!(a.args, vec!["agentConfig".to_string(), "x y".to_string()]);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(pos().to_string(), "overlay.yaml:3");
    }
}
