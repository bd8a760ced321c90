//! Splitting and searching rendered output

use crate::error::{Error, Result};
use crate::resource::Resource;

const SEPARATOR: &str = "---";

/// Split a multi-document stream on `---` lines.
///
/// Fragments holding only whitespace are dropped, so a leading separator
/// or a trailing one yields no empty document.
pub fn split(output: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();

    for line in output.lines() {
        if line.trim_end() == SEPARATOR {
            push_fragment(&mut fragments, &mut current);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_fragment(&mut fragments, &mut current);

    fragments
}

fn push_fragment(fragments: &mut Vec<String>, current: &mut String) {
    let fragment = std::mem::take(current);
    if !fragment.trim().is_empty() {
        fragments.push(fragment);
    }
}

/// Decode one document. `index` only labels the error.
pub fn decode(index: usize, document: &str) -> Result<Resource> {
    serde_yaml::from_str(document).map_err(|source| Error::Decode { index, source })
}

/// Decode every document of a stream independently.
pub fn decode_all(output: &str) -> Vec<Result<Resource>> {
    split(output)
        .iter()
        .enumerate()
        .map(|(index, document)| {
            let decoded = decode(index, document);
            if let Err(e) = &decoded {
                tracing::warn!(index, error = %e, "Skipping undecodable document");
            }
            decoded
        })
        .collect()
}

/// First resource with the given kind and `metadata.name`.
pub fn find_by_name<'a>(resources: &'a [Resource], kind: &str, name: &str) -> Result<&'a Resource> {
    resources
        .iter()
        .find(|r| r.is(kind, name))
        .ok_or_else(|| Error::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        })
}

/// Raw fragments containing `selector` as a literal substring.
pub fn find_docs_with(output: &str, selector: &str) -> Vec<String> {
    split(output)
        .into_iter()
        .filter(|fragment| fragment.contains(selector))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const OUTPUT: &str = "\
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
data:
  key: one
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
data:
  key: two
";

    #[rstest]
    #[case::leading_separator("---\na: 1\n---\nb: 2\n", 2)]
    #[case::no_separator("a: 1\n", 1)]
    #[case::trailing_separator("a: 1\n---\n", 1)]
    #[case::blank_fragments("---\n\n---\n  \n---\na: 1\n", 1)]
    #[case::empty("", 0)]
    fn test_split_drops_empty_fragments(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(split(input).len(), expected);
    }

    #[test]
    fn test_separator_inside_block_scalar_line_is_not_split() {
        let fragments = split("data:\n  text: |\n    --- not a separator\n");
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn test_malformed_document_does_not_abort_siblings() {
        let output = format!("{OUTPUT}---\nkind: [unclosed\n");
        let decoded = decode_all(&output);
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0].is_ok());
        assert!(decoded[1].is_ok());
        assert!(matches!(decoded[2], Err(Error::Decode { index: 2, .. })));
    }

    #[test]
    fn test_find_by_name() {
        let resources: Vec<_> = decode_all(OUTPUT).into_iter().flatten().collect();
        let found = find_by_name(&resources, "ConfigMap", "second").unwrap();
        assert_eq!(found.data_value("key"), Some("two"));

        let err = find_by_name(&resources, "Secret", "second").unwrap_err();
        assert_eq!(err.to_string(), "No Secret named 'second' in rendered output");
    }

    #[test]
    fn test_find_docs_with_substring() {
        let docs = find_docs_with(OUTPUT, "name: first");
        assert_eq!(docs.len(), 1);
        assert!(docs[0].contains("key: one"));
        assert!(find_docs_with(OUTPUT, "name: third").is_empty());
    }
}
