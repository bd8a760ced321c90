//! Data-values override builders

use render_fs::{STDIN_ORIGIN, Source, SourceSet};

/// Override document setting one field under `antrea.config`, in the form
/// callers pipe on stdin:
///
/// ```text
/// #@data/values
/// #@overlay/match-child-defaults missing_ok=True
/// ---
/// antrea:
///   config:
///     <field>
/// ```
///
/// `field` may span several lines; continuation lines are indented to match.
pub fn data_values(field: &str) -> String {
    let body = field.lines().collect::<Vec<_>>().join("\n    ");
    format!(
        "#@data/values\n#@overlay/match-child-defaults missing_ok=True\n---\nantrea:\n  config:\n    {body}\n"
    )
}

/// [`data_values`] wrapped as a stdin source.
pub fn override_source(field: &str) -> Source {
    Source::inline(STDIN_ORIGIN, data_values(field))
}

/// Raw text as a stdin source set.
pub fn stdin_overrides(text: &str) -> SourceSet {
    SourceSet::new().with(Source::inline(STDIN_ORIGIN, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_values_layout() {
        assert_eq!(
            data_values("noSNAT: true"),
            "#@data/values\n#@overlay/match-child-defaults missing_ok=True\n---\nantrea:\n  config:\n    noSNAT: true\n"
        );
    }

    #[test]
    fn test_multiline_field_is_indented() {
        let text = data_values("featureGates:\n  Egress: true");
        assert!(text.ends_with("    featureGates:\n      Egress: true\n"));
    }
}
