//! `mrender extract`

use std::io::Write;
use std::path::Path;

use render_extract::{Error as ExtractError, Resource, decode, split};

use super::STDIN_ARG;
use crate::cli::ExtractArgs;
use crate::error::{CliError, Result};

pub fn run_extract(args: &ExtractArgs) -> Result<()> {
    let text = if args.input == STDIN_ARG {
        render_fs::io::read_stdin()?
    } else {
        render_fs::io::read_text(Path::new(&args.input))?
    };

    let selected = select(&text, args)?;
    std::io::stdout().lock().write_all(selected.as_bytes())?;
    Ok(())
}

/// The requested document as `---`-prefixed text, or the raw value of one
/// data key.
fn select(text: &str, args: &ExtractArgs) -> Result<String> {
    let (fragment, resource) = locate(text, &args.kind, &args.name)?;

    match &args.key {
        None => Ok(format!("---\n{fragment}")),
        Some(key) => resource
            .data_value(key)
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::user(format!(
                    "{} '{}' has no data key '{key}'",
                    args.kind, args.name
                ))
            }),
    }
}

fn locate(text: &str, kind: &str, name: &str) -> Result<(String, Resource)> {
    for (index, fragment) in split(text).into_iter().enumerate() {
        match decode(index, &fragment) {
            Ok(resource) if resource.is(kind, name) => return Ok((fragment, resource)),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping undecodable document"),
        }
    }
    Err(ExtractError::NotFound {
        kind: kind.to_string(),
        name: name.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RENDERED: &str = "---\nkind: ConfigMap\nmetadata:\n  name: a\ndata:\n  conf: |\n    x: 1\n---\nkind: ConfigMap\nmetadata:\n  name: b\n";

    fn args(name: &str, key: Option<&str>) -> ExtractArgs {
        ExtractArgs {
            kind: "ConfigMap".to_string(),
            name: name.to_string(),
            key: key.map(str::to_string),
            input: STDIN_ARG.to_string(),
        }
    }

    #[test]
    fn test_select_whole_document() {
        let out = select(RENDERED, &args("b", None)).unwrap();
        assert_eq!(out, "---\nkind: ConfigMap\nmetadata:\n  name: b\n");
    }

    #[test]
    fn test_select_data_key() {
        assert_eq!(select(RENDERED, &args("a", Some("conf"))).unwrap(), "x: 1\n");
    }

    #[test]
    fn test_missing_key_and_missing_document() {
        let err = select(RENDERED, &args("a", Some("other"))).unwrap_err();
        assert_eq!(err.to_string(), "ConfigMap 'a' has no data key 'other'");

        let err = select(RENDERED, &args("c", None)).unwrap_err();
        assert!(matches!(err, CliError::Extract(ExtractError::NotFound { .. })));
    }
}
