//! `mrender render`

use std::io::Write;

use render_core::{PackageManifest, Pipeline, override_from_assignment};
use render_fs::{Source, SourceSet};

use super::STDIN_ARG;
use crate::cli::RenderArgs;
use crate::error::{CliError, Result};

pub fn run_render(args: &RenderArgs) -> Result<()> {
    let output = build_pipeline(args)?.render()?;
    for (table, gates) in &output.feature_gates {
        let enabled = gates.gates.iter().filter(|(_, on)| *on).count();
        tracing::debug!(table = %table, enabled, ignored = gates.ignored.len(), "Feature gates");
    }
    let text = output.to_text()?;

    match &args.output {
        Some(path) => render_fs::io::write_atomic(path, text.as_bytes())?,
        None => std::io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn build_pipeline(args: &RenderArgs) -> Result<Pipeline> {
    let mut templates = SourceSet::new();
    let mut policy = None;

    if let Some(dir) = &args.package {
        let manifest = PackageManifest::load(dir)?;
        templates = manifest.sources(dir)?;
        policy = Some(manifest.merge_policy());
    }
    for file in &args.files {
        templates.push(Source::from_path(file)?);
    }
    if templates.is_empty() {
        return Err(CliError::user(
            "No templates given: pass --package DIR or -f FILE",
        ));
    }

    let pipeline = Pipeline::new(templates).with_overrides(override_sources(args)?);
    Ok(match policy {
        Some(policy) => pipeline.with_default_policy(policy),
        None => pipeline,
    })
}

/// Override files first, then `--data-value` assignments, each in argument order.
fn override_sources(args: &RenderArgs) -> Result<SourceSet> {
    let mut overrides = SourceSet::new();
    let mut stdin_used = false;

    for file in &args.data_values_files {
        if file == STDIN_ARG {
            if stdin_used {
                return Err(CliError::user("Standard input can only be read once"));
            }
            stdin_used = true;
            overrides.push(Source::from_stdin()?);
        } else {
            overrides.push(Source::from_path(file)?);
        }
    }
    for assignment in &args.data_values {
        overrides.push(override_from_assignment(assignment)?);
    }

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> RenderArgs {
        RenderArgs {
            files: Vec::new(),
            package: None,
            data_values_files: Vec::new(),
            data_values: Vec::new(),
            output: None,
        }
    }

    #[test]
    fn test_no_templates_is_a_user_error() {
        let err = build_pipeline(&args()).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
    }

    #[test]
    fn test_missing_override_file_names_the_path() {
        let mut args = args();
        args.data_values_files = vec!["missing-file.yml".to_string()];
        let err = override_sources(&args).unwrap_err();
        assert!(matches!(err, CliError::Fs(_)));
        assert!(err.to_string().contains("missing-file.yml"));
    }

    #[test]
    fn test_assignments_follow_files() {
        let mut args = args();
        args.data_values = vec!["a.b=1".to_string(), "a.c=two".to_string()];
        let overrides = override_sources(&args).unwrap();
        let origins: Vec<_> = overrides.iter().map(|s| s.origin()).collect();
        assert_eq!(origins, vec!["--data-value a.b", "--data-value a.c"]);
    }
}
