//! Render pipeline
//!
//! ```text
//! templates ──parse──► base docs ─────────────┐
//!                      data values ──merge──► values ──► computed fields
//! overrides ──parse──► data values ──┘                        │
//!                      overlays ──compile──► rules ──apply────┤
//!                                                             ▼
//!                                                   render ──► output
//! ```
//!
//! Every stage is rebuilt per call; nothing is cached between renders.

use crate::config::PackageManifest;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::gates::{FeatureGateSet, GateTable};
use crate::renderer::{self, RenderedDocument};
use render_fs::{Source, SourceSet};
use render_overlay::{apply_overlay, compile_overlays, is_overlay_document};
use render_values::path::{nest_at_path, parse_path};
use render_values::{Document, MergePolicy, Node, merge_data_values, parse_source};
use std::fmt;
use std::path::Path;

pub const DATA_VALUES: &str = "data/values";
pub const COMPUTED_CONFIG: &str = "computed/config";
pub const COMPUTED_GATES: &str = "computed/gates";

/// What a template document is for, decided by its document annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Base,
    DataValues,
    Overlay,
    ComputedConfig,
    ComputedGates,
}

impl DocumentRole {
    pub fn of(document: &Document) -> Self {
        for annotation in &document.meta.annotations {
            match annotation.name.as_str() {
                DATA_VALUES => return Self::DataValues,
                COMPUTED_CONFIG => return Self::ComputedConfig,
                COMPUTED_GATES => return Self::ComputedGates,
                _ => {}
            }
        }
        if is_overlay_document(document) {
            Self::Overlay
        } else {
            Self::Base
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base => "base document",
            Self::DataValues => "data values",
            Self::Overlay => "overlay",
            Self::ComputedConfig => "computed config",
            Self::ComputedGates => "gate table",
        })
    }
}

/// Result of one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub documents: Vec<RenderedDocument>,
    /// Merged data values the documents were rendered from.
    pub data_values: Node,
    /// Gate sets resolved while rendering, keyed by table name.
    pub feature_gates: Vec<(String, FeatureGateSet)>,
}

impl RenderOutput {
    /// The output stream: every document prefixed with `---`.
    pub fn to_text(&self) -> Result<String> {
        renderer::to_text(&self.documents)
    }

    /// First document with the given kind and `metadata.name`.
    pub fn find(&self, kind: &str, name: &str) -> Option<&RenderedDocument> {
        self.documents
            .iter()
            .find(|d| d.kind.as_deref() == Some(kind) && d.name.as_deref() == Some(name))
    }
}

/// Template sources plus caller overrides, rendered on demand.
///
/// # Example
///
/// ```
/// use render_core::Pipeline;
/// use render_fs::{Source, SourceSet};
///
/// let templates = SourceSet::new()
///     .with(Source::inline("values.yaml", "#@data/values\n---\nname: demo\n"))
///     .with(Source::inline("cm.yaml", "kind: ConfigMap\nmetadata:\n  name: #@ values.name\n"));
/// let overrides = SourceSet::new()
///     .with(Source::inline("stdin.yml", "#@data/values\n---\nname: other\n"));
///
/// let output = Pipeline::new(templates).with_overrides(overrides).render().unwrap();
/// assert_eq!(output.documents[0].name.as_deref(), Some("other"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    templates: SourceSet,
    overrides: SourceSet,
    default_policy: MergePolicy,
}

impl Pipeline {
    pub fn new(templates: SourceSet) -> Self {
        Self {
            templates,
            ..Self::default()
        }
    }

    /// Templates and default policy from a bundle's `package.toml`.
    pub fn from_package(dir: &Path) -> Result<Self> {
        let manifest = PackageManifest::load(dir)?;
        Ok(Self::new(manifest.sources(dir)?).with_default_policy(manifest.merge_policy()))
    }

    pub fn with_overrides(mut self, overrides: SourceSet) -> Self {
        for source in &overrides {
            self.overrides.push(source.clone());
        }
        self
    }

    pub fn with_override(mut self, source: Source) -> Self {
        self.overrides.push(source);
        self
    }

    /// Policy for override documents that carry no
    /// `#@overlay/match-child-defaults` of their own.
    pub fn with_default_policy(mut self, policy: MergePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Run every stage. All-or-nothing: the first error aborts the render.
    pub fn render(&self) -> Result<RenderOutput> {
        let mut base = Vec::new();
        let mut data_values = Vec::new();
        let mut overlays = Vec::new();
        let mut computed = Vec::new();

        for source in &self.templates {
            for document in parse_source(source)?.documents {
                match DocumentRole::of(&document) {
                    DocumentRole::Base => base.push(document),
                    DocumentRole::DataValues => data_values.push(document),
                    DocumentRole::Overlay => overlays.push(document),
                    role => computed.push((role, document)),
                }
            }
        }
        let defaults = data_values.len();

        for source in &self.overrides {
            for document in parse_source(source)?.documents {
                match DocumentRole::of(&document) {
                    DocumentRole::DataValues => data_values.push(document),
                    role => {
                        return Err(Error::UnsupportedOverride {
                            role: role.to_string(),
                            position: document.meta.describe_position(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            base = base.len(),
            defaults,
            overrides = data_values.len() - defaults,
            overlays = overlays.len(),
            computed = computed.len(),
            "Classified template documents"
        );

        let values = merge_data_values(&data_values, self.default_policy)?;
        tracing::debug!("Merged data values");

        let mut evaluator = Evaluator::new(values);
        for (role, document) in &computed {
            let annotation = if *role == DocumentRole::ComputedGates {
                COMPUTED_GATES
            } else {
                COMPUTED_CONFIG
            };
            let name = document
                .meta
                .annotation(annotation)
                .and_then(|a| a.kwarg("name"))
                .ok_or_else(|| Error::MissingName {
                    annotation: annotation.to_string(),
                    position: document.meta.describe_position(),
                })?;

            if *role == DocumentRole::ComputedGates {
                evaluator.declare_gates(GateTable::from_document(name, document)?)?;
            } else {
                evaluator.define(name, document)?;
            }
        }

        let rules = compile_overlays(&overlays)?;
        let patched = apply_overlay(base, &rules)?;
        tracing::debug!(rules = rules.len(), documents = patched.len(), "Applied overlays");

        let documents = renderer::render(&patched, &mut evaluator)?;
        tracing::debug!(documents = documents.len(), "Rendered documents");

        let data_values = evaluator.values().clone();
        Ok(RenderOutput {
            documents,
            data_values,
            feature_gates: evaluator.into_gate_sets(),
        })
    }
}

/// Render `templates` with `overrides` straight to output text.
pub fn render_sources(templates: SourceSet, overrides: SourceSet) -> Result<String> {
    Pipeline::new(templates)
        .with_overrides(overrides)
        .render()?
        .to_text()
}

/// Turn a `path=value` assignment into a data-values override source.
///
/// The value is read as a YAML scalar, so `true`, `3` and `null` keep their
/// types; quote it to force a string.
pub fn override_from_assignment(assignment: &str) -> Result<Source> {
    let Some((path, raw)) = assignment.split_once('=') else {
        return Err(Error::InvalidDataValue {
            assignment: assignment.to_string(),
        });
    };
    let segments = parse_path(path.trim());
    if segments.is_empty() {
        return Err(Error::InvalidDataValue {
            assignment: assignment.to_string(),
        });
    }

    let value = match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(value) => Node::from(value),
        Err(_) => Node::string(raw),
    };
    let body = nest_at_path(&segments, value).to_yaml()?;
    Ok(Source::inline(
        format!("--data-value {}", path.trim()),
        format!("#@{DATA_VALUES}\n---\n{body}"),
    ))
}
