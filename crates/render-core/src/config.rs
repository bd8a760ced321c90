//! Package manifest (`package.toml`)
//!
//! A package bundle directory names its template files, in declaration
//! order, and the default merge policy for caller overrides.

use crate::error::{Error, Result};
use render_fs::{Source, SourceSet};
use render_values::MergePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "package.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesSection {
    /// Paths relative to the bundle directory.
    pub files: Vec<String>,
}

/// Policy applied to override documents that declare none themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultPolicy {
    #[default]
    Strict,
    MissingOk,
}

impl From<DefaultPolicy> for MergePolicy {
    fn from(policy: DefaultPolicy) -> Self {
        match policy {
            DefaultPolicy::Strict => MergePolicy::StrictMatch,
            DefaultPolicy::MissingOk => MergePolicy::MatchChildDefaults { missing_ok: true },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    #[serde(default)]
    pub default_policy: DefaultPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManifest {
    pub package: PackageSection,
    pub templates: TemplatesSection,
    #[serde(default)]
    pub render: RenderSection,
}

impl PackageManifest {
    /// Parse manifest text.
    ///
    /// # Example
    ///
    /// ```
    /// use render_core::config::{DefaultPolicy, PackageManifest};
    ///
    /// let manifest = PackageManifest::parse(r#"
    /// [package]
    /// name = "antrea"
    /// version = "1.5.2"
    ///
    /// [templates]
    /// files = ["upstream/antrea.yaml", "values.yaml"]
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.templates.files.len(), 2);
    /// assert_eq!(manifest.render.default_policy, DefaultPolicy::Strict);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `package.toml` from a bundle directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(Error::ManifestNotFound { path });
        }
        let content = render_fs::io::read_text(&path)?;
        toml::from_str(&content).map_err(|e| Error::InvalidManifest {
            path,
            message: e.to_string(),
        })
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.render.default_policy.into()
    }

    /// Read the template files in declaration order. Each source's origin is
    /// its path relative to the bundle, as listed.
    pub fn sources(&self, dir: &Path) -> Result<SourceSet> {
        let mut set = SourceSet::new();
        for name in &self.templates.files {
            let path: PathBuf = dir.join(name);
            if !path.is_file() {
                return Err(Error::MissingTemplate {
                    name: name.clone(),
                    manifest: dir.join(MANIFEST_FILE),
                });
            }
            set.push(Source::from_path_as(&path, name.as_str())?);
        }
        tracing::debug!(
            package = %self.package.name,
            version = %self.package.version,
            templates = set.len(),
            "Loaded package templates"
        );
        Ok(set)
    }
}
