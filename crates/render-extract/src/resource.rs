//! Typed view of a rendered Kubernetes resource

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fields of a manifest that consumers look at. Everything else
/// (`spec`, `status`, ...) is ignored while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub api_version: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// ConfigMap payload; empty for other kinds.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Resource {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn is(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name() == Some(name)
    }
}
