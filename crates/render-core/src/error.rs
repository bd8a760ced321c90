//! Error types for render-core

use std::path::PathBuf;

/// Result type for render-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while evaluating or rendering a package
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Override names a gate the gate table does not know
    #[error("Unknown feature gate '{gate}' on line {position} (table '{table}')")]
    UnknownFeatureGate {
        gate: String,
        table: String,
        position: String,
    },

    /// Expression references a data value or computed field that does not exist
    #[error("Unknown reference '{reference}' in expression on line {position}")]
    UnknownReference { reference: String, position: String },

    #[error("Invalid expression '{expression}' on line {position}: {reason}")]
    InvalidExpression {
        expression: String,
        position: String,
        reason: String,
    },

    /// Function received a value of the wrong kind
    #[error("{function}() on line {position}: {message}")]
    TypeError {
        function: String,
        position: String,
        message: String,
    },

    #[error("Computed field '{name}' on line {position} is already defined")]
    DuplicateComputed { name: String, position: String },

    #[error("Document on line {position}: #@{annotation} requires name=<field>")]
    MissingName { annotation: String, position: String },

    /// Caller overrides may only contain data values
    #[error("Document on line {position}: overrides may only contain data values, found {role}")]
    UnsupportedOverride { role: String, position: String },

    #[error("Invalid data value '{assignment}': expected path=value")]
    InvalidDataValue { assignment: String },

    #[error("Package manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Template file '{name}' listed in {manifest} does not exist")]
    MissingTemplate { name: String, manifest: PathBuf },

    #[error("Invalid package manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    // Transparent wrappers for lower crates
    #[error(transparent)]
    Fs(#[from] render_fs::Error),

    #[error(transparent)]
    Values(#[from] render_values::Error),

    #[error(transparent)]
    Overlay(#[from] render_overlay::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}
