//! Error types for render-overlay

use crate::rule::Expects;
use render_values::NodeKind;

/// Result type for render-overlay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling or applying overlays
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A selector matched a number of nodes its cardinality does not allow.
    #[error("{target} on line {position}: Expected number of matched nodes to be {expected}, but was {actual}")]
    Structural {
        target: String,
        position: String,
        expected: Expects,
        actual: usize,
    },

    #[error("{target} on line {position}: cannot insert, node already exists")]
    AlreadyExists { target: String, position: String },

    #[error("{target} on line {position}: expected {expected} to apply overlay, got {actual}")]
    Shape {
        target: String,
        position: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    #[error("Invalid annotation '{annotation}' on line {position}: {reason}")]
    InvalidAnnotation {
        annotation: String,
        position: String,
        reason: String,
    },

    #[error("Document on line {position}: overlay document requires #@overlay/match")]
    MissingMatcher { position: String },

    #[error(transparent)]
    Values(#[from] render_values::Error),
}
