//! Error types for render-values

use crate::meta::Position;
use crate::node::NodeKind;

/// Result type for render-values operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing templates or merging data values
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse YAML on line {position}: {message}")]
    Parse { position: Position, message: String },

    #[error("Map item (key '{key}') on line {position}: duplicate key")]
    DuplicateKey { key: String, position: Position },

    /// An override key that the defaults tree does not declare.
    #[error(
        "Map item (key '{key}') on line {position}: Expected number of matched nodes to be 1, but was 0 (unknown field)"
    )]
    UnknownField { key: String, position: String },

    #[error("Map item (key '{key}') on line {position}: cannot replace {expected} with {actual}")]
    TypeMismatch {
        key: String,
        position: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    #[error("Document on line {position}: data values must be a map, got {actual}")]
    NotAMapping { position: String, actual: NodeKind },

    #[error("Failed to serialize YAML: {0}")]
    Serialize(String),
}

impl Error {
    pub fn parse(position: Position, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}
