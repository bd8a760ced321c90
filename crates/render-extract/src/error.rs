//! Error types for render-extract

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One document failed to decode; its siblings are unaffected.
    #[error("Failed to decode document {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No {kind} named '{name}' in rendered output")]
    NotFound { kind: String, name: String },
}
