//! Source loading for the manifest renderer
//!
//! Template sources are read as ordered text buffers, each tagged with an
//! origin name that later stages use in error messages. Rendered output is
//! written back with an atomic replace.

pub mod error;
pub mod io;
pub mod source;

pub use error::{Error, Result};
pub use source::{STDIN_ORIGIN, Source, SourceSet};
