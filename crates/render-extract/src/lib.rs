//! Consumer side of rendered output
//!
//! Rendered text is a stream of `---`-separated YAML documents. This crate
//! splits the stream, decodes each document into a typed [`Resource`] and
//! finds resources by kind and name.
//!
//! # Example
//!
//! ```
//! use render_extract::{decode_all, find_by_name};
//!
//! let output = "---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: b\n";
//! let resources: Vec<_> = decode_all(output).into_iter().flatten().collect();
//! let cm = find_by_name(&resources, "ConfigMap", "cm").unwrap();
//! assert_eq!(cm.data_value("a"), Some("b"));
//! ```

pub mod document;
pub mod error;
pub mod resource;

pub use document::{decode, decode_all, find_by_name, find_docs_with, split};
pub use error::{Error, Result};
pub use resource::{Metadata, Resource};
