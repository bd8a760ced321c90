//! Node tree, template parsing and data-values merge
//!
//! Templates are YAML streams whose comments may carry `#@` annotations.
//! [`parse_documents`] turns a source into [`Document`]s of [`Node`]s with
//! source positions and annotations attached, and [`merge`] folds override
//! trees into a defaults tree under a [`MergePolicy`].

pub mod error;
pub mod merge;
pub mod meta;
pub mod node;
pub mod parser;
pub mod path;

pub use error::{Error, Result};
pub use merge::{MergePolicy, merge, merge_data_values};
pub use meta::{Annotation, Meta, Position};
pub use node::{Document, DocumentSet, Entry, Item, Mapping, Node, NodeKind, Scalar, Sequence};
pub use parser::{parse_documents, parse_source};
pub use path::{PathSegment, get_at_path, parse_path};
