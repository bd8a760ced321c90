//! Evaluation, rendering and orchestration for the manifest renderer
//!
//! `render-core` sits on top of the loading, values and overlay layers:
//!
//! ```text
//!                 render-cli
//!                     |
//!                render-core
//!                     |
//!     +---------------+---------------+
//!     |               |               |
//! render-fs     render-values   render-overlay
//! ```
//!
//! [`Pipeline`] classifies template documents, merges data values, evaluates
//! computed fields, applies overlays and renders the result.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod gates;
pub mod pipeline;
pub mod renderer;

pub use config::{DefaultPolicy, PackageManifest};
pub use error::{Error, Result};
pub use evaluator::{Evaluated, Evaluator, IpStack};
pub use gates::{FeatureGateSet, GateTable, UnknownGatePolicy};
pub use pipeline::{DocumentRole, Pipeline, RenderOutput, override_from_assignment, render_sources};
pub use renderer::{RenderedDocument, SEPARATOR};
