//! Structural overlays
//!
//! Overlay documents are compiled into an ordered list of [`OverlayRule`]s,
//! each naming which base documents it targets, a path of [`Selector`]s
//! inside them, and an [`Operation`]. Rules are applied one after another,
//! so later rules see the effect of earlier ones. Every selector declares how
//! many nodes it must match; a mismatch aborts with a structural error.

pub mod apply;
pub mod compile;
pub mod error;
pub mod rule;

pub use apply::apply_overlay;
pub use compile::{compile_document, compile_overlays, is_overlay_document};
pub use error::{Error, Result};
pub use rule::{Expects, Matcher, Operation, OverlayRule, Selector, Template};
