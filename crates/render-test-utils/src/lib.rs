//! Shared test utilities for the manifest renderer workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: paths into `test-fixtures/` and a copyable [`fixtures::TestBundle`]
//! - [`values`]: builders for caller data-values overrides

pub mod fixtures;
pub mod values;
