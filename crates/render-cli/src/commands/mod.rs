//! Subcommand implementations

mod extract;
mod render;

pub use extract::run_extract;
pub use render::run_render;

/// Marks a path argument that reads standard input.
const STDIN_ARG: &str = "-";
