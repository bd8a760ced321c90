//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Render layered Kubernetes manifests from templates, overlays and data values
#[derive(Parser, Debug)]
#[command(name = "mrender")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Render templates into a multi-document YAML stream
    ///
    /// Examples:
    ///   mrender render --package bundle/config
    ///   mrender render --package bundle/config --data-values-file - < values.yml
    ///   mrender render -f base.yaml -f overlay.yaml --data-value app.replicas=3
    Render(RenderArgs),

    /// Print one document (or one data key) from rendered output
    ///
    /// Examples:
    ///   mrender extract --kind ConfigMap --name antrea-config rendered.yaml
    ///   mrender render --package . | mrender extract --kind ConfigMap --name cm --key app.conf
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RenderArgs {
    /// Template file, in declaration order; appended after package templates
    #[arg(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,

    /// Bundle directory holding a package.toml
    #[arg(short, long)]
    pub package: Option<PathBuf>,

    /// Data-values override file; `-` reads standard input
    #[arg(long = "data-values-file")]
    pub data_values_files: Vec<String>,

    /// Single override as `dotted.path=value`, applied after override files
    #[arg(long = "data-value")]
    pub data_values: Vec<String>,

    /// Write output here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ExtractArgs {
    /// Resource kind, e.g. ConfigMap
    #[arg(short, long)]
    pub kind: String,

    /// Resource metadata.name
    #[arg(short, long)]
    pub name: String,

    /// Print only this key of the resource's data section
    #[arg(long)]
    pub key: Option<String>,

    /// Rendered output to read; `-` reads standard input
    #[arg(default_value = "-")]
    pub input: String,
}
