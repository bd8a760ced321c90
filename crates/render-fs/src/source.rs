//! Origin-tagged template sources

use crate::{Result, io};
use std::path::Path;

/// Origin name given to sources read from standard input.
pub const STDIN_ORIGIN: &str = "stdin.yml";

/// A single template source: its text plus the origin name reported in errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    origin: String,
    content: String,
}

impl Source {
    /// Create a source from an in-memory buffer.
    pub fn inline(origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            content: content.into(),
        }
    }

    /// Read a source from disk. The origin is the path as given.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = io::read_text(path)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Loaded template source");
        Ok(Self::inline(path.display().to_string(), content))
    }

    /// Read a source from disk, reporting `origin` instead of the full path.
    pub fn from_path_as(path: impl AsRef<Path>, origin: impl Into<String>) -> Result<Self> {
        let mut source = Self::from_path(path)?;
        source.origin = origin.into();
        Ok(source)
    }

    /// Read standard input as a source named [`STDIN_ORIGIN`].
    pub fn from_stdin() -> Result<Self> {
        Ok(Self::inline(STDIN_ORIGIN, io::read_stdin()?))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered collection of sources. Declaration order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    sources: Vec<Source>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every path in order, stopping at the first unreadable one.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources = paths
            .into_iter()
            .map(Source::from_path)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sources })
    }

    pub fn push(&mut self, source: Source) {
        self.sources.push(source);
    }

    /// Builder-style [`SourceSet::push`].
    pub fn with(mut self, source: Source) -> Self {
        self.push(source);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FromIterator<Source> for SourceSet {
    fn from_iter<T: IntoIterator<Item = Source>>(iter: T) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}
