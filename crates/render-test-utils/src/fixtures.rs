//! Fixture locations and the [`TestBundle`] builder.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name of the default agent ConfigMap in the Antrea fixture.
pub const ANTREA_CONFIG: &str = "antrea-config-2dd957m7fk";
/// Name of the agent tweaker ConfigMap in the Antrea fixture.
pub const ANTREA_TWEAKER: &str = "antrea-agent-tweaker-g56hc6fh8t";

/// Workspace `test-fixtures/` directory.
pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures")
        .canonicalize()
        .expect("test-fixtures directory exists")
}

/// The Antrea 1.5.2 bundle config directory (holds `package.toml`).
pub fn antrea_bundle() -> PathBuf {
    fixtures_root().join("packages/antrea/1.5.2/bundle/config")
}

/// Template files of the Antrea bundle, in declaration order.
pub fn antrea_template_paths() -> Vec<PathBuf> {
    let dir = antrea_bundle();
    [
        "upstream/antrea.yaml",
        "overlay/antrea_overlay.yaml",
        "values.yaml",
        "values.compute.yaml",
    ]
    .iter()
    .map(|f| dir.join(f))
    .collect()
}

/// A temporary copy of a fixture bundle that tests may edit.
///
/// # Example
///
/// ```rust,no_run
/// use render_test_utils::fixtures::{TestBundle, antrea_bundle};
///
/// let bundle = TestBundle::copy_of(&antrea_bundle());
/// bundle.write("values.yaml", "#@data/values\n---\n{}\n");
/// bundle.assert_file_exists("package.toml");
/// ```
pub struct TestBundle {
    temp_dir: TempDir,
}

impl Default for TestBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBundle {
    /// Create an empty bundle directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Copy every file under `source` into a new bundle directory.
    pub fn copy_of(source: &Path) -> Self {
        let bundle = Self::new();
        copy_dir(source, bundle.root());
        bundle
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `path` relative to the bundle, creating parents.
    pub fn write(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}
