//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that lays out a products directory the way
//! a multi-language build leaves it:
//!
//! ```text
//! <temp>/build/products/<sub-build>/allOutputs/metadata.properties
//! <temp>/build/products/<sub-build>/allOutputs/_GROUP_..._CLS[-cls].<ext>
//! ```
//!
//! With no repository configured, publications land under `<temp>/repos`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new()
//!     .with_sub_build("cpp", "1.0", "r1")
//!     .with_artifact("cpp", "_GROUP_com_foo_ID_bar-cpp_CLS-headers.zip");
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// Directory inside each sub-build that holds its outputs.
pub const OUTPUTS_DIR: &str = "allOutputs";

/// A temporary products tree plus the default repository root next to it.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a fixture with an empty products root.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("build/products")
            .create_dir_all()
            .expect("Failed to create products root");
        Self { temp_dir }
    }

    /// Add a sub-build whose metadata declares `version` and `repository`.
    pub fn with_sub_build(self, name: &str, version: &str, repository: &str) -> Self {
        let content = format!(
            "pubVersion={}\nreleasesRepoName={}\n",
            version, repository
        );
        self.with_metadata(name, &content)
    }

    /// Add a sub-build with a raw metadata file.
    pub fn with_metadata(self, name: &str, content: &str) -> Self {
        self.outputs(name)
            .child("metadata.properties")
            .write_str(content)
            .expect("Failed to write metadata");
        self
    }

    /// Add a sub-build directory without any metadata.
    pub fn with_bare_sub_build(self, name: &str) -> Self {
        self.outputs(name)
            .create_dir_all()
            .expect("Failed to create sub-build");
        self
    }

    /// Add an artifact file to a sub-build's outputs.
    pub fn with_artifact(self, sub_build: &str, file_name: &str) -> Self {
        let content = format!("{}/{}", sub_build, file_name);
        self.outputs(sub_build)
            .child(file_name)
            .write_str(&content)
            .expect("Failed to write artifact");
        self
    }

    /// Write `.artifact-combiner.yaml` in the fixture root.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".artifact-combiner.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    fn outputs(&self, sub_build: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir
            .child("build/products")
            .child(sub_build)
            .child(OUTPUTS_DIR)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn products_root(&self) -> PathBuf {
        self.temp_dir.path().join("build/products")
    }

    /// Where repositories are published when no URL is configured.
    pub fn repos_root(&self) -> PathBuf {
        self.temp_dir.path().join("repos")
    }

    /// Path of an artifact inside a sub-build's outputs.
    pub fn artifact_path(&self, sub_build: &str, file_name: &str) -> PathBuf {
        self.products_root()
            .join(sub_build)
            .join(OUTPUTS_DIR)
            .join(file_name)
    }

    /// A command for the binary running in the fixture root, isolated from
    /// the caller's environment overrides.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("artifact-combiner");
        cmd.current_dir(self.path())
            .env_remove("COMBINER_PRODUCTS_ROOT")
            .env_remove("MAVEN_REPO_URL")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
