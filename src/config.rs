//! # Combiner Configuration
//!
//! This module defines `CombinerConfig`, the settings of a combiner run, and
//! the logic for loading it from an optional `.artifact-combiner.yaml` file.
//!
//! Every field has a default matching the layout produced by the upstream
//! packaging step, so an empty file (or no file at all) is a valid
//! configuration:
//!
//! ```yaml
//! products_root: build/products
//! outputs_dir: allOutputs
//! extensions: [zip, jar]
//! metadata:
//!   file_name: metadata.properties
//!   version_key: pubVersion
//!   repository_key: releasesRepoName
//! maven_repo_url: file:///srv/repos
//! repositories:
//!   vendor-nightly: file:///srv/nightly
//! ```
//!
//! Command-line flags and environment variables are layered on top by the
//! binary; the library only sees the merged result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".artifact-combiner.yaml";

/// Where the metadata record lives and which keys it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Glob pattern matched against file names inside a sub-build.
    pub file_name: String,
    /// Key holding the publication version.
    pub version_key: String,
    /// Key holding the name of the repository to release to.
    pub repository_key: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            file_name: "metadata.properties".to_string(),
            version_key: "pubVersion".to_string(),
            repository_key: "releasesRepoName".to_string(),
        }
    }
}

/// Settings for one combiner run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerConfig {
    /// Directory whose immediate subdirectories are sub-build outputs.
    pub products_root: PathBuf,
    /// Only consider artifacts whose parent directory has this name.
    pub outputs_dir: Option<String>,
    /// Archive extensions that can hold artifacts, without the dot.
    pub extensions: Vec<String>,
    pub metadata: MetadataSettings,
    /// Base URL; a repository's destination is `<maven_repo_url>/<name>`.
    pub maven_repo_url: Option<String>,
    /// Explicit destinations for individual repository names.
    pub repositories: BTreeMap<String, String>,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            products_root: PathBuf::from("build/products"),
            outputs_dir: None,
            extensions: vec!["zip".to_string(), "jar".to_string()],
            metadata: MetadataSettings::default(),
            maven_repo_url: None,
            repositories: BTreeMap::new(),
        }
    }
}

impl CombinerConfig {
    /// Check the configuration for values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(Error::ConfigParse {
                message: "extensions must not be empty".to_string(),
                hint: Some("List the archive types sub-builds produce, e.g. [zip, jar]".to_string()),
            });
        }
        if let Some(blank) = self.extensions.iter().find(|ext| normalize_extension(ext).is_empty()) {
            return Err(Error::ConfigParse {
                message: format!("Invalid extension '{}'", blank),
                hint: None,
            });
        }

        for (field, value) in [
            ("metadata.file_name", &self.metadata.file_name),
            ("metadata.version_key", &self.metadata.version_key),
            ("metadata.repository_key", &self.metadata.repository_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("{} must not be blank", field),
                    hint: None,
                });
            }
        }

        if let Some(base) = &self.maven_repo_url {
            Url::parse(base).map_err(|e| Error::ConfigParse {
                message: format!("Invalid maven_repo_url '{}': {}", base, e),
                hint: Some("Use an absolute URL such as file:///srv/repos".to_string()),
            })?;
        }

        for (name, destination) in &self.repositories {
            Url::parse(destination).map_err(|e| Error::ConfigParse {
                message: format!("Invalid destination for repository '{}': {}", name, e),
                hint: None,
            })?;
        }

        Ok(())
    }

    /// Extensions without a leading dot, lowercased.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect()
    }

    /// The base URL repositories are published under.
    ///
    /// Falls back to `<project root>/repos`, where the products root is
    /// `<project root>/build/products`. This is where the packaging step
    /// publishes when no repository is configured.
    pub fn resolved_maven_repo_url(&self) -> Result<Url> {
        match &self.maven_repo_url {
            Some(base) => Ok(Url::parse(base)?),
            None => {
                let products_root = std::path::absolute(&self.products_root)?;
                let project_root = products_root
                    .parent()
                    .and_then(|build| build.parent().or(Some(build)))
                    .unwrap_or(products_root.as_path());
                let base = project_root.join("repos");
                Url::from_directory_path(&base).map_err(|_| Error::ConfigParse {
                    message: format!("Cannot express {} as a URL", base.display()),
                    hint: Some("Set maven_repo_url explicitly".to_string()),
                })
            }
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Parse and validate a YAML configuration string.
///
/// An empty document yields the default configuration.
pub fn parse(yaml_content: &str) -> Result<CombinerConfig> {
    let config = if yaml_content.trim().is_empty() {
        CombinerConfig::default()
    } else {
        serde_yaml::from_str::<CombinerConfig>(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: None,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Load the configuration from a file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CombinerConfig> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
