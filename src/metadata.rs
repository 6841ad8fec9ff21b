//! # Sub-build Metadata
//!
//! Every sub-build drops a small properties file next to its artifacts
//! recording the version it was built as and the repository it releases to.
//! This module locates that record inside a sub-build directory and loads it
//! into a [`SubBuildMetadata`].
//!
//! Loading never aborts a run. Any problem is returned as a
//! [`MetadataError`]; the scanner logs it and drops the sub-build, so one
//! broken sub-build cannot prevent the others from being published.

use std::path::{Path, PathBuf};

use glob::Pattern;
use ini::Ini;
use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::MetadataSettings;
use crate::error::Result;

/// Key accepted for the version when the configured key is absent.
pub const FALLBACK_VERSION_KEY: &str = "version";
/// Key accepted for the repository name when the configured key is absent.
pub const FALLBACK_REPOSITORY_KEY: &str = "repositoryName";

/// Version and target repository shared by every artifact of one sub-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubBuildMetadata {
    pub version: String,
    pub repository_name: String,
}

impl SubBuildMetadata {
    pub fn new(version: &str, repository_name: &str) -> Self {
        Self {
            version: version.to_string(),
            repository_name: repository_name.to_string(),
        }
    }
}

/// Why a sub-build's metadata is considered absent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// No file matching the metadata pattern exists in the sub-build.
    #[error("no metadata file matching '{pattern}'")]
    Missing { pattern: String },

    /// More than one file matches; picking one would be arbitrary.
    #[error("{} metadata files found: {}", files.len(), files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>().join(", "))]
    Ambiguous { files: Vec<PathBuf> },

    /// The file exists but is not a key/value record.
    #[error("cannot parse {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    /// A required key is missing or blank.
    #[error("{} has no value for '{key}'", path.display())]
    MissingKey { path: PathBuf, key: String },

    /// The repository name cannot be used as a single destination segment.
    #[error("{} names repository '{name}', which {reason}", path.display())]
    InvalidRepositoryName {
        path: PathBuf,
        name: String,
        reason: String,
    },

    /// The sub-build directory or the record could not be read.
    #[error("cannot read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Check that `name` can be appended to a repository base URL as exactly one
/// path segment. Returns the reason when it cannot.
pub fn validate_repository_name(name: &str) -> std::result::Result<(), &'static str> {
    if name == "." || name == ".." {
        return Err("is a relative path component");
    }
    if name.contains(['/', '\\']) {
        return Err("contains a path separator");
    }
    if name.contains(['#', '?', '%']) {
        return Err("contains a URL delimiter");
    }
    if name.chars().any(char::is_control) {
        return Err("contains a control character");
    }
    Ok(())
}

/// Locates and parses metadata records.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    pattern: Pattern,
    version_key: String,
    repository_key: String,
}

impl MetadataReader {
    pub fn new(settings: &MetadataSettings) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::new(&settings.file_name)?,
            version_key: settings.version_key.clone(),
            repository_key: settings.repository_key.clone(),
        })
    }

    /// Load the metadata record of the sub-build rooted at `sub_build_dir`.
    pub fn read(&self, sub_build_dir: &Path) -> std::result::Result<SubBuildMetadata, MetadataError> {
        let path = self.locate(sub_build_dir)?;
        let content = std::fs::read_to_string(&path).map_err(|e| MetadataError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let metadata = self.parse(&path, &content)?;
        debug!(
            "Loaded metadata from {}: version={}, repository={}",
            path.display(),
            metadata.version,
            metadata.repository_name
        );
        Ok(metadata)
    }

    /// Find the single metadata record below `sub_build_dir`.
    pub fn locate(&self, sub_build_dir: &Path) -> std::result::Result<PathBuf, MetadataError> {
        let mut found = Vec::new();
        for entry in WalkDir::new(sub_build_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| MetadataError::Io {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| sub_build_dir.to_path_buf()),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.pattern.matches(name));
            if matches {
                trace!("Metadata candidate: {}", entry.path().display());
                found.push(entry.into_path());
            }
        }

        match found.len() {
            0 => Err(MetadataError::Missing {
                pattern: self.pattern.as_str().to_string(),
            }),
            1 => Ok(found.remove(0)),
            _ => Err(MetadataError::Ambiguous { files: found }),
        }
    }

    /// Parse the content of a metadata record read from `path`.
    pub fn parse(&self, path: &Path, content: &str) -> std::result::Result<SubBuildMetadata, MetadataError> {
        let ini = Ini::load_from_str(content).map_err(|e| MetadataError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let properties = ini.general_section();

        let lookup = |primary: &str, fallback: &str| -> std::result::Result<String, MetadataError> {
            properties
                .get(primary)
                .or_else(|| properties.get(fallback))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| MetadataError::MissingKey {
                    path: path.to_path_buf(),
                    key: primary.to_string(),
                })
        };

        let version = lookup(&self.version_key, FALLBACK_VERSION_KEY)?;
        let repository_name = lookup(&self.repository_key, FALLBACK_REPOSITORY_KEY)?;
        validate_repository_name(&repository_name).map_err(|reason| {
            MetadataError::InvalidRepositoryName {
                path: path.to_path_buf(),
                name: repository_name.clone(),
                reason: reason.to_string(),
            }
        })?;

        Ok(SubBuildMetadata {
            version,
            repository_name,
        })
    }
}
