//! # Artifact Scanner
//!
//! The products root holds one directory per sub-build. The scanner lists
//! those directories, loads each one's metadata record exactly once and then
//! enumerates the artifact files inside it.
//!
//! ```text
//! products/
//! ├── native/
//! │   └── allOutputs/
//! │       ├── metadata.properties
//! │       ├── _GROUP_com_foo_ID_bar-cpp_CLS-headers.zip
//! │       └── _GROUP_com_foo_ID_bar-cpp_CLS-linuxx86-64.zip
//! └── java/
//!     └── allOutputs/
//!         ├── metadata.properties
//!         └── _GROUP_com_foo_ID_bar-java_CLS.jar
//! ```
//!
//! [`Scan::entries`] is lazy: a sub-build's directory is only walked when the
//! iterator reaches it, and every call starts a fresh walk. Sub-builds are
//! visited in name order and files in file-name order, so the same tree
//! always yields the same sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::CombinerConfig;
use crate::error::{Error, Result};
use crate::metadata::{MetadataError, MetadataReader, SubBuildMetadata};
use crate::naming::NamingCodec;

/// An artifact file found inside a sub-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    pub file_name: String,
}

/// One sub-build whose metadata loaded successfully.
#[derive(Debug, Clone)]
pub struct SubBuild {
    pub name: String,
    pub path: PathBuf,
    pub metadata: Arc<SubBuildMetadata>,
}

/// A sub-build that contributes nothing because its metadata is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSubBuild {
    pub name: String,
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: MetadataError,
}

fn serialize_reason<S>(reason: &MetadataError, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(reason)
}

/// A candidate file paired with the metadata of the sub-build it came from.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub file: CandidateFile,
    pub metadata: Arc<SubBuildMetadata>,
    /// Name of the originating sub-build directory.
    pub sub_build: String,
}

/// Discovers sub-builds and their artifact files.
#[derive(Debug, Clone)]
pub struct Scanner {
    codec: NamingCodec,
    metadata: MetadataReader,
    extensions: Vec<String>,
    outputs_dir: Option<String>,
}

impl Scanner {
    pub fn new(config: &CombinerConfig) -> Result<Self> {
        Ok(Self {
            codec: NamingCodec::new()?,
            metadata: MetadataReader::new(&config.metadata)?,
            extensions: config.normalized_extensions(),
            outputs_dir: config.outputs_dir.clone(),
        })
    }

    /// List the sub-builds under `products_root` and load their metadata.
    ///
    /// Fails only when `products_root` itself cannot be read. Sub-builds with
    /// absent metadata are logged and reported through [`Scan::skipped`].
    pub fn scan(&self, products_root: &Path) -> Result<Scan<'_>> {
        let root = std::path::absolute(products_root)?;
        if !root.is_dir() {
            return Err(Error::Scan {
                path: root,
                message: "products root is not a directory".to_string(),
            });
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(|e| Error::Scan {
            path: root.clone(),
            message: e.to_string(),
        })? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    continue;
                }
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => dirs.push(entry.path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
        dirs.sort();

        let mut sub_builds = Vec::new();
        let mut skipped = Vec::new();
        for path in dirs {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.metadata.read(&path) {
                Ok(metadata) => {
                    debug!(
                        "Sub-build '{}' releases {} to '{}'",
                        name, metadata.version, metadata.repository_name
                    );
                    sub_builds.push(SubBuild {
                        name,
                        path,
                        metadata: Arc::new(metadata),
                    });
                }
                Err(reason) => {
                    warn!("Skipping sub-build '{}': {}", name, reason);
                    skipped.push(SkippedSubBuild { name, path, reason });
                }
            }
        }

        Ok(Scan {
            scanner: self,
            root,
            sub_builds,
            skipped,
        })
    }

    /// Enumerate the artifact files of one sub-build in file-name order.
    ///
    /// Any walk error fails the whole sub-build so that it is never
    /// published partially.
    pub fn candidates(&self, sub_build: &SubBuild) -> Result<Vec<CandidateFile>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&sub_build.path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                trace!("Ignoring non UTF-8 file name {}", entry.path().display());
                continue;
            };
            if !self.has_artifact_extension(entry.path()) || !self.in_outputs_dir(entry.path()) {
                continue;
            }
            if !self.codec.matches(file_name) {
                trace!("Ignoring {}: not an encoded artifact name", entry.path().display());
                continue;
            }
            files.push(CandidateFile {
                file_name: file_name.to_string(),
                path: entry.into_path(),
            });
        }
        Ok(files)
    }

    fn has_artifact_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn in_outputs_dir(&self, path: &Path) -> bool {
        match &self.outputs_dir {
            None => true,
            Some(dir) => path
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|parent| parent == dir.as_str()),
        }
    }
}

/// The result of scanning a products root.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    scanner: &'a Scanner,
    root: PathBuf,
    sub_builds: Vec<SubBuild>,
    skipped: Vec<SkippedSubBuild>,
}

impl Scan<'_> {
    /// Absolute path of the scanned products root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sub-builds with usable metadata, in name order.
    pub fn sub_builds(&self) -> &[SubBuild] {
        &self.sub_builds
    }

    /// Sub-builds dropped because their metadata is absent.
    pub fn skipped(&self) -> &[SkippedSubBuild] {
        &self.skipped
    }

    /// Iterate over every candidate file of every usable sub-build.
    ///
    /// Each call walks the directories again.
    pub fn entries(&self) -> impl Iterator<Item = ScanEntry> + '_ {
        self.sub_builds.iter().flat_map(move |sub_build| {
            let files = match self.scanner.candidates(sub_build) {
                Ok(files) => files,
                Err(e) => {
                    warn!(
                        "Dropping sub-build '{}': failed to read {}: {}",
                        sub_build.name,
                        sub_build.path.display(),
                        e
                    );
                    Vec::new()
                }
            };
            files.into_iter().map(move |file| ScanEntry {
                file,
                metadata: Arc::clone(&sub_build.metadata),
                sub_build: sub_build.name.clone(),
            })
        })
    }
}
