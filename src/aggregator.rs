//! # Publication Aggregator
//!
//! Turns the stream of scanned files into publications. Files are grouped by
//! `(group_id, artifact_id)`; the first file seen for a key creates the
//! publication and fixes its version and repository, later files are merged
//! into it one classifier slot at a time.
//!
//! Nothing is silently overwritten. A later file that disagrees with the
//! publication it would join is left out and reported as a [`Conflict`]:
//!
//! - a different target repository ([`Conflict::RepositoryMismatch`]),
//! - a different version ([`Conflict::VersionMismatch`]),
//! - a classifier slot that is already filled ([`Conflict::DuplicateArtifact`]).
//!
//! Conflicts never stop aggregation; every other key is processed normally.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use log::{debug, trace, warn};
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::naming::{NamingCodec, PublicationKey};
use crate::scanner::ScanEntry;

/// A file occupying one classifier slot of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub classifier: Option<String>,
    pub extension: String,
    pub path: PathBuf,
    /// Sub-build the file was found in.
    pub sub_build: String,
}

/// A logical package: every classified artifact of one group/artifact id,
/// bound to exactly one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub bound_repository: String,
    #[serde(serialize_with = "serialize_slots")]
    artifacts: BTreeMap<Option<String>, Artifact>,
}

impl Publication {
    fn new(key: PublicationKey, version: &str, bound_repository: &str, first: Artifact) -> Self {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(first.classifier.clone(), first);
        Self {
            group_id: key.group_id,
            artifact_id: key.artifact_id,
            version: version.to_string(),
            bound_repository: bound_repository.to_string(),
            artifacts,
        }
    }

    pub fn key(&self) -> PublicationKey {
        PublicationKey::new(&self.group_id, &self.artifact_id)
    }

    /// `group:artifact:version`
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Artifacts ordered by classifier, the unclassified one first.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    pub fn artifact(&self, classifier: Option<&str>) -> Option<&Artifact> {
        self.artifacts.get(&classifier.map(str::to_string))
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }
}

fn serialize_slots<S>(slots: &BTreeMap<Option<String>, Artifact>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(slots.values())
}

/// A file that could not be merged into the publication for its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// The same package is claimed by two target repositories.
    RepositoryMismatch {
        key: PublicationKey,
        file: PathBuf,
        sub_build: String,
        bound: String,
        claimed: String,
    },
    /// The same package is claimed at two versions.
    VersionMismatch {
        key: PublicationKey,
        file: PathBuf,
        sub_build: String,
        version: String,
        claimed: String,
    },
    /// Two files fill the same classifier slot; the first one is kept.
    DuplicateArtifact {
        key: PublicationKey,
        classifier: Option<String>,
        kept: PathBuf,
        rejected: PathBuf,
    },
}

impl Conflict {
    pub fn key(&self) -> &PublicationKey {
        match self {
            Conflict::RepositoryMismatch { key, .. }
            | Conflict::VersionMismatch { key, .. }
            | Conflict::DuplicateArtifact { key, .. } => key,
        }
    }

    /// The file that was left out.
    pub fn rejected_file(&self) -> &PathBuf {
        match self {
            Conflict::RepositoryMismatch { file, .. } | Conflict::VersionMismatch { file, .. } => file,
            Conflict::DuplicateArtifact { rejected, .. } => rejected,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::RepositoryMismatch {
                key,
                file,
                sub_build,
                bound,
                claimed,
            } => write!(
                f,
                "{} is bound to repository '{}' but sub-build '{}' targets '{}' ({})",
                key,
                bound,
                sub_build,
                claimed,
                file.display()
            ),
            Conflict::VersionMismatch {
                key,
                file,
                sub_build,
                version,
                claimed,
            } => write!(
                f,
                "{} has version '{}' but sub-build '{}' built '{}' ({})",
                key,
                version,
                sub_build,
                claimed,
                file.display()
            ),
            Conflict::DuplicateArtifact {
                key,
                classifier,
                kept,
                rejected,
            } => write!(
                f,
                "{} already has an artifact for classifier '{}': keeping {}, ignoring {}",
                key,
                classifier.as_deref().unwrap_or("<none>"),
                kept.display(),
                rejected.display()
            ),
        }
    }
}

/// Publications ordered by key, plus every conflict in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub publications: Vec<Publication>,
    pub conflicts: Vec<Conflict>,
}

impl Aggregation {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn find(&self, group_id: &str, artifact_id: &str) -> Option<&Publication> {
        self.publications
            .iter()
            .find(|p| p.group_id == group_id && p.artifact_id == artifact_id)
    }
}

/// Builds publications from scan entries.
#[derive(Debug, Clone)]
pub struct Aggregator {
    codec: NamingCodec,
}

impl Aggregator {
    pub fn new() -> Result<Self> {
        Ok(Self::with_codec(NamingCodec::new()?))
    }

    pub fn with_codec(codec: NamingCodec) -> Self {
        Self { codec }
    }

    /// Merge `entries` into publications.
    pub fn aggregate<I>(&self, entries: I) -> Aggregation
    where
        I: IntoIterator<Item = ScanEntry>,
    {
        let mut publications: BTreeMap<PublicationKey, Publication> = BTreeMap::new();
        let mut conflicts = Vec::new();
        let mut attached: HashSet<PathBuf> = HashSet::new();

        for entry in entries {
            let Some(parsed) = self.codec.parse_name(&entry.file.file_name) else {
                trace!("Skipping {}: not an encoded artifact name", entry.file.file_name);
                continue;
            };
            if attached.contains(&entry.file.path) {
                debug!("Skipping {}: already attached", entry.file.path.display());
                continue;
            }

            let key = parsed.identity.key();
            let artifact = Artifact {
                classifier: parsed.identity.classifier,
                extension: parsed.extension,
                path: entry.file.path.clone(),
                sub_build: entry.sub_build.clone(),
            };

            match publications.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    debug!(
                        "New publication {}:{} bound to '{}'",
                        key, entry.metadata.version, entry.metadata.repository_name
                    );
                    slot.insert(Publication::new(
                        key,
                        &entry.metadata.version,
                        &entry.metadata.repository_name,
                        artifact,
                    ));
                    attached.insert(entry.file.path);
                }
                Entry::Occupied(mut slot) => {
                    let publication = slot.get_mut();
                    if let Some(conflict) = merge(publication, key, artifact, &entry) {
                        warn!("Conflict: {}", conflict);
                        conflicts.push(conflict);
                    } else {
                        attached.insert(entry.file.path);
                    }
                }
            }
        }

        Aggregation {
            publications: publications.into_values().collect(),
            conflicts,
        }
    }
}

/// Attach `artifact` to `publication`, or explain why it cannot be attached.
fn merge(
    publication: &mut Publication,
    key: PublicationKey,
    artifact: Artifact,
    entry: &ScanEntry,
) -> Option<Conflict> {
    if entry.metadata.repository_name != publication.bound_repository {
        return Some(Conflict::RepositoryMismatch {
            key,
            file: artifact.path,
            sub_build: artifact.sub_build,
            bound: publication.bound_repository.clone(),
            claimed: entry.metadata.repository_name.clone(),
        });
    }
    if entry.metadata.version != publication.version {
        return Some(Conflict::VersionMismatch {
            key,
            file: artifact.path,
            sub_build: artifact.sub_build,
            version: publication.version.clone(),
            claimed: entry.metadata.version.clone(),
        });
    }

    match publication.artifacts.entry(artifact.classifier.clone()) {
        Entry::Occupied(existing) => Some(Conflict::DuplicateArtifact {
            key,
            classifier: artifact.classifier,
            kept: existing.get().path.clone(),
            rejected: artifact.path,
        }),
        Entry::Vacant(slot) => {
            trace!(
                "Attached {} to {}",
                artifact.path.display(),
                publication_label(&key, &entry.metadata.version)
            );
            slot.insert(artifact);
            None
        }
    }
}

fn publication_label(key: &PublicationKey, version: &str) -> String {
    format!("{}:{}", key, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SubBuildMetadata;
    use crate::scanner::CandidateFile;
    use std::sync::Arc;

    fn entry(sub_build: &str, file_name: &str, version: &str, repository: &str) -> ScanEntry {
        ScanEntry {
            file: CandidateFile {
                path: PathBuf::from(format!("/products/{}/allOutputs/{}", sub_build, file_name)),
                file_name: file_name.to_string(),
            },
            metadata: Arc::new(SubBuildMetadata::new(version, repository)),
            sub_build: sub_build.to_string(),
        }
    }

    fn aggregate(entries: Vec<ScanEntry>) -> Aggregation {
        Aggregator::new().unwrap().aggregate(entries)
    }

    #[test]
    fn test_classifiers_merge_into_one_publication() {
        let result = aggregate(vec![
            entry("native", "_GROUP_com_foo_ID_bar_CLS.zip", "1.0", "r1"),
            entry("native", "_GROUP_com_foo_ID_bar_CLS-sources.zip", "1.0", "r1"),
        ]);

        assert!(result.conflicts.is_empty());
        assert_eq!(result.publications.len(), 1);
        let publication = &result.publications[0];
        assert_eq!(publication.coordinates(), "com.foo:bar:1.0");
        assert_eq!(publication.bound_repository, "r1");
        assert_eq!(publication.artifact_count(), 2);
        assert!(publication.artifact(None).is_some());
        assert_eq!(
            publication.artifact(Some("sources")).unwrap().path,
            PathBuf::from("/products/native/allOutputs/_GROUP_com_foo_ID_bar_CLS-sources.zip")
        );
    }

    #[test]
    fn test_repository_mismatch_is_a_conflict() {
        let result = aggregate(vec![
            entry("a", "_GROUP_com_foo_ID_bar_CLS.zip", "1.0", "r1"),
            entry("b", "_GROUP_com_foo_ID_bar_CLS-sources.zip", "1.0", "r2"),
        ]);

        assert_eq!(result.publications.len(), 1);
        let publication = &result.publications[0];
        assert_eq!(publication.bound_repository, "r1");
        assert_eq!(publication.artifact_count(), 1);
        assert!(publication.artifact(Some("sources")).is_none());

        assert_eq!(result.conflicts.len(), 1);
        match &result.conflicts[0] {
            Conflict::RepositoryMismatch {
                key,
                sub_build,
                bound,
                claimed,
                ..
            } => {
                assert_eq!(key, &PublicationKey::new("com.foo", "bar"));
                assert_eq!(sub_build, "b");
                assert_eq!(bound, "r1");
                assert_eq!(claimed, "r2");
            }
            other => panic!("unexpected conflict {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_is_a_conflict() {
        let result = aggregate(vec![
            entry("a", "_GROUP_com_foo_ID_bar_CLS.zip", "1.0", "r1"),
            entry("b", "_GROUP_com_foo_ID_bar_CLS-sources.zip", "1.1", "r1"),
        ]);

        assert_eq!(result.publications[0].version, "1.0");
        assert_eq!(result.publications[0].artifact_count(), 1);
        assert!(matches!(
            &result.conflicts[..],
            [Conflict::VersionMismatch { version, claimed, .. }] if version == "1.0" && claimed == "1.1"
        ));
    }

    #[test]
    fn test_duplicate_classifier_keeps_first() {
        let result = aggregate(vec![
            entry("a", "_GROUP_com_foo_ID_bar_CLS-sources.zip", "1.0", "r1"),
            entry("b", "_GROUP_com_foo_ID_bar_CLS-sources.jar", "1.0", "r1"),
        ]);

        let publication = &result.publications[0];
        assert_eq!(publication.artifact_count(), 1);
        assert_eq!(publication.artifact(Some("sources")).unwrap().sub_build, "a");
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(
            result.conflicts[0].rejected_file(),
            &PathBuf::from("/products/b/allOutputs/_GROUP_com_foo_ID_bar_CLS-sources.jar")
        );
    }

    #[test]
    fn test_unrelated_names_are_skipped() {
        let result = aggregate(vec![
            entry("a", "bar-1.0.zip", "1.0", "r1"),
            entry("a", "_GROUP_com_foo_ID_bar_CLS.zip", "1.0", "r1"),
        ]);
        assert_eq!(result.publications.len(), 1);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_same_file_is_attached_once() {
        let duplicate = entry("a", "_GROUP_com_foo_ID_bar_CLS.zip", "1.0", "r1");
        let result = aggregate(vec![duplicate.clone(), duplicate]);
        assert_eq!(result.publications[0].artifact_count(), 1);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_publications_are_ordered_by_key() {
        let result = aggregate(vec![
            entry("a", "_GROUP_org_zed_ID_alpha_CLS.zip", "1", "r1"),
            entry("a", "_GROUP_com_foo_ID_zulu_CLS.zip", "1", "r1"),
            entry("b", "_GROUP_com_foo_ID_alpha-java_CLS.jar", "1", "r2"),
        ]);
        let keys: Vec<_> = result.publications.iter().map(|p| p.key().to_string()).collect();
        assert_eq!(keys, vec!["com.foo:alpha-java", "com.foo:zulu", "org.zed:alpha"]);
        assert_eq!(result.find("com.foo", "alpha-java").unwrap().bound_repository, "r2");
    }

    #[test]
    fn test_conflict_display() {
        let conflict = Conflict::DuplicateArtifact {
            key: PublicationKey::new("com.foo", "bar"),
            classifier: None,
            kept: PathBuf::from("a.zip"),
            rejected: PathBuf::from("b.zip"),
        };
        let display = conflict.to_string();
        assert!(display.contains("com.foo:bar"));
        assert!(display.contains("<none>"));
        assert!(display.contains("keeping a.zip"));
    }

    #[test]
    fn test_serialize_publication_artifacts_as_list() {
        let result = aggregate(vec![entry("a", "_GROUP_com_foo_ID_bar_CLS-sources.zip", "1.0", "r1")]);
        let json = serde_json::to_value(&result.publications[0]).unwrap();
        assert_eq!(json["artifacts"][0]["classifier"], "sources");
        assert_eq!(json["bound_repository"], "r1");
    }
}
