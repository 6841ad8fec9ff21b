//! # Artifact Naming Codec
//!
//! Sub-builds tag every artifact they produce with its Maven identity by
//! embedding it in the file name:
//!
//! ```text
//! [<marker>]_GROUP_<group_with_underscores>_ID_<artifactId>_CLS[-<classifier>].<ext>
//! ```
//!
//! The group id has its `.` separators replaced by `_` on the way in and
//! restored on the way out. A bare `_CLS` means the artifact has no
//! classifier. Anything before `_GROUP_` is a marker segment and carries no
//! identity.
//!
//! Both directions are built from the same token constants so the grammar is
//! defined exactly once.
//!
//! ```
//! use artifact_combiner::naming::{encode, ArtifactIdentity, NamingCodec};
//!
//! let codec = NamingCodec::new().unwrap();
//! let identity = codec.parse("_GROUP_com_foo_ID_bar-java_CLS-sources.jar").unwrap();
//! assert_eq!(identity.group_id, "com.foo");
//! assert_eq!(identity.artifact_id, "bar-java");
//! assert_eq!(identity.classifier.as_deref(), Some("sources"));
//!
//! let name = encode(&ArtifactIdentity::new("com.foo", "bar", None), "zip");
//! assert_eq!(name, "_GROUP_com_foo_ID_bar_CLS.zip");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::Serialize;

use crate::error::Result;

/// Token introducing the encoded group id.
pub const GROUP_TOKEN: &str = "_GROUP_";
/// Token introducing the artifact id.
pub const ID_TOKEN: &str = "_ID_";
/// Token closing the identity; an optional classifier follows it.
pub const CLASSIFIER_TOKEN: &str = "_CLS";
/// Separator between [`CLASSIFIER_TOKEN`] and a classifier.
pub const CLASSIFIER_SEPARATOR: char = '-';

const GROUP_SEPARATOR: char = '.';
const ENCODED_GROUP_SEPARATOR: char = '_';

/// The key a publication is identified by: group id and artifact id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PublicationKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl PublicationKey {
    pub fn new(group_id: &str, artifact_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        }
    }
}

impl fmt::Display for PublicationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// The identity recovered from an artifact file name.
///
/// Equality, ordering and hashing only look at the group id and artifact id.
/// The classifier does not change which publication a file belongs to, it
/// selects the slot the file fills inside that publication.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactIdentity {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: Option<String>,
}

impl ArtifactIdentity {
    pub fn new(group_id: &str, artifact_id: &str, classifier: Option<&str>) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            classifier: classifier.map(str::to_string),
        }
    }

    /// The publication key this identity belongs to.
    pub fn key(&self) -> PublicationKey {
        PublicationKey::new(&self.group_id, &self.artifact_id)
    }
}

impl PartialEq for ArtifactIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl Eq for ArtifactIdentity {}

impl Hash for ArtifactIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
    }
}

impl PartialOrd for ArtifactIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArtifactIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.group_id, &self.artifact_id).cmp(&(&other.group_id, &other.artifact_id))
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

/// A fully decoded file name: identity plus the parts that carry no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub identity: ArtifactIdentity,
    /// Marker segment before `_GROUP_`, empty when absent.
    pub marker: String,
    /// File extension without the leading dot.
    pub extension: String,
}

/// Compiled naming grammar.
///
/// Construct once and reuse; compiling the pattern is the only fallible step.
#[derive(Debug, Clone)]
pub struct NamingCodec {
    pattern: Regex,
}

impl NamingCodec {
    /// Compile the naming grammar.
    pub fn new() -> Result<Self> {
        let pattern = format!(
            r"^(?P<marker>[A-Za-z0-9_]*?){group}(?P<group>[^.]+?){id}(?P<artifact>[^.]+){cls}(?:{sep}(?P<classifier>[^.]+))?\.(?P<extension>[A-Za-z0-9]+)$",
            group = regex::escape(GROUP_TOKEN),
            id = regex::escape(ID_TOKEN),
            cls = regex::escape(CLASSIFIER_TOKEN),
            sep = regex::escape(&CLASSIFIER_SEPARATOR.to_string()),
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Decode the identity carried by `file_name`.
    ///
    /// Returns `None` when the name does not follow the grammar; such files
    /// are not outputs of a sub-build and are skipped by callers.
    pub fn parse(&self, file_name: &str) -> Option<ArtifactIdentity> {
        self.parse_name(file_name).map(|parsed| parsed.identity)
    }

    /// Decode the identity together with the marker and extension.
    pub fn parse_name(&self, file_name: &str) -> Option<ParsedName> {
        let captures = self.pattern.captures(file_name)?;

        let group_id = captures
            .name("group")?
            .as_str()
            .replace(ENCODED_GROUP_SEPARATOR, &GROUP_SEPARATOR.to_string());
        let artifact_id = captures.name("artifact")?.as_str().to_string();
        let classifier = captures.name("classifier").map(|m| m.as_str().to_string());
        let marker = captures
            .name("marker")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let extension = captures.name("extension")?.as_str().to_string();

        Some(ParsedName {
            identity: ArtifactIdentity {
                group_id,
                artifact_id,
                classifier,
            },
            marker,
            extension,
        })
    }

    /// Whether `file_name` follows the grammar.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }
}

/// Encode an identity as the file name fragment without extension.
pub fn fragment(identity: &ArtifactIdentity) -> String {
    let mut name = format!(
        "{}{}{}{}{}",
        GROUP_TOKEN,
        identity
            .group_id
            .replace(GROUP_SEPARATOR, &ENCODED_GROUP_SEPARATOR.to_string()),
        ID_TOKEN,
        identity.artifact_id,
        CLASSIFIER_TOKEN
    );
    if let Some(classifier) = &identity.classifier {
        name.push(CLASSIFIER_SEPARATOR);
        name.push_str(classifier);
    }
    name
}

/// Encode an identity as a complete file name with the given extension.
pub fn encode(identity: &ArtifactIdentity, extension: &str) -> String {
    format!("{}.{}", fragment(identity), extension)
}
