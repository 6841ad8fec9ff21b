//! # Artifact Combiner Library
//!
//! A multi-language build produces one directory per sub-build (one for the
//! C++ outputs, one for Java, one for Python, ...) under a shared products
//! root. Each sub-build carries a small metadata file naming the version it
//! was built at and the repository it must be released to. Artifact files
//! encode their Maven identity in their file name.
//!
//! This library gathers those files into logical publications and routes each
//! publication to exactly the repository it is bound to, even though every
//! repository is reachable from the single publish step.
//!
//! ## Quick Example
//!
//! ```
//! use artifact_combiner::naming::{encode, ArtifactIdentity, NamingCodec};
//!
//! let codec = NamingCodec::new().unwrap();
//! let identity = ArtifactIdentity::new("com.foo", "bar-cpp", Some("headers"));
//!
//! let file_name = encode(&identity, "zip");
//! assert_eq!(file_name, "_GROUP_com_foo_ID_bar-cpp_CLS-headers.zip");
//!
//! let parsed = codec.parse(&file_name).unwrap();
//! assert_eq!(parsed.group_id, "com.foo");
//! assert_eq!(parsed.classifier.as_deref(), Some("headers"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Naming (`naming`)**: The file-name grammar that carries group, artifact
//!   and classifier through the build.
//! - **Metadata (`metadata`)**: Reads a sub-build's version and target
//!   repository from its `metadata.properties`.
//! - **Scanning (`scanner`)**: Finds sub-builds and their artifact files.
//! - **Aggregation (`aggregator`)**: Merges classified files into publications
//!   and reports conflicts instead of silently resolving them.
//! - **Routing (`router`)**: Partitions publications by bound repository into a
//!   [`router::PublishPlan`].
//! - **Publishing (`publisher`)**: Drives a plan through an executor, one
//!   parallel task per repository.
//!
//! ## Execution Flow
//!
//! [`combiner::combine`] runs the read-only stages:
//!
//! 1.  **Discovery**: Every immediate subdirectory of the products root is a
//!     sub-build; its metadata is read once.
//! 2.  **Aggregation**: Candidate files are merged into publications keyed by
//!     group and artifact id.
//! 3.  **Routing**: Publications are partitioned by the repository they are
//!     bound to.
//!
//! [`publisher::publish_plan`] then uploads the plan. A failure in one
//! repository never affects another.

pub mod aggregator;
pub mod combiner;
pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod publisher;
pub mod router;
pub mod scanner;

#[cfg(test)]
mod naming_proptest;
