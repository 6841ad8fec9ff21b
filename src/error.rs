//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `artifact-combiner` library. It uses the `thiserror` library to create a
//! single `Error` enum covering every failure mode of a combiner run.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum representing all errors that can occur while
//!   configuring, scanning, routing and publishing.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Not every irregularity is an `Error`. A filename that does not follow the
//! naming grammar is simply skipped, a sub-build without readable metadata is
//! recorded as skipped (see [`crate::metadata::MetadataError`]), and identity
//! clashes are reported as [`crate::aggregator::Conflict`] values. The variants
//! below are the failures that stop an operation: configuration problems,
//! unreadable roots, routing violations and publish failures.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for artifact-combiner operations
#[derive(Error, Debug)]
pub enum Error {
    /// The combiner configuration could not be parsed or failed validation.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The products directory (or a sub-build inside it) could not be scanned.
    #[error("Scan error at {}: {message}", path.display())]
    Scan { path: PathBuf, message: String },

    /// A publication was routed to a repository it is not bound to.
    ///
    /// This is never tolerated: a plan containing such a route is rejected
    /// as a whole.
    #[error("Routing violation: publication {publication} is bound to '{bound}' but was routed to '{repository}'")]
    RoutingViolation {
        repository: String,
        publication: String,
        bound: String,
    },

    /// A repository name cannot be appended to the base URL as one segment.
    #[error("Invalid repository name '{name}': {reason}")]
    InvalidRepositoryName { name: String, reason: String },

    /// The destination URL of a repository cannot be handled by the executor.
    #[error("Unsupported destination: {url}")]
    UnsupportedDestination { url: String },

    /// Publishing a publication to its repository failed.
    #[error("Publish error: {publication} -> {repository}: {message}")]
    Publish {
        repository: String,
        publication: String,
        message: String,
    },

    /// Publishing to a repository was cancelled before it completed.
    #[error("Publishing to '{repository}' was cancelled")]
    Cancelled { repository: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory walk error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
