//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `artifact-combiner` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `artifact_combiner` library.
//!
//! Options shared by every command live in [`SourceArgs`].

pub mod plan;
pub mod publish;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use artifact_combiner::config::{self, CombinerConfig, DEFAULT_CONFIG_FILE};

/// Where the build outputs come from and where repositories live.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to the combiner configuration file.
    ///
    /// Defaults to `.artifact-combiner.yaml` in the current directory when it
    /// exists; built-in defaults are used otherwise.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory whose subdirectories hold the sub-build outputs.
    #[arg(long, value_name = "DIR", env = "COMBINER_PRODUCTS_ROOT")]
    pub products_root: Option<PathBuf>,

    /// Base URL under which each repository is published by name.
    #[arg(long, value_name = "URL", env = "MAVEN_REPO_URL")]
    pub maven_repo_url: Option<String>,
}

impl SourceArgs {
    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<CombinerConfig> {
        let mut config = match &self.config {
            Some(path) => load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                load_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => CombinerConfig::default(),
        };

        if let Some(root) = &self.products_root {
            config.products_root = root.clone();
        }
        if let Some(url) = &self.maven_repo_url {
            config.maven_repo_url = Some(url.clone());
        }

        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<CombinerConfig> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    config::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e))
}
