//! Orchestrator for a complete combiner run
//!
//! Runs the stages in order and hands the intermediate values from one to
//! the next:
//!
//! 1. Scan the products root for sub-builds and their artifact files
//! 2. Aggregate the files into publications, collecting conflicts
//! 3. Route each publication to the repository it is bound to
//!
//! Publishing the resulting plan is a separate step (see
//! [`crate::publisher`]) so callers can inspect or refuse a plan first.

use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::aggregator::{Aggregation, Aggregator};
use crate::config::CombinerConfig;
use crate::error::Result;
use crate::router::{route, PublishPlan, SinkResolver};
use crate::scanner::{Scanner, SkippedSubBuild};

/// Everything a combiner run found and decided.
#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    /// Absolute path of the scanned products root.
    pub products_root: PathBuf,
    /// Names of the sub-builds that contributed artifacts.
    pub sub_builds: Vec<String>,
    /// Sub-builds dropped because their metadata is absent.
    pub skipped: Vec<SkippedSubBuild>,
    pub aggregation: Aggregation,
    pub plan: PublishPlan,
}

impl CombineReport {
    pub fn has_conflicts(&self) -> bool {
        self.aggregation.has_conflicts()
    }

    /// The whole report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Scan, aggregate and route according to `config`.
pub fn combine(config: &CombinerConfig) -> Result<CombineReport> {
    config.validate()?;

    // Stage 1: Discovery
    let scanner = Scanner::new(config)?;
    let scan = scanner.scan(&config.products_root)?;

    // Stage 2: Aggregation
    let aggregation = Aggregator::new()?.aggregate(scan.entries());

    // Stage 3: Routing
    let resolver = SinkResolver::from_config(config)?;
    let plan = route(&aggregation.publications, &resolver)?;

    info!(
        "Combined {} publications from {} sub-builds into {} repositories ({} conflicts, {} skipped sub-builds)",
        aggregation.publications.len(),
        scan.sub_builds().len(),
        plan.repositories().count(),
        aggregation.conflicts.len(),
        scan.skipped().len()
    );

    Ok(CombineReport {
        products_root: scan.root().to_path_buf(),
        sub_builds: scan.sub_builds().iter().map(|s| s.name.clone()).collect(),
        skipped: scan.skipped().to_vec(),
        aggregation,
        plan,
    })
}
