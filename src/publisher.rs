//! # Publishing
//!
//! Drives a [`PublishPlan`] through a [`PublishExecutor`]. The executor is the
//! piece that actually moves bytes; this module only decides what it is asked
//! to do and in which order.
//!
//! Each repository is published on its own rayon task. Repositories hold
//! disjoint sets of publications and distinct destinations, so there is no
//! ordering between them, and a failure or cancellation in one repository
//! stops only that repository's remaining publications.
//!
//! A publication is always handed to the executor as a whole. Executors must
//! make it visible atomically; [`LocalRepositoryExecutor`] stages every file
//! before moving any of them into place.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use rayon::prelude::*;
use url::Url;

use crate::aggregator::{Artifact, Publication};
use crate::error::{Error, Result};
use crate::router::{PublishPlan, RepositorySink, Route};

/// Uploads one publication to one repository.
pub trait PublishExecutor: Send + Sync {
    /// Upload every artifact of `publication` to `sink` as one unit.
    ///
    /// On error nothing of the publication may remain visible at the
    /// destination.
    fn publish(&self, sink: &RepositorySink, publication: &Publication) -> Result<()>;
}

/// Cooperative cancellation flag for one repository.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One [`CancelToken`] per repository of a plan.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    tokens: BTreeMap<String, CancelToken>,
}

impl CancelRegistry {
    pub fn for_plan(plan: &PublishPlan) -> Self {
        Self {
            tokens: plan
                .repositories()
                .map(|name| (name.to_string(), CancelToken::default()))
                .collect(),
        }
    }

    /// Token for `repository`; repositories unknown to the registry get a
    /// fresh token that is never cancelled.
    pub fn token(&self, repository: &str) -> CancelToken {
        self.tokens.get(repository).cloned().unwrap_or_default()
    }

    pub fn cancel(&self, repository: &str) {
        if let Some(token) = self.tokens.get(repository) {
            token.cancel();
        }
    }
}

/// Outcome of publishing one repository.
#[derive(Debug)]
pub struct RepositoryReport {
    pub repository: String,
    pub destination: Url,
    /// Coordinates of publications that completed.
    pub published: Vec<String>,
    /// Publication that failed, if any.
    pub failed: Option<String>,
    /// Publications skipped after a failure or cancellation.
    pub not_attempted: Vec<String>,
    pub error: Option<Error>,
}

impl RepositoryReport {
    fn new(sink: &RepositorySink) -> Self {
        Self {
            repository: sink.name.clone(),
            destination: sink.destination_url.clone(),
            published: Vec::new(),
            failed: None,
            not_attempted: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of publishing a whole plan, one entry per repository.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub repositories: Vec<RepositoryReport>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.repositories.iter().all(RepositoryReport::is_success)
    }

    pub fn published_count(&self) -> usize {
        self.repositories.iter().map(|r| r.published.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RepositoryReport> {
        self.repositories.iter().filter(|r| !r.is_success())
    }
}

/// Publish every route of `plan` with a fresh set of cancel tokens.
pub fn publish_plan<E>(plan: &PublishPlan, executor: &E) -> Result<PublishReport>
where
    E: PublishExecutor + ?Sized,
{
    publish_plan_with(plan, executor, &CancelRegistry::for_plan(plan))
}

/// Publish every route of `plan`, one parallel task per repository.
///
/// Returns an error only when the plan itself is invalid; per-repository
/// failures are reported in the [`PublishReport`].
pub fn publish_plan_with<E>(
    plan: &PublishPlan,
    executor: &E,
    cancel: &CancelRegistry,
) -> Result<PublishReport>
where
    E: PublishExecutor + ?Sized,
{
    plan.verify()?;

    let routes: Vec<&Route> = plan.routes().collect();
    let repositories = routes
        .par_iter()
        .map(|route| publish_route(plan, route, executor, &cancel.token(&route.sink.name)))
        .collect();

    Ok(PublishReport { repositories })
}

fn publish_route<E>(
    plan: &PublishPlan,
    route: &Route,
    executor: &E,
    token: &CancelToken,
) -> RepositoryReport
where
    E: PublishExecutor + ?Sized,
{
    let sink = &route.sink;
    let mut report = RepositoryReport::new(sink);
    let rest = |index: usize| {
        route
            .publications
            .iter()
            .skip(index + 1)
            .map(Publication::coordinates)
            .collect::<Vec<_>>()
    };

    for (index, publication) in route.publications.iter().enumerate() {
        if token.is_cancelled() {
            warn!("Publishing to '{}' cancelled", sink.name);
            report.not_attempted.push(publication.coordinates());
            report.not_attempted.extend(rest(index));
            report.error = Some(Error::Cancelled {
                repository: sink.name.clone(),
            });
            break;
        }

        if !plan.permits(&sink.name, publication) {
            report.failed = Some(publication.coordinates());
            report.not_attempted.extend(rest(index));
            report.error = Some(Error::RoutingViolation {
                repository: sink.name.clone(),
                publication: publication.coordinates(),
                bound: publication.bound_repository.clone(),
            });
            break;
        }

        match executor.publish(sink, publication) {
            Ok(()) => {
                info!("Published {} to '{}'", publication.coordinates(), sink.name);
                report.published.push(publication.coordinates());
            }
            Err(e) => {
                error!(
                    "Failed to publish {} to '{}': {}",
                    publication.coordinates(),
                    sink.name,
                    e
                );
                report.failed = Some(publication.coordinates());
                report.not_attempted.extend(rest(index));
                report.error = Some(e);
                break;
            }
        }
    }

    report
}

/// Maven file name of an artifact: `<artifactId>-<version>[-<classifier>].<ext>`.
pub fn maven_file_name(publication: &Publication, artifact: &Artifact) -> String {
    let mut name = format!("{}-{}", publication.artifact_id, publication.version);
    if let Some(classifier) = &artifact.classifier {
        name.push('-');
        name.push_str(classifier);
    }
    name.push('.');
    name.push_str(&artifact.extension);
    name
}

/// Directory of a publication inside a Maven repository rooted at `root`.
pub fn maven_version_dir(root: &Path, publication: &Publication) -> PathBuf {
    let mut dir = root.to_path_buf();
    for segment in publication.group_id.split('.') {
        dir.push(segment);
    }
    dir.push(&publication.artifact_id);
    dir.push(&publication.version);
    dir
}

/// Minimal POM describing a publication; it declares no dependencies.
pub fn render_pom(publication: &Publication) -> String {
    let packaging = publication
        .artifact(None)
        .map(|a| a.extension.as_str())
        .unwrap_or("pom");

    let mut pom = String::new();
    pom.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    pom.push_str("<project xmlns=\"http://maven.apache.org/POM/4.0.0\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd\">\n");
    pom.push_str("  <modelVersion>4.0.0</modelVersion>\n");
    let _ = writeln!(pom, "  <groupId>{}</groupId>", xml_escape(&publication.group_id));
    let _ = writeln!(pom, "  <artifactId>{}</artifactId>", xml_escape(&publication.artifact_id));
    let _ = writeln!(pom, "  <version>{}</version>", xml_escape(&publication.version));
    let _ = writeln!(pom, "  <packaging>{}</packaging>", xml_escape(packaging));
    pom.push_str("</project>\n");
    pom
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Publishes into Maven repositories on the local filesystem (`file://`).
#[derive(Debug, Clone, Default)]
pub struct LocalRepositoryExecutor;

impl LocalRepositoryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Filesystem root of the repository behind `sink`.
    pub fn repository_root(sink: &RepositorySink) -> Result<PathBuf> {
        if sink.destination_url.scheme() != "file" {
            return Err(Error::UnsupportedDestination {
                url: sink.destination_url.to_string(),
            });
        }
        sink.destination_url
            .to_file_path()
            .map_err(|_| Error::UnsupportedDestination {
                url: sink.destination_url.to_string(),
            })
    }
}

impl PublishExecutor for LocalRepositoryExecutor {
    fn publish(&self, sink: &RepositorySink, publication: &Publication) -> Result<()> {
        let root = Self::repository_root(sink)?;
        let dir = maven_version_dir(&root, publication);
        fs::create_dir_all(&dir)?;

        let publish_error = |message: String| Error::Publish {
            repository: sink.name.clone(),
            publication: publication.coordinates(),
            message,
        };

        let mut staged = Staging::default();
        for artifact in publication.artifacts() {
            let part = staged.stage(dir.join(maven_file_name(publication, artifact)));
            debug!("Staging {} as {}", artifact.path.display(), part.display());
            fs::copy(&artifact.path, &part)
                .map_err(|e| publish_error(format!("copy {}: {}", artifact.path.display(), e)))?;
        }

        let pom_target = dir.join(format!(
            "{}-{}.pom",
            publication.artifact_id, publication.version
        ));
        let pom_part = staged.stage(pom_target.clone());
        fs::write(&pom_part, render_pom(publication))
            .map_err(|e| publish_error(format!("write {}: {}", pom_target.display(), e)))?;

        staged
            .commit()
            .map_err(|e| publish_error(format!("finalize: {}", e)))
    }
}

/// Files copied next to their final names, waiting to be renamed in.
///
/// A part is registered before anything is written to it, so dropping an
/// uncommitted staging removes every part file, including half-written ones.
#[derive(Debug, Default)]
struct Staging {
    files: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    target.with_file_name(name)
}

impl Staging {
    /// Register `target` and return the part path to write it to.
    fn stage(&mut self, target: PathBuf) -> PathBuf {
        let part = sibling(&target, ".part");
        self.files.push((part.clone(), target));
        part
    }

    /// Rename every part into place.
    ///
    /// A file already at a target is moved aside first. On failure the
    /// renamed parts are removed and the previous files are put back.
    fn commit(mut self) -> std::io::Result<()> {
        let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (index, (part, target)) in self.files.iter().enumerate() {
            if fs::symlink_metadata(target).is_ok() {
                let backup = sibling(target, ".bak");
                if let Err(e) = fs::rename(target, &backup) {
                    self.rollback(index, &backups);
                    return Err(e);
                }
                backups.push((backup, target.clone()));
            }
            if let Err(e) = fs::rename(part, target) {
                self.rollback(index, &backups);
                return Err(e);
            }
        }
        for (backup, _) in &backups {
            let _ = fs::remove_file(backup);
        }
        self.committed = true;
        Ok(())
    }

    fn rollback(&self, renamed: usize, backups: &[(PathBuf, PathBuf)]) {
        for (_, done) in &self.files[..renamed] {
            let _ = fs::remove_file(done);
        }
        for (backup, target) in backups {
            if let Err(e) = fs::rename(backup, target) {
                warn!("Cannot restore {}: {}", target.display(), e);
            }
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (part, _) in &self.files {
            if part.exists() {
                let _ = fs::remove_file(part);
            }
        }
    }
}

/// Records what would be published without touching any destination.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    recorded: Mutex<Vec<(String, String)>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(repository, coordinates)` pairs in the order they were received.
    pub fn recorded(&self) -> Result<Vec<(String, String)>> {
        let recorded = self.recorded.lock().map_err(|_| Error::LockPoisoned {
            context: "dry-run record".to_string(),
        })?;
        Ok(recorded.clone())
    }
}

impl PublishExecutor for DryRunExecutor {
    fn publish(&self, sink: &RepositorySink, publication: &Publication) -> Result<()> {
        info!(
            "[dry-run] would publish {} ({} artifacts) to {}",
            publication.coordinates(),
            publication.artifact_count(),
            sink.destination_url
        );
        self.recorded
            .lock()
            .map_err(|_| Error::LockPoisoned {
                context: "dry-run record".to_string(),
            })?
            .push((sink.name.clone(), publication.coordinates()));
        Ok(())
    }
}
