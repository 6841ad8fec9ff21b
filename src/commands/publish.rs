//! # Publish Command Implementation
//!
//! This module implements the `publish` subcommand. It builds the same plan
//! as `plan`, refuses to go on when conflicts were found (unless told to), and
//! then uploads every publication to the repository it is bound to.
//!
//! Repositories are published in parallel. A failure in one repository is
//! reported and makes the command fail, but never stops another repository.
//!
//! ## Options
//!
//! - `--dry-run`: Log what would be published without writing anything
//! - `--allow-conflicts`: Publish even though some files were left out

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use artifact_combiner::aggregator::Publication;
use artifact_combiner::combiner::combine;
use artifact_combiner::output::{status_line, OutputConfig, Status};
use artifact_combiner::publisher::{
    publish_plan, DryRunExecutor, LocalRepositoryExecutor, PublishExecutor, PublishReport,
};
use artifact_combiner::router::RepositorySink;

use super::plan::print_diagnostics;
use super::SourceArgs;

/// Publish every publication to the repository it is bound to
#[derive(Args, Debug, Clone, Default)]
pub struct PublishArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Show what would be published without writing to any repository.
    #[arg(long)]
    pub dry_run: bool,

    /// Publish even when conflicts left some files out of the plan.
    #[arg(long)]
    pub allow_conflicts: bool,
}

/// Execute the `publish` command.
pub fn execute(args: PublishArgs, output: &OutputConfig) -> Result<()> {
    let config = args.source.load_config()?;
    let report = combine(&config)?;
    print_diagnostics(&report, output);

    if report.has_conflicts() && !args.allow_conflicts {
        anyhow::bail!(
            "Refusing to publish: {} conflict(s) found (use --allow-conflicts to publish the rest)",
            report.aggregation.conflicts.len()
        );
    }

    if report.plan.is_empty() {
        println!(
            "{}",
            status_line(output, Status::Info, "Nothing to publish")
        );
        return Ok(());
    }

    let progress = ProgressBar::new(report.plan.publication_count() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let result = if args.dry_run {
        publish_plan(
            &report.plan,
            &ProgressExecutor::new(DryRunExecutor::new(), progress.clone()),
        )?
    } else {
        publish_plan(
            &report.plan,
            &ProgressExecutor::new(LocalRepositoryExecutor::new(), progress.clone()),
        )?
    };
    progress.finish_and_clear();

    print_publish_report(&result, args.dry_run, output);

    if !result.is_success() {
        anyhow::bail!(
            "Publishing failed for {} repository(ies)",
            result.failures().count()
        );
    }

    Ok(())
}

fn print_publish_report(report: &PublishReport, dry_run: bool, output: &OutputConfig) {
    let verb = if dry_run { "Would publish" } else { "Published" };
    for repository in &report.repositories {
        for coordinates in &repository.published {
            println!(
                "{}",
                status_line(
                    output,
                    Status::Ok,
                    &format!("{} {} to '{}'", verb, coordinates, repository.repository)
                )
            );
        }
        if let Some(error) = &repository.error {
            println!(
                "{}",
                status_line(
                    output,
                    Status::Fail,
                    &format!("Repository '{}': {}", repository.repository, error)
                )
            );
            for coordinates in &repository.not_attempted {
                println!("    not attempted: {}", coordinates);
            }
        }
    }
}

/// Advances a progress bar around another executor.
struct ProgressExecutor<E> {
    inner: E,
    progress: ProgressBar,
}

impl<E> ProgressExecutor<E> {
    fn new(inner: E, progress: ProgressBar) -> Self {
        Self { inner, progress }
    }
}

impl<E: PublishExecutor> PublishExecutor for ProgressExecutor<E> {
    fn publish(
        &self,
        sink: &RepositorySink,
        publication: &Publication,
    ) -> artifact_combiner::error::Result<()> {
        self.progress
            .set_message(format!("{} -> {}", publication.coordinates(), sink.name));
        let result = self.inner.publish(sink, publication);
        self.progress.inc(1);
        result
    }
}
