//! # Plan Command Implementation
//!
//! This module implements the `plan` subcommand, which scans the products
//! root and shows which publications would be sent to which repository,
//! without publishing anything.
//!
//! ## Functionality
//!
//! - **Routing Tree**: Displays repository → publication → artifact as a tree.
//! - **JSON Output**: `--format json` emits the complete report for tooling.
//! - **Conflict Gate**: `--strict` fails when any conflict was found, so the
//!   command can guard a release pipeline.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::{Args, ValueEnum};
use ptree::{print_tree, TreeItem};

use artifact_combiner::aggregator::{Artifact, Publication};
use artifact_combiner::combiner::{combine, CombineReport};
use artifact_combiner::output::{status_line, OutputConfig, Status};
use artifact_combiner::router::Route;

use super::SourceArgs;

/// How the plan is printed.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanFormat {
    #[default]
    Tree,
    Json,
}

/// Show which publications would be sent to which repository
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = PlanFormat::Tree)]
    pub format: PlanFormat,

    /// Exit with an error when conflicts were found.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, output: &OutputConfig) -> Result<()> {
    let config = args.source.load_config()?;
    let report = combine(&config)?;

    match args.format {
        PlanFormat::Json => println!("{}", report.to_json()?),
        PlanFormat::Tree => {
            println!(
                "{}",
                status_line(
                    output,
                    Status::Info,
                    &format!("Publish plan for: {}", report.products_root.display())
                )
            );
            print_tree(&build_plan_tree(&report))
                .map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
            print_diagnostics(&report, output);
        }
    }

    if args.strict && report.has_conflicts() {
        anyhow::bail!(
            "{} conflict(s) found; refusing a plan that drops artifacts",
            report.aggregation.conflicts.len()
        );
    }

    Ok(())
}

/// Print skipped sub-builds and conflicts after the plan.
pub(crate) fn print_diagnostics(report: &CombineReport, output: &OutputConfig) {
    for skipped in &report.skipped {
        println!(
            "{}",
            status_line(
                output,
                Status::Warn,
                &format!("Skipped sub-build '{}': {}", skipped.name, skipped.reason)
            )
        );
    }
    for conflict in &report.aggregation.conflicts {
        println!(
            "{}",
            status_line(output, Status::Warn, &format!("Conflict: {}", conflict))
        );
    }
    if !report.has_conflicts() && report.skipped.is_empty() {
        println!(
            "{}",
            status_line(
                output,
                Status::Ok,
                &format!(
                    "{} publication(s) in {} repository(ies), no conflicts",
                    report.plan.publication_count(),
                    report.plan.repositories().count()
                )
            )
        );
    }
}

/// Build the repository → publication → artifact tree.
fn build_plan_tree(report: &CombineReport) -> TreeNode {
    let children = report.plan.routes().map(route_node).collect();
    TreeNode {
        label: report.products_root.display().to_string(),
        children,
    }
}

fn route_node(route: &Route) -> TreeNode {
    TreeNode {
        label: format!("{} -> {}", route.sink.name, route.sink.destination_url),
        children: route.publications.iter().map(publication_node).collect(),
    }
}

fn publication_node(publication: &Publication) -> TreeNode {
    TreeNode {
        label: publication.coordinates(),
        children: publication.artifacts().map(artifact_node).collect(),
    }
}

fn artifact_node(artifact: &Artifact) -> TreeNode {
    TreeNode {
        label: format!(
            "[{}] {} ({})",
            artifact.classifier.as_deref().unwrap_or("main"),
            artifact.path.display(),
            artifact.sub_build
        ),
        children: vec![],
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
