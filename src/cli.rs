//! Command-line interface module for rulemove.
//!
//! This module handles:
//! - Argument parsing into [`Overrides`]
//! - Compiling rules and listing candidates
//! - Planning and executing the run in the configured mode

use crate::config::{Overrides, Settings};
use crate::error::Result;
use crate::executor::{ExecutionMode, ExecutionReport, Executor};
use crate::fs_ops::{DryRunOps, FileOps, LiveOps};
use crate::lister::{FileLister, GlobLister, ListError};
use crate::output::OutputFormatter;
use crate::planner::{OperationPlan, Planner};
use crate::rule::RuleSet;
use clap::{ArgAction, Parser};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

const AFTER_HELP: &str = "\
Notes:
  Rules are written s<d>FROM<d>TO<d> with any non-alphanumeric delimiter <d>,
  e.g. --rule 's!^(?<base>.+)\\.jpg$!images/${base}.jpg!'. The first matching
  rule wins. Append 'i' after the last delimiter for a case-insensitive match.

  Files are renamed, not copied: source and destination must be on the same device.

Examples:
  rulemove --to /shares/files
  rulemove --from /shares/upload --to /shares/files --rule 's!^(?<base>.+)\\.jpg$!misc/${base}.jpg!'
  rulemove --from /shares/upload --to /shares/files \\
      --rule 's!^scene(?<sceneNo>\\d+)-(?<part>\\d+)\\.mp4$!scenes/${sceneNo}/${part}.mp4!'";

/// Move globbed files to destinations computed by ordered rewrite rules.
#[derive(Debug, Parser)]
#[command(name = "rulemove", version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Source base path (default is the current directory)
    #[arg(long, value_name = "PATH")]
    pub from: Option<PathBuf>,

    /// Destination base path
    #[arg(long, value_name = "PATH")]
    pub to: Option<PathBuf>,

    /// Glob expression selecting candidate files, relative to the source path
    #[arg(long, value_name = "EXPRESSION")]
    pub glob: Option<String>,

    /// Rule to apply; repeat to append more rules
    #[arg(long = "rule", value_name = "s/FROM/TO/")]
    pub rules: Vec<String>,

    /// Maximum number of operations to execute at once [default: 3]
    #[arg(short = 'p', long, value_name = "N")]
    pub parallel: Option<NonZeroUsize>,

    /// Don't do anything, just print the shell commands that would run
    #[arg(short = 'n', long = "dry-run", alias = "dryrun")]
    pub dry_run: bool,

    /// Alias for --parallel=1 --dry-run
    #[arg(long)]
    pub debug: bool,

    /// Fail without touching anything if any globbed file matches no rule
    #[arg(long = "stop-unmatched")]
    pub stop_unmatched: bool,

    /// Configuration file with default settings and rules
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The command-line values that take part in settings resolution.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            source: self.from.clone(),
            destination: self.to.clone(),
            glob: self.glob.clone(),
            rules: self.rules.clone(),
            parallel: self.parallel,
            dry_run: self.dry_run,
            debug: self.debug,
            stop_unmatched: self.stop_unmatched,
            verbosity: self.verbose,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: ExecutionMode,
    pub report: ExecutionReport,
    pub unmatched: usize,
}

/// Runs a full pass with the glob lister and the filesystem selected by `settings.mode`.
///
/// Dry runs print their commands to stdout; live runs show a progress bar.
pub async fn run_cli(settings: &Settings) -> Result<RunSummary> {
    let lister = GlobLister::new(&settings.source_root);
    match settings.mode {
        ExecutionMode::DryRun => {
            let ops = Arc::new(DryRunOps::new(std::io::stdout()));
            run_with(settings, &lister, ops, false).await
        }
        ExecutionMode::Live => {
            let ops = Arc::new(LiveOps::new(&settings.source_root));
            run_with(settings, &lister, ops, true).await
        }
    }
}

/// Runs a full pass with explicit collaborators.
///
/// Rules are compiled before anything is listed, and the whole plan is built
/// before the first filesystem operation is dispatched.
pub async fn run_with<L, O>(
    settings: &Settings,
    lister: &L,
    ops: Arc<O>,
    show_progress: bool,
) -> Result<RunSummary>
where
    L: FileLister,
    O: FileOps + 'static,
{
    tracing::debug!(?settings, "resolved settings");

    let rules = RuleSet::compile(&settings.rules)?;
    tracing::info!(count = rules.len(), "compiled rules");

    let candidates = list_candidates(lister, &settings.glob).await?;
    let plan = Planner::new(&rules, &settings.destination_root, settings.stop_on_unmatched)
        .plan(candidates)?;
    log_plan(&plan);

    let mut executor = Executor::new(ops, settings.concurrency);
    if show_progress {
        executor = executor
            .with_progress(OutputFormatter::create_progress_bar(plan.operation_count() as u64));
    }
    let report = executor.execute(&plan).await?;

    Ok(RunSummary {
        mode: settings.mode,
        report,
        unmatched: plan.unmatched.len(),
    })
}

/// Walks the filesystem on the blocking pool so runtime workers stay free.
async fn list_candidates<L: FileLister>(lister: &L, pattern: &str) -> Result<Vec<String>> {
    let lister = lister.clone();
    let pattern = pattern.to_string();
    let listed = tokio::task::spawn_blocking(move || lister.list(&pattern))
        .await
        .map_err(ListError::from)?;
    Ok(listed?)
}

fn log_plan(plan: &OperationPlan) {
    tracing::info!(
        directories = plan.directories_to_create.len(),
        moves = plan.moves.len(),
        unmatched = plan.unmatched.len(),
        "plan ready"
    );
    if plan.moves.is_empty() {
        tracing::warn!("no listed file matched any rule; nothing to do");
    }
}
