//! rulemove - batch relocation of files through ordered rewrite rules
//!
//! Files selected by a glob are matched against an ordered list of
//! `s<d>FROM<d>TO<d>` rules. The first rule that matches a path decides its
//! destination: named captures from `FROM` fill the `${name}` placeholders in
//! `TO`, and the result is joined onto the destination root. The complete plan
//! is computed up front, then executed with bounded concurrency (all directory
//! creation first, then all moves) or printed as shell commands in dry-run mode.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod fs_ops;
pub mod lister;
pub mod output;
pub mod planner;
pub mod resolver;
pub mod rule;
pub mod template;

pub use cli::{Cli, RunSummary, run_cli, run_with};
pub use config::{ConfigError, FileConfig, Overrides, Settings};
pub use error::{Error, Result};
pub use executor::{ExecutionMode, ExecutionReport, Executor};
pub use fs_ops::{DryRunOps, FileOps, LiveOps, OperationError};
pub use lister::{FileLister, GlobLister, ListError};
pub use planner::{CandidateFile, Move, OperationPlan, PlanError, Planner};
pub use rule::{Rule, RuleError, RuleSet, find_rule};
pub use template::{Template, TemplateError};
