//! Turns listed candidates into a complete operation plan.
//!
//! Planning is synchronous and finishes before any filesystem work starts, so
//! the directory set it builds is never shared with concurrent writers.

use crate::resolver::{self, ResolveError};
use crate::rule::{Rule, RuleSet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort planning. No plan is produced when any of these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The file lister returned nothing.
    #[error("no files found")]
    NoFilesFound,
    /// Stop-on-unmatched is set and this path matched no rule.
    #[error("file '{path}' did not match any rule - aborting")]
    UnmatchedFile { path: String },
    /// A matched rule could not be expanded for this path.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// A single discovered file on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct CandidateFile<'r> {
    /// Path relative to the source root, as listed.
    pub source_path: String,
    /// The first rule that matched, if any.
    pub matched_rule: Option<&'r Rule>,
    /// Where the file will go. Only set for matched candidates.
    pub destination_path: Option<PathBuf>,
}

impl<'r> CandidateFile<'r> {
    fn new(source_path: String) -> Self {
        Self {
            source_path,
            matched_rule: None,
            destination_path: None,
        }
    }
}

/// A pending rename from `source` (relative to the source root) to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Every filesystem operation for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPlan {
    /// Unique destination parents, in the order they were first needed.
    pub directories_to_create: Vec<PathBuf>,
    /// Moves, in the order the candidates were listed.
    pub moves: Vec<Move>,
    /// Candidates that matched no rule and were dropped.
    pub unmatched: Vec<String>,
}

impl OperationPlan {
    pub fn is_empty(&self) -> bool {
        self.directories_to_create.is_empty() && self.moves.is_empty()
    }

    /// Total number of filesystem operations in the plan.
    pub fn operation_count(&self) -> usize {
        self.directories_to_create.len() + self.moves.len()
    }
}

/// Builds [`OperationPlan`]s from candidate lists.
pub struct Planner<'a> {
    rules: &'a RuleSet,
    output_root: &'a Path,
    stop_on_unmatched: bool,
}

impl<'a> Planner<'a> {
    pub fn new(rules: &'a RuleSet, output_root: &'a Path, stop_on_unmatched: bool) -> Self {
        Self {
            rules,
            output_root,
            stop_on_unmatched,
        }
    }

    /// Matches each candidate against the rules and resolves its destination.
    ///
    /// # Errors
    ///
    /// * `PlanError::NoFilesFound` if `candidates` is empty
    /// * `PlanError::UnmatchedFile` for the first unmatched candidate when
    ///   stop-on-unmatched is enabled
    /// * `PlanError::Resolve` if a template cannot be expanded
    pub fn plan<I>(&self, candidates: I) -> Result<OperationPlan, PlanError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut candidates: Vec<CandidateFile<'a>> =
            candidates.into_iter().map(CandidateFile::new).collect();
        if candidates.is_empty() {
            return Err(PlanError::NoFilesFound);
        }

        for candidate in &mut candidates {
            candidate.matched_rule = self.rules.first_match(&candidate.source_path);
        }

        if self.stop_on_unmatched
            && let Some(unmatched) = candidates.iter().find(|c| c.matched_rule.is_none())
        {
            return Err(PlanError::UnmatchedFile {
                path: unmatched.source_path.clone(),
            });
        }

        for candidate in &mut candidates {
            if let Some(rule) = candidate.matched_rule {
                let destination =
                    resolver::resolve(&candidate.source_path, rule, self.output_root)?;
                tracing::debug!(
                    source = %candidate.source_path,
                    destination = %destination.display(),
                    rule = %rule,
                    "resolved"
                );
                candidate.destination_path = Some(destination);
            }
        }

        Ok(Self::assemble(candidates))
    }

    fn assemble(candidates: Vec<CandidateFile<'_>>) -> OperationPlan {
        let mut plan = OperationPlan::default();
        let mut seen = HashSet::new();

        for candidate in candidates {
            let Some(destination) = candidate.destination_path else {
                tracing::info!(path = %candidate.source_path, "no rule matched, skipping");
                plan.unmatched.push(candidate.source_path);
                continue;
            };

            if let Some(parent) = destination.parent()
                && !parent.as_os_str().is_empty()
                && seen.insert(parent.to_path_buf())
            {
                plan.directories_to_create.push(parent.to_path_buf());
            }

            plan.moves.push(Move {
                source: PathBuf::from(candidate.source_path),
                destination,
            });
        }

        plan
    }
}
