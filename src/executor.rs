//! Runs an [`OperationPlan`] with a bounded number of operations in flight.
//!
//! Execution happens in two strict phases. Every directory creation finishes
//! before the first move is dispatched. Within a phase a semaphore caps the
//! number of running operations, and a freed slot is refilled straight away
//! from the queue. Once any operation fails, nothing new is dispatched; the
//! operations already running are awaited and the first error is returned.
//! Completed operations are never rolled back.

use crate::fs_ops::{FileOps, OperationError};
use crate::planner::{Move, OperationPlan};
use indicatif::ProgressBar;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Whether operations are performed or only rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    DryRun,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    CreateDirectories,
    MoveFiles,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::CreateDirectories => f.write_str("directory creation"),
            Phase::MoveFiles => f.write_str("file moves"),
        }
    }
}

/// Counts of what a successful run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub directories_created: usize,
    pub files_moved: usize,
}

/// Dispatches plan operations against a [`FileOps`] implementation.
pub struct Executor<O> {
    ops: Arc<O>,
    limit: NonZeroUsize,
    progress: ProgressBar,
}

impl<O: FileOps + 'static> Executor<O> {
    pub fn new(ops: Arc<O>, limit: NonZeroUsize) -> Self {
        Self {
            ops,
            limit,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports each completed operation on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Creates all planned directories, then performs all planned moves.
    pub async fn execute(&self, plan: &OperationPlan) -> Result<ExecutionReport, OperationError> {
        let directories_created = self
            .run_phase(
                Phase::CreateDirectories,
                plan.directories_to_create.clone(),
                |ops: Arc<O>, dir: PathBuf| async move { ops.create_dir(&dir).await },
            )
            .await?;

        let files_moved = self
            .run_phase(
                Phase::MoveFiles,
                plan.moves.clone(),
                |ops: Arc<O>, mv: Move| async move {
                    ops.move_file(&mv.source, &mv.destination).await
                },
            )
            .await?;

        self.progress.finish_and_clear();
        Ok(ExecutionReport {
            directories_created,
            files_moved,
        })
    }

    async fn run_phase<T, F, Fut>(
        &self,
        phase: Phase,
        items: Vec<T>,
        op: F,
    ) -> Result<usize, OperationError>
    where
        T: Send + 'static,
        F: Fn(Arc<O>, T) -> Fut,
        Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
    {
        let total = items.len();
        tracing::debug!(%phase, total, limit = self.limit.get(), "starting phase");

        let semaphore = Arc::new(Semaphore::new(self.limit.get()));
        let mut tasks = JoinSet::new();
        let mut tally = Tally::default();
        // Set by a failing task before it releases its permit, so the next
        // acquire observes it even if the task has not been joined yet.
        let failed = Arc::new(AtomicBool::new(false));

        for item in items {
            let permit = Arc::clone(&semaphore).acquire_owned().await?;
            while let Some(joined) = tasks.try_join_next() {
                tally.record(joined, &self.progress);
            }
            if tally.failed() || failed.load(Ordering::SeqCst) {
                break;
            }

            let fut = op(Arc::clone(&self.ops), item);
            let failed = Arc::clone(&failed);
            tasks.spawn(async move {
                let result = fut.await;
                if result.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                drop(permit);
                result
            });
        }

        while let Some(joined) = tasks.join_next().await {
            tally.record(joined, &self.progress);
        }

        match tally.error {
            Some(err) => {
                tracing::error!(
                    %phase,
                    completed = tally.completed,
                    total,
                    "aborting run; completed operations are left in place"
                );
                Err(err)
            }
            None => {
                tracing::debug!(%phase, completed = tally.completed, "phase finished");
                Ok(tally.completed)
            }
        }
    }
}

#[derive(Default)]
struct Tally {
    completed: usize,
    error: Option<OperationError>,
}

impl Tally {
    fn record(&mut self, joined: Result<Result<(), OperationError>, JoinError>, progress: &ProgressBar) {
        match joined.map_err(OperationError::from).and_then(|result| result) {
            Ok(()) => {
                self.completed += 1;
                progress.inc(1);
            }
            Err(err) => {
                tracing::warn!(error = %err, "operation failed");
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }
}
