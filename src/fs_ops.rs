//! Filesystem operations behind a mode-agnostic seam.
//!
//! The executor only ever talks to [`FileOps`]. [`LiveOps`] performs real
//! directory creation and same-device renames; [`DryRunOps`] writes the
//! equivalent shell commands instead and never touches the filesystem.

use crate::output::{render_mkdir, render_move};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// A failed filesystem operation. Any one of these is fatal for the run.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write dry-run output: {0}")]
    Output(#[source] std::io::Error),
    #[error("operation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("operation scheduler closed unexpectedly")]
    SchedulerClosed(#[from] tokio::sync::AcquireError),
}

/// The two filesystem capabilities the executor needs.
#[async_trait]
pub trait FileOps: Send + Sync {
    /// Ensures `path` exists, creating missing parents. Existing directories are not an error.
    async fn create_dir(&self, path: &Path) -> Result<(), OperationError>;

    /// Renames `source` to `destination`. `source` is relative to the source root.
    async fn move_file(&self, source: &Path, destination: &Path) -> Result<(), OperationError>;
}

/// Performs operations for real.
#[derive(Debug, Clone)]
pub struct LiveOps {
    source_root: PathBuf,
}

impl LiveOps {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }
}

#[async_trait]
impl FileOps for LiveOps {
    async fn create_dir(&self, path: &Path) -> Result<(), OperationError> {
        tracing::debug!(path = %path.display(), "mkdir");
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| OperationError::CreateDirectory {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn move_file(&self, source: &Path, destination: &Path) -> Result<(), OperationError> {
        let from = self.source_root.join(source);
        tracing::debug!(from = %from.display(), to = %destination.display(), "mv");
        // rename(2) only; cross-device moves surface as an error.
        tokio::fs::rename(&from, destination)
            .await
            .map_err(|err| OperationError::Move {
                from,
                to: destination.to_path_buf(),
                source: err,
            })
    }
}

/// Writes one shell command per operation to `W` instead of touching disk.
pub struct DryRunOps<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> DryRunOps<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, line: &str) -> Result<(), OperationError> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", line)
            .and_then(|_| out.flush())
            .map_err(OperationError::Output)
    }
}

impl DryRunOps<Vec<u8>> {
    /// Everything written so far, for buffered dry runs.
    pub fn rendered(&self) -> String {
        let out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[async_trait]
impl<W: Write + Send> FileOps for DryRunOps<W> {
    async fn create_dir(&self, path: &Path) -> Result<(), OperationError> {
        self.emit(&render_mkdir(path))
    }

    async fn move_file(&self, source: &Path, destination: &Path) -> Result<(), OperationError> {
        self.emit(&render_move(source, destination))
    }
}
