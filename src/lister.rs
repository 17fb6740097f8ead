//! Candidate discovery.

use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("invalid glob expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("error while listing files: {0}")]
    Walk(#[from] glob::GlobError),
    #[error("file listing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Produces candidate paths, relative to some root, for a pattern.
///
/// Listing walks the filesystem synchronously; callers inside a runtime move
/// it onto a blocking thread, hence the `Clone + Send` bounds.
pub trait FileLister: Clone + Send + 'static {
    fn list(&self, pattern: &str) -> Result<Vec<String>, ListError>;
}

/// Lists regular files under `root` that match a glob expression.
///
/// Supports `*`, `?`, `[...]` and `**`. Hidden entries only match when the
/// pattern spells out the leading dot. Results are sorted so that runs over
/// the same tree are reproducible.
#[derive(Debug, Clone)]
pub struct GlobLister {
    root: PathBuf,
}

impl GlobLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn options() -> MatchOptions {
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        }
    }
}

impl FileLister for GlobLister {
    fn list(&self, pattern: &str) -> Result<Vec<String>, ListError> {
        // glob drops `./` from the paths it yields, so match against a root without it.
        let base = without_cur_dir(&self.root);
        let full = if base.as_os_str().is_empty() {
            PathBuf::from(pattern)
        } else {
            Path::new(&Pattern::escape(&base.to_string_lossy())).join(pattern)
        };
        let full = full.to_string_lossy();

        let entries =
            glob::glob_with(&full, Self::options()).map_err(|source| ListError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            if let Some(relative) = relative_candidate(&base, &path) {
                files.push(relative);
            }
        }

        files.sort();
        tracing::info!(pattern, count = files.len(), "listed candidates");
        Ok(files)
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `path` relative to `base` as a UTF-8 string, or `None` (with a warning)
/// when it lies outside `base` or its name is not valid UTF-8.
fn relative_candidate(base: &Path, path: &Path) -> Option<String> {
    let cleaned = without_cur_dir(path);
    let Ok(relative) = cleaned.strip_prefix(base) else {
        tracing::warn!(path = %path.display(), root = %base.display(), "skipping path outside source root");
        return None;
    };
    match relative.to_str() {
        Some(relative) => Some(relative.to_string()),
        None => {
            tracing::warn!(path = %path.display(), "skipping non-UTF-8 file name");
            None
        }
    }
}
