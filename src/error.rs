use crate::config::ConfigError;
use crate::fs_ops::OperationError;
use crate::lister::ListError;
use crate::planner::PlanError;
use crate::rule::RuleError;
use thiserror::Error;

/// Any failure that aborts a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Operation(#[from] OperationError),
}

pub type Result<T> = std::result::Result<T, Error>;
