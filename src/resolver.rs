//! Destination path resolution for matched candidates.

use crate::rule::Rule;
use crate::template::TemplateError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors raised while resolving a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The rule's pattern does not match the path.
    #[error("'{path}' does not match rule \"{rule}\"")]
    NotMatched { rule: String, path: String },
    /// The template names a group that took no part in the match.
    #[error("rule \"{rule}\" has no value for ${{{name}}} when applied to '{path}'")]
    UnresolvedPlaceholder {
        rule: String,
        path: String,
        name: String,
    },
    #[error(transparent)]
    Template(TemplateError),
}

/// Named groups that participated in `rule`'s match against `path`.
///
/// Groups that did not participate (an optional group that was skipped) are
/// left out of the map entirely. Returns `None` when the rule does not match.
pub fn captures<'a>(rule: &'a Rule, path: &'a str) -> Option<HashMap<&'a str, &'a str>> {
    let caps = rule.pattern().captures(path)?;
    Some(
        rule.pattern()
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name, m.as_str())))
            .collect(),
    )
}

/// Expands `rule` for `path` and joins the result onto `output_root`.
///
/// The expanded string is always treated as relative to `output_root`, and
/// the joined path is normalized lexically.
pub fn resolve(path: &str, rule: &Rule, output_root: &Path) -> Result<PathBuf, ResolveError> {
    let values = captures(rule, path).ok_or_else(|| ResolveError::NotMatched {
        rule: rule.text().to_string(),
        path: path.to_string(),
    })?;

    let relative = rule.template().render(&values).map_err(|err| match err {
        TemplateError::Missing { name } => ResolveError::UnresolvedPlaceholder {
            rule: rule.text().to_string(),
            path: path.to_string(),
            name,
        },
        other => ResolveError::Template(other),
    })?;

    Ok(join_normalized(output_root, Path::new(&relative)))
}

/// Joins `relative` onto `root`, ignoring any root or prefix on `relative`,
/// then folds `.` and `..` components.
pub fn join_normalized(root: &Path, relative: &Path) -> PathBuf {
    let relative_parts = relative
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)));
    normalize(root.components().chain(relative_parts))
}

fn normalize<'a>(components: impl Iterator<Item = Component<'a>>) -> PathBuf {
    let mut out: Vec<Component<'a>> = Vec::new();
    for component in components {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
