//! Rewrite rules and first-match-wins selection.
//!
//! Rules are written Perl-style as `s<d>FROM<d>TO<d>`, where `<d>` is any
//! single non-alphanumeric character chosen by the author:
//!
//! ```text
//! s!^(?<base>.+)\.jpg$!images/${base}.jpg!
//! s|^scene(?<no>\d+)\.mp4$|scenes/${no}.mp4|i
//! ```
//!
//! `FROM` is a regular expression tested against each candidate path, `TO` a
//! [`Template`] expanded from its named captures. Trailing flags after the
//! last delimiter are optional; `i` makes the pattern case-insensitive.

use crate::template::{Template, TemplateError};
use regex::{Regex, RegexBuilder};
use std::fmt;
use thiserror::Error;

/// Errors raised while turning rule strings into a [`RuleSet`].
#[derive(Debug, Error)]
pub enum RuleError {
    /// Neither the configuration nor the command line supplied any rule.
    #[error("no rules are configured; pass at least one --rule")]
    NoRulesConfigured,
    /// The rule string does not follow `s<d>FROM<d>TO<d>[flags]`.
    #[error("invalid rule \"{rule}\": {reason}")]
    InvalidSyntax { rule: String, reason: String },
    /// `FROM` is not a valid regular expression.
    #[error("invalid pattern in rule \"{rule}\": {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
    /// `TO` is not a valid template.
    #[error("invalid template in rule \"{rule}\": {source}")]
    InvalidTemplate {
        rule: String,
        #[source]
        source: TemplateError,
    },
    /// `TO` references a group that `FROM` never defines.
    #[error("rule \"{rule}\" references ${{{name}}} but its pattern has no such named group")]
    UnknownPlaceholder { rule: String, name: String },
}

/// The three textual parts of a rule string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParts<'a> {
    pub delimiter: char,
    pub from: &'a str,
    pub to: &'a str,
    pub flags: &'a str,
}

/// Splits a rule string into its delimiter-bounded fields.
///
/// `FROM` ends at the first delimiter after it; `TO` extends to the last
/// delimiter in the string, so it may itself contain the delimiter.
pub fn split_rule(rule: &str) -> Result<RuleParts<'_>, RuleError> {
    let invalid = |reason: &str| RuleError::InvalidSyntax {
        rule: rule.to_string(),
        reason: reason.to_string(),
    };

    let Some(body) = rule.strip_prefix('s') else {
        return Err(invalid("rules must start with 's'"));
    };
    let mut chars = body.chars();
    let delimiter = chars.next().ok_or_else(|| invalid("missing delimiter after 's'"))?;
    if delimiter.is_alphanumeric() || delimiter.is_whitespace() || delimiter == '\\' {
        return Err(invalid(
            "delimiter must not be alphanumeric, whitespace or a backslash",
        ));
    }
    let body = chars.as_str();

    let from_end = body
        .find(delimiter)
        .ok_or_else(|| invalid("expected three delimiters"))?;
    let from = &body[..from_end];
    let after_from = &body[from_end + delimiter.len_utf8()..];

    let to_end = after_from
        .rfind(delimiter)
        .ok_or_else(|| invalid("expected three delimiters"))?;
    let to = &after_from[..to_end];
    let flags = &after_from[to_end + delimiter.len_utf8()..];

    if from.is_empty() {
        return Err(invalid("pattern is empty"));
    }
    if to.is_empty() {
        return Err(invalid("destination template is empty"));
    }
    if let Some(flag) = flags.chars().find(|c| *c != 'i') {
        return Err(invalid(&format!("unknown flag '{}'", flag)));
    }

    Ok(RuleParts {
        delimiter,
        from,
        to,
        flags,
    })
}

/// A compiled rewrite rule: a pattern plus its destination template.
#[derive(Debug, Clone)]
pub struct Rule {
    text: String,
    pattern: Regex,
    template: Template,
}

impl Rule {
    /// Parses and eagerly compiles a single rule string.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let parts = split_rule(text)?;

        let pattern = RegexBuilder::new(parts.from)
            .case_insensitive(parts.flags.contains('i'))
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                rule: text.to_string(),
                source,
            })?;

        let template =
            Template::compile(parts.to).map_err(|source| RuleError::InvalidTemplate {
                rule: text.to_string(),
                source,
            })?;

        if let Some(name) = template
            .placeholders()
            .find(|name| !pattern.capture_names().flatten().any(|group| group == *name))
        {
            return Err(RuleError::UnknownPlaceholder {
                rule: text.to_string(),
                name: name.to_string(),
            });
        }

        Ok(Self {
            text: text.to_string(),
            pattern,
            template,
        })
    }

    /// The rule as it was written.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An ordered, non-empty list of rules. Earlier rules take priority.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compiles every rule string in order, failing on the first bad one.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NoRulesConfigured` when `texts` is empty.
    pub fn compile<I, S>(texts: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = texts
            .into_iter()
            .map(|text| Rule::parse(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        if rules.is_empty() {
            return Err(RuleError::NoRulesConfigured);
        }

        Ok(Self { rules })
    }

    /// Returns the first rule whose pattern matches `path`.
    pub fn first_match(&self, path: &str) -> Option<&Rule> {
        find_rule(path, &self.rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// First-match-wins scan. Stops at the first matching rule.
pub fn find_rule<'r>(path: &str, rules: &'r [Rule]) -> Option<&'r Rule> {
    rules.iter().find(|rule| rule.is_match(path))
}
